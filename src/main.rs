mod debug_report;

use abel::{
    AbelError, Context, DiscoveryPayload, GuidStrategy, Loadsheet, Options, PriorConfig, convert_verbose_with,
};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ABEL_LOG";

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    init_tracing();

    if let Err(err) = run(&config) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

struct CliConfig {
    loadsheet: PathBuf,
    payload: Option<PathBuf>,
    prior: Option<PathBuf>,
    output: Option<PathBuf>,
    guids: GuidStrategy,
    extended_columns: bool,
    color: bool,
}

fn run(config: &CliConfig) -> Result<(), AbelError> {
    let loadsheet = Loadsheet::from_json(&read_file(&config.loadsheet)?)?;
    let payload = match &config.payload {
        Some(path) => DiscoveryPayload::from_json(&read_file(path)?)?,
        None => DiscoveryPayload::default(),
    };
    let prior = match &config.prior {
        Some(path) => Some(PriorConfig::from_yaml(&read_file(path)?)?),
        None => None,
    };

    let ctx = Context::default();
    let opts = Options { guids: config.guids, extended_columns: config.extended_columns };
    let res = convert_verbose_with(&loadsheet, &payload, prior.as_ref(), &ctx, &opts)?;

    let json = res.report.to_json()?;
    match &config.output {
        Some(path) => std::fs::write(path, json + "\n").map_err(|source| io_error(path, source))?,
        None => {
            let mut out = io::stdout().lock();
            writeln!(out, "{json}").map_err(|source| AbelError::Io { path: "<stdout>".into(), source })?;
        }
    }

    debug_report::print_run(&config.loadsheet.display().to_string(), &res.report, &res.details, config.color);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).with_target(false).init();
}

fn read_file(path: &Path) -> Result<String, AbelError> {
    std::fs::read_to_string(path).map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: io::Error) -> AbelError {
    AbelError::Io { path: path.display().to_string(), source }
}

fn parse_args() -> Result<CliConfig, String> {
    let mut loadsheet: Option<PathBuf> = None;
    let mut payload: Option<PathBuf> = None;
    let mut prior: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut guids = GuidStrategy::Derived;
    let mut extended_columns = false;
    let mut color = io::stderr().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        let slot = match flag.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("abel {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => {
                color = true;
                continue;
            }
            "--no-color" => {
                color = false;
                continue;
            }
            "--random-guids" => {
                guids = GuidStrategy::Random;
                continue;
            }
            "--extended" => {
                extended_columns = true;
                continue;
            }
            "--loadsheet" | "-l" => &mut loadsheet,
            "--payload" | "-p" => &mut payload,
            "--prior" => &mut prior,
            "--output" | "-o" => &mut output,
            _ => return Err(format!("error: unknown option '{arg}'\n\n{}", help_text())),
        };

        let value = match inline {
            Some(value) => value,
            None => args.next().ok_or_else(|| format!("error: {flag} expects a value"))?,
        };
        if value.is_empty() {
            return Err(format!("error: {flag} expects a value"));
        }
        if slot.is_some() {
            return Err(format!("error: {flag} provided multiple times"));
        }
        *slot = Some(PathBuf::from(value));
    }

    let Some(loadsheet) = loadsheet else {
        return Err(format!("error: no loadsheet provided\n\n{}", help_text()));
    };

    Ok(CliConfig { loadsheet, payload, prior, output, guids, extended_columns, color })
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "abel {version}

Converts an HVAC point loadsheet and a device discovery payload into
building entity tables.

Usage:
  abel --loadsheet <file> [--payload <file>] [--prior <file>] [OPTIONS]

Options:
  -l, --loadsheet <file>     Loadsheet JSON (array of row objects). Required.
  -p, --payload <file>       Discovery payload JSON. Default: empty payload.
  --prior <file>             Previously published configuration (YAML).
  -o, --output <file>        Write the report JSON here instead of stdout.
  --random-guids             Mint random guids for new virtual entities.
  --extended                 Add display name, device id and units-check columns.
  --color                    Force ANSI color in the run summary.
  --no-color                 Disable ANSI color in the run summary.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Logging:
  {log_env}=<filter>          tracing filter, e.g. {log_env}=abel=debug. Default: warn

Exit codes:
  0  Success.
  1  Conversion or I/O error.
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
        log_env = LOG_ENV,
    )
}
