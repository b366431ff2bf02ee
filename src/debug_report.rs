use abel::{ConversionDetails, Report};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

/// Run summary on stderr; stdout is reserved for the report.
pub fn print_run(source: &str, report: &Report, details: &ConversionDetails, color: bool) {
    let palette = ansi::Palette::new(color);
    eprintln!("\n{}", palette.bold(palette.paint(format!("⚙  Converting: {source}"), ansi::CYAN)));
    eprintln!("  {} {}", palette.dim("started:"), palette.dim(details.run_started.format("%Y-%m-%dT%H:%M:%S").to_string()));

    eprintln!("\n{}", palette.paint("━━━ Stages ━━━", ansi::GRAY));
    for stage in &details.stages {
        let notes = if stage.notes > 0 {
            palette.paint(format!("{} notes", stage.notes), ansi::YELLOW)
        } else {
            palette.dim("0 notes")
        };
        eprintln!(
            "  {:<10} {}  {}  {}",
            palette.paint(&stage.name, ansi::BLUE),
            palette.paint(format!("{} rows", stage.produced), ansi::GREEN),
            notes,
            palette.dim(format!("{:?}", stage.duration)),
        );
    }

    eprintln!("\n{}", palette.paint("━━━ Tables ━━━", ansi::GRAY));
    let virtual_count = report.entities.iter().filter(|e| !e.is_reporting).count();
    eprintln!(
        "  entities: {}  {}",
        palette.bold(report.entities.len().to_string()),
        palette.dim(format!("({virtual_count} virtual)")),
    );
    eprintln!("  entity fields: {}", palette.bold(report.entity_fields.len().to_string()));
    eprintln!("  states: {}", palette.bold(report.states.len().to_string()));
    if !report.existing_virtual_entities.is_empty() {
        eprintln!("  existing virtual entities: {}", palette.bold(report.existing_virtual_entities.len().to_string()));
    }

    if !report.log.is_empty() || !report.incorrect_units.is_empty() {
        eprintln!("\n{}", palette.paint("━━━ Review ━━━", ansi::GRAY));
        for entry in report.log.iter().take(10) {
            eprintln!("  {} {}", palette.paint(format!("[{}]", entry.index), ansi::GRAY), entry.message);
        }
        if report.log.len() > 10 {
            eprintln!("  {}", palette.dim(format!("... +{} more log entries", report.log.len() - 10)));
        }
        if !report.incorrect_units.is_empty() {
            eprintln!(
                "  {}",
                palette.paint(format!("{} points report incorrect units", report.incorrect_units.len()), ansi::YELLOW)
            );
        }
    }

    eprintln!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    eprintln!("  Total: {}", palette.paint(format!("{:?}", details.total), ansi::GREEN));
    eprintln!();
}
