use crate::Rule;

// Priority tiers. Stateful and counter points never carry an engineering
// unit, whatever else the name says, and percentages beat the measured
// quantity they are a percentage of.
const NO_UNITS: u16 = 3;
const PERCENT: u16 = 2;
const MEASURED: u16 = 1;

/// Unit rules. Within a tier, names that embed a more generic keyword
/// (`reactive_power` vs `power`) must be declared first.
pub fn get() -> Vec<Rule> {
    vec![
        rule! {
            name: "no units (stateful or counter)",
            pattern: [any_of!(
                "alarm",
                "run_command",
                "run_status",
                "damper_command",
                "damper_status",
                "mode",
                "valve_command",
                "valve_status",
                "count",
                "powerfactor",
            )],
            priority: NO_UNITS,
            unit: "no_units",
        },
        rule! {
            name: "percentage",
            pattern: [has!("percentage")],
            priority: PERCENT,
            unit: "percent",
        },
        rule! {
            name: "temperature",
            pattern: [has!("temperature")],
            priority: MEASURED,
            unit: "degrees_fahrenheit",
        },
        rule! {
            name: "frequency",
            pattern: [has!("frequency")],
            priority: MEASURED,
            unit: "hertz",
        },
        rule! {
            name: "current",
            pattern: [has!("current")],
            priority: MEASURED,
            unit: "amperes",
        },
        rule! {
            name: "torque",
            pattern: [has!("torque")],
            priority: MEASURED,
            unit: "newton_meters",
        },
        rule! {
            name: "cooling thermal power",
            pattern: [has!("cooling_thermal_power")],
            priority: MEASURED,
            unit: "tons_of_refrigeration",
        },
        rule! {
            name: "heating thermal power",
            pattern: [has!("heating_thermal_power")],
            priority: MEASURED,
            unit: "btus_per_hour",
        },
        rule! {
            name: "load power",
            pattern: [has!("load_power")],
            priority: MEASURED,
            unit: "tons_of_refrigeration",
        },
        rule! {
            name: "reactive power",
            pattern: [has!("reactive_power")],
            priority: MEASURED,
            unit: "kilovolt_amperes_reactive",
        },
        rule! {
            name: "power",
            pattern: [has!("power")],
            priority: MEASURED,
            unit: "kilowatts",
        },
        rule! {
            name: "illuminance",
            pattern: [has!("illuminance")],
            priority: MEASURED,
            unit: "lux",
        },
        rule! {
            name: "reactive energy accumulator",
            pattern: [has!("reactive_energy_accumulator")],
            priority: MEASURED,
            unit: "kilovolt_ampere_hours",
        },
        rule! {
            name: "thermal energy accumulator",
            pattern: [has!("thermal_energy_accumulator")],
            priority: MEASURED,
            unit: "tons_of_refrigeration",
        },
        rule! {
            name: "energy accumulator",
            pattern: [has!("energy_accumulator")],
            priority: MEASURED,
            unit: "kilowatt_hours",
        },
        rule! {
            name: "time accumulator",
            pattern: [has!("time_accumulator")],
            priority: MEASURED,
            unit: "hours",
        },
        rule! {
            name: "water volume accumulator",
            pattern: [has!("water_volume_accumulator")],
            priority: MEASURED,
            unit: "us_gallons",
        },
        rule! {
            name: "thermal efficiency",
            pattern: [has!("thermalefficiency")],
            priority: MEASURED,
            unit: "kilowatts_per_ton",
        },
        rule! {
            name: "enthalpy",
            pattern: [has!("enthalpy")],
            priority: MEASURED,
            unit: "btus_per_pound_dry_air",
        },
        rule! {
            name: "humidity",
            pattern: [has!("humidity")],
            priority: MEASURED,
            unit: "percent_relative_humidity",
        },
        rule! {
            name: "voltage",
            pattern: [has!("voltage")],
            priority: MEASURED,
            unit: "volts",
        },
        rule! {
            name: "air pressure",
            pattern: [has!("air"), has!("pressure")],
            priority: MEASURED,
            unit: "inches_of_water",
        },
        rule! {
            name: "filter pressure",
            pattern: [has!("filter"), has!("pressure")],
            priority: MEASURED,
            unit: "inches_of_water",
        },
        rule! {
            name: "liquid or differential pressure",
            pattern: [any_of!("refrigerant", "water", "differential"), has!("pressure")],
            priority: MEASURED,
            unit: "pounds_force_per_square_inch",
        },
        rule! {
            name: "air flowrate",
            pattern: [has!("air"), has!("flowrate")],
            priority: MEASURED,
            unit: "cubic_feet_per_minute",
        },
        rule! {
            name: "water flowrate",
            pattern: [has!("water"), has!("flowrate")],
            priority: MEASURED,
            unit: "us_gallons_per_minute",
        },
        rule! {
            name: "bare flowrate",
            pattern: [re!(r"^flowrate_(sensor|setpoint)$")],
            priority: MEASURED,
            unit: "us_gallons_per_minute",
        },
        rule! {
            name: "concentration",
            pattern: [has!("concentration")],
            priority: MEASURED,
            unit: "parts_per_million",
        },
    ]
}
