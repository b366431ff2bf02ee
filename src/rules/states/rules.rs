use crate::Rule;

/// State rules. A rule with more patterns beats a rule with fewer
/// (`economizer` + `mode`); single-keyword families tie and the earlier
/// declaration wins, so a `valve_status` alarm maps like a valve, not an
/// alarm.
pub fn get() -> Vec<Rule> {
    vec![
        rule! {
            name: "economizer mode",
            pattern: [has!("economizer"), has!("mode")],
            states: ("ON", "OFF"),
        },
        rule! {
            name: "valve",
            pattern: [any_of!("valve_command", "valve_status")],
            states: ("OPEN", "CLOSED"),
        },
        rule! {
            name: "damper",
            pattern: [any_of!("damper_command", "damper_status")],
            states: ("OPEN", "CLOSED"),
        },
        rule! {
            name: "run",
            pattern: [any_of!("run_command", "run_status")],
            states: ("ON", "OFF"),
        },
        rule! {
            name: "occupancy override",
            pattern: [exact!("user_occupancy_override_status")],
            states: ("ENABLED", "DISABLED"),
        },
        rule! {
            name: "occupancy",
            pattern: [has!("occupancy_status")],
            states: ("OCCUPIED", "UNOCCUPIED"),
        },
        rule! {
            name: "alarm",
            pattern: [has!("alarm")],
            states: ("ACTIVE", "INACTIVE"),
        },
    ]
}
