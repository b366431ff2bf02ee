macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

macro_rules! has {
    ($kw:literal) => {
        $crate::Pattern::Contains($kw)
    };
}

macro_rules! any_of {
    ($($kw:literal),+ $(,)?) => {
        $crate::Pattern::AnyOf(&[$($kw),+])
    };
}

macro_rules! exact {
    ($kw:literal) => {
        $crate::Pattern::Exact($kw)
    };
}

macro_rules! re {
    ($pat:literal) => {
        $crate::Pattern::Regex(regex!($pat))
    };
}

macro_rules! rule {
    (
        name: $name:expr,
        pattern: [ $($pat:expr),* $(,)? ]
        $(, priority: $priority:expr)?
        , unit: $unit:expr
        $(,)?
    ) => {{
        $crate::Rule {
            name: $name,
            pattern: vec![ $($pat),* ],
            production: $crate::Production::Unit($unit),
            priority: { 0 $(+ $priority)? },
        }
    }};
    (
        name: $name:expr,
        pattern: [ $($pat:expr),* $(,)? ]
        $(, priority: $priority:expr)?
        , states: ($active:expr, $inactive:expr)
        $(,)?
    ) => {{
        $crate::Rule {
            name: $name,
            pattern: vec![ $($pat),* ],
            production: $crate::Production::States { active: $active, inactive: $inactive },
            priority: { 0 $(+ $priority)? },
        }
    }};
}
