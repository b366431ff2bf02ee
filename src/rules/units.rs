pub(crate) mod helpers;
pub(crate) mod rules;
