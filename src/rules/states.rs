pub(crate) mod rules;


/// The two raw tokens binary points report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryToken {
    Active,
    Inactive,
}

impl BinaryToken {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            BinaryToken::Active => "active",
            BinaryToken::Inactive => "inactive",
        }
    }
}

/// The canonical pair used when discovery did not report any state text.
pub(crate) const DEFAULT_TOKENS: [BinaryToken; 2] = [BinaryToken::Active, BinaryToken::Inactive];

pub(crate) fn normalize_token(raw: &str) -> Option<BinaryToken> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "active" => Some(BinaryToken::Active),
        "inactive" => Some(BinaryToken::Inactive),
        _ => None,
    }
}
