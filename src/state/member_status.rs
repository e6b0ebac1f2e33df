use std::fmt;

/// Represents whether a member has been supplied to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberStatus {
    /// Discovered in a fragment, waiting to be supplied
    Unprocessed,

    /// Supplied once; kept only as a deduplication marker
    Processed,
}

impl MemberStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Unprocessed => "unprocessed",
            Self::Processed => "processed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "unprocessed" => Some(Self::Unprocessed),
            "processed" => Some(Self::Processed),
            _ => None,
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
