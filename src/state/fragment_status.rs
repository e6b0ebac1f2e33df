/// Fragment status definitions for tracking crawl progress
///
/// A fragment starts out `NotVisited`. The first fetch moves it to either
/// `Immutable` (terminal) or `MutableAndActive`, which loops onto itself on
/// every revisit.
use std::fmt;

/// Represents the crawl status of a single fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentStatus {
    /// Discovered but never fetched
    NotVisited,

    /// Fetched and declared immutable, never revisited
    Immutable,

    /// Fetched and may still change, revisited once its next visit is due
    MutableAndActive,
}

impl FragmentStatus {
    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::NotVisited => "not_visited",
            Self::Immutable => "immutable",
            Self::MutableAndActive => "mutable_and_active",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "not_visited" => Some(Self::NotVisited),
            "immutable" => Some(Self::Immutable),
            "mutable_and_active" => Some(Self::MutableAndActive),
            _ => None,
        }
    }
}

impl fmt::Display for FragmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_db_string() {
        for status in [
            FragmentStatus::NotVisited,
            FragmentStatus::Immutable,
            FragmentStatus::MutableAndActive,
        ] {
            let db_str = status.to_db_string();
            assert_eq!(Some(status), FragmentStatus::from_db_string(db_str));
        }
        assert_eq!(FragmentStatus::from_db_string("visited"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", FragmentStatus::NotVisited), "not_visited");
        assert_eq!(
            format!("{}", FragmentStatus::MutableAndActive),
            "mutable_and_active"
        );
    }
}
