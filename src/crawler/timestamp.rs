//! Member timestamp extraction

use chrono::{DateTime, Utc};
use oxrdf::{Graph, NamedNode, TermRef};

/// Derives the creation timestamp of a member from its graph
pub trait TimestampExtractor: Send + Sync {
    fn extract(&self, member: &Graph) -> DateTime<Utc>;
}

/// Stamps every member with the time it was discovered
#[derive(Debug, Default, Clone, Copy)]
pub struct CurrentTimeExtractor;

impl TimestampExtractor for CurrentTimeExtractor {
    fn extract(&self, _member: &Graph) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Reads the timestamp from the first literal object of a predicate
///
/// Falls back to the current time when the predicate is missing or its value
/// is not an RFC 3339 date-time.
#[derive(Debug, Clone)]
pub struct PropertyPathExtractor {
    predicate: NamedNode,
}

impl PropertyPathExtractor {
    pub fn new(predicate: NamedNode) -> Self {
        Self { predicate }
    }
}

impl TimestampExtractor for PropertyPathExtractor {
    fn extract(&self, member: &Graph) -> DateTime<Utc> {
        let timestamp = member
            .triples_for_predicate(&self.predicate)
            .find_map(|triple| match triple.object {
                TermRef::Literal(literal) => DateTime::parse_from_rfc3339(literal.value()).ok(),
                _ => None,
            });

        match timestamp {
            Some(timestamp) => timestamp.with_timezone(&Utc),
            None => {
                tracing::trace!("No usable {} on member, using current time", self.predicate);
                Utc::now()
            }
        }
    }
}
