//! Fragment mutability derived from response cache headers

use chrono::{DateTime, Duration, Utc};

/// Longest revisit delay honoured, to keep timestamp arithmetic in range
pub const MAX_REVISIT_DELAY_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Whether a fetched fragment may change, and when to look at it again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutabilityStatus {
    immutable: bool,
    earliest_next_visit: DateTime<Utc>,
}

impl MutabilityStatus {
    /// A fragment that is never revisited
    pub fn immutable() -> Self {
        Self {
            immutable: true,
            earliest_next_visit: DateTime::<Utc>::MAX_UTC,
        }
    }

    /// A fragment to revisit at or after `earliest_next_visit`
    pub fn mutable(earliest_next_visit: DateTime<Utc>) -> Self {
        Self {
            immutable: false,
            earliest_next_visit,
        }
    }

    /// Derives the status from a `Cache-Control` header value
    ///
    /// `immutable` wins over everything else. `no-cache`/`no-store` and an
    /// absent or unusable header fall back to `now + polling_interval`.
    pub fn from_cache_control(
        header: Option<&str>,
        now: DateTime<Utc>,
        polling_interval: std::time::Duration,
    ) -> Self {
        let fallback = || Self::revisit_after(now, polling_interval.as_secs());

        let Some(header) = header else {
            return fallback();
        };

        let directives: Vec<String> = header
            .split(',')
            .map(|d| d.trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        if directives.iter().any(|d| d == "immutable") {
            return Self::immutable();
        }
        if directives.iter().any(|d| d == "no-cache" || d == "no-store") {
            return fallback();
        }

        let max_age = directives.iter().find_map(|d| {
            d.strip_prefix("max-age=")
                .and_then(|v| v.trim_matches('"').parse::<u64>().ok())
        });

        match max_age {
            Some(seconds) => Self::revisit_after(now, seconds),
            None => fallback(),
        }
    }

    /// Mutable, due `seconds` after `now`
    ///
    /// Delays are capped; a due time past the representable range becomes
    /// the latest representable instant.
    fn revisit_after(now: DateTime<Utc>, seconds: u64) -> Self {
        let seconds = seconds.min(MAX_REVISIT_DELAY_SECS) as i64;
        let due = now
            .checked_add_signed(Duration::seconds(seconds))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::mutable(due)
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    pub fn earliest_next_visit(&self) -> DateTime<Utc> {
        self.earliest_next_visit
    }
}
