//! Crawl statistics
//!
//! Counters kept by the crawl engine and the member supplier, and a
//! printer for the end-of-run summary.

use std::io::{self, Write};

/// Counters for one client run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Fragment responses handled, redirects and 304s included
    pub fragments_fetched: u64,

    /// New fragments added to the fragment store
    pub relations_discovered: u64,

    /// Members saved as unprocessed
    pub members_discovered: u64,

    /// Members handed out by the crawl engine
    pub members_supplied: u64,

    /// Rediscovered members that were already supplied
    pub duplicates_skipped: u64,

    /// Members dropped because a newer version was already supplied
    pub outdated_versions_skipped: u64,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Members that reached the caller after version filtering
    pub fn members_emitted(&self) -> u64 {
        self.members_supplied
            .saturating_sub(self.outdated_versions_skipped)
    }
}

/// Writes a human-readable summary of the statistics
pub fn write_statistics(stats: &CrawlStatistics, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "=== Crawl Statistics ===")?;
    writeln!(out)?;
    writeln!(out, "Fragments:")?;
    writeln!(out, "  Fetched: {}", stats.fragments_fetched)?;
    writeln!(out, "  Discovered: {}", stats.relations_discovered)?;
    writeln!(out)?;
    writeln!(out, "Members:")?;
    writeln!(out, "  Discovered: {}", stats.members_discovered)?;
    writeln!(out, "  Supplied: {}", stats.members_supplied)?;
    writeln!(out, "  Duplicates skipped: {}", stats.duplicates_skipped)?;
    if stats.outdated_versions_skipped > 0 {
        writeln!(
            out,
            "  Outdated versions skipped: {}",
            stats.outdated_versions_skipped
        )?;
    }
    writeln!(out, "  Emitted: {}", stats.members_emitted())?;
    Ok(())
}

/// Prints the statistics summary to stderr
///
/// Stdout is reserved for member output.
pub fn print_statistics(stats: &CrawlStatistics) {
    let stderr = io::stderr();
    let mut handle = stderr.lock();
    if let Err(e) = write_statistics(stats, &mut handle) {
        tracing::warn!("Failed to print statistics: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_members_emitted() {
        let stats = CrawlStatistics {
            members_supplied: 10,
            outdated_versions_skipped: 3,
            ..CrawlStatistics::new()
        };
        assert_eq!(stats.members_emitted(), 7);
    }

    #[test]
    fn test_write_statistics() {
        let stats = CrawlStatistics {
            fragments_fetched: 3,
            relations_discovered: 2,
            members_discovered: 5,
            members_supplied: 5,
            duplicates_skipped: 1,
            outdated_versions_skipped: 0,
        };

        let mut out = Vec::new();
        write_statistics(&stats, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Fetched: 3"));
        assert!(text.contains("Duplicates skipped: 1"));
        assert!(!text.contains("Outdated versions"));
    }
}
