//! Output module for members and run statistics
//!
//! This module handles:
//! - Serializing supplied members in an RDF format
//! - Recording and printing crawl statistics

pub mod stats;
mod writer;

pub use stats::{print_statistics, write_statistics, CrawlStatistics};
pub use writer::MemberWriter;
