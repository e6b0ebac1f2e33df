//! Crawler module for LDES fragments
//!
//! This module contains the core crawling logic, including:
//! - Fetching fragments and interpreting their responses
//! - Extracting relations and members from the fragment graph
//! - Deriving fragment mutability from cache headers
//! - Scheduling fragment visits and revisits
//! - Supplying members exactly once

mod coordinator;
mod fetcher;
mod mutability;
pub mod parser;
mod scheduler;
mod supplier;
mod timestamp;

pub use coordinator::{StopHandle, SuppliedMember, TreeNodeProcessor};
pub use fetcher::{LdesMetaData, TreeMember, TreeNodeFetcher, TreeNodeRequest, TreeNodeResponse};
pub use mutability::{MutabilityStatus, MAX_REVISIT_DELAY_SECS};
pub use scheduler::{time_until_ready, Scheduler};
pub use supplier::{LatestStateFilter, MemberSupplier};
pub use timestamp::{CurrentTimeExtractor, PropertyPathExtractor, TimestampExtractor};
