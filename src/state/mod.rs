//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `FragmentStatus`: where a fragment stands in the crawl (not visited, immutable, mutable)
//! - `MemberStatus`: whether a member has been handed to the caller yet

mod fragment_status;
mod member_status;

// Re-export main types
pub use fragment_status::FragmentStatus;
pub use member_status::MemberStatus;
