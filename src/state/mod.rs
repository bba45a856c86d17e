//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageState`: Tracks the lifecycle of each URL (scheduled, fetching, succeeded, reported, etc.)
//! - `MemoTable`: The shared identity URL -> fetch outcome table that guarantees one fetch per URL

mod memo;
mod page_state;

// Re-export main types
pub use memo::{MemoEntry, MemoTable, Resolution};
pub use page_state::PageState;
