#![deny(clippy::all)]
//! Shared domain types and wire models for the booru-sync ingestion service.

// Public Exports
pub use chrono;
pub use log;
pub use serde;
pub use serde_json;

pub mod model;
pub mod page;
pub mod timestamp;

/// Most posts the server returns per `posts` page.
pub const POST_LIMIT: usize = 200;

/// Most records the server returns per page on every other index, and the
/// largest accepted `search` name list.
pub const PAGE_LIMIT: usize = 1000;
