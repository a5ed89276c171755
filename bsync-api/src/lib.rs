#![deny(clippy::all)]
//! Authenticated, rate-limited access to the upstream JSON API.

// Public Exports
pub use reqwest;

pub mod client;
pub mod error;
pub mod rate_limit;

pub use client::{Api, UserInfo};
pub use error::ApiError;
pub use rate_limit::RateLimit;
