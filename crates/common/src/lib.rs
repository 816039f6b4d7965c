//! SquatCount Common Utilities
//!
//! Shared infrastructure for all SquatCount crates:
//! - Error types and result aliases
//! - Session clock and frame sampling for throttled processing
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
