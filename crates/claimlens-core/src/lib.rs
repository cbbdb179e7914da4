//! Claimlens Core
//!
//! Pure domain types and the error taxonomy for the claim aggregation
//! service. No async runtime or database driver dependencies.

pub mod error;
pub mod types;

pub use error::{ClaimlensError, Result};
pub use types::{AggregatedRow, CreatorStats};
