//! Engagement statistics over a sample of a profile's recent posts.

pub mod engagement;
pub mod error;
pub mod format;

pub use engagement::{
    calculate, EngagementResult, EngagementStats, DEFAULT_SAMPLE_SIZE, REACH_MULTIPLIER,
};
pub use error::CalculateError;
pub use format::{format_count, format_percentage, Count};
