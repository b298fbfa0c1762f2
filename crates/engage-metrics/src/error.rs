use engage_core::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalculateError {
    /// The handle could not be resolved, or the post sequence failed mid-way.
    #[error(transparent)]
    Lookup(#[from] SourceError),

    #[error("No posts processed")]
    NoPostsProcessed,
}
