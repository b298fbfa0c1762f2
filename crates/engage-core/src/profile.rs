//! Profile data model and the capability interface every data source implements.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A resolved account on the external platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Platform-assigned user id; used to page through the profile's posts.
    pub id: String,
    pub handle: String,
    pub follower_count: u64,
}

/// Interaction counts for a single post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub like_count: u64,
    pub comment_count: u64,
}

/// Lazy, single-pass sequence of posts, most recent first.
pub type PostStream<'a> = BoxStream<'a, Result<Post, SourceError>>;

/// Errors raised by a [`ProfileSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("profile not found: {handle}")]
    NotFound { handle: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited by the platform")]
    RateLimited,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("could not decode {context}: {reason}")]
    Decode { context: String, reason: String },

    /// The like or comment count of one post could not be read.
    #[error("could not read counts for post {post_id}: {reason}")]
    PostRead { post_id: String, reason: String },
}

impl SourceError {
    /// `true` when the failure is confined to a single post and the
    /// remaining sequence can still be consumed.
    #[must_use]
    pub fn is_post_scoped(&self) -> bool {
        matches!(self, Self::PostRead { .. })
    }
}

/// Something that can resolve a handle and enumerate its posts.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Look up a profile by its public handle.
    async fn resolve_profile(&self, handle: &str) -> Result<Profile, SourceError>;

    /// Stream the profile's posts in source order.
    ///
    /// Items are fetched on demand; dropping the stream stops further
    /// requests. A [`SourceError::PostRead`] item means only that post was
    /// unreadable, any other error ends the sequence.
    fn posts<'a>(&'a self, profile: &'a Profile) -> PostStream<'a>;
}
