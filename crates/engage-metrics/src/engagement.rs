//! Sampling loop and the engagement figures derived from it.

use engage_core::{Post, ProfileSource};
use futures::StreamExt;
use serde::Serialize;

use crate::error::CalculateError;
use crate::format::{format_count, format_percentage};

/// Number of posts sampled when the caller does not specify a limit.
pub const DEFAULT_SAMPLE_SIZE: usize = 25;

/// Scales the engagement rate into an estimated per-post reach.
pub const REACH_MULTIPLIER: f64 = 1.5;

/// Raw engagement figures for one profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementStats {
    pub handle: String,
    pub followers: u64,
    pub processed_posts: usize,
    pub skipped_posts: usize,
    pub total_likes: u64,
    pub total_comments: u64,
    pub average_likes: f64,
    pub average_comments: f64,
    pub engagement_rate: f64,
    pub estimated_reach: f64,
}

/// Display-ready engagement figures, as returned over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngagementResult {
    pub followers: String,
    pub average_likes: String,
    pub average_comments: String,
    pub engagement_rate: String,
    pub estimated_reach: String,
}

#[derive(Debug, Default)]
struct Totals {
    likes: u64,
    comments: u64,
    processed: usize,
    skipped: usize,
}

impl Totals {
    fn record(&mut self, post: &Post) {
        self.likes = self.likes.saturating_add(post.like_count);
        self.comments = self.comments.saturating_add(post.comment_count);
        self.processed += 1;
    }
}

impl EngagementStats {
    #[allow(clippy::cast_precision_loss)]
    fn from_totals(handle: String, followers: u64, totals: &Totals) -> Self {
        debug_assert!(totals.processed > 0);
        let processed = totals.processed as f64;
        let followers_f = followers as f64;

        let average_likes = totals.likes as f64 / processed;
        let average_comments = totals.comments as f64 / processed;
        let engagement_rate = if followers > 0 {
            (totals.likes as f64 + totals.comments as f64) / (followers_f * processed)
        } else {
            0.0
        };
        let estimated_reach = engagement_rate * followers_f * REACH_MULTIPLIER;

        Self {
            handle,
            followers,
            processed_posts: totals.processed,
            skipped_posts: totals.skipped,
            total_likes: totals.likes,
            total_comments: totals.comments,
            average_likes,
            average_comments,
            engagement_rate,
            estimated_reach,
        }
    }

    /// Formats the figures for display.
    #[must_use]
    pub fn to_result(&self) -> EngagementResult {
        EngagementResult {
            followers: format_count(self.followers),
            average_likes: format_count(self.average_likes),
            average_comments: format_count(self.average_comments),
            engagement_rate: format_percentage(self.engagement_rate),
            estimated_reach: format_count(self.estimated_reach),
        }
    }
}

/// Samples up to `sample_size` of the profile's posts and computes
/// engagement figures from the ones that could be read.
///
/// Posts whose counts cannot be read are skipped but still use up a slot of
/// the sample. Any other source failure aborts the calculation.
///
/// # Errors
///
/// - [`CalculateError::Lookup`] if the handle cannot be resolved or the post
///   sequence fails.
/// - [`CalculateError::NoPostsProcessed`] if no sampled post could be read.
pub async fn calculate<S>(
    source: &S,
    handle: &str,
    sample_size: usize,
) -> Result<EngagementStats, CalculateError>
where
    S: ProfileSource + ?Sized,
{
    let profile = source.resolve_profile(handle).await?;
    tracing::debug!(
        handle = %profile.handle,
        followers = profile.follower_count,
        sample_size,
        "profile resolved"
    );

    let mut totals = Totals::default();
    let mut posts = source.posts(&profile).take(sample_size);

    while let Some(item) = posts.next().await {
        match item {
            Ok(post) => totals.record(&post),
            Err(err) if err.is_post_scoped() => {
                tracing::debug!(handle = %profile.handle, error = %err, "skipping unreadable post");
                totals.skipped += 1;
            }
            Err(err) => return Err(CalculateError::Lookup(err)),
        }
    }
    drop(posts);

    if totals.processed == 0 {
        tracing::info!(
            handle = %profile.handle,
            skipped = totals.skipped,
            "no posts processed"
        );
        return Err(CalculateError::NoPostsProcessed);
    }

    let stats = EngagementStats::from_totals(profile.handle, profile.follower_count, &totals);
    tracing::info!(
        handle = %stats.handle,
        processed = stats.processed_posts,
        skipped = stats.skipped_posts,
        engagement_rate = stats.engagement_rate,
        "engagement calculated"
    );
    Ok(stats)
}
