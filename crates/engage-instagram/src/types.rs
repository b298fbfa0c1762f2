//! Wire types for the Instagram web API responses this crate reads.
//!
//! Only the fields used downstream are declared; everything else in the
//! payloads is ignored.

use serde::Deserialize;

/// `GET /api/v1/users/web_profile_info/?username=...`
#[derive(Debug, Deserialize)]
pub struct WebProfileResponse {
    pub data: WebProfileData,
}

#[derive(Debug, Deserialize)]
pub struct WebProfileData {
    pub user: Option<WebProfileUser>,
}

#[derive(Debug, Deserialize)]
pub struct WebProfileUser {
    pub id: String,
    pub username: String,
    pub edge_followed_by: EdgeCount,
    #[serde(default)]
    pub is_private: bool,
}

/// `{"count": N}` wrapper used throughout the GraphQL shapes.
///
/// Hidden counts come back as negative numbers or are omitted entirely.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EdgeCount {
    pub count: i64,
}

impl EdgeCount {
    #[must_use]
    pub fn visible(self) -> Option<u64> {
        u64::try_from(self.count).ok()
    }
}

/// `GET /graphql/query/?query_hash=...` for a user's timeline.
#[derive(Debug, Deserialize)]
pub struct TimelineResponse {
    pub data: TimelineData,
}

#[derive(Debug, Deserialize)]
pub struct TimelineData {
    pub user: Option<TimelineUser>,
}

#[derive(Debug, Deserialize)]
pub struct TimelineUser {
    pub edge_owner_to_timeline_media: TimelineMedia,
}

#[derive(Debug, Deserialize)]
pub struct TimelineMedia {
    pub page_info: PageInfo,
    #[serde(default)]
    pub edges: Vec<MediaEdge>,
}

#[derive(Debug, Deserialize)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MediaEdge {
    pub node: MediaNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaNode {
    pub id: String,
    #[serde(default)]
    pub shortcode: Option<String>,
    #[serde(default)]
    pub edge_media_preview_like: Option<EdgeCount>,
    #[serde(default)]
    pub edge_liked_by: Option<EdgeCount>,
    #[serde(default)]
    pub edge_media_to_comment: Option<EdgeCount>,
    #[serde(default)]
    pub edge_media_preview_comment: Option<EdgeCount>,
}

impl MediaNode {
    #[must_use]
    pub fn like_count(&self) -> Option<u64> {
        self.edge_media_preview_like
            .or(self.edge_liked_by)
            .and_then(EdgeCount::visible)
    }

    #[must_use]
    pub fn comment_count(&self) -> Option<u64> {
        self.edge_media_to_comment
            .or(self.edge_media_preview_comment)
            .and_then(EdgeCount::visible)
    }

    /// Shortcode when present, otherwise the numeric media id.
    #[must_use]
    pub fn label(&self) -> &str {
        self.shortcode.as_deref().unwrap_or(&self.id)
    }
}

/// `GET /api/v1/media/{id}/info/`
#[derive(Debug, Deserialize)]
pub struct MediaInfoResponse {
    #[serde(default)]
    pub items: Vec<MediaInfoItem>,
}

#[derive(Debug, Deserialize)]
pub struct MediaInfoItem {
    #[serde(default)]
    pub like_count: Option<i64>,
    #[serde(default)]
    pub comment_count: Option<i64>,
}

/// `POST /accounts/login/ajax/`
#[derive(Debug, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub authenticated: Option<bool>,
    #[serde(default)]
    pub user: Option<bool>,
    #[serde(default)]
    pub two_factor_required: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub checkpoint_url: Option<String>,
}
