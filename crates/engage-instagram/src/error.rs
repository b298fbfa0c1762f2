use std::path::PathBuf;

use engage_core::SourceError;
use thiserror::Error;

/// Errors returned by the Instagram client and session store.
#[derive(Debug, Error)]
pub enum InstagramError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("HTTP {status} from {url}: login required or session rejected")]
    Unauthorized { status: u16, url: String },

    #[error("rate limited by Instagram at {url}")]
    RateLimited { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context} response is missing {field}")]
    MissingField {
        context: String,
        field: &'static str,
    },

    #[error("invalid handle \"{0}\"")]
    InvalidHandle(String),

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },

    #[error("login failed: {0}")]
    Login(String),

    #[error("session file {path}: {reason}")]
    Session { path: PathBuf, reason: String },
}

impl InstagramError {
    /// Maps a client failure encountered while handling `handle` onto the
    /// source-level error taxonomy.
    #[must_use]
    pub fn into_source_error(self, handle: &str) -> SourceError {
        match self {
            Self::NotFound { .. } | Self::InvalidHandle(_) => SourceError::NotFound {
                handle: handle.to_string(),
            },
            Self::Unauthorized { .. } | Self::Login(_) | Self::Session { .. } => {
                SourceError::Auth(self.to_string())
            }
            Self::RateLimited { .. } => SourceError::RateLimited,
            Self::UnexpectedStatus { status, url } => SourceError::UnexpectedStatus { status, url },
            Self::Deserialize { .. } | Self::MissingField { .. } => SourceError::Decode {
                context: handle.to_string(),
                reason: self.to_string(),
            },
            Self::Http(_) | Self::InvalidBaseUrl { .. } => SourceError::Transport(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_source_not_found() {
        let err = InstagramError::NotFound {
            url: "https://www.instagram.com/x".to_string(),
        };
        assert!(matches!(
            err.into_source_error("ghost"),
            SourceError::NotFound { ref handle } if handle == "ghost"
        ));
    }

    #[test]
    fn login_failure_maps_to_auth() {
        let err = InstagramError::Login("checkpoint required".to_string());
        let mapped = err.into_source_error("acct");
        assert!(matches!(mapped, SourceError::Auth(ref m) if m.contains("checkpoint required")));
    }

    #[test]
    fn rate_limit_maps_to_rate_limited() {
        let err = InstagramError::RateLimited {
            url: "https://www.instagram.com/api".to_string(),
        };
        assert!(matches!(
            err.into_source_error("acct"),
            SourceError::RateLimited
        ));
    }
}
