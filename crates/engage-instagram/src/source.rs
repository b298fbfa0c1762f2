//! [`ProfileSource`] implementation over [`InstagramClient`].

use async_trait::async_trait;
use engage_core::{
    AppConfig, Credentials, Post, PostStream, Profile, ProfileSource, SourceError,
};
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;

use crate::client::InstagramClient;
use crate::error::InstagramError;
use crate::handle::normalize_handle;
use crate::session::{SessionFile, SessionStore};
use crate::types::MediaNode;

struct Login {
    credentials: Credentials,
    store: SessionStore,
}

/// Instagram profile source.
///
/// Anonymous by default. Built with [`InstagramSource::authenticated`], it
/// establishes one session the first time it is used (stored session file
/// first, fresh login otherwise) and reuses it across requests. A failed
/// attempt leaves the session unset so the next call tries again. When
/// Instagram rejects the session with 401/403 it is dropped, its file
/// deleted, and the next call logs in afresh.
pub struct InstagramSource {
    anonymous: InstagramClient,
    login: Option<Login>,
    session: Mutex<Option<InstagramClient>>,
}

enum Cursor {
    Start,
    After(String),
    Done,
}

impl InstagramSource {
    #[must_use]
    pub fn anonymous(client: InstagramClient) -> Self {
        Self {
            anonymous: client,
            login: None,
            session: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn authenticated(
        client: InstagramClient,
        credentials: Credentials,
        store: SessionStore,
    ) -> Self {
        Self {
            anonymous: client,
            login: Some(Login { credentials, store }),
            session: Mutex::new(None),
        }
    }

    /// Builds the source described by `config`: authenticated when login is
    /// required and credentials are present, anonymous otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`InstagramError::InvalidBaseUrl`] or [`InstagramError::Http`]
    /// if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, InstagramError> {
        let client = InstagramClient::with_base_url(
            config.request_timeout_secs,
            &config.user_agent,
            &config.instagram_base_url,
        )?;

        match config.credentials() {
            Some(credentials) if config.require_login => {
                tracing::info!(
                    account = %credentials.username,
                    session_dir = %config.session_dir.display(),
                    "using authenticated Instagram session"
                );
                Ok(Self::authenticated(
                    client,
                    credentials,
                    SessionStore::new(&config.session_dir),
                ))
            }
            _ => Ok(Self::anonymous(client)),
        }
    }

    /// Client to issue requests with, logging in first if this source
    /// requires a session that does not exist yet.
    ///
    /// The lock is held while logging in so concurrent callers share one
    /// login attempt.
    async fn active_client(&self) -> Result<InstagramClient, InstagramError> {
        let Some(login) = &self.login else {
            return Ok(self.anonymous.clone());
        };
        let mut session = self.session.lock().await;
        if let Some(client) = session.as_ref() {
            return Ok(client.clone());
        }
        let client = self.establish_session(login).await?;
        *session = Some(client.clone());
        Ok(client)
    }

    async fn establish_session(&self, login: &Login) -> Result<InstagramClient, InstagramError> {
        let account = &login.credentials.username;

        if let Some(stored) = login.store.load(account).await? {
            tracing::info!(
                account = %account,
                saved_at = %stored.saved_at,
                "reusing stored session"
            );
            return self.anonymous.with_cookies(&stored.cookies);
        }

        tracing::info!(account = %account, "no stored session; logging in");
        let cookies = self
            .anonymous
            .login(account, &login.credentials.password)
            .await?;
        let session = SessionFile {
            account: account.clone(),
            saved_at: chrono::Utc::now(),
            cookies,
        };
        login.store.save(&session).await?;
        self.anonymous.with_cookies(&session.cookies)
    }

    /// Drops the session if Instagram refused it, so the next call logs in again.
    async fn check_session<T>(
        &self,
        result: Result<T, InstagramError>,
    ) -> Result<T, InstagramError> {
        if let (Err(InstagramError::Unauthorized { status, .. }), Some(login)) =
            (&result, &self.login)
        {
            let account = &login.credentials.username;
            tracing::warn!(account = %account, status = *status, "session rejected; discarding");
            self.session.lock().await.take();
            if let Err(e) = login.store.discard(account).await {
                tracing::error!(account = %account, error = %e, "failed to delete rejected session file");
            }
        }
        result
    }

    async fn fetch_page(
        &self,
        profile: &Profile,
        cursor: Option<&str>,
    ) -> Result<(Vec<MediaNode>, Cursor), SourceError> {
        let client = self
            .active_client()
            .await
            .map_err(|e| e.into_source_error(&profile.handle))?;
        let page = self
            .check_session(client.fetch_timeline_page(&profile.id, cursor).await)
            .await
            .map_err(|e| e.into_source_error(&profile.handle))?;

        let nodes: Vec<MediaNode> = page.edges.into_iter().map(|edge| edge.node).collect();
        // An empty page cannot make progress, whatever page_info claims.
        let next = match page.page_info.end_cursor {
            Some(end) if page.page_info.has_next_page && !nodes.is_empty() => Cursor::After(end),
            _ => Cursor::Done,
        };
        Ok((nodes, next))
    }

    /// Turns a timeline node into a [`Post`], fetching the media record when
    /// the timeline omitted either count.
    async fn read_post(&self, node: MediaNode) -> Result<Post, SourceError> {
        if let (Some(likes), Some(comments)) = (node.like_count(), node.comment_count()) {
            return Ok(Post {
                id: node.id,
                like_count: likes,
                comment_count: comments,
            });
        }

        let post_read = |e: InstagramError| SourceError::PostRead {
            post_id: node.label().to_string(),
            reason: e.to_string(),
        };
        let client = self.active_client().await.map_err(post_read)?;
        let (likes, comments) = self
            .check_session(client.fetch_media_counts(&node.id).await)
            .await
            .map_err(post_read)?;

        Ok(Post {
            like_count: node.like_count().unwrap_or(likes),
            comment_count: node.comment_count().unwrap_or(comments),
            id: node.id,
        })
    }
}

#[async_trait]
impl ProfileSource for InstagramSource {
    async fn resolve_profile(&self, handle: &str) -> Result<Profile, SourceError> {
        let normalized = normalize_handle(handle).map_err(|e| e.into_source_error(handle))?;
        let client = self
            .active_client()
            .await
            .map_err(|e| e.into_source_error(&normalized))?;
        let user = self
            .check_session(client.fetch_profile(&normalized).await)
            .await
            .map_err(|e| e.into_source_error(&normalized))?;

        let follower_count = user.edge_followed_by.visible().unwrap_or(0);
        if user.is_private && !client.is_authenticated() {
            tracing::warn!(handle = %user.username, "profile is private; posts may be unavailable");
        }

        Ok(Profile {
            id: user.id,
            handle: user.username,
            follower_count,
        })
    }

    fn posts<'a>(&'a self, profile: &'a Profile) -> PostStream<'a> {
        stream::unfold(Cursor::Start, move |cursor| async move {
            let after = match cursor {
                Cursor::Done => return None,
                Cursor::Start => None,
                Cursor::After(end) => Some(end),
            };
            match self.fetch_page(profile, after.as_deref()).await {
                Ok((nodes, next)) => {
                    tracing::debug!(handle = %profile.handle, posts = nodes.len(), "fetched timeline page");
                    let items: Vec<Result<MediaNode, SourceError>> =
                        nodes.into_iter().map(Ok).collect();
                    Some((items, next))
                }
                Err(err) => Some((vec![Err(err)], Cursor::Done)),
            }
        })
        .flat_map(stream::iter)
        .then(move |item| async move {
            match item {
                Ok(node) => self.read_post(node).await,
                Err(err) => Err(err),
            }
        })
        .boxed()
    }
}
