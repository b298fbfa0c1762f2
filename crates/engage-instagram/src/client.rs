//! HTTP client for the Instagram web API.
//!
//! Wraps `reqwest` with the headers the web app sends, maps HTTP statuses to
//! typed errors, and keeps cookies in a per-client [`Jar`]. No request is
//! ever retried.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::{header, Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::InstagramError;
use crate::session::SessionCookies;
use crate::types::{
    LoginResponse, MediaInfoResponse, TimelineMedia, TimelineResponse, WebProfileResponse,
    WebProfileUser,
};

const DEFAULT_BASE_URL: &str = "https://www.instagram.com";

/// App id the instagram.com web client identifies itself with.
const WEB_APP_ID: &str = "936619743392459";

/// Persisted GraphQL query for a user's timeline media.
const TIMELINE_QUERY_HASH: &str = "003056d32c2554def87228bc3fd9668a";

/// Posts requested per timeline page.
pub const TIMELINE_PAGE_SIZE: u32 = 12;

/// Client for the Instagram web API.
///
/// Cheap to clone; clones share the connection pool and cookie jar. Use
/// [`InstagramClient::with_cookies`] to derive a logged-in client.
#[derive(Clone)]
pub struct InstagramClient {
    client: Client,
    jar: Arc<Jar>,
    base_url: String,
    origin: Url,
    timeout_secs: u64,
    user_agent: String,
    authenticated: bool,
}

impl std::fmt::Debug for InstagramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstagramClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.authenticated)
            .finish_non_exhaustive()
    }
}

impl InstagramClient {
    /// Creates an anonymous client pointed at instagram.com.
    ///
    /// # Errors
    ///
    /// Returns [`InstagramError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, InstagramError> {
        Self::with_base_url(timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates an anonymous client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`InstagramError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`InstagramError::InvalidBaseUrl`] if `base_url` is
    /// not an absolute http(s) URL.
    pub fn with_base_url(
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, InstagramError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let origin = Url::parse(trimmed).map_err(|e| InstagramError::InvalidBaseUrl {
            base_url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(InstagramError::InvalidBaseUrl {
                base_url: base_url.to_string(),
                reason: format!("unsupported scheme '{}'", origin.scheme()),
            });
        }

        let jar = Arc::new(Jar::default());
        Ok(Self {
            client: build_http(timeout_secs, user_agent, Arc::clone(&jar))?,
            jar,
            base_url: trimmed.to_string(),
            origin,
            timeout_secs,
            user_agent: user_agent.to_string(),
            authenticated: false,
        })
    }

    /// Returns a logged-in client whose jar starts out holding `cookies`.
    ///
    /// # Errors
    ///
    /// Returns [`InstagramError::Http`] if the new `reqwest::Client` cannot
    /// be constructed.
    pub fn with_cookies(&self, cookies: &SessionCookies) -> Result<Self, InstagramError> {
        let mut session = self.fresh()?;
        cookies.seed(&session.jar, &session.origin);
        session.authenticated = true;
        Ok(session)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Cookies this client would currently send to Instagram.
    #[must_use]
    pub fn cookies(&self) -> SessionCookies {
        SessionCookies::from_jar(&self.jar, &self.origin)
    }

    /// Anonymous client with the same settings and an empty jar.
    fn fresh(&self) -> Result<Self, InstagramError> {
        let jar = Arc::new(Jar::default());
        Ok(Self {
            client: build_http(self.timeout_secs, &self.user_agent, Arc::clone(&jar))?,
            jar,
            base_url: self.base_url.clone(),
            origin: self.origin.clone(),
            timeout_secs: self.timeout_secs,
            user_agent: self.user_agent.clone(),
            authenticated: false,
        })
    }

    /// Fetches the public profile record for `handle`.
    ///
    /// # Errors
    ///
    /// - [`InstagramError::NotFound`] on HTTP 404 or a `null` user.
    /// - [`InstagramError::Unauthorized`] on HTTP 401/403.
    /// - [`InstagramError::RateLimited`] on HTTP 429.
    /// - [`InstagramError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`InstagramError::Http`] on network failure.
    /// - [`InstagramError::Deserialize`] if the body does not match the expected shape.
    pub async fn fetch_profile(&self, handle: &str) -> Result<WebProfileUser, InstagramError> {
        let url = format!("{}/api/v1/users/web_profile_info/", self.base_url);
        let request = self.get(&url).query(&[("username", handle)]);
        let body: WebProfileResponse = self
            .send_json(request, &url, &format!("web_profile_info({handle})"))
            .await?;

        body.data.user.ok_or(InstagramError::NotFound { url })
    }

    /// Fetches one page of a user's timeline, starting after `cursor`.
    ///
    /// # Errors
    ///
    /// Same status mapping as [`InstagramClient::fetch_profile`];
    /// [`InstagramError::MissingField`] if the response has no user.
    pub async fn fetch_timeline_page(
        &self,
        user_id: &str,
        cursor: Option<&str>,
    ) -> Result<TimelineMedia, InstagramError> {
        let url = format!("{}/graphql/query/", self.base_url);
        let variables = match cursor {
            Some(after) => serde_json::json!({
                "id": user_id,
                "first": TIMELINE_PAGE_SIZE,
                "after": after,
            }),
            None => serde_json::json!({ "id": user_id, "first": TIMELINE_PAGE_SIZE }),
        }
        .to_string();
        let request = self.get(&url).query(&[
            ("query_hash", TIMELINE_QUERY_HASH),
            ("variables", variables.as_str()),
        ]);
        let context = format!("timeline(user_id={user_id})");
        let body: TimelineResponse = self.send_json(request, &url, &context).await?;

        body.data
            .user
            .map(|u| u.edge_owner_to_timeline_media)
            .ok_or(InstagramError::MissingField {
                context,
                field: "data.user",
            })
    }

    /// Fetches full like/comment counts for one media item.
    ///
    /// Returns `(like_count, comment_count)`.
    ///
    /// # Errors
    ///
    /// Same status mapping as [`InstagramClient::fetch_profile`];
    /// [`InstagramError::MissingField`] if either count is absent or hidden.
    pub async fn fetch_media_counts(&self, media_id: &str) -> Result<(u64, u64), InstagramError> {
        let url = format!("{}/api/v1/media/{media_id}/info/", self.base_url);
        let context = format!("media_info({media_id})");
        let body: MediaInfoResponse = self.send_json(self.get(&url), &url, &context).await?;

        let item = body
            .items
            .into_iter()
            .next()
            .ok_or(InstagramError::MissingField {
                context: context.clone(),
                field: "items[0]",
            })?;
        let likes = item
            .like_count
            .and_then(|n| u64::try_from(n).ok())
            .ok_or(InstagramError::MissingField {
                context: context.clone(),
                field: "like_count",
            })?;
        let comments = item
            .comment_count
            .and_then(|n| u64::try_from(n).ok())
            .ok_or(InstagramError::MissingField {
                context,
                field: "comment_count",
            })?;
        Ok((likes, comments))
    }

    /// Logs in with a username and password and returns the session cookies.
    ///
    /// Runs on a throwaway jar: first loads the login page to obtain a
    /// `csrftoken`, then posts the credentials to the AJAX login endpoint.
    ///
    /// # Errors
    ///
    /// - [`InstagramError::Login`] if the credentials are rejected, a
    ///   checkpoint or two-factor challenge is required, or no session
    ///   cookie is issued.
    /// - [`InstagramError::Http`] on network failure.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionCookies, InstagramError> {
        let session = self.fresh()?;

        let login_page = format!("{}/accounts/login/", self.base_url);
        session.client.get(&login_page).send().await?;
        let csrf = session
            .cookies()
            .get("csrftoken")
            .map(str::to_owned)
            .ok_or_else(|| InstagramError::Login("no csrftoken issued by login page".to_string()))?;

        let url = format!("{}/accounts/login/ajax/", self.base_url);
        let enc_password = format!(
            "#PWD_INSTAGRAM_BROWSER:0:{}:{password}",
            chrono::Utc::now().timestamp()
        );
        let response = session
            .client
            .post(&url)
            .header("x-csrftoken", &csrf)
            .header("x-requested-with", "XMLHttpRequest")
            .header(header::REFERER, &login_page)
            .form(&[
                ("username", username),
                ("enc_password", enc_password.as_str()),
                ("queryParams", "{}"),
                ("optIntoOneTap", "false"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(InstagramError::RateLimited { url });
        }
        let text = response.text().await?;
        let body: LoginResponse = serde_json::from_str(&text).unwrap_or_default();

        if body.two_factor_required == Some(true) {
            return Err(InstagramError::Login(
                "two-factor authentication required".to_string(),
            ));
        }
        if body.checkpoint_url.is_some() || body.message.as_deref() == Some("checkpoint_required")
        {
            return Err(InstagramError::Login("checkpoint required".to_string()));
        }
        if body.authenticated != Some(true) {
            let reason = match (body.user, body.message) {
                (_, Some(message)) => message,
                (Some(false), None) => format!("unknown user {username}"),
                _ => format!("credentials rejected (HTTP {})", status.as_u16()),
            };
            return Err(InstagramError::Login(reason));
        }

        let cookies = session.cookies();
        if cookies.get("sessionid").is_none() {
            return Err(InstagramError::Login(
                "authenticated but no sessionid cookie issued".to_string(),
            ));
        }

        tracing::info!(account = username, "logged in");
        Ok(cookies)
    }

    /// Starts a GET, adding the CSRF header when logged in. Cookies come from the jar.
    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        if !self.authenticated {
            return request;
        }
        let cookies = self.cookies();
        match cookies.get("csrftoken") {
            Some(csrf) => request.header("x-csrftoken", csrf),
            None => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        context: &str,
    ) -> Result<T, InstagramError> {
        let response = request.send().await?;
        let response = Self::check_status(response, url)?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| InstagramError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }

    /// Maps non-2xx statuses to typed errors.
    fn check_status(response: Response, url: &str) -> Result<Response, InstagramError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        tracing::debug!(status = status.as_u16(), url, "instagram returned error status");
        Err(match status {
            StatusCode::NOT_FOUND => InstagramError::NotFound {
                url: url.to_string(),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => InstagramError::Unauthorized {
                status: status.as_u16(),
                url: url.to_string(),
            },
            StatusCode::TOO_MANY_REQUESTS => InstagramError::RateLimited {
                url: url.to_string(),
            },
            _ => InstagramError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            },
        })
    }
}

fn build_http(timeout_secs: u64, user_agent: &str, jar: Arc<Jar>) -> Result<Client, InstagramError> {
    let mut default_headers = header::HeaderMap::new();
    default_headers.insert("x-ig-app-id", header::HeaderValue::from_static(WEB_APP_ID));
    default_headers.insert(
        header::ACCEPT_LANGUAGE,
        header::HeaderValue::from_static("en-US,en;q=0.9"),
    );

    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(user_agent)
        .default_headers(default_headers)
        .cookie_provider(jar)
        .build()?)
}
