//! On-disk persistence of a logged-in session.
//!
//! One JSON file per account under a fixed directory. The cookie values are
//! opaque to everything outside [`crate::client`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::InstagramError;

/// Snapshot of the cookies a [`Jar`] would send to one origin.
///
/// Attribute handling (expiry, path, domain) stays with the jar; the
/// snapshot only records the `name=value` pairs that are live when taken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCookies(BTreeMap<String, String>);

impl SessionCookies {
    /// Captures the cookies `jar` currently holds for `origin`.
    #[must_use]
    pub fn from_jar(jar: &Jar, origin: &Url) -> Self {
        let mut cookies = BTreeMap::new();
        let Some(header) = jar.cookies(origin) else {
            return Self(cookies);
        };
        let Ok(header) = header.to_str() else {
            return Self(cookies);
        };
        for pair in header.split("; ") {
            if let Some((name, value)) = pair.split_once('=') {
                cookies.insert(name.to_string(), value.to_string());
            }
        }
        Self(cookies)
    }

    /// Loads every cookie into `jar` as a host-only cookie for `origin`.
    pub fn seed(&self, jar: &Jar, origin: &Url) {
        for (name, value) in &self.0 {
            jar.add_cookie_str(&format!("{name}={value}; Path=/"), origin);
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Serialized form of a persisted session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFile {
    pub account: String,
    pub saved_at: DateTime<Utc>,
    pub cookies: SessionCookies,
}

/// Directory of `session-<account>.json` files.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the session file for `account`.
    ///
    /// Characters outside `[A-Za-z0-9._-]` are replaced so the account name
    /// can never escape the store directory.
    #[must_use]
    pub fn path_for(&self, account: &str) -> PathBuf {
        let safe: String = account
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let safe = safe.trim_start_matches('.');
        self.dir.join(format!("session-{safe}.json"))
    }

    /// Loads the stored session for `account`, if any.
    ///
    /// A missing file is `Ok(None)`. A file that exists but cannot be parsed
    /// or belongs to a different account is also `Ok(None)`, logged at warn,
    /// so the caller falls back to a fresh login.
    ///
    /// # Errors
    ///
    /// Returns [`InstagramError::Session`] if the file exists but cannot be read.
    pub async fn load(&self, account: &str) -> Result<Option<SessionFile>, InstagramError> {
        let path = self.path_for(account);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(InstagramError::Session {
                    path,
                    reason: e.to_string(),
                })
            }
        };

        match serde_json::from_slice::<SessionFile>(&bytes) {
            Ok(session) if session.account == account && !session.cookies.is_empty() => {
                Ok(Some(session))
            }
            Ok(_) => {
                tracing::warn!(path = %path.display(), "session file does not match account; ignoring");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable session file; ignoring");
                Ok(None)
            }
        }
    }

    /// Writes `session` to its account's file, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`InstagramError::Session`] on any filesystem failure.
    pub async fn save(&self, session: &SessionFile) -> Result<PathBuf, InstagramError> {
        let path = self.path_for(&session.account);
        let to_session_err = |e: std::io::Error| InstagramError::Session {
            path: path.clone(),
            reason: e.to_string(),
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(to_session_err)?;

        let body = serde_json::to_vec_pretty(session).map_err(|e| InstagramError::Session {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(&path, body).await.map_err(to_session_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(to_session_err)?;
        }

        tracing::info!(path = %path.display(), account = %session.account, "saved session");
        Ok(path)
    }

    /// Deletes the stored session for `account`. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`InstagramError::Session`] if the file exists but cannot be removed.
    pub async fn discard(&self, account: &str) -> Result<(), InstagramError> {
        let path = self.path_for(account);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), account, "discarded session");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(InstagramError::Session {
                path,
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://www.instagram.com/").expect("url")
    }

    #[test]
    fn snapshot_reads_what_the_jar_would_send() {
        let jar = Jar::default();
        jar.add_cookie_str("csrftoken=abc123; Path=/; Secure", &origin());
        jar.add_cookie_str("sessionid=s%3A1; Path=/; HttpOnly", &origin());
        jar.add_cookie_str("scoped=1; Path=/accounts/", &origin());

        let snapshot = SessionCookies::from_jar(&jar, &origin());

        assert_eq!(snapshot.get("csrftoken"), Some("abc123"));
        assert_eq!(snapshot.get("sessionid"), Some("s%3A1"));
        assert_eq!(snapshot.get("scoped"), None);
    }

    #[test]
    fn cookie_expired_by_max_age_is_dropped() {
        let jar = Jar::default();
        let mut stored = SessionCookies::default();
        stored.insert("sessionid", "live");
        stored.insert("csrftoken", "tok");
        stored.seed(&jar, &origin());

        jar.add_cookie_str("sessionid=stale; Max-Age=0; Path=/", &origin());

        let snapshot = SessionCookies::from_jar(&jar, &origin());
        assert_eq!(snapshot.get("sessionid"), None);
        assert_eq!(snapshot.get("csrftoken"), Some("tok"));
    }

    #[test]
    fn seeded_cookies_survive_a_snapshot() {
        let mut stored = SessionCookies::default();
        stored.insert("sessionid", "abc");
        stored.insert("ds_user_id", "99");
        let jar = Jar::default();
        stored.seed(&jar, &origin());

        assert_eq!(SessionCookies::from_jar(&jar, &origin()), stored);
    }

    #[test]
    fn empty_jar_gives_empty_snapshot() {
        assert!(SessionCookies::from_jar(&Jar::default(), &origin()).is_empty());
    }

    #[tokio::test]
    async fn discard_removes_the_file_and_tolerates_absence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path());
        let mut cookies = SessionCookies::default();
        cookies.insert("sessionid", "abc");
        let path = store
            .save(&SessionFile {
                account: "scout".to_string(),
                saved_at: Utc::now(),
                cookies,
            })
            .await
            .expect("save");
        assert!(path.exists());

        store.discard("scout").await.expect("discard");
        assert!(!path.exists());
        store.discard("scout").await.expect("second discard is a no-op");
    }

    #[test]
    fn path_for_is_keyed_by_account_and_sanitized() {
        let store = SessionStore::new("/tmp/sessions");
        assert_eq!(
            store.path_for("scout"),
            PathBuf::from("/tmp/sessions/session-scout.json")
        );
        assert_eq!(
            store.path_for("../evil"),
            PathBuf::from("/tmp/sessions/session-_evil.json")
        );
    }
}
