use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Account credentials for the external platform.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub require_login: bool,
    pub instagram_username: Option<String>,
    pub instagram_password: Option<String>,
    pub session_dir: PathBuf,
    pub instagram_base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_secs: u64,
}

impl AppConfig {
    /// Returns the platform credentials when both halves are configured.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.instagram_username, &self.instagram_password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("require_login", &self.require_login)
            .field("instagram_username", &self.instagram_username)
            .field(
                "instagram_password",
                &self.instagram_password.as_ref().map(|_| "[redacted]"),
            )
            .field("session_dir", &self.session_dir)
            .field("instagram_base_url", &self.instagram_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .finish()
    }
}
