//! Instagram-backed [`engage_core::ProfileSource`].
//!
//! Talks to the public web API used by instagram.com. Anonymous access works
//! for public profiles; when credentials are supplied the source logs in once
//! and persists the session cookies to disk for later runs.

pub mod client;
pub mod error;
pub mod handle;
pub mod session;
pub mod source;
pub mod types;

pub use client::InstagramClient;
pub use error::InstagramError;
pub use handle::normalize_handle;
pub use session::{SessionCookies, SessionFile, SessionStore};
pub use source::InstagramSource;
