//! Shared configuration and domain model for the engagement service.

pub mod app_config;
pub mod config;
pub mod error;
pub mod profile;

pub use app_config::{AppConfig, Credentials, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::ConfigError;
pub use profile::{Post, PostStream, Profile, ProfileSource, SourceError};
