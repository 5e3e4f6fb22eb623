//! Runtime configuration read from the environment.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::session::GateMode;

/// Base URL of the hosted platform.
pub const ENV_API_URL: &str = "WATERMARK_ERASER_API_URL";
/// API key used as the bearer token.
pub const ENV_API_KEY: &str = "WATERMARK_ERASER_API_KEY";
/// Storage bucket for originals.
pub const ENV_BUCKET: &str = "WATERMARK_ERASER_BUCKET";
/// Request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "WATERMARK_ERASER_TIMEOUT_SECS";
/// Session gate mode, `enforce` or `assume`.
pub const ENV_AUTH_GATE: &str = "WATERMARK_ERASER_AUTH_GATE";

/// Settings for the platform client and the workflow.
#[derive(Debug, Clone)]
pub struct Config {
    /// Platform base URL, without a trailing slash.
    pub api_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Storage bucket.
    pub bucket: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Session gate mode.
    pub gate: GateMode,
}

impl Config {
    /// Default storage bucket.
    pub const DEFAULT_BUCKET: &'static str = "images";
    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    /// Read the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or a value is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through an arbitrary lookup function.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require =
            |name: &str| get(name).ok_or_else(|| Error::Config(format!("{name} must be set")));

        let api_url = require(ENV_API_URL)?.trim_end_matches('/').to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "{ENV_API_URL} must be an http(s) URL, got '{api_url}'"
            )));
        }

        let timeout = match get(ENV_TIMEOUT_SECS) {
            Some(v) => {
                let secs: u64 = v.trim().parse().map_err(|_| {
                    Error::Config(format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds"))
                })?;
                Duration::from_secs(secs)
            }
            None => Self::DEFAULT_TIMEOUT,
        };

        let gate = match get(ENV_AUTH_GATE) {
            Some(v) => v.parse()?,
            None => GateMode::default(),
        };

        Ok(Self {
            api_url,
            api_key: require(ENV_API_KEY)?,
            bucket: get(ENV_BUCKET).unwrap_or_else(|| Self::DEFAULT_BUCKET.to_string()),
            timeout,
            gate,
        })
    }
}
