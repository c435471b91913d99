//! Configuration for Portrait Studio.
//!
//! [`StudioConfig`] is a plain struct: build it by hand, start from
//! [`StudioConfig::default`], or read it from the environment with
//! [`StudioConfig::from_env`].
//!
//! | Variable                         | Field             | Default                                              |
//! |----------------------------------|-------------------|------------------------------------------------------|
//! | `GEMINI_API_KEY` (or `API_KEY`)  | `api_key`         | required by `from_env`                               |
//! | `PORTRAIT_STUDIO_MODEL`          | `model`           | `gemini-2.5-flash-image`                             |
//! | `PORTRAIT_STUDIO_BASE_URL`       | `base_url`        | `https://generativelanguage.googleapis.com/v1beta`   |
//! | `PORTRAIT_STUDIO_TIMEOUT_SECS`   | `request_timeout` | 120 seconds                                          |
//! | `PORTRAIT_STUDIO_ASPECT_RATIO`   | `aspect_ratio`    | unset (model default)                                |
//! | `PORTRAIT_STUDIO_CATALOG`        | `catalog_path`    | unset (compiled-in six styles)                       |
//!
//! # Example
//!
//! ```rust
//! use portrait_studio::StudioConfig;
//!
//! let config = StudioConfig {
//!     api_key: "test-key".into(),
//!     aspect_ratio: Some("3:4".into()),
//!     ..StudioConfig::default()
//! };
//! assert_eq!(config.model, "gemini-2.5-flash-image");
//! ```

use crate::studio::style_catalog::{CatalogError, StyleCatalog};
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Settings for the Gemini client and the style catalog.
#[derive(Clone, Debug)]
pub struct StudioConfig {
    /// Pre-provisioned Gemini API credential.
    pub api_key: String,
    pub model: String,
    /// API root without a trailing slash; `/models/{model}:generateContent` is appended.
    pub base_url: String,
    /// Upper bound for one generation request, connect included.
    pub request_timeout: Duration,
    /// Optional output aspect ratio such as `"3:4"`.
    pub aspect_ratio: Option<String>,
    /// JSON style catalog to use instead of the compiled-in one.
    pub catalog_path: Option<PathBuf>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            aspect_ratio: None,
            catalog_path: None,
        }
    }
}

/// Errors raised while assembling a [`StudioConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither `GEMINI_API_KEY` nor `API_KEY` is set.
    MissingApiKey,
    /// A variable was set to a value that cannot be parsed.
    InvalidValue { name: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingApiKey => {
                write!(f, "Missing API key: set GEMINI_API_KEY or API_KEY")
            }
            ConfigError::InvalidValue { name, value } => {
                write!(f, "Invalid value for {}: {:?}", name, value)
            }
        }
    }
}

impl Error for ConfigError {}

impl StudioConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    ///
    /// ```rust
    /// use portrait_studio::StudioConfig;
    /// use std::collections::HashMap;
    ///
    /// let vars: HashMap<&str, &str> = [("API_KEY", "k"), ("PORTRAIT_STUDIO_TIMEOUT_SECS", "30")]
    ///     .into_iter()
    ///     .collect();
    /// let config = StudioConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
    /// assert_eq!(config.api_key, "k");
    /// assert_eq!(config.request_timeout.as_secs(), 30);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = get("GEMINI_API_KEY")
            .or_else(|| get("API_KEY"))
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = StudioConfig {
            api_key,
            ..StudioConfig::default()
        };

        if let Some(model) = get("PORTRAIT_STUDIO_MODEL") {
            config.model = model;
        }
        if let Some(base_url) = get("PORTRAIT_STUDIO_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = get("PORTRAIT_STUDIO_TIMEOUT_SECS") {
            let secs = raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    name: "PORTRAIT_STUDIO_TIMEOUT_SECS".to_string(),
                    value: raw.clone(),
                })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        config.aspect_ratio = get("PORTRAIT_STUDIO_ASPECT_RATIO");
        config.catalog_path = get("PORTRAIT_STUDIO_CATALOG").map(PathBuf::from);

        Ok(config)
    }

    /// Load the configured style catalog, or the compiled-in default when none is set.
    pub fn load_catalog(&self) -> Result<StyleCatalog, CatalogError> {
        match &self.catalog_path {
            Some(path) => StyleCatalog::from_file(path),
            None => Ok(StyleCatalog::default_catalog()),
        }
    }
}
