//! Consent box configuration.
//!
//! `ConsentConfig` controls where and for how long the consent record is
//! kept, and whether the consent box is enabled at all for a page load.
//!
//! `ConsentConfig` provides sensible defaults via [`Default`] and a fluent
//! [`ConsentConfig::builder()`] for customization with validation.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use cookiebox::config::ConsentConfig;
//! let cfg = ConsentConfig::default();
//! assert_eq!(cfg.cookie_name, "cookiebox");
//! assert_eq!(cfg.retention_days, 365);
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use cookiebox::config::ConsentConfig;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = ConsentConfig::builder()
//!     .cookie_name("consent")
//!     .retention_days(180)
//!     .site("https://shop.example.com/")
//!     .build()?; // returns Result<ConsentConfig, ConsentConfigError>
//! # Ok(()) }
//! ```
//!
//! # Fields (summary)
//! - `cookie_name`: Name of the cookie holding the record (default: `cookiebox`).
//! - `retention_days`: Lifetime of the record after the last write (default: 365).
//! - `site`: Site the record is scoped to; only its origin is used.
//! - `enabled`: When `false`, `init()` leaves the box inert.
//!
//! # Errors
//!
//! Builder validation can return [`ConsentConfigError`] if values are invalid
//! (e.g. an empty cookie name, `retention_days` outside `1..=MAX_RETENTION_DAYS`
//! or an unparsable site).

use serde::Deserialize;
use std::fmt;
use url::Url;

pub const DEFAULT_COOKIE_NAME: &str = "cookiebox";
pub const DEFAULT_RETENTION_DAYS: u32 = 365;
/// Longest accepted retention, ten years.
pub const MAX_RETENTION_DAYS: u32 = 3650;
const DEFAULT_SITE: &str = "https://localhost/";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsentConfig {
    pub cookie_name: String,
    pub retention_days: u32,
    pub site: Url,
    pub enabled: bool,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            retention_days: DEFAULT_RETENTION_DAYS,
            site: Url::parse(DEFAULT_SITE).expect("default site is a valid URL"),
            enabled: true,
        }
    }
}

impl ConsentConfig {
    pub fn builder() -> ConsentConfigBuilder {
        ConsentConfigBuilder::default()
    }

    /// Parses a JSON document and validates the result. Missing fields fall
    /// back to their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConsentConfigError> {
        let cfg: ConsentConfig =
            serde_json::from_str(json).map_err(|e| ConsentConfigError::Parse(e.to_string()))?;
        validate(&cfg)?;
        Ok(cfg)
    }
}

/// Builder for [`ConsentConfig`].
#[derive(Debug, Clone, Default)]
pub struct ConsentConfigBuilder {
    inner: ConsentConfig,
    site: Option<String>,
}

impl ConsentConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut ConsentConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn cookie_name<S: Into<String>>(self, name: S) -> Self { self.map(|c| c.cookie_name = name.into()) }
    pub fn retention_days(self, days: u32) -> Self { self.map(|c| c.retention_days = days) }
    pub fn enabled(self, on: bool) -> Self { self.map(|c| c.enabled = on) }

    pub fn site<S: Into<String>>(mut self, site: S) -> Self {
        self.site = Some(site.into());
        self
    }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut ConsentConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(mut self) -> Result<ConsentConfig, ConsentConfigError> {
        if let Some(site) = self.site.take() {
            self.inner.site = Url::parse(&site).map_err(|_| ConsentConfigError::InvalidSite(site))?;
        }
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentConfigError {
    InvalidCookieName(String),
    ZeroRetention,
    RetentionTooLong(u32),
    InvalidSite(String),
    Parse(String),
}

impl fmt::Display for ConsentConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsentConfigError::InvalidCookieName(n) =>
                write!(f, "cookie_name {n:?} is not a valid cookie name"),
            ConsentConfigError::ZeroRetention =>
                write!(f, "retention_days must be at least 1"),
            ConsentConfigError::RetentionTooLong(d) =>
                write!(f, "retention_days {d} exceeds the maximum of {MAX_RETENTION_DAYS}"),
            ConsentConfigError::InvalidSite(s) =>
                write!(f, "site {s:?} is not an absolute http(s) URL"),
            ConsentConfigError::Parse(e) =>
                write!(f, "cannot parse consent config: {e}"),
        }
    }
}
impl std::error::Error for ConsentConfigError {}

fn validate(c: &ConsentConfig) -> Result<(), ConsentConfigError> {
    let bad_char = |ch: char| ch.is_whitespace() || matches!(ch, ';' | '=' | ',');
    if c.cookie_name.is_empty() || c.cookie_name.chars().any(bad_char) {
        return Err(ConsentConfigError::InvalidCookieName(c.cookie_name.clone()));
    }
    if c.retention_days == 0 {
        return Err(ConsentConfigError::ZeroRetention);
    }
    if c.retention_days > MAX_RETENTION_DAYS {
        return Err(ConsentConfigError::RetentionTooLong(c.retention_days));
    }
    if !matches!(c.site.scheme(), "http" | "https") {
        return Err(ConsentConfigError::InvalidSite(c.site.to_string()));
    }
    Ok(())
}
