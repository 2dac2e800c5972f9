//! Cookie core types.
//!
//! This module defines the **type-erased handles** used throughout the crate
//! and the serializable [`Cookie`] data structure.
//!
//! # Concurrency model
//! - [`CookieJarHandle`] is `Arc<RwLock<dyn CookieJar + Send + Sync>>`.
//!   Callers take a **read lock** for queries and a **write lock** for
//!   mutations on the underlying jar.
//! - [`CookieStoreHandle`] is `Arc<dyn CookieStore + Send + Sync>`.
//!   Stores manage their **own internal synchronization**; the trait methods take `&self`.
//!
//! ```rust
//! use cookiebox::cookies::Cookie;
//!
//! let c = Cookie::new("cookiebox", "analytics,maps").expires_in_days(365).unwrap();
//! assert!(c.expires.is_some());
//! assert!(!c.is_expired());
//! ```

use crate::engine::cookies::store::CookieStore;
use crate::engine::cookies::CookieJar;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

/// A handle to a cookie jar trait.
///
/// Reference-counted, read/write-locked pointer to a type-erased [`CookieJar`].
pub type CookieJarHandle = Arc<RwLock<dyn CookieJar + Send + Sync>>;

/// A handle to a cookie store trait.
pub type CookieStoreHandle = Arc<dyn CookieStore + Send + Sync>;

/// A cookie as stored/serialized by the crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    pub name: String,

    /// Raw cookie value (not URL-decoded).
    pub value: String,

    /// Path scoping (e.g., `"/"`). Jars default this to `"/"` on store.
    pub path: Option<String>,

    /// Domain scoping (host-only if `None`).
    pub domain: Option<String>,

    /// If `true`, cookie is sent only over HTTPS.
    pub secure: bool,

    /// Expiration timestamp in RFC 3339. Session cookies have `None`.
    pub expires: Option<String>,

    /// SameSite policy (`"Strict"`, `"Lax"`, or `"None"`).
    pub same_site: Option<String>,

    /// If `true`, cookie is blocked from access by client-side scripts.
    pub http_only: bool,
}

impl Cookie {
    /// Creates a host-only session cookie on path `/` with `SameSite=Lax`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: Some("/".to_string()),
            domain: None,
            secure: false,
            expires: None,
            same_site: Some("Lax".to_string()),
            http_only: false,
        }
    }

    /// Sets the expiry to `days` days from now. Fails when that date is out
    /// of the representable range.
    pub fn expires_in_days(self, days: u32) -> Result<Self> {
        let at = OffsetDateTime::now_utc()
            .checked_add(Duration::days(i64::from(days)))
            .ok_or_else(|| anyhow!("expiry {days} days from now is out of range"))?;
        Ok(self.expires_at(at))
    }

    pub fn expires_at(mut self, at: OffsetDateTime) -> Self {
        // Rfc3339 formatting only fails for offsets with seconds, which UTC never has
        self.expires = at.format(&Rfc3339).ok();
        self
    }

    /// Parsed expiry timestamp. An unparsable value counts as no expiry.
    pub fn expires_at_time(&self) -> Option<OffsetDateTime> {
        self.expires
            .as_deref()
            .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at_time().is_some_and(|at| at <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }
}
