//! Cookie jar abstraction and a simple in-memory implementation.
//!
//! A **cookie jar** holds the cookies of one browsing profile, bucketed by
//! origin. The consent store reads and writes its record through this trait so
//! the record follows normal cookie rules (scoping, expiry, last write wins).
//!
//! ## Notes & limitations
//! - Cookies are bucketed by **origin** (`url.origin().ascii_serialization()`).
//!   Within a bucket, simple host/subdomain and path prefix checks are applied.
//! - Expired cookies are invisible to readers. Storing an already expired
//!   cookie deletes any cookie of the same name, as browsers do.
//! - This module is **not** internally synchronized. Use it via a
//!   `CookieJarHandle = Arc<RwLock<dyn CookieJar + Send + Sync>>`.
//!
use crate::engine::cookies::Cookie;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use url::Url;

/// A cookie jar keeps the cookies for one browsing profile.
///
/// ### Type erasure
/// `as_any` enables downcasting when callers need access to concrete
/// implementations (e.g., for snapshotting/persistence).
pub trait CookieJar: Send + Sync {
    /// Returns a type-erased reference to the jar.
    fn as_any(&self) -> &dyn Any;

    /// Stores `cookie` for `url`, replacing any cookie with the same name.
    fn set_cookie(&mut self, url: &Url, cookie: Cookie);

    /// Returns the live (unexpired, in-scope) cookie named `name` for `url`.
    fn get_cookie(&self, url: &Url, name: &str) -> Option<Cookie>;

    /// Removes all cookies from the jar.
    fn clear(&mut self);

    /// Removes a single cookie with `cookie_name` associated with `url`.
    fn remove_cookie(&mut self, url: &Url, cookie_name: &str);
}

/// Default in-memory cookie jar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultCookieJar {
    /// Key: origin string from `Url::origin().ascii_serialization()`.
    /// Value: vector of cookie records for that origin.
    pub entries: HashMap<String, Vec<Cookie>>,
}

impl DefaultCookieJar {
    /// Creates an empty in-memory cookie jar.
    pub fn new() -> Self {
        DefaultCookieJar {
            entries: HashMap::new(),
        }
    }
}

fn in_scope(cookie: &Cookie, url: &Url) -> bool {
    let host = url.host_str().unwrap_or_default();
    let path = url.path();

    let domain_ok = match &cookie.domain {
        Some(domain) => host == domain || host.ends_with(&format!(".{}", domain)),
        None => true,
    };
    let path_ok = match &cookie.path {
        Some(cookie_path) => path.starts_with(cookie_path),
        None => true,
    };

    domain_ok && path_ok && (!cookie.secure || url.scheme() == "https")
}

impl CookieJar for DefaultCookieJar {
    fn as_any(&self) -> &dyn Any { self }

    fn set_cookie(&mut self, url: &Url, mut cookie: Cookie) {
        let origin = url.origin().ascii_serialization();
        if cookie.path.is_none() {
            cookie.path = Some("/".to_string());
        }
        if let Some(domain) = cookie.domain.take() {
            cookie.domain = Some(domain.trim_start_matches('.').to_string());
        }

        let bucket = self.entries.entry(origin).or_default();
        bucket.retain(|c| c.name != cookie.name);

        if cookie.is_expired() {
            log::debug!("Cookiebox » cookie {:?} stored expired, removed", cookie.name);
            return;
        }
        bucket.push(cookie);
    }

    fn get_cookie(&self, url: &Url, name: &str) -> Option<Cookie> {
        let origin = url.origin().ascii_serialization();
        self.entries
            .get(&origin)?
            .iter()
            .find(|c| c.name == name && !c.is_expired() && in_scope(c, url))
            .cloned()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn remove_cookie(&mut self, url: &Url, cookie_name: &str) {
        let origin = url.origin().ascii_serialization();
        if let Some(cookies) = self.entries.get_mut(&origin) {
            cookies.retain(|c| c.name != cookie_name);
        }
    }
}
