//! Cookie store infrastructure.
//!
//! A **cookie store** is a provisioner and persistence layer for a cookie jar.
//! The consent box never holds a store, only the [`CookieJarHandle`] minted by it.
//!
//! This module exports two reference implementations:
//! - [`JsonCookieStore`]: file-backed JSON store (good for simple setups).
//! - [`SqliteCookieStore`]: SQLite-backed store (feature `sqlite_cookie_store`).
//!
//! ## Design notes
//! - `CookieStore::jar()` returns the *same logical jar instance* for the
//!   lifetime of the store, so all handles observe consistent state.
//! - Jars minted by a store are [`PersistentCookieJar`](super::PersistentCookieJar)s
//!   that hold only a weak reference back to it.
//!
//! ## Example
//! ```rust,no_run
//! use cookiebox::cookies::{CookieStore, JsonCookieStore};
//!
//! let store = JsonCookieStore::new("cookies.json".into());
//! let jar = store.jar();
//! ```
mod json;
#[cfg(feature = "sqlite_cookie_store")]
mod sqlite;

use crate::engine::cookies::cookie_jar::DefaultCookieJar;
use crate::engine::cookies::cookies::CookieJarHandle;

/// File-backed JSON cookie store.
pub use json::JsonCookieStore;
/// SQLite-backed cookie store.
#[cfg(feature = "sqlite_cookie_store")]
pub use sqlite::SqliteCookieStore;

/// A cookie **store** mints a cookie **jar** and persists it.
///
/// Implementations must be `Send + Sync` and safe for concurrent use.
pub trait CookieStore: Send + Sync {
    /// Returns (or creates and returns) the jar handle of this store.
    fn jar(&self) -> CookieJarHandle;

    /// Persists the cookie state from a provided snapshot, replacing what was stored.
    ///
    /// This should be **best-effort** and must not panic.
    fn persist_snapshot(&self, snapshot: &DefaultCookieJar);

    /// Persists the live jar to durable storage.
    ///
    /// Called at explicit flush points. Best-effort, must not panic.
    fn persist_all(&self);
}
