//! JSON-backed cookie store.
//!
//! `JsonCookieStore` persists the cookie jar in a single JSON file on disk. It
//! implements the [`CookieStore`] trait and hands out a jar wrapped in
//! [`PersistentCookieJar`], so that **every mutation** triggers a snapshot
//! write back to this store.
//!
//! ### I/O characteristics & caveats
//! - Every persist **rewrites** the entire JSON file. File writes are not atomic.
//! - I/O and serialization failures are logged and otherwise ignored; a
//!   missing or unreadable file loads as an empty jar.
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, Weak};

use crate::engine::cookies::cookie_jar::DefaultCookieJar;
use crate::engine::cookies::persistent_cookie_jar::PersistentCookieJar;
use crate::engine::cookies::store::CookieStore;
use crate::engine::cookies::CookieJarHandle;
use serde::{Deserialize, Serialize};

/// On-disk representation of the cookie jar.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CookieStoreFile {
    jar: DefaultCookieJar,
}

/// A JSON-based cookie store that persists cookies across sessions.
pub struct JsonCookieStore {
    /// Path to the JSON file where cookies are stored.
    path: PathBuf,

    /// The jar handed out by this store, created on first request.
    jar: RwLock<Option<CookieJarHandle>>,

    /// Self handle, so `PersistentCookieJar` can call back into this store.
    store_self: Weak<JsonCookieStore>,
}

impl JsonCookieStore {
    /// Creates (or opens) a JSON cookie store at `path`.
    ///
    /// If the file does not exist, an empty structure is written to disk.
    pub fn new(path: PathBuf) -> Arc<Self> {
        let store = Arc::new_cyclic(|me| Self {
            path,
            jar: RwLock::new(None),
            store_self: me.clone(),
        });

        if !store.path.exists() {
            store.save_file(&CookieStoreFile::default());
        }

        store
    }

    /// Loads and deserializes the store file. Returns an empty jar on any failure.
    fn load_file(&self) -> CookieStoreFile {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!("Cookiebox » cannot read cookie store {}: {}", self.path.display(), e);
                return CookieStoreFile::default();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|e| {
            log::warn!("Cookiebox » cookie store {} is corrupt: {}", self.path.display(), e);
            CookieStoreFile::default()
        })
    }

    /// Serializes and writes the store file (pretty-printed).
    fn save_file(&self, store_file: &CookieStoreFile) {
        let result = serde_json::to_string_pretty(store_file)
            .map_err(anyhow::Error::from)
            .and_then(|contents| fs::write(&self.path, contents).map_err(anyhow::Error::from));

        if let Err(e) = result {
            log::error!("Cookiebox » cannot write cookie store {}: {}", self.path.display(), e);
        }
    }
}

impl CookieStore for JsonCookieStore {
    fn jar(&self) -> CookieJarHandle {
        {
            // Fast path: already in memory
            if let Ok(jar) = self.jar.read() {
                if let Some(jar) = jar.as_ref() {
                    return jar.clone();
                }
            }
        }

        let file = self.load_file();
        let weak: Weak<dyn CookieStore + Send + Sync> = self.store_self.clone();
        let persistent: CookieJarHandle = Arc::new(RwLock::new(PersistentCookieJar::new(file.jar, weak)));

        match self.jar.write() {
            Ok(mut slot) => slot.get_or_insert(persistent).clone(),
            Err(_) => persistent,
        }
    }

    fn persist_snapshot(&self, snapshot: &DefaultCookieJar) {
        self.save_file(&CookieStoreFile { jar: snapshot.clone() });
    }

    fn persist_all(&self) {
        let Ok(slot) = self.jar.read() else { return };
        let Some(jar) = slot.as_ref() else { return };
        let Ok(jar) = jar.read() else { return };

        if let Some(persist) = jar.as_any().downcast_ref::<PersistentCookieJar>() {
            if let Some(snapshot) = persist.snapshot() {
                self.persist_snapshot(&snapshot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cookies::Cookie;
    use url::Url;

    #[test]
    fn creates_empty_file_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let _store = JsonCookieStore::new(path.clone());
        assert!(path.exists());
    }

    #[test]
    fn same_store_returns_same_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCookieStore::new(dir.path().join("cookies.json"));

        let a = store.jar();
        let b = store.jar();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn cookies_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let url = Url::parse("https://example.com/").unwrap();

        {
            let store = JsonCookieStore::new(path.clone());
            let jar = store.jar();
            jar.write().unwrap().set_cookie(&url, Cookie::new("cookiebox", "analytics,maps").expires_in_days(365).unwrap());
        }

        let store = JsonCookieStore::new(path);
        let jar = store.jar();
        let cookie = jar.read().unwrap().get_cookie(&url, "cookiebox").unwrap();
        assert_eq!(cookie.value, "analytics,maps");
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonCookieStore::new(path);
        let jar = store.jar();
        let jar = jar.read().unwrap();
        let persist = jar.as_any().downcast_ref::<PersistentCookieJar>().unwrap();
        assert!(persist.snapshot().unwrap().entries.is_empty());
    }

    #[test]
    fn persist_all_writes_live_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let url = Url::parse("https://example.com/").unwrap();

        let store = JsonCookieStore::new(path.clone());
        let jar = store.jar();
        jar.write().unwrap().set_cookie(&url, Cookie::new("cookiebox", "maps"));
        fs::write(&path, "{}").unwrap();

        store.persist_all();
        let reloaded = JsonCookieStore::new(path).jar();
        assert_eq!(reloaded.read().unwrap().get_cookie(&url, "cookiebox").unwrap().value, "maps");
    }
}
