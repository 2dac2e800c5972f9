use crate::engine::cookies::cookie_jar::DefaultCookieJar;
use crate::engine::cookies::{Cookie, CookieJar, CookieStore};
use std::sync::{Arc, RwLock, Weak};
use url::Url;

/// A `CookieJar` decorator that persists changes after each mutation.
///
/// This type is *transparent* for reads but *eagerly* persists after writes.
pub struct PersistentCookieJar {
    /// Inner cookie jar that holds the actual cookie state.
    pub inner: Arc<RwLock<DefaultCookieJar>>,
    /// Store responsible for persistence. Dropped stores simply stop persisting.
    store: Weak<dyn CookieStore + Send + Sync>,
}

impl PersistentCookieJar {
    /// Creates a new persistence-enabled wrapper around an existing jar.
    pub fn new(jar: DefaultCookieJar, store: Weak<dyn CookieStore + Send + Sync>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(jar)),
            store,
        }
    }

    /// Returns a clone of the current jar state.
    pub fn snapshot(&self) -> Option<DefaultCookieJar> {
        self.inner.read().ok().map(|jar| jar.clone())
    }

    /// Snapshots the inner jar and persists it to the backing store.
    fn persist(&self) {
        let Some(store) = self.store.upgrade() else {
            log::warn!("Cookiebox » cookie store dropped, change not persisted");
            return;
        };
        match self.snapshot() {
            Some(snapshot) => store.persist_snapshot(&snapshot),
            None => log::error!("Cookiebox » cookie jar lock poisoned, change not persisted"),
        }
    }

    /// Applies `f` and persists. A poisoned jar drops the write and persists nothing.
    fn mutate(&self, f: impl FnOnce(&mut DefaultCookieJar)) {
        {
            let Ok(mut jar) = self.inner.write() else {
                log::error!("Cookiebox » cookie jar lock poisoned, write dropped");
                return;
            };
            f(&mut jar);
        }
        self.persist();
    }
}

impl CookieJar for PersistentCookieJar {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    /// Stores the cookie, then persists the updated state.
    fn set_cookie(&mut self, url: &Url, cookie: Cookie) {
        self.mutate(|jar| jar.set_cookie(url, cookie));
    }

    fn get_cookie(&self, url: &Url, name: &str) -> Option<Cookie> {
        self.inner.read().ok()?.get_cookie(url, name)
    }

    /// Clears all cookies in the jar, then persists the updated state.
    fn clear(&mut self) {
        self.mutate(|jar| jar.clear());
    }

    /// Removes a single cookie by name for `url`, then persists the updated state.
    fn remove_cookie(&mut self, url: &Url, cookie_name: &str) {
        self.mutate(|jar| jar.remove_cookie(url, cookie_name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        snapshots: Mutex<Vec<DefaultCookieJar>>,
    }

    impl CookieStore for RecordingStore {
        fn jar(&self) -> crate::engine::cookies::CookieJarHandle {
            Arc::new(RwLock::new(DefaultCookieJar::new()))
        }
        fn persist_snapshot(&self, snapshot: &DefaultCookieJar) {
            self.snapshots.lock().unwrap().push(snapshot.clone());
        }
        fn persist_all(&self) {}
    }

    #[test]
    fn every_mutation_persists_a_snapshot() {
        let store = Arc::new(RecordingStore::default());
        let weak: Weak<dyn CookieStore + Send + Sync> = Arc::downgrade(&store) as Weak<dyn CookieStore + Send + Sync>;
        let mut jar = PersistentCookieJar::new(DefaultCookieJar::new(), weak);
        let url = Url::parse("https://example.com/").unwrap();

        jar.set_cookie(&url, Cookie::new("cookiebox", "maps"));
        assert!(jar.get_cookie(&url, "cookiebox").is_some());
        jar.remove_cookie(&url, "cookiebox");
        jar.clear();

        let snapshots = store.snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0].get_cookie(&url, "cookiebox").unwrap().value, "maps");
        assert!(snapshots[1].get_cookie(&url, "cookiebox").is_none());
    }

    #[test]
    fn poisoned_jar_drops_write_without_persisting() {
        let store = Arc::new(RecordingStore::default());
        let weak: Weak<dyn CookieStore + Send + Sync> = Arc::downgrade(&store) as Weak<dyn CookieStore + Send + Sync>;
        let mut jar = PersistentCookieJar::new(DefaultCookieJar::new(), weak);
        let url = Url::parse("https://example.com/").unwrap();

        let inner = jar.inner.clone();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = inner.write().unwrap();
            panic!("poison the jar");
        }));

        jar.set_cookie(&url, Cookie::new("cookiebox", "maps"));
        assert!(jar.get_cookie(&url, "cookiebox").is_none());
        assert!(store.snapshots.lock().unwrap().is_empty());
    }

    #[test]
    fn dropped_store_keeps_jar_usable() {
        let store = Arc::new(RecordingStore::default());
        let weak: Weak<dyn CookieStore + Send + Sync> = Arc::downgrade(&store) as Weak<dyn CookieStore + Send + Sync>;
        drop(store);

        let mut jar = PersistentCookieJar::new(DefaultCookieJar::new(), weak);
        let url = Url::parse("https://example.com/").unwrap();
        jar.set_cookie(&url, Cookie::new("cookiebox", "maps"));
        assert_eq!(jar.get_cookie(&url, "cookiebox").unwrap().value, "maps");
    }
}
