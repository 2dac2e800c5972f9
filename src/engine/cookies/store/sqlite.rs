//! SQLite-backed cookie store.
//!
//! `SqliteCookieStore` persists the cookie jar in a SQLite database, one row
//! per cookie. Like the JSON store it hands out a [`PersistentCookieJar`], so
//! every mutation is snapshotted back to the database.
//!
//! ## Design
//! - One **table** (`cookies`) keyed by `(origin, name)`.
//! - Database access is via an `r2d2` pool for safe multi-threaded use.
//! - A snapshot **rewrites** the table in one transaction (DELETE + INSERT).
//!
//! ## Example
//! ```ignore
//! let store = SqliteCookieStore::new("cookies.sqlite".into())?;
//! let jar = store.jar();
//! ```

use std::path::PathBuf;
use std::sync::{Arc, RwLock, Weak};

use anyhow::Result;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::rusqlite::params;
use r2d2_sqlite::SqliteConnectionManager;

use crate::engine::cookies::cookie_jar::DefaultCookieJar;
use crate::engine::cookies::persistent_cookie_jar::PersistentCookieJar;
use crate::engine::cookies::store::CookieStore;
use crate::engine::cookies::{Cookie, CookieJarHandle};

/// A SQLite-based cookie store that persists cookies across sessions.
pub struct SqliteCookieStore {
    /// Connection pool for SQLite database (so it can run multithreaded)
    pool: Pool<SqliteConnectionManager>,
    /// The jar handed out by this store, created on first request.
    jar: RwLock<Option<CookieJarHandle>>,
    /// Self handle provided to persistent jars for callback persistence.
    store_self: Weak<SqliteCookieStore>,
}

impl SqliteCookieStore {
    /// Opens (or creates) a SQLite database at `path` and ensures the schema exists.
    pub fn new(path: PathBuf) -> Result<Arc<Self>> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::new(manager)?;

        pool.get()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS cookies (
                origin TEXT NOT NULL,
                name TEXT NOT NULL,
                value TEXT NOT NULL,
                path TEXT,
                domain TEXT,
                secure INTEGER NOT NULL,
                expires TEXT,
                same_site TEXT,
                http_only INTEGER NOT NULL,
                PRIMARY KEY (origin, name)
            );",
        )?;

        Ok(Arc::new_cyclic(|me| Self {
            pool,
            jar: RwLock::new(None),
            store_self: me.clone(),
        }))
    }

    /// Borrows a pooled SQLite connection.
    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Loads all cookies from the database into a new [`DefaultCookieJar`].
    fn load(&self) -> Result<DefaultCookieJar> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT origin, name, value, path, domain, secure, expires, same_site, http_only
             FROM cookies ORDER BY rowid",
        )?;

        let rows = stmt.query_map([], |row| {
            let origin: String = row.get(0)?;
            let cookie = Cookie {
                name: row.get(1)?,
                value: row.get(2)?,
                path: row.get(3)?,
                domain: row.get(4)?,
                secure: row.get::<_, i64>(5)? != 0,
                expires: row.get(6)?,
                same_site: row.get(7)?,
                http_only: row.get::<_, i64>(8)? != 0,
            };
            Ok((origin, cookie))
        })?;

        let mut jar = DefaultCookieJar::new();
        for row in rows {
            let (origin, cookie) = row?;
            jar.entries.entry(origin).or_default().push(cookie);
        }
        Ok(jar)
    }

    fn save(&self, snapshot: &DefaultCookieJar) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM cookies", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO cookies (origin, name, value, path, domain, secure, expires, same_site, http_only)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for (origin, cookies) in &snapshot.entries {
                for c in cookies {
                    stmt.execute(params![
                        origin,
                        c.name,
                        c.value,
                        c.path,
                        c.domain,
                        c.secure as i64,
                        c.expires,
                        c.same_site,
                        c.http_only as i64,
                    ])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl CookieStore for SqliteCookieStore {
    fn jar(&self) -> CookieJarHandle {
        if let Ok(jar) = self.jar.read() {
            if let Some(jar) = jar.as_ref() {
                return jar.clone();
            }
        }

        let jar = self.load().unwrap_or_else(|e| {
            log::error!("Cookiebox » cannot load cookies from sqlite: {}", e);
            DefaultCookieJar::new()
        });
        let weak: Weak<dyn CookieStore + Send + Sync> = self.store_self.clone();
        let persistent: CookieJarHandle = Arc::new(RwLock::new(PersistentCookieJar::new(jar, weak)));

        match self.jar.write() {
            Ok(mut slot) => slot.get_or_insert(persistent).clone(),
            Err(_) => persistent,
        }
    }

    fn persist_snapshot(&self, snapshot: &DefaultCookieJar) {
        if let Err(e) = self.save(snapshot) {
            log::error!("Cookiebox » cannot persist cookies to sqlite: {}", e);
        }
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
