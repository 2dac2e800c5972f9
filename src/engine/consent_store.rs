//! Persistence of the consent record in a cookie.
//!
//! The store reads and writes one cookie (default name `cookiebox`) scoped to
//! the configured site. Concurrent writers (other tabs sharing the jar) are
//! resolved by last write wins.

use crate::engine::config::ConsentConfig;
use crate::engine::cookies::{Cookie, CookieJarHandle};
use crate::engine::errors::ConsentError;
use crate::engine::record::ConsentRecord;
use url::Url;

pub struct ConsentStore {
    jar: CookieJarHandle,
    site: Url,
    cookie_name: String,
}

impl ConsentStore {
    pub fn new(jar: CookieJarHandle, config: &ConsentConfig) -> Self {
        Self {
            jar,
            site: config.site.clone(),
            cookie_name: config.cookie_name.clone(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Persists `ids` for `ttl_days` days, overwriting any prior record.
    pub fn save(&self, ids: &ConsentRecord, ttl_days: u32) -> Result<(), ConsentError> {
        let cookie = Cookie::new(self.cookie_name.clone(), ids.encode())
            .expires_in_days(ttl_days)
            .map_err(|e| ConsentError::Storage(e.to_string()))?;

        self.jar
            .write()
            .map_err(|_| ConsentError::poisoned("cookie jar"))?
            .set_cookie(&self.site, cookie);

        log::debug!("Cookiebox » saved {:?} for {} days", ids.encode(), ttl_days);
        Ok(())
    }

    /// Raw persisted value, `None` when no (unexpired) record exists.
    pub fn raw(&self) -> Option<String> {
        let jar = match self.jar.read() {
            Ok(jar) => jar,
            Err(_) => {
                log::error!("Cookiebox » cookie jar lock poisoned, treating record as absent");
                return None;
            }
        };
        jar.get_cookie(&self.site, &self.cookie_name).map(|c| c.value)
    }

    /// Whether a record exists at all, even one that does not decode.
    pub fn exists(&self) -> bool {
        self.raw().is_some()
    }

    /// Decoded record, or `None` when absent or malformed.
    pub fn load(&self) -> Option<ConsentRecord> {
        let raw = self.raw()?;
        match ConsentRecord::decode(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                log::debug!("Cookiebox » {}, treating as absent", e);
                None
            }
        }
    }

    /// Tests membership against `snapshot` when given, otherwise against the
    /// persisted record. No record means no consent.
    pub fn has(&self, id: &str, snapshot: Option<&ConsentRecord>) -> bool {
        match snapshot {
            Some(record) => record.contains(id),
            None => self.load().is_some_and(|record| record.contains(id)),
        }
    }

    /// Removes the record.
    pub fn clear(&self) -> Result<(), ConsentError> {
        self.jar
            .write()
            .map_err(|_| ConsentError::poisoned("cookie jar"))?
            .remove_cookie(&self.site, &self.cookie_name);
        Ok(())
    }
}
