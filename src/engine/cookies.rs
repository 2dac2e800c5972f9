// src/engine/cookies.rs
//! Cookies: [`CookieJar`], [`CookieStore`] and backends.
//!
//! The consent record is kept in an ordinary cookie. Hosts hand the consent
//! box a [`CookieJarHandle`], either a plain in-memory [`DefaultCookieJar`] or
//! a jar minted by one of the persistent stores.

mod cookies;
mod cookie_jar;
mod store;
mod persistent_cookie_jar;

pub use cookies::Cookie;
pub use cookies::CookieJarHandle;
pub use cookies::CookieStoreHandle;

pub use cookie_jar::CookieJar;
pub use cookie_jar::DefaultCookieJar;
pub use persistent_cookie_jar::PersistentCookieJar;

pub use store::CookieStore;
pub use store::JsonCookieStore;
#[cfg(feature = "sqlite_cookie_store")]
pub use store::SqliteCookieStore;
