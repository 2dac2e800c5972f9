//! Consent state engine.
//!
//! Components, leaves first:
//! - [`cookies`]: cookie jars and stores the consent record lives in.
//! - [`consent_store`]: reads/writes the consent record.
//! - [`category_tree`]: categories, sub-categories and checkbox consistency.
//! - [`filters`]: source filters and the registry that dispatches consent to them.
//! - [`consent_box`]: the state machine tying it all together.

pub mod category_tree;
pub mod config;
pub mod consent_box;
pub mod consent_store;
pub mod cookies;
pub mod errors;
pub mod events;
pub mod filters;
pub mod record;

/// Capacity of the consent event broadcast channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

pub use category_tree::{Category, CategoryDecl, CategoryTree};
pub use config::ConsentConfig;
pub use consent_box::{BoxState, ConsentBox, ConsentBoxBuilder};
pub use consent_store::ConsentStore;
pub use errors::ConsentError;
pub use events::{ConsentEvent, Subscription};
pub use filters::{DispatchReport, FnFilter, SourceFilter, SourceFilterRegistry};
pub use record::ConsentRecord;
