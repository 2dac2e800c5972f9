//! The consent box: state machine over the category tree, the consent store
//! and the source filter registry.
//!
//! ```text
//!            open()             accept_all() / accept_selection() / hide()
//!  Hidden ───────────▶ Visible ──────────────────────────────────────────▶ Hidden
//!    │                    │ open(X)
//!    │ open(X)            ▼
//!    └──────────▶ Highlighted(X) ───────────────────────────────────────▶ Hidden
//! ```
//!
//! `init()` resolves the first state: without a persisted record the box is
//! shown (first visit), otherwise it stays hidden and the persisted consent
//! is dispatched to the filters right away.
//!
//! # Example
//! ```rust
//! use cookiebox::{CategoryDecl, ConsentBox, ConsentConfig, FnFilter};
//!
//! let mut cookiebox = ConsentBox::builder()
//!     .config(ConsentConfig::default())
//!     .category(CategoryDecl::new("analytics"))
//!     .category(CategoryDecl::new("maps"))
//!     .create()
//!     .unwrap();
//! cookiebox.register_filter(FnFilter::new("maps", || Ok(()), || Ok(())));
//!
//! cookiebox.init().unwrap();
//! assert!(cookiebox.is_visible());
//!
//! cookiebox.toggle("maps", true).unwrap();
//! cookiebox.accept_selection().unwrap();
//! assert!(cookiebox.has_consent("maps"));
//! assert!(!cookiebox.has_consent("analytics"));
//! ```

use crate::engine::category_tree::{CategoryDecl, CategoryTree};
use crate::engine::config::ConsentConfig;
use crate::engine::consent_store::ConsentStore;
use crate::engine::cookies::{CookieJarHandle, CookieStore, CookieStoreHandle, DefaultCookieJar};
use crate::engine::errors::ConsentError;
use crate::engine::events::{ConsentBus, ConsentEvent, Subscription};
use crate::engine::filters::{DispatchReport, SourceFilter, SourceFilterRegistry};
use crate::engine::record::ConsentRecord;
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

/// Visible state of the consent box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoxState {
    Hidden,
    Visible,
    /// Visible, with the user pointed at one category.
    Highlighted(String),
}

pub struct ConsentBox {
    config: ConsentConfig,
    tree: CategoryTree,
    store: ConsentStore,
    filters: SourceFilterRegistry,
    state: BoxState,
    /// Top-level categories whose description/sub-category panel is open.
    expanded: BTreeSet<String>,
    /// Set when `init()` found the box unusable; every command then fails.
    inert: Option<String>,
    bus: ConsentBus,
    /// Persistent store behind the jar, held so its jar keeps persisting.
    cookie_store: Option<CookieStoreHandle>,
}

impl ConsentBox {
    /// Entry point to start building a consent box.
    pub fn builder() -> ConsentBoxBuilder {
        ConsentBoxBuilder::default()
    }

    pub fn register_filter<F: SourceFilter + 'static>(&mut self, filter: F) {
        self.filters.register(Box::new(filter));
    }

    /// Resolves the initial state.
    ///
    /// Without category markup, or when disabled by configuration, the box
    /// turns inert for the rest of the session and a
    /// [`ConsentError::Configuration`] is returned (and logged).
    pub fn init(&mut self) -> Result<(), ConsentError> {
        if !self.config.enabled {
            log::warn!("Cookiebox » Cookiebox is disabled.");
            return Err(self.make_inert("consent box disabled by configuration"));
        }
        if self.tree.is_empty() {
            log::error!("Cookiebox » Cookiebox not found!");
            return Err(self.make_inert("no consent categories declared"));
        }
        self.inert = None;

        if !self.store.exists() {
            self.show(None);
        } else {
            // A record that no longer decodes still means the visitor answered
            let record = self.store.load().unwrap_or_default();
            self.dispatch(&record);
        }
        Ok(())
    }

    /// Shows the box, optionally highlighting category `highlight` and
    /// expanding the panel that holds it.
    pub fn open(&mut self, highlight: Option<&str>) -> Result<(), ConsentError> {
        self.ensure_active()?;
        if let Some(id) = highlight {
            if !self.tree.contains(id) {
                log::warn!("Cookiebox » cannot highlight unknown category {:?}", id);
                return Err(ConsentError::NotFound(id.to_string()));
            }
        }

        if let Some(record) = self.store.load() {
            for unknown in self.tree.restore(&record) {
                log::warn!("Cookiebox » persisted category {:?} is not declared, ignored", unknown);
            }
        }

        self.show(highlight);
        Ok(())
    }

    /// Expands the description/sub-category panel holding category `id`.
    pub fn expand(&mut self, id: &str) -> Result<(), ConsentError> {
        self.ensure_active()?;
        let top = self
            .tree
            .top_level_of(id)
            .ok_or_else(|| ConsentError::NotFound(id.to_string()))?;
        self.expanded.insert(top.to_string());
        Ok(())
    }

    pub fn toggle(&mut self, id: &str, checked: bool) -> Result<(), ConsentError> {
        self.ensure_active()?;
        self.tree
            .toggle(id, checked)
            .inspect_err(|e| log::warn!("Cookiebox » toggle failed: {}", e))
    }

    /// Grants every category, persists, dispatches and hides the box.
    pub fn accept_all(&mut self) -> Result<DispatchReport, ConsentError> {
        self.ensure_active()?;
        self.tree.set_all(true);
        self.accept()
    }

    /// Persists exactly the checked categories, dispatches and hides the box.
    pub fn accept_selection(&mut self) -> Result<DispatchReport, ConsentError> {
        self.ensure_active()?;
        self.accept()
    }

    /// Hides the box, clearing the highlight and collapsing every panel.
    pub fn hide(&mut self) -> Result<(), ConsentError> {
        self.ensure_active()?;
        self.close();
        Ok(())
    }

    /// Whether `id` is part of the persisted record. No record means no consent.
    pub fn has_consent(&self, id: &str) -> bool {
        self.store.has(id, None)
    }

    pub fn state(&self) -> &BoxState {
        &self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state != BoxState::Hidden
    }

    pub fn highlighted(&self) -> Option<&str> {
        match &self.state {
            BoxState::Highlighted(id) => Some(id.as_str()),
            _ => None,
        }
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn is_inert(&self) -> bool {
        self.inert.is_some()
    }

    pub fn tree(&self) -> &CategoryTree {
        &self.tree
    }

    pub fn store(&self) -> &ConsentStore {
        &self.store
    }

    pub fn config(&self) -> &ConsentConfig {
        &self.config
    }

    /// Subscribe to consent events published from now on.
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    /// Writes the live jar out through the backing cookie store, if any.
    pub fn flush(&self) {
        if let Some(store) = &self.cookie_store {
            store.persist_all();
        }
    }

    fn make_inert(&mut self, reason: &str) -> ConsentError {
        self.inert = Some(reason.to_string());
        ConsentError::Configuration(reason.to_string())
    }

    fn ensure_active(&self) -> Result<(), ConsentError> {
        match &self.inert {
            Some(reason) => Err(ConsentError::Configuration(reason.clone())),
            None => Ok(()),
        }
    }

    fn show(&mut self, highlight: Option<&str>) {
        self.state = match highlight {
            None => BoxState::Visible,
            Some(id) => {
                log::debug!("Cookiebox » highlight {:?}", id);
                if let Some(top) = self.tree.top_level_of(id) {
                    self.expanded.insert(top.to_string());
                }
                BoxState::Highlighted(id.to_string())
            }
        };
        self.bus.publish(ConsentEvent::Shown { highlight: highlight.map(str::to_string) });
    }

    fn close(&mut self) {
        self.expanded.clear();
        if self.state != BoxState::Hidden {
            self.state = BoxState::Hidden;
            self.bus.publish(ConsentEvent::Hidden);
        }
    }

    fn accept(&mut self) -> Result<DispatchReport, ConsentError> {
        let record = self.tree.current_consent_set();
        self.store.save(&record, self.config.retention_days)?;
        self.bus.publish(ConsentEvent::ConsentSaved {
            ids: record.iter().map(str::to_string).collect(),
        });

        let report = self.dispatch(&record);
        self.close();
        Ok(report)
    }

    fn dispatch(&self, record: &ConsentRecord) -> DispatchReport {
        let report = self.filters.dispatch(record);
        self.bus.publish(ConsentEvent::FiltersDispatched {
            granted: report.granted.clone(),
            revoked: report.revoked.clone(),
            failed: report.failed_filters(),
        });
        report
    }
}

/// Builder for a [`ConsentBox`].
#[derive(Default)]
pub struct ConsentBoxBuilder {
    config: Option<ConsentConfig>,
    categories: Vec<CategoryDecl>,
    cookie_jar: Option<CookieJarHandle>,
    cookie_store: Option<CookieStoreHandle>,
    filters: Vec<Box<dyn SourceFilter>>,
}

impl ConsentBoxBuilder {
    pub fn config(mut self, cfg: ConsentConfig) -> Self {
        self.config = Some(cfg);
        self
    }

    pub fn category(mut self, decl: CategoryDecl) -> Self {
        self.categories.push(decl);
        self
    }

    pub fn categories(mut self, decls: impl IntoIterator<Item = CategoryDecl>) -> Self {
        self.categories.extend(decls);
        self
    }

    /// Jar holding the consent cookie. Defaults to a fresh in-memory jar.
    pub fn cookie_jar(mut self, jar: CookieJarHandle) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    /// Keeps the consent cookie in the jar of a persistent store.
    pub fn cookie_store(mut self, store: CookieStoreHandle) -> Self {
        self.cookie_jar = Some(store.jar());
        self.cookie_store = Some(store);
        self
    }

    pub fn filter<F: SourceFilter + 'static>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn create(self) -> Result<ConsentBox, ConsentError> {
        let config = self.config.unwrap_or_default();
        let tree = CategoryTree::build(self.categories)?;
        let jar = self
            .cookie_jar
            .unwrap_or_else(|| Arc::new(RwLock::new(DefaultCookieJar::new())));

        let mut filters = SourceFilterRegistry::new();
        for filter in self.filters {
            filters.register(filter);
        }

        Ok(ConsentBox {
            store: ConsentStore::new(jar, &config),
            config,
            tree,
            filters,
            state: BoxState::Hidden,
            expanded: BTreeSet::new(),
            inert: None,
            bus: ConsentBus::default(),
            cookie_store: self.cookie_store,
        })
    }
}
