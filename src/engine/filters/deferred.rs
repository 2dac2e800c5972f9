//! Deferred loading of embedded resources.
//!
//! Consent-gated embeds are published with their real location in a
//! secondary `data_src` attribute so nothing loads before consent. Granting
//! promotes it to `src` and marks the embed's container allowed; revoking
//! moves it back.

use crate::engine::filters::SourceFilter;
use anyhow::{anyhow, Result};
use std::sync::{Arc, RwLock};

/// One embedded resource (an iframe, script or player) on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedResource {
    /// Active loading attribute.
    pub src: Option<String>,
    /// Location parked until consent is granted.
    pub data_src: Option<String>,
    /// Whether the container shows the resource as allowed.
    pub allowed: bool,
}

impl EmbeddedResource {
    /// A resource waiting for consent.
    pub fn deferred(location: impl Into<String>) -> Self {
        Self { src: None, data_src: Some(location.into()), allowed: false }
    }

    /// A resource that loads unconditionally.
    pub fn loaded(location: impl Into<String>) -> Self {
        Self { src: Some(location.into()), data_src: None, allowed: false }
    }

    pub fn location(&self) -> Option<&str> {
        self.src.as_deref().or(self.data_src.as_deref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmbedDocument {
    pub resources: Vec<EmbeddedResource>,
}

pub type EmbedDocumentHandle = Arc<RwLock<EmbedDocument>>;

/// Enables or disables every resource whose location contains `pattern`.
pub struct DeferredSourceFilter {
    name: String,
    pattern: String,
    document: EmbedDocumentHandle,
}

impl DeferredSourceFilter {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, document: EmbedDocumentHandle) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            document,
        }
    }

    fn for_matching(&self, f: impl Fn(&mut EmbeddedResource, String)) -> Result<()> {
        let mut doc = self
            .document
            .write()
            .map_err(|_| anyhow!("embed document lock poisoned"))?;

        for resource in doc.resources.iter_mut() {
            let Some(location) = resource.location().map(str::to_string) else {
                continue;
            };
            if location.contains(&self.pattern) {
                f(resource, location);
            }
        }
        Ok(())
    }
}

impl SourceFilter for DeferredSourceFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_granted(&self) -> Result<()> {
        self.for_matching(|resource, location| {
            resource.src.get_or_insert(location);
            resource.data_src = None;
            resource.allowed = true;
        })
    }

    fn on_revoked(&self) -> Result<()> {
        self.for_matching(|resource, location| {
            resource.src = None;
            resource.data_src = Some(location);
            resource.allowed = false;
        })
    }
}
