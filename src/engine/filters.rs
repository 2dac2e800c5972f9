//! Source filters and their registry.
//!
//! A **source filter** guards one kind of third-party resource (a map embed,
//! an analytics script, a video player) behind one consent category. The
//! registry informs every filter of the current consent state: filters whose
//! name is in the consent set are granted, all others are revoked.
//!
//! Filter callbacks are foreign code. A callback returning an error or
//! panicking is logged and recorded in the [`DispatchReport`]; dispatch always
//! reaches every remaining filter.

mod deferred;
mod flag;

pub use deferred::{DeferredSourceFilter, EmbedDocument, EmbedDocumentHandle, EmbeddedResource};
pub use flag::FlagFilter;

use crate::engine::errors::ConsentError;
use crate::engine::record::ConsentRecord;
use anyhow::Result;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// A filter notified of grant/revoke for one named consent category.
pub trait SourceFilter: Send + Sync {
    /// Consent identifier this filter is bound to.
    fn name(&self) -> &str;

    /// Called when `name()` is part of the consent set.
    fn on_granted(&self) -> Result<()>;

    /// Called when `name()` is not part of the consent set.
    fn on_revoked(&self) -> Result<()>;
}

/// Filter backed by two closures.
pub struct FnFilter<G, R> {
    name: String,
    granted: G,
    revoked: R,
}

impl<G, R> FnFilter<G, R>
where
    G: Fn() -> Result<()> + Send + Sync,
    R: Fn() -> Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, granted: G, revoked: R) -> Self {
        Self { name: name.into(), granted, revoked }
    }
}

impl<G, R> SourceFilter for FnFilter<G, R>
where
    G: Fn() -> Result<()> + Send + Sync,
    R: Fn() -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_granted(&self) -> Result<()> {
        (self.granted)()
    }

    fn on_revoked(&self) -> Result<()> {
        (self.revoked)()
    }
}

/// Outcome of one dispatch round, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Filters whose `on_granted` was invoked.
    pub granted: Vec<String>,
    /// Filters whose `on_revoked` was invoked.
    pub revoked: Vec<String>,
    /// Callbacks that failed, as [`ConsentError::FilterCallback`].
    pub failed: Vec<ConsentError>,
}

impl DispatchReport {
    pub fn failed_filters(&self) -> Vec<String> {
        self.failed
            .iter()
            .filter_map(|e| match e {
                ConsentError::FilterCallback { filter, .. } => Some(filter.clone()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Default)]
pub struct SourceFilterRegistry {
    filters: Vec<Box<dyn SourceFilter>>,
}

impl SourceFilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `filter`. Duplicate names are kept and each is dispatched.
    pub fn register(&mut self, filter: Box<dyn SourceFilter>) {
        log::debug!("Cookiebox » registered source filter {:?}", filter.name());
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Invokes exactly one callback on every filter, in registration order.
    pub fn dispatch(&self, consent: &ConsentRecord) -> DispatchReport {
        let mut report = DispatchReport::default();
        log::debug!("Cookiebox » dispatching {:?} to {} source filters", consent.encode(), self.filters.len());

        for filter in &self.filters {
            let name = filter.name().to_string();
            let granted = consent.contains(&name);

            let outcome = catch_unwind(AssertUnwindSafe(|| {
                if granted {
                    filter.on_granted()
                } else {
                    filter.on_revoked()
                }
            }));

            if granted {
                log::debug!("Cookiebox » {:?}-cookie enabled", name);
                report.granted.push(name.clone());
            } else {
                log::debug!("Cookiebox » {:?}-cookie disabled", name);
                report.revoked.push(name.clone());
            }

            let reason = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => format!("{e:#}"),
                Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
            };
            log::error!("Cookiebox » source filter {:?} failed: {}", name, reason);
            report.failed.push(ConsentError::FilterCallback { filter: name, reason });
        }

        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Calls = Arc<Mutex<Vec<String>>>;

    fn recording(name: &str, calls: &Calls) -> Box<dyn SourceFilter> {
        let (g, r) = (calls.clone(), calls.clone());
        let (gn, rn) = (name.to_string(), name.to_string());
        Box::new(FnFilter::new(
            name,
            move || {
                g.lock().unwrap().push(format!("+{gn}"));
                Ok(())
            },
            move || {
                r.lock().unwrap().push(format!("-{rn}"));
                Ok(())
            },
        ))
    }

    fn record(ids: &[&str]) -> ConsentRecord {
        ids.iter().copied().collect()
    }

    #[test]
    fn each_filter_gets_exactly_one_callback_in_order() {
        let calls = Calls::default();
        let mut registry = SourceFilterRegistry::new();
        registry.register(recording("analytics", &calls));
        registry.register(recording("maps", &calls));
        registry.register(recording("youtube", &calls));

        let report = registry.dispatch(&record(&["maps"]));

        assert_eq!(*calls.lock().unwrap(), vec!["-analytics", "+maps", "-youtube"]);
        assert_eq!(report.granted, vec!["maps"]);
        assert_eq!(report.revoked, vec!["analytics", "youtube"]);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn duplicate_names_are_all_dispatched() {
        let calls = Calls::default();
        let mut registry = SourceFilterRegistry::new();
        registry.register(recording("maps", &calls));
        registry.register(recording("maps", &calls));

        registry.dispatch(&record(&["maps"]));
        assert_eq!(*calls.lock().unwrap(), vec!["+maps", "+maps"]);
        assert_eq!(registry.names(), vec!["maps", "maps"]);
    }

    #[test]
    fn failing_filters_do_not_stop_dispatch() {
        let calls = Calls::default();
        let mut registry = SourceFilterRegistry::new();
        registry.register(Box::new(FnFilter::new(
            "analytics",
            || anyhow::bail!("tracker script missing"),
            || Ok(()),
        )));
        registry.register(Box::new(FnFilter::new(
            "maps",
            || Ok(()),
            || panic!("iframe vanished"),
        )));
        registry.register(recording("youtube", &calls));

        let report = registry.dispatch(&record(&["analytics"]));

        assert_eq!(*calls.lock().unwrap(), vec!["-youtube"]);
        assert_eq!(report.granted, vec!["analytics"]);
        assert_eq!(report.revoked, vec!["maps", "youtube"]);
        assert_eq!(report.failed_filters(), vec!["analytics", "maps"]);
        assert_eq!(
            report.failed[0],
            ConsentError::FilterCallback {
                filter: "analytics".into(),
                reason: "tracker script missing".into()
            }
        );
        assert!(matches!(
            &report.failed[1],
            ConsentError::FilterCallback { reason, .. } if reason.contains("iframe vanished")
        ));
    }

    #[test]
    fn empty_registry_dispatches_nothing() {
        let registry = SourceFilterRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.dispatch(&record(&["maps"])), DispatchReport::default());
    }
}
