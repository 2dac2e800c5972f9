use crate::engine::filters::SourceFilter;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Raises a shared "disabled" flag while consent is revoked.
///
/// Fits trackers that check an opt-out switch before sending anything, like
/// analytics' `ga-disable-<measurement id>` property.
pub struct FlagFilter {
    name: String,
    disabled: Arc<AtomicBool>,
}

impl FlagFilter {
    pub fn new(name: impl Into<String>, disabled: Arc<AtomicBool>) -> Self {
        Self { name: name.into(), disabled }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }
}

impl SourceFilter for FlagFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_granted(&self) -> Result<()> {
        self.disabled.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn on_revoked(&self) -> Result<()> {
        self.disabled.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_tracks_consent() {
        let flag = Arc::new(AtomicBool::new(false));
        let filter = FlagFilter::new("google-analytics", flag.clone());

        filter.on_revoked().unwrap();
        assert!(flag.load(Ordering::SeqCst));
        assert!(filter.is_disabled());

        filter.on_granted().unwrap();
        assert!(!filter.is_disabled());
    }
}
