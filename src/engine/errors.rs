#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Category not found: {0}")]
    NotFound(String),

    #[error("Malformed consent record: {0:?}")]
    MalformedRecord(String),

    #[error("Source filter '{filter}' failed: {reason}")]
    FilterCallback { filter: String, reason: String },

    #[error("Invalid category declaration: {0}")]
    InvalidCategory(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ConsentError {
    pub(crate) fn poisoned(what: &str) -> Self {
        ConsentError::Storage(format!("{what} lock poisoned"))
    }
}
