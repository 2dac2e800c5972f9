//! The consent record: the set of category identifiers a visitor granted.
//!
//! On the wire (the cookie value) the record is the identifiers joined by `,`
//! without escaping, which is why identifiers may never contain a comma.
//! The record is a *set*: duplicates are dropped, first occurrence wins and
//! insertion order is kept so the encoded value follows declaration order.

use crate::engine::errors::ConsentError;
use std::fmt;
use std::str::FromStr;

pub const SEPARATOR: &str = ",";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsentRecord {
    ids: Vec<String>,
}

impl ConsentRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `id` unless it is already present. Returns `true` when it was added.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Encodes the record as the persisted cookie value.
    pub fn encode(&self) -> String {
        self.ids.join(SEPARATOR)
    }

    /// Decodes a persisted cookie value.
    ///
    /// Empty values and values with empty segments (`"a,,b"`, `"a,"`) are
    /// malformed.
    pub fn decode(value: &str) -> Result<Self, ConsentError> {
        if value.is_empty() {
            return Err(ConsentError::MalformedRecord(value.to_string()));
        }

        let mut record = ConsentRecord::new();
        for id in value.split(SEPARATOR) {
            if id.is_empty() {
                return Err(ConsentError::MalformedRecord(value.to_string()));
            }
            record.insert(id);
        }
        Ok(record)
    }
}

impl fmt::Display for ConsentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for ConsentRecord {
    type Err = ConsentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConsentRecord::decode(s)
    }
}

impl<S: Into<String>> FromIterator<S> for ConsentRecord {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut record = ConsentRecord::new();
        for id in iter {
            record.insert(id);
        }
        record
    }
}

impl<'a> IntoIterator for &'a ConsentRecord {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}
