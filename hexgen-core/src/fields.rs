use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Key injected into every report entry to record the source file extension.
pub const FILE_EXTENSION_KEY: &str = "file_extension";

/// Formats a numeric field as lowercase hex with a `0x` prefix.
pub fn hex_value(value: impl Into<u64>) -> String {
    format!("{:#x}", value.into())
}

/// Ordered field-name to rendered-value mapping for a single parsed header.
///
/// Insertion order is kept so that serialized fixtures list fields in header
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(IndexMap<String, String>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn insert_hex(&mut self, key: impl Into<String>, value: impl Into<u64>) {
        self.insert(key, hex_value(value));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
