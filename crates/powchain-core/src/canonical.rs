//! Sorted-field JSON encoder.
//!
//! Block hashes and signatures are computed over this encoding, so its
//! output must never depend on struct field order or on serde_json's map
//! implementation. Keys are emitted in byte order, without whitespace.

use serde_json::Value;
use std::collections::BTreeMap;

/// Types with a canonical text encoding.
pub trait Canonical {
    fn canonical_json(&self) -> String;
}

#[derive(Debug, Default)]
pub struct CanonicalObject {
    fields: BTreeMap<&'static str, String>,
}

impl CanonicalObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(self, key: &'static str, value: &str) -> Self {
        self.raw(key, Value::from(value).to_string())
    }

    pub fn uint(self, key: &'static str, value: u64) -> Self {
        self.raw(key, value.to_string())
    }

    /// Non-finite floats encode as `null`, as serde_json does.
    pub fn float(self, key: &'static str, value: f64) -> Self {
        self.raw(key, Value::from(value).to_string())
    }

    pub fn optional_string(self, key: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.string(key, v),
            None => self.raw(key, Value::Null.to_string()),
        }
    }

    pub fn array<'a, T, I>(self, key: &'static str, items: I) -> Self
    where
        T: Canonical + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let encoded: Vec<String> = items.into_iter().map(|item| item.canonical_json()).collect();
        self.raw(key, format!("[{}]", encoded.join(",")))
    }

    /// Insert an already-encoded JSON value.
    pub fn raw(mut self, key: &'static str, encoded: String) -> Self {
        self.fields.insert(key, encoded);
        self
    }

    pub fn finish(self) -> String {
        let body: Vec<String> = self
            .fields
            .into_iter()
            .map(|(k, v)| format!("{}:{}", Value::from(k), v))
            .collect();
        format!("{{{}}}", body.join(","))
    }
}
