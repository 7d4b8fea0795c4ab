//! Theme settings addressed by dotted paths.
//!
//! Copyright (c) 2025 Posit, PBC

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StylesError;

/// Nested theme settings, usually a theme's `config.json` `settings` object.
///
/// Values are looked up by name: a key containing dots is first tried as-is,
/// then walked one segment at a time (`global.h1.font-size.value`). Numeric
/// segments index into arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeSettings(Value);

impl ThemeSettings {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Settings with no values; every lookup misses.
    pub fn empty() -> Self {
        Self(Value::Object(Default::default()))
    }

    /// Parse settings from JSON text.
    pub fn from_json(json: &str) -> Result<Self, StylesError> {
        serde_json::from_str(json)
            .map(Self)
            .map_err(|e| StylesError::Config(format!("theme settings: {}", e)))
    }

    /// Read settings from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, StylesError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            StylesError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    /// Look up a value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(name) {
            return Some(value);
        }
        if !name.contains('.') {
            return None;
        }
        name.split('.').try_fold(&self.0, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for ThemeSettings {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
