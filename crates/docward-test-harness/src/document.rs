//! In-memory document fixtures.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use docward_types::{Document, PropertyError, Value};

/// A document held entirely in memory.
///
/// Properties can be marked as failing to simulate a broken store or a schema
/// mismatch; reading them yields a [`PropertyError::Backend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryDocument {
    id: String,
    type_name: String,
    lifecycle_state: Option<String>,
    properties: BTreeMap<String, Value>,
    failing: BTreeSet<String>,
}

impl InMemoryDocument {
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            lifecycle_state: None,
            properties: BTreeMap::new(),
            failing: BTreeSet::new(),
        }
    }

    pub fn with_lifecycle(mut self, state: impl Into<String>) -> Self {
        self.lifecycle_state = Some(state.into());
        self
    }

    pub fn with_text(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties
            .insert(path.into(), Value::Text(value.into()));
        self
    }

    pub fn with_date(mut self, path: impl Into<String>, value: DateTime<Utc>) -> Self {
        self.properties.insert(path.into(), Value::Date(value));
        self
    }

    /// Makes every read of `path` fail.
    pub fn with_failing_property(mut self, path: impl Into<String>) -> Self {
        self.failing.insert(path.into());
        self
    }
}

impl Document for InMemoryDocument {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn lifecycle_state(&self) -> Option<&str> {
        self.lifecycle_state.as_deref()
    }

    fn property(&self, path: &str) -> Result<Option<Value>, PropertyError> {
        if self.failing.contains(path) {
            return Err(PropertyError::Backend {
                path: path.to_string(),
                reason: "injected read failure".to_string(),
            });
        }
        Ok(self.properties.get(path).cloned())
    }
}
