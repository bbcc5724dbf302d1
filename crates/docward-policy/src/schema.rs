//! Optional schema catalog for validating policies at startup.
//!
//! A catalog lists the field paths the repository defines (with their value
//! type) and, optionally, the known groups and document types. When a chain is
//! built with a catalog, every policy is checked against it and any mismatch is
//! a [`ConfigurationError`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::policy::DocumentPolicy;

/// Declared value type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Date,
}

impl FieldType {
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Date => "date",
        }
    }
}

/// Field, group and type names known to the host repository.
///
/// Groups and types are only checked when at least one has been declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    fields: BTreeMap<String, FieldType>,
    groups: Option<BTreeSet<String>>,
    types: Option<BTreeSet<String>>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, path: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(path.into(), field_type);
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.get_or_insert_with(BTreeSet::new).insert(group.into());
        self
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.types.get_or_insert_with(BTreeSet::new).insert(type_name.into());
        self
    }

    pub fn field_type(&self, path: &str) -> Option<FieldType> {
        self.fields.get(path).copied()
    }

    /// Checks every field, group and type a policy references.
    pub fn validate(&self, policy: &DocumentPolicy) -> Result<(), ConfigurationError> {
        let rules = std::iter::once(&policy.rule).chain(policy.scope.as_ref());

        for rule in rules {
            for (field, expected) in rule.field_references() {
                let declared = self.field_type(field).ok_or_else(|| {
                    ConfigurationError::UnknownField {
                        policy: policy.name.clone(),
                        field: field.to_string(),
                    }
                })?;
                if let Some(expected) = expected
                    && expected != declared
                {
                    return Err(ConfigurationError::FieldTypeMismatch {
                        policy: policy.name.clone(),
                        field: field.to_string(),
                        expected: expected.name(),
                        declared: declared.name(),
                    });
                }
            }

            if let Some(groups) = &self.groups
                && let Some(unknown) = rule
                    .group_references()
                    .into_iter()
                    .find(|g| !groups.contains(*g))
            {
                return Err(ConfigurationError::UnknownGroup {
                    policy: policy.name.clone(),
                    group: unknown.to_string(),
                });
            }

            if let Some(types) = &self.types
                && let Some(unknown) = rule
                    .type_references()
                    .into_iter()
                    .find(|t| !types.contains(*t))
            {
                return Err(ConfigurationError::UnknownType {
                    policy: policy.name.clone(),
                    type_name: unknown.to_string(),
                });
            }
        }

        if let (Some(types), Some(guard)) = (&self.types, &policy.type_guard)
            && !types.contains(guard)
        {
            return Err(ConfigurationError::UnknownType {
                policy: policy.name.clone(),
                type_name: guard.clone(),
            });
        }

        Ok(())
    }
}
