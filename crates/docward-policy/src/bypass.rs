//! Privileged principals exempt from document policies.

use std::collections::BTreeSet;

use docward_types::{Principal, PrincipalKind};
use serde::{Deserialize, Serialize};

/// Default name of the repository's system identity.
pub const DEFAULT_SYSTEM_PRINCIPAL: &str = "system";

/// Default name of the administrator identity.
pub const DEFAULT_ADMINISTRATOR_PRINCIPAL: &str = "Administrator";

/// Names that bypass every policy on both enforcement faces.
///
/// A principal bypasses when its kind is privileged or when its name matches
/// one of the configured names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BypassPrincipals {
    system: String,
    administrators: BTreeSet<String>,
}

impl Default for BypassPrincipals {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PRINCIPAL, DEFAULT_ADMINISTRATOR_PRINCIPAL)
    }
}

impl BypassPrincipals {
    pub fn new(system: impl Into<String>, administrator: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            administrators: BTreeSet::from([administrator.into()]),
        }
    }

    /// Adds another name treated as an administrator.
    pub fn with_administrator(mut self, name: impl Into<String>) -> Self {
        self.administrators.insert(name.into());
        self
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn administrators(&self) -> &BTreeSet<String> {
        &self.administrators
    }

    /// Classifies a bare name.
    pub fn classify(&self, name: &str) -> PrincipalKind {
        if name == self.system {
            PrincipalKind::System
        } else if self.administrators.contains(name) {
            PrincipalKind::Administrator
        } else {
            PrincipalKind::Ordinary
        }
    }

    pub fn is_bypass(&self, principal: &Principal) -> bool {
        principal.kind().is_privileged() || self.classify(principal.name()).is_privileged()
    }
}
