//! Principals and the group-membership oracle.

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Distinguished identity classes.
///
/// System and administrator principals bypass every document policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    /// The repository's internal system identity.
    System,
    /// The distinguished administrator identity.
    Administrator,
    /// Any other user or service account.
    Ordinary,
}

impl PrincipalKind {
    /// Returns whether this kind bypasses the policy layer.
    pub fn is_privileged(self) -> bool {
        !matches!(self, PrincipalKind::Ordinary)
    }
}

/// A principal requesting access.
///
/// A principal is either *resolved* (its group memberships are known) or
/// *bare* (only the name is known). Bare principals must be resolved through
/// a [`MembershipOracle`] before their memberships can be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    name: String,
    kind: PrincipalKind,
    groups: Option<BTreeSet<String>>,
}

impl Principal {
    /// Creates a bare ordinary principal.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PrincipalKind::Ordinary,
            groups: None,
        }
    }

    /// Creates the system principal.
    pub fn system(name: impl Into<String>) -> Self {
        Self::new(name).with_kind(PrincipalKind::System)
    }

    /// Creates an administrator principal.
    pub fn administrator(name: impl Into<String>) -> Self {
        Self::new(name).with_kind(PrincipalKind::Administrator)
    }

    /// Sets the principal kind.
    pub fn with_kind(mut self, kind: PrincipalKind) -> Self {
        self.kind = kind;
        self
    }

    /// Marks the principal as resolved with the given group memberships.
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = Some(groups.into_iter().map(Into::into).collect());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PrincipalKind {
        self.kind
    }

    /// Group memberships, or `None` for a bare principal.
    pub fn groups(&self) -> Option<&BTreeSet<String>> {
        self.groups.as_ref()
    }

    /// Returns whether the group memberships of this principal are known.
    pub fn is_resolved(&self) -> bool {
        self.groups.is_some()
    }

    /// Membership test against the locally known groups.
    ///
    /// Returns `None` when the principal is bare and the answer must come
    /// from the oracle.
    pub fn is_member_of(&self, group: &str) -> Option<bool> {
        self.groups.as_ref().map(|g| g.contains(group))
    }
}

impl Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Failure of the external membership oracle.
///
/// The engine never guesses an outcome when the oracle fails: the error is
/// surfaced to the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// The identity service does not know this principal.
    #[error("unknown principal '{0}'")]
    UnknownPrincipal(String),

    /// The identity service could not be reached.
    #[error("membership oracle unavailable: {0}")]
    Unavailable(String),

    /// The identity service did not answer in time.
    #[error("membership oracle timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
}

/// Group membership lookups, provided by the host's identity service.
///
/// Calls are synchronous and side-effect free. Any caching belongs to the
/// implementation, not to the engine.
pub trait MembershipOracle: Send + Sync {
    /// Answers whether `principal` is a member of `group`.
    fn is_member_of(&self, principal: &str, group: &str) -> Result<bool, OracleError>;

    /// Resolves a bare principal name into a principal with known groups.
    fn resolve_principal(&self, name: &str) -> Result<Principal, OracleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_principal_has_unknown_memberships() {
        let p = Principal::new("user1");
        assert!(!p.is_resolved());
        assert_eq!(p.is_member_of("GROUP1"), None);
        assert_eq!(p.kind(), PrincipalKind::Ordinary);
    }

    #[test]
    fn test_resolved_principal_memberships() {
        let p = Principal::new("user1").with_groups(["GROUP1", "members"]);
        assert!(p.is_resolved());
        assert_eq!(p.is_member_of("GROUP1"), Some(true));
        assert_eq!(p.is_member_of("GROUP2"), Some(false));
    }

    #[test]
    fn test_privileged_kinds() {
        assert!(Principal::system("system").kind().is_privileged());
        assert!(Principal::administrator("Administrator").kind().is_privileged());
        assert!(!Principal::new("user1").kind().is_privileged());
    }
}
