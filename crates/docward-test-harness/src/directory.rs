//! Static membership directory.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use docward_types::{MembershipOracle, OracleError, Principal};
use tracing::trace;

/// A [`MembershipOracle`] backed by a fixed user/group table.
///
/// Unknown users are members of nothing; resolving an unknown user fails with
/// [`OracleError::UnknownPrincipal`]. The directory can be switched into an
/// unavailable state to exercise oracle failure paths, and counts every call.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    users: BTreeMap<String, BTreeSet<String>>,
    unavailable: AtomicBool,
    membership_calls: AtomicUsize,
    resolve_calls: AtomicUsize,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user with the given groups, replacing any previous entry.
    pub fn with_user<I, S>(mut self, name: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users
            .insert(name.into(), groups.into_iter().map(Into::into).collect());
        self
    }

    /// Adds `user` to `group`, registering the user if needed.
    pub fn with_member(mut self, group: impl Into<String>, user: impl Into<String>) -> Self {
        self.users.entry(user.into()).or_default().insert(group.into());
        self
    }

    /// Makes every subsequent call fail with [`OracleError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn membership_calls(&self) -> usize {
        self.membership_calls.load(Ordering::SeqCst)
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), OracleError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OracleError::Unavailable(
                "static directory switched off".to_string(),
            ));
        }
        Ok(())
    }
}

impl MembershipOracle for StaticDirectory {
    fn is_member_of(&self, principal: &str, group: &str) -> Result<bool, OracleError> {
        self.membership_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let member = self
            .users
            .get(principal)
            .is_some_and(|groups| groups.contains(group));
        trace!(principal, group, member, "directory membership lookup");
        Ok(member)
    }

    fn resolve_principal(&self, name: &str) -> Result<Principal, OracleError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let groups = self
            .users
            .get(name)
            .ok_or_else(|| OracleError::UnknownPrincipal(name.to_string()))?;
        Ok(Principal::new(name).with_groups(groups.iter().cloned()))
    }
}
