//! Policy chain enforcement.
//!
//! Applies an ordered list of policies on both faces:
//!
//! - **Permission face** ([`PolicyChain::decide`]): DENY is sticky and ends
//!   the walk, GRANT is recorded, UNKNOWN changes nothing.
//! - **Query face** ([`PolicyChain::transform`]): every governing policy
//!   contributes a filter term, conjoined in registration order onto the
//!   query's WHERE clause.
//!
//! Privileged principals bypass both faces.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use docward_query::{Expr, Query};
use docward_types::{Decision, Document, MembershipOracle, Principal};
use tracing::{debug, error, info, warn};

use crate::bypass::BypassPrincipals;
use crate::error::{ConfigurationError, PolicyError, Result};
use crate::permissions::{BROWSE, PermissionRequest};
use crate::policy::{DocumentPolicy, PolicyShape};
use crate::rule::{QueryContext, RuleContext};
use crate::schema::SchemaCatalog;

/// Maximum number of policies in one chain.
pub const MAX_POLICIES_PER_CHAIN: usize = 256;

// ============================================================================
// Builder
// ============================================================================

/// Collects policies and settings for a [`PolicyChain`].
pub struct PolicyChainBuilder {
    oracle: Arc<dyn MembershipOracle>,
    policies: Vec<DocumentPolicy>,
    bypass: BypassPrincipals,
    schema: Option<SchemaCatalog>,
    audit_enabled: bool,
    use_additional_principals: bool,
    query_permission: String,
}

impl PolicyChainBuilder {
    /// Appends a policy. Registration order is evaluation order.
    pub fn policy(mut self, policy: DocumentPolicy) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn policies(mut self, policies: impl IntoIterator<Item = DocumentPolicy>) -> Self {
        self.policies.extend(policies);
        self
    }

    pub fn with_bypass(mut self, bypass: BypassPrincipals) -> Self {
        self.bypass = bypass;
        self
    }

    /// Validates every policy against `schema` at build time.
    pub fn with_schema(mut self, schema: SchemaCatalog) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Disables audit logging (for testing).
    pub fn without_audit(mut self) -> Self {
        self.audit_enabled = false;
        self
    }

    pub fn with_audit(mut self, enabled: bool) -> Self {
        self.audit_enabled = enabled;
        self
    }

    /// Whether a request's additional principals count as group memberships.
    /// Off by default.
    ///
    /// Only permission checks carry additional principals. With this enabled,
    /// a check may return UNKNOWN for a document that listings still hide.
    pub fn use_additional_principals(mut self, enabled: bool) -> Self {
        self.use_additional_principals = enabled;
        self
    }

    /// Permission that listing queries are filtered for. Defaults to `Browse`.
    pub fn query_permission(mut self, permission: impl Into<String>) -> Self {
        self.query_permission = permission.into();
        self
    }

    /// Validates the configuration and builds the chain.
    pub fn build(self) -> std::result::Result<PolicyChain, ConfigurationError> {
        if self.policies.len() > MAX_POLICIES_PER_CHAIN {
            return Err(ConfigurationError::TooManyPolicies {
                count: self.policies.len(),
                max: MAX_POLICIES_PER_CHAIN,
            });
        }

        let mut names = BTreeSet::new();
        for policy in &self.policies {
            policy.validate()?;
            if !names.insert(policy.name.as_str()) {
                return Err(ConfigurationError::DuplicatePolicy(policy.name.clone()));
            }
            if let Some(schema) = &self.schema {
                schema.validate(policy)?;
            }
        }

        for policy in self.policies.iter().filter(|p| !p.expressible_in_query) {
            warn!(
                policy = %policy.name,
                "Policy is decision-only; listings will not reflect it"
            );
        }

        let requires_membership = self.policies.iter().any(DocumentPolicy::requires_membership);

        Ok(PolicyChain {
            policies: self.policies,
            oracle: self.oracle,
            bypass: self.bypass,
            audit_enabled: self.audit_enabled,
            use_additional_principals: self.use_additional_principals,
            query_permission: self.query_permission,
            requires_membership,
            property_failures: AtomicU64::new(0),
        })
    }
}

// ============================================================================
// Chain
// ============================================================================

/// An ordered, immutable list of policies plus the oracle they consult.
///
/// Safe to share across threads: the only mutable state is an atomic counter
/// of property read failures.
pub struct PolicyChain {
    policies: Vec<DocumentPolicy>,
    oracle: Arc<dyn MembershipOracle>,
    bypass: BypassPrincipals,
    audit_enabled: bool,
    use_additional_principals: bool,
    query_permission: String,
    requires_membership: bool,
    property_failures: AtomicU64,
}

impl fmt::Debug for PolicyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyChain")
            .field("policies", &self.policies)
            .field("bypass", &self.bypass)
            .field("audit_enabled", &self.audit_enabled)
            .field("query_permission", &self.query_permission)
            .finish_non_exhaustive()
    }
}

impl PolicyChain {
    pub fn builder(oracle: Arc<dyn MembershipOracle>) -> PolicyChainBuilder {
        PolicyChainBuilder {
            oracle,
            policies: Vec::new(),
            bypass: BypassPrincipals::default(),
            schema: None,
            audit_enabled: true,
            use_additional_principals: false,
            query_permission: BROWSE.to_string(),
        }
    }

    pub fn policies(&self) -> &[DocumentPolicy] {
        &self.policies
    }

    pub fn bypass(&self) -> &BypassPrincipals {
        &self.bypass
    }

    /// Number of property reads that failed or had the wrong type.
    pub fn property_access_failures(&self) -> u64 {
        self.property_failures.load(Ordering::Relaxed)
    }

    /// Returns whether any policy can deny `permission`.
    pub fn is_restricting(&self, permission: &str) -> bool {
        self.policies.iter().any(|p| p.is_restricting(permission))
    }

    /// Returns whether every policy is reflected in rewritten queries.
    pub fn is_query_expressible(&self) -> bool {
        self.policies.iter().all(|p| p.expressible_in_query)
    }

    /// Decides a permission check at the current instant.
    pub fn decide<D: Document + ?Sized>(
        &self,
        doc: &D,
        principal: &Principal,
        request: &PermissionRequest,
    ) -> Result<Decision> {
        self.decide_at(doc, principal, request, Utc::now())
    }

    /// Decides a permission check as of `now`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Oracle`] when a membership lookup fails. No
    /// decision is guessed in that case.
    pub fn decide_at<D: Document + ?Sized>(
        &self,
        doc: &D,
        principal: &Principal,
        request: &PermissionRequest,
        now: DateTime<Utc>,
    ) -> Result<Decision> {
        if self.bypass.is_bypass(principal) {
            if self.audit_enabled {
                debug!(
                    document = %doc.id(),
                    principal = %principal,
                    permission = %request.permission(),
                    "Privileged principal bypasses document policies"
                );
            }
            return Ok(Decision::Unknown);
        }

        let additional: &[String] = if self.use_additional_principals {
            request.additional_principals()
        } else {
            &[]
        };
        let ctx = RuleContext::new(principal, self.oracle.as_ref(), now)
            .with_additional_principals(additional)
            .with_failure_counter(&self.property_failures);

        let mut result = Decision::Unknown;
        for policy in &self.policies {
            if !policy.governs(request.all_permissions()) {
                continue;
            }
            let decision = policy.decide(doc, &ctx)?;
            if decision.is_deny() {
                if self.audit_enabled {
                    warn!(
                        document = %doc.id(),
                        principal = %principal,
                        permission = %request.permission(),
                        policy = %policy.name,
                        "Document access denied by policy"
                    );
                }
                return Ok(Decision::Deny);
            }
            result = result.combine(decision);
        }

        if self.audit_enabled {
            debug!(
                document = %doc.id(),
                principal = %principal,
                permission = %request.permission(),
                decision = ?result,
                "Document policies evaluated"
            );
        }
        Ok(result)
    }

    /// Rewrites a listing query at the current instant.
    pub fn transform(&self, principal: &Principal, query: Query) -> Result<Query> {
        self.transform_at(principal, query, Utc::now())
    }

    /// Rewrites a listing query so it selects only documents `principal` may
    /// see, with date rules evaluated as of `now`.
    ///
    /// # Errors
    ///
    /// Any oracle failure while resolving the principal aborts the whole
    /// transform. A partially filtered query is never returned.
    pub fn transform_at(
        &self,
        principal: &Principal,
        query: Query,
        now: DateTime<Utc>,
    ) -> Result<Query> {
        if self.bypass.is_bypass(principal) {
            return Ok(query);
        }

        let principal = self.resolve_for_query(principal)?;

        let ctx = QueryContext::new(&principal, now);
        let mut terms = Vec::new();
        for policy in &self.policies {
            if !policy.governs(std::iter::once(self.query_permission.as_str())) {
                continue;
            }
            if !policy.expressible_in_query {
                warn!(
                    policy = %policy.name,
                    principal = %principal,
                    "Skipping decision-only policy in query transform"
                );
                continue;
            }
            if let Some(filter) = policy.build_filter(&ctx) {
                terms.push(match policy.shape {
                    PolicyShape::DenialGate => Expr::negate(filter),
                    PolicyShape::GrantGate => filter,
                });
            }
        }

        if terms.is_empty() {
            return Ok(query);
        }

        let filter = Expr::and_all(terms);
        if self.audit_enabled {
            info!(
                principal = %principal,
                filter = %filter,
                "Injecting document policy filter"
            );
        }
        Ok(query.and_where(filter))
    }

    /// Resolves a bare principal through the oracle when any policy needs
    /// group memberships on the query face.
    fn resolve_for_query<'p>(&self, principal: &'p Principal) -> Result<Cow<'p, Principal>> {
        if principal.is_resolved() || !self.requires_membership {
            return Ok(Cow::Borrowed(principal));
        }

        let resolved = self
            .oracle
            .resolve_principal(principal.name())
            .inspect_err(|e| {
                error!(
                    principal = %principal,
                    error = %e,
                    "Principal resolution failed, aborting query transform"
                );
            })?;

        if !resolved.is_resolved() {
            return Err(PolicyError::UnresolvedPrincipal(principal.name().to_string()));
        }

        // bypass status comes from the caller only, as on the permission face
        Ok(Cow::Owned(resolved.with_kind(principal.kind())))
    }
}
