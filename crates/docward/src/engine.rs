//! The `Engine` ties engine settings, a membership oracle and a policy list
//! into one shareable handle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use docward_config::EngineConfig;
use docward_policy::{
    BypassPrincipals, DocumentPolicy, PermissionRequest, PolicyChain, SchemaCatalog,
    StandardPolicies,
};
use docward_query::Query;
use docward_types::{Decision, Document, MembershipOracle, Principal};
use tracing::info;

use crate::error::{DocwardError, Result};

/// Builder for [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    oracle: Option<Arc<dyn MembershipOracle>>,
    policies: Vec<DocumentPolicy>,
    schema: Option<SchemaCatalog>,
}

impl EngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn oracle(mut self, oracle: Arc<dyn MembershipOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Appends a policy. Registration order is evaluation order.
    pub fn policy(mut self, policy: DocumentPolicy) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn policies(mut self, policies: impl IntoIterator<Item = DocumentPolicy>) -> Self {
        self.policies.extend(policies);
        self
    }

    /// Appends the five stock policies.
    pub fn standard_policies(self) -> Self {
        self.policies(StandardPolicies::all())
    }

    /// Checks every policy against a repository schema at build time.
    pub fn schema(mut self, schema: SchemaCatalog) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn build(self) -> Result<Engine> {
        self.config.validate()?;
        let oracle = self.oracle.ok_or(DocwardError::MissingOracle)?;

        let bypass = self
            .config
            .bypass
            .additional_administrators
            .iter()
            .fold(
                BypassPrincipals::new(
                    &self.config.bypass.system_principal,
                    &self.config.bypass.administrator_principal,
                ),
                |bypass, name| bypass.with_administrator(name),
            );

        let mut chain = PolicyChain::builder(oracle)
            .policies(self.policies)
            .with_bypass(bypass)
            .with_audit(self.config.audit.enabled)
            .use_additional_principals(self.config.membership.use_additional_principals);
        if let Some(schema) = self.schema {
            chain = chain.with_schema(schema);
        }
        let chain = chain.build()?;

        info!(
            policies = chain.policies().len(),
            audit = self.config.audit.enabled,
            query_expressible = chain.is_query_expressible(),
            "Document policy engine ready"
        );

        Ok(Engine {
            chain: Arc::new(chain),
            config: Arc::new(self.config),
        })
    }
}

/// A built policy engine. Cheap to clone and safe to share across threads.
///
/// ```ignore
/// let engine = Engine::builder()
///     .config(EngineConfig::load()?)
///     .oracle(directory)
///     .standard_policies()
///     .build()?;
///
/// let user = engine.principal("user1");
/// let decision = engine.decide(&doc, &user, &PermissionRequest::read())?;
/// let listing = engine.transform(&user, Query::all_documents())?;
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    chain: Arc<PolicyChain>,
    config: Arc<EngineConfig>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn chain(&self) -> &PolicyChain {
        &self.chain
    }

    /// A bare principal whose kind follows the configured bypass names.
    pub fn principal(&self, name: &str) -> Principal {
        Principal::new(name).with_kind(self.chain.bypass().classify(name))
    }

    pub fn decide<D: Document + ?Sized>(
        &self,
        doc: &D,
        principal: &Principal,
        request: &PermissionRequest,
    ) -> Result<Decision> {
        Ok(self.chain.decide(doc, principal, request)?)
    }

    pub fn decide_at<D: Document + ?Sized>(
        &self,
        doc: &D,
        principal: &Principal,
        request: &PermissionRequest,
        now: DateTime<Utc>,
    ) -> Result<Decision> {
        Ok(self.chain.decide_at(doc, principal, request, now)?)
    }

    pub fn transform(&self, principal: &Principal, query: Query) -> Result<Query> {
        Ok(self.chain.transform(principal, query)?)
    }

    pub fn transform_at(
        &self,
        principal: &Principal,
        query: Query,
        now: DateTime<Utc>,
    ) -> Result<Query> {
        Ok(self.chain.transform_at(principal, query, now)?)
    }

    /// Whether any policy can deny `permission`.
    pub fn is_restricting(&self, permission: &str) -> bool {
        self.chain.is_restricting(permission)
    }

    /// Whether listings reflect every policy.
    pub fn is_query_expressible(&self) -> bool {
        self.chain.is_query_expressible()
    }

    pub fn property_access_failures(&self) -> u64 {
        self.chain.property_access_failures()
    }
}
