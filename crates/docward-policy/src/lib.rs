//! # docward-policy: Dual-enforcement document policies
//!
//! Enforces document-level access rules through two paths that must agree:
//!
//! - **Permission check**: per document, a chain of policies decides
//!   GRANT / DENY / UNKNOWN
//! - **Query transform**: listing queries are rewritten so that documents the
//!   permission check would DENY never appear in results
//!
//! Both paths are driven by the same [`Rule`] values. Each rule has one
//! boolean evaluator and one expression producer, and the two are kept
//! equivalent (see the property tests under `tests/`).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐      ┌──────────────────────────┐
//! │  decide(doc, principal)  │      │  transform(principal, q) │
//! └────────────┬─────────────┘      └────────────┬─────────────┘
//!              │                                 │
//!              ▼                                 ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  PolicyChain                                                │
//! │  ├─ Bypass (system / administrator)                         │
//! │  ├─ Permission scoping                                      │
//! │  └─ DocumentPolicy × N                                      │
//! │       type guard + scope + Rule + shape + decision table    │
//! └────────────┬─────────────────────────────────┬──────────────┘
//!              │                                 │
//!              ▼                                 ▼
//!   DENY sticky, GRANT recorded     WHERE P0 AND NOT deny₁ AND grant₂ ...
//! ```
//!
//! ## Examples
//!
//! ```ignore
//! use std::sync::Arc;
//! use docward_policy::{PermissionRequest, PolicyChain, StandardPolicies};
//! use docward_query::Query;
//! use docward_types::Principal;
//!
//! let chain = PolicyChain::builder(oracle)
//!     .policies(StandardPolicies::all())
//!     .build()?;
//!
//! let decision = chain.decide(&doc, &Principal::new("user1"), &PermissionRequest::read())?;
//! let listing = chain.transform(&Principal::new("user1"), Query::all_documents())?;
//! ```

pub mod bypass;
pub mod enforcement;
mod error;
pub mod permissions;
pub mod policy;
pub mod rule;
pub mod schema;

pub use bypass::BypassPrincipals;
pub use enforcement::{MAX_POLICIES_PER_CHAIN, PolicyChain, PolicyChainBuilder};
pub use error::{ConfigurationError, PolicyError, Result};
pub use permissions::PermissionRequest;
pub use policy::{
    DecisionTable, DocumentPolicy, MAX_POLICY_NAME_LENGTH, PolicyShape, StandardPolicies,
};
pub use rule::{QueryContext, Rule, RuleContext};
pub use schema::{FieldType, SchemaCatalog};
