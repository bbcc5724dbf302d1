//! # docward
//!
//! Document-level access policies for a content repository, enforced twice:
//!
//! - on **permission checks**, where each policy answers GRANT, DENY or
//!   UNKNOWN for one document and DENY vetoes everything else
//! - on **listing queries**, which are rewritten so that no listed document
//!   would be denied by a permission check
//!
//! Both faces are derived from one declarative policy list, so they cannot
//! drift apart.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Engine                             │
//! │  ┌──────────────┐   ┌───────────────┐   ┌─────────────────┐  │
//! │  │ EngineConfig │ → │  PolicyChain  │ ← │ MembershipOracle│  │
//! │  │ (bypass,     │   │ (decide +     │   │ (host identity  │  │
//! │  │  audit, ...) │   │  transform)   │   │  service)       │  │
//! │  └──────────────┘   └───────┬───────┘   └─────────────────┘  │
//! │                             │                                │
//! │                 ┌───────────┴───────────┐                    │
//! │                 ▼                       ▼                    │
//! │           Document (trait)        Query / Expr               │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use docward::{Engine, EngineConfig, PermissionRequest, Query};
//!
//! let engine = Engine::builder()
//!     .config(EngineConfig::load()?)
//!     .oracle(directory)
//!     .standard_policies()
//!     .build()?;
//!
//! let user = engine.principal("user1");
//! let decision = engine.decide(&doc, &user, &PermissionRequest::read())?;
//! let listing = engine.transform(&user, Query::all_documents())?;
//! ```
//!
//! # Modules
//!
//! - **Engine**: [`Engine`], [`EngineBuilder`]
//! - **Policies**: rules, decision tables, the chain (from `docward-policy`)
//! - **Queries**: expression tree and query model (from `docward-query`)
//! - **Configuration**: [`EngineConfig`] and its loader (from `docward-config`)

mod engine;
mod error;

pub use engine::{Engine, EngineBuilder};
pub use error::{DocwardError, Result};

// Re-export core types
pub use docward_types::{
    Decision, Document, MembershipOracle, OracleError, Principal, PrincipalKind, PropertyError,
    Value,
};

// Re-export the query model
pub use docward_query::{CompareOp, Expr, Literal, OrderBy, Query, QueryError, Reference};

// Re-export the policy engine
pub use docward_policy::{
    BypassPrincipals, ConfigurationError, DecisionTable, DocumentPolicy, FieldType,
    PermissionRequest, PolicyChain, PolicyError, PolicyShape, Rule, SchemaCatalog,
    StandardPolicies,
};

// Re-export configuration
pub use docward_config::{
    AuditConfig, BypassConfig, ConfigError, ConfigLoader, EngineConfig, MembershipConfig,
};
