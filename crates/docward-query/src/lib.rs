//! # docward-query: Filter expressions and listing queries
//!
//! This crate models the part of the repository query language that the
//! policy layer touches:
//!
//! - [`Expr`]: references (`ecm:primaryType`, `ecm:currentLifeCycleState`,
//!   schema fields), literals, comparisons, `IS [NOT] NULL`, `[NOT] IN`,
//!   `AND`/`OR`/`NOT` and boolean constants
//! - [`Query`]: `SELECT ... FROM ... WHERE ... GROUP BY ... HAVING ...
//!   ORDER BY ... LIMIT ... OFFSET ...`
//! - Deterministic text rendering (`Display`)
//! - Three-valued evaluation of an [`Expr`] against a
//!   [`Document`](docward_types::Document)
//! - A reference in-memory executor ([`execute`])
//!
//! ## Filter Injection
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  Original Query                      │
//! │  SELECT * FROM Document WHERE a = 1  │
//! └───────────────┬─────────────────────┘
//!                 │  Query::and_where(E)
//!                 ▼
//! ┌─────────────────────────────────────┐
//! │  Rewritten Query                     │
//! │  SELECT * FROM Document              │
//! │  WHERE a = 1 AND E                   │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use docward_query::{Expr, Query, Reference, execute};
//!
//! let query = Query::all_documents()
//!     .and_where(Expr::negate(Expr::eq(Reference::LifecycleState, "archived")));
//!
//! let ids = execute(&query, &documents)?;
//! ```

mod error;
mod eval;
mod executor;
mod expr;
mod query;

pub use error::{QueryError, Result};
pub use executor::execute;
pub use expr::{CompareOp, Expr, LIFECYCLE_STATE, Literal, PRIMARY_TYPE, Reference};
pub use query::{ALL_TYPES, OrderBy, Query};
