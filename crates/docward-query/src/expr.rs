//! Filter expression tree.
//!
//! Expressions are built by the policy layer and attached to a query's WHERE
//! clause. The tree only knows references, literals, comparisons and boolean
//! combinators; it never interprets field semantics.

use std::cmp::Ordering;
use std::fmt::{self, Display};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Reference to the primary type pseudo-field.
pub const PRIMARY_TYPE: &str = "ecm:primaryType";

/// Reference to the lifecycle state pseudo-field.
pub const LIFECYCLE_STATE: &str = "ecm:currentLifeCycleState";

// ============================================================================
// Reference & literals
// ============================================================================

/// Left-hand side of a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reference {
    /// The document's primary type name.
    PrimaryType,
    /// The document's current lifecycle state.
    LifecycleState,
    /// A schema-qualified property, e.g. `dc:rights`.
    Field(String),
}

impl Reference {
    pub fn field(path: impl Into<String>) -> Self {
        Reference::Field(path.into())
    }

    /// The name this reference renders as.
    pub fn as_str(&self) -> &str {
        match self {
            Reference::PrimaryType => PRIMARY_TYPE,
            Reference::LifecycleState => LIFECYCLE_STATE,
            Reference::Field(path) => path,
        }
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Literal operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    String(String),
    /// Rendered at millisecond precision. Evaluation compares the full value,
    /// so query text and in-memory checks can differ for instants within the
    /// same millisecond.
    Date(DateTime<Utc>),
    Integer(i64),
    Boolean(bool),
}

impl Literal {
    pub fn string(s: impl Into<String>) -> Self {
        Literal::String(s.into())
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Date(d) => write!(
                f,
                "TIMESTAMP '{}'",
                d.to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
            Literal::Integer(n) => write!(f, "{n}"),
            Literal::Boolean(true) => f.write_str("TRUE"),
            Literal::Boolean(false) => f.write_str("FALSE"),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Integer(value)
    }
}

impl From<DateTime<Utc>> for Literal {
    fn from(value: DateTime<Utc>) -> Self {
        Literal::Date(value)
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// Equal (=)
    Eq,
    /// Not equal (<>)
    NotEq,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    LtEq,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    GtEq,
}

impl CompareOp {
    /// Returns the query-language spelling of this operator.
    pub fn to_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        }
    }

    /// Returns whether `lhs.cmp(rhs) == ordering` satisfies this operator.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::NotEq => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::LtEq => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::GtEq => ordering != Ordering::Less,
        }
    }
}

// ============================================================================
// Expression
// ============================================================================

/// A filter expression.
///
/// Prefer the folding constructors ([`Expr::and_all`], [`Expr::or_any`],
/// [`Expr::negate`]) over building `And`/`Or`/`Not` nodes by hand: they keep
/// the tree flat and eliminate boolean constants, which keeps rendered query
/// text stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// `reference op literal`
    Compare {
        reference: Reference,
        op: CompareOp,
        literal: Literal,
    },
    /// `reference IS NULL`
    IsNull(Reference),
    /// `reference IS NOT NULL`
    IsNotNull(Reference),
    /// `reference IN (literal, ...)`
    In {
        reference: Reference,
        literals: Vec<Literal>,
    },
    /// `reference NOT IN (literal, ...)`
    NotIn {
        reference: Reference,
        literals: Vec<Literal>,
    },
    /// Conjunction of all operands.
    And(Vec<Expr>),
    /// Disjunction of all operands.
    Or(Vec<Expr>),
    /// Negation.
    Not(Box<Expr>),
    /// Boolean constant.
    Constant(bool),
}

impl Expr {
    pub fn compare(reference: Reference, op: CompareOp, literal: impl Into<Literal>) -> Self {
        Expr::Compare {
            reference,
            op,
            literal: literal.into(),
        }
    }

    pub fn eq(reference: Reference, literal: impl Into<Literal>) -> Self {
        Self::compare(reference, CompareOp::Eq, literal)
    }

    pub fn not_eq(reference: Reference, literal: impl Into<Literal>) -> Self {
        Self::compare(reference, CompareOp::NotEq, literal)
    }

    pub fn lt(reference: Reference, literal: impl Into<Literal>) -> Self {
        Self::compare(reference, CompareOp::Lt, literal)
    }

    pub fn is_null(reference: Reference) -> Self {
        Expr::IsNull(reference)
    }

    pub fn is_not_null(reference: Reference) -> Self {
        Expr::IsNotNull(reference)
    }

    pub fn in_list<I, L>(reference: Reference, literals: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        Expr::In {
            reference,
            literals: literals.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_in_list<I, L>(reference: Reference, literals: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        Expr::NotIn {
            reference,
            literals: literals.into_iter().map(Into::into).collect(),
        }
    }

    /// Conjunction with constant folding and flattening.
    ///
    /// An empty conjunction is `TRUE`.
    pub fn and_all(exprs: impl IntoIterator<Item = Expr>) -> Self {
        let mut terms = Vec::new();
        for expr in exprs {
            match expr {
                Expr::Constant(true) => {}
                Expr::Constant(false) => return Expr::Constant(false),
                Expr::And(inner) => terms.extend(inner),
                other => terms.push(other),
            }
        }
        match terms.len() {
            0 => Expr::Constant(true),
            1 => terms.remove(0),
            _ => Expr::And(terms),
        }
    }

    /// Disjunction with constant folding and flattening.
    ///
    /// An empty disjunction is `FALSE`.
    pub fn or_any(exprs: impl IntoIterator<Item = Expr>) -> Self {
        let mut terms = Vec::new();
        for expr in exprs {
            match expr {
                Expr::Constant(false) => {}
                Expr::Constant(true) => return Expr::Constant(true),
                Expr::Or(inner) => terms.extend(inner),
                other => terms.push(other),
            }
        }
        match terms.len() {
            0 => Expr::Constant(false),
            1 => terms.remove(0),
            _ => Expr::Or(terms),
        }
    }

    /// Negation with constant folding and double-negation elimination.
    pub fn negate(expr: Expr) -> Self {
        match expr {
            Expr::Constant(b) => Expr::Constant(!b),
            Expr::Not(inner) => *inner,
            Expr::IsNull(r) => Expr::IsNotNull(r),
            Expr::IsNotNull(r) => Expr::IsNull(r),
            other => Expr::Not(Box::new(other)),
        }
    }

    /// `self AND other`, folded.
    pub fn and(self, other: Expr) -> Self {
        Self::and_all([self, other])
    }

    /// `self OR other`, folded.
    pub fn or(self, other: Expr) -> Self {
        Self::or_any([self, other])
    }

    /// Returns the value of a constant expression.
    pub fn as_constant(&self) -> Option<bool> {
        match self {
            Expr::Constant(b) => Some(*b),
            _ => None,
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare {
                reference,
                op,
                literal,
            } => write!(f, "{reference} {} {literal}", op.to_sql()),
            Expr::IsNull(r) => write!(f, "{r} IS NULL"),
            Expr::IsNotNull(r) => write!(f, "{r} IS NOT NULL"),
            Expr::In {
                reference,
                literals,
            } => write!(f, "{reference} IN ({})", join_literals(literals)),
            Expr::NotIn {
                reference,
                literals,
            } => write!(f, "{reference} NOT IN ({})", join_literals(literals)),
            Expr::And(terms) => write_joined(f, terms, " AND ", |e| matches!(e, Expr::Or(_))),
            Expr::Or(terms) => write_joined(f, terms, " OR ", |e| matches!(e, Expr::And(_))),
            Expr::Not(inner) => write!(f, "NOT ({inner})"),
            Expr::Constant(true) => f.write_str("TRUE"),
            Expr::Constant(false) => f.write_str("FALSE"),
        }
    }
}

fn join_literals(literals: &[Literal]) -> String {
    literals
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    terms: &[Expr],
    separator: &str,
    needs_parens: impl Fn(&Expr) -> bool,
) -> fmt::Result {
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        if needs_parens(term) {
            write!(f, "({term})")?;
        } else {
            write!(f, "{term}")?;
        }
    }
    Ok(())
}
