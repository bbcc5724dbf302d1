//! Rules: atomic conditions with a decision form and a query form.
//!
//! Every [`Rule`] has exactly two projections:
//!
//! - [`Rule::evaluate`] answers the condition for one document
//! - [`Rule::to_expression`] produces a filter that selects exactly the
//!   documents for which `evaluate` is `true`
//!
//! Document-side expressions are null-guarded (`f IS NOT NULL AND f op v`) so
//! they never evaluate to SQL *unknown*. That makes them safe to negate, which
//! denial-gate policies rely on.
//!
//! Membership rules cannot be pushed into the query engine as such. On the
//! query face they are resolved against the (resolved) principal at transform
//! time and fold into constants or value lists.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use docward_query::{Expr, Reference};
use docward_types::{Document, MembershipOracle, OracleError, Principal, PropertyError, Value};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::{ConfigurationError, Result};
use crate::schema::FieldType;

// ============================================================================
// Rule
// ============================================================================

/// A single condition over a document and the requesting principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Text field equals a value.
    FieldEquals { field: String, value: String },
    /// Text field is present and differs from a value.
    FieldNotEquals { field: String, value: String },
    /// Field has no value.
    FieldIsNull(String),
    /// Field has a value.
    FieldIsNotNull(String),
    /// Date field is strictly before the evaluation instant.
    FieldBeforeNow(String),
    /// Text field is one of a set of values.
    FieldIn {
        field: String,
        values: BTreeSet<String>,
    },
    /// Lifecycle state is present and equals a value.
    LifecycleStateEquals(String),
    /// Lifecycle state is present and differs from a value.
    LifecycleStateNotEquals(String),
    /// Document primary type equals a name.
    TypeNameEquals(String),
    /// The principal belongs to a group. Decision-only.
    MemberOf(String),
    /// The principal belongs to the group that the field's value maps to.
    /// Unmapped values never match. Decision-only.
    MemberOfGroupNamedBy {
        field: String,
        groups: BTreeMap<String, String>,
    },
    /// Every sub-rule holds. Empty is `true`.
    All(Vec<Rule>),
    /// At least one sub-rule holds. Empty is `false`.
    Any(Vec<Rule>),
    /// The sub-rule does not hold.
    Not(Box<Rule>),
}

impl Rule {
    pub fn field_equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Rule::FieldEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field_not_equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Rule::FieldNotEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field_in<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rule::FieldIn {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn member_of_group_named_by<I, K, G>(field: impl Into<String>, mapping: I) -> Self
    where
        I: IntoIterator<Item = (K, G)>,
        K: Into<String>,
        G: Into<String>,
    {
        Rule::MemberOfGroupNamedBy {
            field: field.into(),
            groups: mapping
                .into_iter()
                .map(|(k, g)| (k.into(), g.into()))
                .collect(),
        }
    }

    pub fn not(rule: Rule) -> Self {
        Rule::Not(Box::new(rule))
    }

    /// Evaluates the decision form against a document.
    ///
    /// Missing or unreadable properties make field rules `false` (except the
    /// null tests). Only membership rules can fail, with an oracle error.
    pub fn evaluate<D: Document + ?Sized>(&self, doc: &D, ctx: &RuleContext<'_>) -> Result<bool> {
        let hit = match self {
            Rule::FieldEquals { field, value } => {
                ctx.read_text(doc, field).is_some_and(|v| v == *value)
            }
            Rule::FieldNotEquals { field, value } => {
                ctx.read_text(doc, field).is_some_and(|v| v != *value)
            }
            Rule::FieldIsNull(field) => ctx.read(doc, field).is_none(),
            Rule::FieldIsNotNull(field) => ctx.read(doc, field).is_some(),
            Rule::FieldBeforeNow(field) => ctx.read_date(doc, field).is_some_and(|d| d < ctx.now),
            Rule::FieldIn { field, values } => {
                ctx.read_text(doc, field).is_some_and(|v| values.contains(&v))
            }
            Rule::LifecycleStateEquals(state) => doc.lifecycle_state() == Some(state.as_str()),
            Rule::LifecycleStateNotEquals(state) => doc
                .lifecycle_state()
                .is_some_and(|current| current != state),
            Rule::TypeNameEquals(name) => doc.type_name() == name,
            Rule::MemberOf(group) => ctx.is_member_of(group)?,
            Rule::MemberOfGroupNamedBy { field, groups } => {
                match ctx.read_text(doc, field).and_then(|v| groups.get(&v)) {
                    Some(group) => ctx.is_member_of(group)?,
                    None => false,
                }
            }
            Rule::All(rules) => {
                for rule in rules {
                    if !rule.evaluate(doc, ctx)? {
                        return Ok(false);
                    }
                }
                true
            }
            Rule::Any(rules) => {
                for rule in rules {
                    if rule.evaluate(doc, ctx)? {
                        return Ok(true);
                    }
                }
                false
            }
            Rule::Not(rule) => !rule.evaluate(doc, ctx)?,
        };
        Ok(hit)
    }

    /// Produces the query form.
    ///
    /// The result never evaluates to SQL unknown on any document.
    pub fn to_expression(&self, ctx: &QueryContext<'_>) -> Expr {
        match self {
            Rule::FieldEquals { field, value } => guarded(
                Reference::field(field.as_str()),
                Expr::eq(Reference::field(field.as_str()), value.as_str()),
            ),
            Rule::FieldNotEquals { field, value } => guarded(
                Reference::field(field.as_str()),
                Expr::not_eq(Reference::field(field.as_str()), value.as_str()),
            ),
            Rule::FieldIsNull(field) => Expr::is_null(Reference::field(field.as_str())),
            Rule::FieldIsNotNull(field) => Expr::is_not_null(Reference::field(field.as_str())),
            Rule::FieldBeforeNow(field) => guarded(
                Reference::field(field.as_str()),
                Expr::lt(Reference::field(field.as_str()), ctx.now),
            ),
            Rule::FieldIn { field, values } => value_set(field, values.iter().map(String::as_str)),
            Rule::LifecycleStateEquals(state) => guarded(
                Reference::LifecycleState,
                Expr::eq(Reference::LifecycleState, state.as_str()),
            ),
            Rule::LifecycleStateNotEquals(state) => guarded(
                Reference::LifecycleState,
                Expr::not_eq(Reference::LifecycleState, state.as_str()),
            ),
            Rule::TypeNameEquals(name) => Expr::eq(Reference::PrimaryType, name.as_str()),
            Rule::MemberOf(group) => Expr::Constant(ctx.is_member_of(group)),
            Rule::MemberOfGroupNamedBy { field, groups } => value_set(
                field,
                groups
                    .iter()
                    .filter(|(_, group)| ctx.is_member_of(group))
                    .map(|(value, _)| value.as_str()),
            ),
            Rule::All(rules) => Expr::and_all(rules.iter().map(|r| r.to_expression(ctx))),
            Rule::Any(rules) => Expr::or_any(rules.iter().map(|r| r.to_expression(ctx))),
            Rule::Not(rule) => Expr::negate(rule.to_expression(ctx)),
        }
    }

    /// Returns whether this rule consults group membership.
    pub fn is_decision_only(&self) -> bool {
        let mut found = false;
        self.walk(&mut |rule| {
            found |= matches!(rule, Rule::MemberOf(_) | Rule::MemberOfGroupNamedBy { .. });
        });
        found
    }

    /// Field paths this rule reads, with the type it reads them as
    /// (`None` for null tests, which accept any type).
    pub fn field_references(&self) -> Vec<(&str, Option<FieldType>)> {
        let mut out = Vec::new();
        self.walk(&mut |rule| match rule {
            Rule::FieldEquals { field, .. }
            | Rule::FieldNotEquals { field, .. }
            | Rule::FieldIn { field, .. }
            | Rule::MemberOfGroupNamedBy { field, .. } => {
                out.push((field.as_str(), Some(FieldType::Text)));
            }
            Rule::FieldBeforeNow(field) => out.push((field.as_str(), Some(FieldType::Date))),
            Rule::FieldIsNull(field) | Rule::FieldIsNotNull(field) => {
                out.push((field.as_str(), None));
            }
            _ => {}
        });
        out
    }

    /// Group names this rule may test membership of.
    pub fn group_references(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.walk(&mut |rule| match rule {
            Rule::MemberOf(group) => {
                out.insert(group.as_str());
            }
            Rule::MemberOfGroupNamedBy { groups, .. } => {
                out.extend(groups.values().map(String::as_str));
            }
            _ => {}
        });
        out
    }

    /// Document type names this rule compares against.
    pub fn type_references(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.walk(&mut |rule| {
            if let Rule::TypeNameEquals(name) = rule {
                out.insert(name.as_str());
            }
        });
        out
    }

    /// Structural checks that do not need a schema.
    pub fn validate(&self, policy: &str) -> std::result::Result<(), ConfigurationError> {
        let mut problem = None;
        self.walk(&mut |rule| {
            if problem.is_some() {
                return;
            }
            match rule {
                Rule::FieldIn { field, values } if values.is_empty() => {
                    problem = Some(ConfigurationError::EmptyValueSet {
                        policy: policy.to_string(),
                        field: field.clone(),
                    });
                }
                Rule::MemberOfGroupNamedBy { field, groups } if groups.is_empty() => {
                    problem = Some(ConfigurationError::EmptyGroupMapping {
                        policy: policy.to_string(),
                        field: field.clone(),
                    });
                }
                _ => {}
            }
        });
        problem.map_or(Ok(()), Err)
    }

    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Rule)) {
        visit(self);
        match self {
            Rule::All(rules) | Rule::Any(rules) => {
                for rule in rules {
                    rule.walk(visit);
                }
            }
            Rule::Not(rule) => rule.walk(visit),
            _ => {}
        }
    }
}

/// `reference IS NOT NULL AND comparison`
fn guarded(reference: Reference, comparison: Expr) -> Expr {
    Expr::and_all([Expr::is_not_null(reference), comparison])
}

/// `field IS NOT NULL AND field IN (values)`, or `FALSE` for no values.
fn value_set<'a>(field: &str, values: impl Iterator<Item = &'a str>) -> Expr {
    let values: Vec<&str> = values.collect();
    if values.is_empty() {
        return Expr::Constant(false);
    }
    guarded(
        Reference::field(field),
        Expr::in_list(Reference::field(field), values),
    )
}

// ============================================================================
// Evaluation contexts
// ============================================================================

/// Request-time state for the decision face.
pub struct RuleContext<'a> {
    principal: &'a Principal,
    oracle: &'a dyn MembershipOracle,
    additional_principals: &'a [String],
    now: DateTime<Utc>,
    bypass: bool,
    failures: Option<&'a AtomicU64>,
}

impl<'a> RuleContext<'a> {
    pub fn new(principal: &'a Principal, oracle: &'a dyn MembershipOracle, now: DateTime<Utc>) -> Self {
        Self {
            principal,
            oracle,
            additional_principals: &[],
            now,
            bypass: false,
            failures: None,
        }
    }

    /// Extra principals (typically groups) attached to the request. A group
    /// listed here counts as a membership of the requesting principal.
    pub fn with_additional_principals(mut self, additional: &'a [String]) -> Self {
        self.additional_principals = additional;
        self
    }

    /// Marks the principal as exempt from every policy.
    pub fn with_bypass(mut self, bypass: bool) -> Self {
        self.bypass = bypass;
        self
    }

    /// Counts property read failures into `counter`.
    pub fn with_failure_counter(mut self, counter: &'a AtomicU64) -> Self {
        self.failures = Some(counter);
        self
    }

    pub fn principal(&self) -> &Principal {
        self.principal
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    /// Membership test: request attachments, then known groups, then the oracle.
    pub fn is_member_of(&self, group: &str) -> std::result::Result<bool, OracleError> {
        if self.additional_principals.iter().any(|p| p == group) {
            return Ok(true);
        }
        if let Some(known) = self.principal.is_member_of(group) {
            return Ok(known);
        }
        self.oracle
            .is_member_of(self.principal.name(), group)
            .inspect_err(|e| {
                error!(
                    principal = %self.principal,
                    group = %group,
                    error = %e,
                    "Membership lookup failed"
                );
            })
    }

    fn read<D: Document + ?Sized>(&self, doc: &D, path: &str) -> Option<Value> {
        match doc.property(path) {
            Ok(value) => value,
            Err(e) => {
                self.record_failure(doc, &e);
                None
            }
        }
    }

    fn read_text<D: Document + ?Sized>(&self, doc: &D, path: &str) -> Option<String> {
        match self.read(doc, path)? {
            Value::Text(s) => Some(s),
            other => {
                self.record_mismatch(doc, path, "text", &other);
                None
            }
        }
    }

    fn read_date<D: Document + ?Sized>(&self, doc: &D, path: &str) -> Option<DateTime<Utc>> {
        match self.read(doc, path)? {
            Value::Date(d) => Some(d),
            other => {
                self.record_mismatch(doc, path, "date", &other);
                None
            }
        }
    }

    fn record_mismatch<D: Document + ?Sized>(
        &self,
        doc: &D,
        path: &str,
        expected: &'static str,
        found: &Value,
    ) {
        let err = PropertyError::TypeMismatch {
            path: path.to_string(),
            expected,
            found: found.kind(),
        };
        self.record_failure(doc, &err);
    }

    fn record_failure<D: Document + ?Sized>(&self, doc: &D, err: &PropertyError) {
        warn!(
            document = %doc.id(),
            error = %err,
            "Property access failed, treating as absent"
        );
        if let Some(counter) = self.failures {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Transform-time state for the query face.
///
/// Membership is answered from the principal's known groups only; a bare
/// principal is a member of nothing. Callers resolve principals before
/// building filters for membership rules.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    principal: &'a Principal,
    now: DateTime<Utc>,
    bypass: bool,
}

impl<'a> QueryContext<'a> {
    pub fn new(principal: &'a Principal, now: DateTime<Utc>) -> Self {
        Self {
            principal,
            now,
            bypass: false,
        }
    }

    pub fn with_bypass(mut self, bypass: bool) -> Self {
        self.bypass = bypass;
        self
    }

    pub fn principal(&self) -> &Principal {
        self.principal
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    pub fn is_member_of(&self, group: &str) -> bool {
        self.principal.is_member_of(group).unwrap_or(false)
    }
}
