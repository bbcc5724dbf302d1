//! Document policies.
//!
//! A policy is data: a type guard, an optional scope, a [`Rule`], a
//! [`PolicyShape`] and a [`DecisionTable`]. The same record drives the
//! permission face ([`DocumentPolicy::decide`]) and the query face
//! ([`DocumentPolicy::build_filter`]).
//!
//! ```text
//!   applicable = type_guard AND scope
//!
//!   decide:        not applicable        -> UNKNOWN
//!                  applicable, rule      -> table.on_true
//!                  applicable, not rule  -> table.on_false
//!
//!   build_filter:  denial gate  ->  applicable AND rule        (chain negates)
//!                  grant gate   ->  NOT applicable OR rule     (chain conjoins)
//! ```

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use docward_query::{Expr, Reference};
use docward_types::{Decision, Document};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Result};
use crate::rule::{QueryContext, Rule, RuleContext};

/// Maximum length of a policy name.
pub const MAX_POLICY_NAME_LENGTH: usize = 128;

// ============================================================================
// Decision table & shape
// ============================================================================

/// Maps a policy's boolean rule outcome to a [`Decision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTable {
    pub on_true: Decision,
    pub on_false: Decision,
}

impl DecisionTable {
    pub const fn new(on_true: Decision, on_false: Decision) -> Self {
        Self { on_true, on_false }
    }

    /// `true -> DENY`, `false -> UNKNOWN`.
    pub const fn deny_when_true() -> Self {
        Self::new(Decision::Deny, Decision::Unknown)
    }

    /// `true -> GRANT`, `false -> DENY`.
    pub const fn grant_or_deny() -> Self {
        Self::new(Decision::Grant, Decision::Deny)
    }

    pub fn map(self, outcome: bool) -> Decision {
        if outcome { self.on_true } else { self.on_false }
    }

    pub fn can_deny(self) -> bool {
        self.on_true.is_deny() || self.on_false.is_deny()
    }
}

impl Display for DecisionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{true -> {}, false -> {}}}", self.on_true, self.on_false)
    }
}

/// How a policy's filter combines into a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyShape {
    /// Rule `true` means the document violates the policy. The filter
    /// describes forbidden documents and the chain negates it.
    DenialGate,
    /// Rule `false` means the principal lacks access. The filter describes
    /// visible documents and the chain conjoins it as is.
    GrantGate,
}

impl PolicyShape {
    pub fn name(self) -> &'static str {
        match self {
            PolicyShape::DenialGate => "denial gate",
            PolicyShape::GrantGate => "grant gate",
        }
    }

    /// Returns whether `table` has exactly the one DENY outcome this shape
    /// can express as a filter.
    pub fn accepts(self, table: DecisionTable) -> bool {
        match self {
            PolicyShape::DenialGate => table.on_true.is_deny() && !table.on_false.is_deny(),
            PolicyShape::GrantGate => table.on_false.is_deny() && !table.on_true.is_deny(),
        }
    }
}

// ============================================================================
// Document policy
// ============================================================================

/// One named access rule with a decision face and a query face.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPolicy {
    /// Unique name within a chain.
    pub name: String,

    /// Only documents of this primary type are governed. `None` governs all.
    pub type_guard: Option<String>,

    /// Additional applicability condition. Outside it the policy says UNKNOWN.
    pub scope: Option<Rule>,

    /// The condition mapped through `table`.
    pub rule: Rule,

    pub shape: PolicyShape,

    pub table: DecisionTable,

    /// Permissions this policy restricts. `None` restricts every permission.
    pub permissions: Option<BTreeSet<String>>,

    /// Whether the query face applies this policy.
    pub expressible_in_query: bool,
}

impl DocumentPolicy {
    fn with_shape(name: impl Into<String>, rule: Rule, shape: PolicyShape, table: DecisionTable) -> Self {
        Self {
            name: name.into(),
            type_guard: None,
            scope: None,
            rule,
            shape,
            table,
            permissions: None,
            expressible_in_query: true,
        }
    }

    /// A policy that denies when `rule` holds and has no opinion otherwise.
    pub fn denial_gate(name: impl Into<String>, rule: Rule) -> Self {
        Self::with_shape(name, rule, PolicyShape::DenialGate, DecisionTable::deny_when_true())
    }

    /// A policy that grants when `rule` holds and denies otherwise.
    pub fn grant_gate(name: impl Into<String>, rule: Rule) -> Self {
        Self::with_shape(name, rule, PolicyShape::GrantGate, DecisionTable::grant_or_deny())
    }

    /// Restricts the policy to documents of one primary type.
    pub fn for_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_guard = Some(type_name.into());
        self
    }

    /// Restricts the policy to documents matching `scope`.
    pub fn within(mut self, scope: Rule) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Replaces the decision table. Must still fit the shape.
    pub fn with_table(mut self, table: DecisionTable) -> Self {
        self.table = table;
        self
    }

    /// Adds a permission to the set this policy restricts.
    pub fn for_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions
            .get_or_insert_with(BTreeSet::new)
            .insert(permission.into());
        self
    }

    /// Keeps this policy off the query face.
    pub fn decision_only(mut self) -> Self {
        self.expressible_in_query = false;
        self
    }

    /// Returns whether this policy restricts `permission`.
    pub fn is_restricting(&self, permission: &str) -> bool {
        self.table.can_deny()
            && self
                .permissions
                .as_ref()
                .is_none_or(|set| set.contains(permission))
    }

    /// Returns whether this policy takes part in a check for any of the
    /// given permissions.
    pub fn governs<'p>(&self, mut permissions: impl Iterator<Item = &'p str>) -> bool {
        match &self.permissions {
            None => true,
            Some(set) => permissions.any(|p| set.contains(p)),
        }
    }

    /// Returns whether this policy consults group membership.
    pub fn requires_membership(&self) -> bool {
        self.rule.is_decision_only() || self.scope.as_ref().is_some_and(Rule::is_decision_only)
    }

    /// Returns whether the type guard and scope select `doc`.
    pub fn applies_to<D: Document + ?Sized>(&self, doc: &D, ctx: &RuleContext<'_>) -> Result<bool> {
        if let Some(guard) = &self.type_guard
            && doc.type_name() != guard
        {
            return Ok(false);
        }
        match &self.scope {
            Some(scope) => scope.evaluate(doc, ctx),
            None => Ok(true),
        }
    }

    /// The permission face.
    pub fn decide<D: Document + ?Sized>(&self, doc: &D, ctx: &RuleContext<'_>) -> Result<Decision> {
        if ctx.is_bypassed() || !self.applies_to(doc, ctx)? {
            return Ok(Decision::Unknown);
        }
        let outcome = self.rule.evaluate(doc, ctx)?;
        Ok(self.table.map(outcome))
    }

    /// `type_guard AND scope` in query form.
    pub fn applicability_expression(&self, ctx: &QueryContext<'_>) -> Expr {
        let guard = self
            .type_guard
            .as_ref()
            .map(|t| Expr::eq(Reference::PrimaryType, t.as_str()));
        let scope = self.scope.as_ref().map(|s| s.to_expression(ctx));
        Expr::and_all(guard.into_iter().chain(scope))
    }

    /// The query face.
    ///
    /// Denial gates return the forbidden set, grant gates the visible set.
    /// Returns `None` when the policy cannot affect this principal's listing.
    pub fn build_filter(&self, ctx: &QueryContext<'_>) -> Option<Expr> {
        if ctx.is_bypassed() {
            return None;
        }
        let applicable = self.applicability_expression(ctx);
        let rule = self.rule.to_expression(ctx);
        let filter = match self.shape {
            PolicyShape::DenialGate => Expr::and_all([applicable, rule]),
            PolicyShape::GrantGate => Expr::or_any([Expr::negate(applicable), rule]),
        };
        let no_op = match self.shape {
            PolicyShape::DenialGate => false,
            PolicyShape::GrantGate => true,
        };
        if filter.as_constant() == Some(no_op) {
            None
        } else {
            Some(filter)
        }
    }

    /// Checks name, decision table and rule structure.
    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        if self.name.is_empty() {
            return Err(ConfigurationError::EmptyPolicyName);
        }
        if self.name.chars().count() > MAX_POLICY_NAME_LENGTH {
            return Err(ConfigurationError::PolicyNameTooLong {
                name: self.name.clone(),
                max: MAX_POLICY_NAME_LENGTH,
            });
        }
        if !self.shape.accepts(self.table) {
            return Err(ConfigurationError::DecisionTableMismatch {
                policy: self.name.clone(),
                shape: self.shape.name(),
                table: self.table.to_string(),
            });
        }
        if let Some(scope) = &self.scope {
            scope.validate(&self.name)?;
        }
        self.rule.validate(&self.name)
    }
}

// ============================================================================
// Standard policies
// ============================================================================

/// Group whose members may read ITAR-controlled files.
pub const ITAR_READERS_GROUP: &str = "itar_readers";

/// Yes/No field marking a file as ITAR-controlled.
pub const ITAR_FIELD: &str = "ITAR:ITAR_doc";

/// Expiry date field.
pub const DC_EXPIRED_FIELD: &str = "dc:expired";

/// Rights field naming the group allowed to read a document.
pub const DC_RIGHTS_FIELD: &str = "dc:rights";

pub const RIGHTS_DEFAULT: &str = "DEFAULT";
pub const RIGHTS_GROUP1: &str = "GROUP1";
pub const RIGHTS_GROUP2: &str = "GROUP2";
pub const RIGHTS_GROUP3: &str = "GROUP3";

/// The stock document policies.
pub struct StandardPolicies;

impl StandardPolicies {
    /// Denies `File` documents with `ITAR:ITAR_doc = 'Yes'` to principals
    /// outside `itar_readers`.
    pub fn no_itar() -> DocumentPolicy {
        DocumentPolicy::denial_gate(
            "no-itar",
            Rule::All(vec![
                Rule::field_equals(ITAR_FIELD, "Yes"),
                Rule::not(Rule::MemberOf(ITAR_READERS_GROUP.to_string())),
            ]),
        )
        .for_type("File")
    }

    /// Denies `CustomFile` documents whose lifecycle state is set and is
    /// not `archived`.
    pub fn archived() -> DocumentPolicy {
        DocumentPolicy::denial_gate(
            "archived",
            Rule::LifecycleStateNotEquals("archived".to_string()),
        )
        .for_type("CustomFile")
    }

    /// Denies documents whose lifecycle state is set and is not `approved`.
    pub fn lifecycle_approved() -> DocumentPolicy {
        DocumentPolicy::denial_gate(
            "lifecycle-approved",
            Rule::LifecycleStateNotEquals("approved".to_string()),
        )
    }

    /// Denies documents whose `dc:expired` date has passed.
    pub fn dc_expired() -> DocumentPolicy {
        DocumentPolicy::denial_gate("dc-expired", Rule::FieldBeforeNow(DC_EXPIRED_FIELD.to_string()))
    }

    /// Grants documents carrying a known `dc:rights` value to members of the
    /// mapped group and denies everyone else. Other values, and documents
    /// without rights, are left to the base ACL.
    ///
    /// | dc:rights | group  |
    /// |-----------|--------|
    /// | DEFAULT   | GROUP1 |
    /// | GROUP1    | GROUP1 |
    /// | GROUP2    | GROUP2 |
    /// | GROUP3    | GROUP3 |
    pub fn dc_rights() -> DocumentPolicy {
        let mapping = [
            (RIGHTS_DEFAULT, RIGHTS_GROUP1),
            (RIGHTS_GROUP1, RIGHTS_GROUP1),
            (RIGHTS_GROUP2, RIGHTS_GROUP2),
            (RIGHTS_GROUP3, RIGHTS_GROUP3),
        ];
        DocumentPolicy::grant_gate(
            "dc-rights",
            Rule::member_of_group_named_by(DC_RIGHTS_FIELD, mapping),
        )
        .within(Rule::field_in(
            DC_RIGHTS_FIELD,
            mapping.iter().map(|(value, _)| *value),
        ))
    }

    /// All standard policies, in registration order.
    pub fn all() -> Vec<DocumentPolicy> {
        vec![
            Self::no_itar(),
            Self::archived(),
            Self::lifecycle_approved(),
            Self::dc_expired(),
            Self::dc_rights(),
        ]
    }
}
