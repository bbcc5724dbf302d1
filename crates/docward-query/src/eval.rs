//! Three-valued evaluation of filter expressions.
//!
//! Follows SQL NULL semantics: a comparison against a missing value is
//! *unknown* (`None`), and `AND`/`OR`/`NOT` combine per Kleene logic. A row is
//! selected only when its filter evaluates to `Some(true)`.
//!
//! A comparison between values of incompatible types (a text property against
//! a date literal, say) is `Some(false)` rather than unknown. Property read
//! failures evaluate as NULL.

use std::cmp::Ordering;

use docward_types::{Document, Value};

use crate::expr::{Expr, Literal, Reference};

impl Expr {
    /// Evaluates this expression against a document.
    pub fn evaluate<D: Document + ?Sized>(&self, doc: &D) -> Option<bool> {
        match self {
            Expr::Compare {
                reference,
                op,
                literal,
            } => {
                let value = resolve(reference, doc)?;
                Some(compare(&value, literal).is_some_and(|ord| op.holds(ord)))
            }
            Expr::IsNull(reference) => Some(resolve(reference, doc).is_none()),
            Expr::IsNotNull(reference) => Some(resolve(reference, doc).is_some()),
            Expr::In {
                reference,
                literals,
            } => {
                let value = resolve(reference, doc)?;
                Some(contains(&value, literals))
            }
            Expr::NotIn {
                reference,
                literals,
            } => {
                let value = resolve(reference, doc)?;
                Some(!contains(&value, literals))
            }
            Expr::And(terms) => {
                let mut result = Some(true);
                for term in terms {
                    match term.evaluate(doc) {
                        Some(false) => return Some(false),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                result
            }
            Expr::Or(terms) => {
                let mut result = Some(false);
                for term in terms {
                    match term.evaluate(doc) {
                        Some(true) => return Some(true),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                result
            }
            Expr::Not(inner) => inner.evaluate(doc).map(|b| !b),
            Expr::Constant(b) => Some(*b),
        }
    }

    /// Returns whether a row with this filter would be selected.
    pub fn selects<D: Document + ?Sized>(&self, doc: &D) -> bool {
        self.evaluate(doc) == Some(true)
    }
}

/// Reads the value a reference points at, treating read errors as NULL.
pub(crate) fn resolve<D: Document + ?Sized>(reference: &Reference, doc: &D) -> Option<Value> {
    match reference {
        Reference::PrimaryType => Some(Value::Text(doc.type_name().to_string())),
        Reference::LifecycleState => doc.lifecycle_state().map(|s| Value::Text(s.to_string())),
        Reference::Field(path) => doc.property(path).ok().flatten(),
    }
}

/// Orders a value against a literal, or `None` when the types are incompatible.
fn compare(value: &Value, literal: &Literal) -> Option<Ordering> {
    match (value, literal) {
        (Value::Text(a), Literal::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::Date(a), Literal::Date(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn contains(value: &Value, literals: &[Literal]) -> bool {
    literals
        .iter()
        .any(|lit| compare(value, lit) == Some(Ordering::Equal))
}

/// Total order over optional values used by `ORDER BY`: NULL first, then text,
/// then dates.
pub(crate) fn order_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Text(_)) => 1,
            Some(Value::Date(_)) => 2,
        }
    }
    match (a, b) {
        (Some(Value::Text(x)), Some(Value::Text(y))) => x.cmp(y),
        (Some(Value::Date(x)), Some(Value::Date(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use docward_types::PropertyError;
    use std::collections::BTreeMap;

    struct Doc {
        type_name: &'static str,
        lifecycle: Option<&'static str>,
        props: BTreeMap<&'static str, Value>,
        broken: Option<&'static str>,
    }

    impl Doc {
        fn new(type_name: &'static str) -> Self {
            Self {
                type_name,
                lifecycle: None,
                props: BTreeMap::new(),
                broken: None,
            }
        }

        fn with(mut self, path: &'static str, value: impl Into<Value>) -> Self {
            self.props.insert(path, value.into());
            self
        }
    }

    impl Document for Doc {
        fn id(&self) -> &str {
            "doc"
        }

        fn type_name(&self) -> &str {
            self.type_name
        }

        fn lifecycle_state(&self) -> Option<&str> {
            self.lifecycle
        }

        fn property(&self, path: &str) -> Result<Option<Value>, PropertyError> {
            if self.broken == Some(path) {
                return Err(PropertyError::Backend {
                    path: path.to_string(),
                    reason: "disk on fire".to_string(),
                });
            }
            Ok(self.props.get(path).cloned())
        }
    }

    fn jan(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_compare_against_null_is_unknown() {
        let doc = Doc::new("File");
        let e = Expr::eq(Reference::field("dc:rights"), "GROUP1");
        assert_eq!(e.evaluate(&doc), None);
        assert_eq!(Expr::negate(e).evaluate(&doc), None);
    }

    #[test]
    fn test_null_checks_are_two_valued() {
        let doc = Doc::new("File").with("dc:rights", "GROUP1");
        assert_eq!(Expr::is_null(Reference::field("dc:rights")).evaluate(&doc), Some(false));
        assert_eq!(Expr::is_null(Reference::field("dc:title")).evaluate(&doc), Some(true));
        assert_eq!(
            Expr::is_not_null(Reference::LifecycleState).evaluate(&doc),
            Some(false)
        );
    }

    #[test]
    fn test_kleene_connectives() {
        let doc = Doc::new("File").with("a", "x");
        let t = Expr::eq(Reference::field("a"), "x");
        let f = Expr::eq(Reference::field("a"), "y");
        let u = Expr::eq(Reference::field("missing"), "y");

        assert_eq!(Expr::And(vec![t.clone(), u.clone()]).evaluate(&doc), None);
        assert_eq!(Expr::And(vec![f.clone(), u.clone()]).evaluate(&doc), Some(false));
        assert_eq!(Expr::Or(vec![t.clone(), u.clone()]).evaluate(&doc), Some(true));
        assert_eq!(Expr::Or(vec![f, u.clone()]).evaluate(&doc), None);
        assert_eq!(Expr::Not(Box::new(t)).evaluate(&doc), Some(false));
    }

    #[test]
    fn test_date_comparison() {
        let doc = Doc::new("File").with("dc:expired", jan(3));
        let before = Expr::lt(Reference::field("dc:expired"), jan(8));
        let after = Expr::lt(Reference::field("dc:expired"), jan(2));
        assert!(before.selects(&doc));
        assert!(!after.selects(&doc));
    }

    #[test]
    fn test_incompatible_types_compare_false() {
        let doc = Doc::new("File").with("dc:expired", "soon");
        let e = Expr::lt(Reference::field("dc:expired"), jan(8));
        assert_eq!(e.evaluate(&doc), Some(false));
        let e = Expr::eq(Reference::field("dc:expired"), 3_i64);
        assert_eq!(e.evaluate(&doc), Some(false));
    }

    #[test]
    fn test_in_and_not_in() {
        let doc = Doc::new("File").with("dc:rights", "GROUP2");
        let values = ["GROUP1", "GROUP2"];
        assert!(Expr::in_list(Reference::field("dc:rights"), values).selects(&doc));
        assert!(!Expr::not_in_list(Reference::field("dc:rights"), values).selects(&doc));

        let empty = Doc::new("File");
        assert_eq!(
            Expr::in_list(Reference::field("dc:rights"), values).evaluate(&empty),
            None
        );
    }

    #[test]
    fn test_primary_type_and_lifecycle() {
        let mut doc = Doc::new("CustomFile");
        doc.lifecycle = Some("archived");
        assert!(Expr::eq(Reference::PrimaryType, "CustomFile").selects(&doc));
        assert!(Expr::eq(Reference::LifecycleState, "archived").selects(&doc));
        assert!(!Expr::not_eq(Reference::LifecycleState, "archived").selects(&doc));
    }

    #[test]
    fn test_read_errors_evaluate_as_null() {
        let mut doc = Doc::new("File").with("ITAR:ITAR_doc", "Yes");
        doc.broken = Some("ITAR:ITAR_doc");
        assert_eq!(
            Expr::is_null(Reference::field("ITAR:ITAR_doc")).evaluate(&doc),
            Some(true)
        );
        assert_eq!(
            Expr::eq(Reference::field("ITAR:ITAR_doc"), "Yes").evaluate(&doc),
            None
        );
    }

    #[test]
    fn test_order_values_puts_nulls_first() {
        let a = Value::from("a");
        let b = Value::from("b");
        assert_eq!(order_values(None, Some(&a)), Ordering::Less);
        assert_eq!(order_values(Some(&a), Some(&b)), Ordering::Less);
        assert_eq!(order_values(Some(&b), Some(&b)), Ordering::Equal);
        assert_eq!(
            order_values(Some(&Value::from(jan(1))), Some(&a)),
            Ordering::Greater
        );
    }
}
