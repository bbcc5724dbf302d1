//! Reference in-memory executor.
//!
//! Runs a [`Query`] against a slice of documents. This is not a search engine:
//! it scans every document, and exists so that rewritten queries can be
//! checked against the permission face on the same fixtures.

use tracing::debug;

use docward_types::Document;

use crate::error::{QueryError, Result};
use crate::eval::{order_values, resolve};
use crate::query::Query;

/// Executes `query` against `docs` and returns the ids of selected documents.
///
/// Results follow the ORDER BY keys (NULL first when ascending), then input
/// order, and honour OFFSET and LIMIT.
pub fn execute<D: Document>(query: &Query, docs: &[D]) -> Result<Vec<String>> {
    query.validate()?;

    if !query.group_by().is_empty() {
        return Err(QueryError::UnsupportedFeature(
            "GROUP BY is not supported by the in-memory executor".to_string(),
        ));
    }

    let mut selected: Vec<&D> = docs
        .iter()
        .filter(|doc| query.matches_type(doc.type_name()))
        .filter(|doc| query.filter().is_none_or(|f| f.selects(*doc)))
        .collect();

    if !query.order_by().is_empty() {
        // sort_by is stable: ties keep input order
        selected.sort_by(|a, b| {
            for key in query.order_by() {
                let va = resolve(&key.reference, *a);
                let vb = resolve(&key.reference, *b);
                let mut ord = order_values(va.as_ref(), vb.as_ref());
                if key.descending {
                    ord = ord.reverse();
                }
                if ord.is_ne() {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });
    }

    let offset = query.offset().unwrap_or(0);
    let limit = query.limit().unwrap_or(usize::MAX);
    let ids: Vec<String> = selected
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|doc| doc.id().to_string())
        .collect();

    debug!(query = %query, scanned = docs.len(), matched = ids.len(), "executed query");
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Expr, Reference};
    use crate::query::OrderBy;
    use docward_types::{PropertyError, Value};

    struct Doc {
        id: &'static str,
        type_name: &'static str,
        title: Option<&'static str>,
    }

    impl Document for Doc {
        fn id(&self) -> &str {
            self.id
        }

        fn type_name(&self) -> &str {
            self.type_name
        }

        fn lifecycle_state(&self) -> Option<&str> {
            None
        }

        fn property(&self, path: &str) -> std::result::Result<Option<Value>, PropertyError> {
            match path {
                "dc:title" => Ok(self.title.map(Value::from)),
                other => Err(PropertyError::UnknownField {
                    path: other.to_string(),
                }),
            }
        }
    }

    fn fixtures() -> Vec<Doc> {
        vec![
            Doc { id: "d1", type_name: "File", title: Some("b") },
            Doc { id: "d2", type_name: "Note", title: Some("a") },
            Doc { id: "d3", type_name: "File", title: None },
            Doc { id: "d4", type_name: "File", title: Some("a") },
        ]
    }

    #[test]
    fn test_from_document_matches_every_type() {
        let ids = execute(&Query::all_documents(), &fixtures()).unwrap();
        assert_eq!(ids, ["d1", "d2", "d3", "d4"]);
    }

    #[test]
    fn test_from_specific_type() {
        let ids = execute(&Query::select_all_from(["Note"]), &fixtures()).unwrap();
        assert_eq!(ids, ["d2"]);
    }

    #[test]
    fn test_where_drops_unknown_rows() {
        let q = Query::all_documents().with_where(Expr::not_eq(Reference::field("dc:title"), "a"));
        // d3 has no title: the comparison is unknown, so it is not selected
        assert_eq!(execute(&q, &fixtures()).unwrap(), ["d1"]);
    }

    #[test]
    fn test_order_by_is_stable_with_nulls_first() {
        let q = Query::all_documents().with_order_by(OrderBy::asc(Reference::field("dc:title")));
        assert_eq!(execute(&q, &fixtures()).unwrap(), ["d3", "d2", "d4", "d1"]);

        let q = Query::all_documents().with_order_by(OrderBy::desc(Reference::field("dc:title")));
        assert_eq!(execute(&q, &fixtures()).unwrap(), ["d1", "d2", "d4", "d3"]);
    }

    #[test]
    fn test_offset_and_limit() {
        let q = Query::all_documents().with_offset(1).with_limit(2);
        assert_eq!(execute(&q, &fixtures()).unwrap(), ["d2", "d3"]);
    }

    #[test]
    fn test_group_by_is_unsupported() {
        let q = Query::all_documents().with_group_by(vec![Reference::field("dc:title")]);
        assert!(matches!(
            execute(&q, &fixtures()),
            Err(QueryError::UnsupportedFeature(_))
        ));
    }
}
