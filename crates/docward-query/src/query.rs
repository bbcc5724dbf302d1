//! Listing queries.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};
use crate::expr::{Expr, Reference};

/// Type name that matches documents of every type in `FROM`.
pub const ALL_TYPES: &str = "Document";

/// One `ORDER BY` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub reference: Reference,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(reference: Reference) -> Self {
        Self {
            reference,
            descending: false,
        }
    }

    pub fn desc(reference: Reference) -> Self {
        Self {
            reference,
            descending: true,
        }
    }
}

/// A document listing query.
///
/// Only the filter is ever rewritten by the policy layer. Projection, type
/// list, grouping, ordering and paging pass through [`Query::and_where`]
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    select: Vec<String>,
    from: Vec<String>,
    filter: Option<Expr>,
    group_by: Vec<Reference>,
    having: Option<Expr>,
    order_by: Vec<OrderBy>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl Query {
    /// `SELECT * FROM <types>`.
    pub fn select_all_from<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            select: Vec::new(),
            from: types.into_iter().map(Into::into).collect(),
            filter: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// `SELECT * FROM Document`.
    pub fn all_documents() -> Self {
        Self::select_all_from([ALL_TYPES])
    }

    /// Replaces the projection. An empty list means `*`.
    pub fn with_select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the WHERE clause.
    pub fn with_where(mut self, filter: Expr) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Conjoins `extra` onto the existing WHERE clause.
    ///
    /// Produces `P0 AND extra` when a filter is present, `extra` otherwise.
    pub fn and_where(mut self, extra: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => Expr::and_all([existing, extra]),
            None => extra,
        });
        self
    }

    pub fn with_group_by(mut self, keys: Vec<Reference>) -> Self {
        self.group_by = keys;
        self
    }

    pub fn with_having(mut self, having: Expr) -> Self {
        self.having = Some(having);
        self
    }

    pub fn with_order_by(mut self, key: OrderBy) -> Self {
        self.order_by.push(key);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn select(&self) -> &[String] {
        &self.select
    }

    pub fn types(&self) -> &[String] {
        &self.from
    }

    pub fn filter(&self) -> Option<&Expr> {
        self.filter.as_ref()
    }

    pub fn group_by(&self) -> &[Reference] {
        &self.group_by
    }

    pub fn having(&self) -> Option<&Expr> {
        self.having.as_ref()
    }

    pub fn order_by(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Returns whether `type_name` is selected by the FROM clause.
    pub fn matches_type(&self, type_name: &str) -> bool {
        self.from
            .iter()
            .any(|t| t == ALL_TYPES || t == type_name)
    }

    /// Structural checks shared by every executor.
    pub fn validate(&self) -> Result<()> {
        if self.from.is_empty() {
            return Err(QueryError::InvalidQuery(
                "FROM clause names no document types".to_string(),
            ));
        }
        if self.from.iter().any(String::is_empty) {
            return Err(QueryError::InvalidQuery(
                "FROM clause contains an empty type name".to_string(),
            ));
        }
        if self.having.is_some() && self.group_by.is_empty() {
            return Err(QueryError::InvalidQuery(
                "HAVING requires GROUP BY".to_string(),
            ));
        }
        Ok(())
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.select.is_empty() {
            f.write_str("SELECT *")?;
        } else {
            write!(f, "SELECT {}", self.select.join(", "))?;
        }
        write!(f, " FROM {}", self.from.join(", "))?;
        if let Some(filter) = &self.filter {
            write!(f, " WHERE {filter}")?;
        }
        if !self.group_by.is_empty() {
            let keys: Vec<&str> = self.group_by.iter().map(Reference::as_str).collect();
            write!(f, " GROUP BY {}", keys.join(", "))?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {having}")?;
        }
        if !self.order_by.is_empty() {
            let keys: Vec<String> = self
                .order_by
                .iter()
                .map(|k| {
                    if k.descending {
                        format!("{} DESC", k.reference)
                    } else {
                        k.reference.to_string()
                    }
                })
                .collect();
            write!(f, " ORDER BY {}", keys.join(", "))?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {offset}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a_eq_1() -> Expr {
        Expr::eq(Reference::field("a"), 1_i64)
    }

    #[test]
    fn test_and_where_without_existing_filter() {
        let q = Query::select_all_from(["File"]).and_where(a_eq_1());
        assert_eq!(q.to_string(), "SELECT * FROM File WHERE a = 1");
    }

    #[test]
    fn test_and_where_conjoins() {
        let q = Query::all_documents()
            .with_where(a_eq_1())
            .and_where(Expr::negate(Expr::eq(Reference::PrimaryType, "File")));
        assert_eq!(
            q.to_string(),
            "SELECT * FROM Document WHERE a = 1 AND NOT (ecm:primaryType = 'File')"
        );
    }

    #[test]
    fn test_and_where_parenthesises_disjunction() {
        let q = Query::all_documents()
            .with_where(a_eq_1().or(Expr::eq(Reference::field("b"), 2_i64)))
            .and_where(Expr::eq(Reference::field("c"), 3_i64));
        assert_eq!(
            q.to_string(),
            "SELECT * FROM Document WHERE (a = 1 OR b = 2) AND c = 3"
        );
    }

    #[test]
    fn test_and_where_preserves_other_clauses() {
        let original = Query::select_all_from(["File", "Note"])
            .with_select(["ecm:uuid", "dc:title"])
            .with_order_by(OrderBy::desc(Reference::field("dc:modified")))
            .with_limit(20)
            .with_offset(40);
        let rewritten = original.clone().and_where(a_eq_1());

        assert_eq!(rewritten.select(), original.select());
        assert_eq!(rewritten.types(), original.types());
        assert_eq!(rewritten.order_by(), original.order_by());
        assert_eq!(rewritten.limit(), Some(20));
        assert_eq!(rewritten.offset(), Some(40));
        assert_eq!(
            rewritten.to_string(),
            "SELECT ecm:uuid, dc:title FROM File, Note WHERE a = 1 \
             ORDER BY dc:modified DESC LIMIT 20 OFFSET 40"
        );
    }

    #[test]
    fn test_render_group_by_having() {
        let q = Query::all_documents()
            .with_group_by(vec![Reference::field("dc:creator")])
            .with_having(Expr::is_not_null(Reference::field("dc:creator")));
        assert_eq!(
            q.to_string(),
            "SELECT * FROM Document GROUP BY dc:creator HAVING dc:creator IS NOT NULL"
        );
    }

    #[test]
    fn test_matches_type() {
        assert!(Query::all_documents().matches_type("AnyType"));
        let q = Query::select_all_from(["File"]);
        assert!(q.matches_type("File"));
        assert!(!q.matches_type("Note"));
    }

    #[test]
    fn test_validate() {
        assert!(Query::all_documents().validate().is_ok());
        assert!(matches!(
            Query::select_all_from(Vec::<String>::new()).validate(),
            Err(QueryError::InvalidQuery(_))
        ));
        assert!(matches!(
            Query::all_documents().with_having(a_eq_1()).validate(),
            Err(QueryError::InvalidQuery(_))
        ));
    }
}
