//! Query construction for the item access layer: filters, sort and field projection.
//!
//! Queries are built with the fluent builder API and handed to a backend, which
//! either evaluates them directly (in-memory) or translates them through a
//! [`QueryVisitor`] into its native dialect (MongoDB).
//!
//! ```ignore
//! use itemlayer::query::{Query, Filter, SortDirection};
//!
//! let query = Query::builder()
//!     .filter(Filter::regex("major", "Comp"))
//!     .sort("gpa", SortDirection::Desc)
//!     .project(["sid", "gpa"])
//!     .build();
//! ```
//!
//! # Filter Expression API
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - Pattern: `regex` (case-sensitive, unanchored)
//! - Logical: `and`, `or`
//!
//! Field names may be dotted paths into sub-documents (`"name.first"`). Field names
//! are not checked against any schema: a filter on a field no record has matches nothing.

use bson::Bson;

use crate::error::{ItemStoreError, ItemStoreResult};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl SortDirection {
    /// Returns the numeric form used by document stores: `1` or `-1`.
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

impl TryFrom<i32> for SortDirection {
    type Error = ItemStoreError;

    fn try_from(value: i32) -> ItemStoreResult<Self> {
        match value {
            1 => Ok(SortDirection::Asc),
            -1 => Ok(SortDirection::Desc),
            other => Err(ItemStoreError::Storage(format!(
                "invalid sort direction {other}, expected 1 or -1"
            ))),
        }
    }
}

/// Sort specification for query results.
///
/// Records with equal sort keys keep their insertion order.
#[derive(Debug, Clone)]
pub struct Sort {
    /// The field name (or dotted path) to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOp {
    /// Equal to.
    Eq,
    /// Not equal to. Also matches records where the field is missing.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// String field matches a regular expression (case-sensitive).
    Regex,
}

/// A filter expression for selecting records.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Field comparison expression.
    Field {
        /// The field name or dotted path to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }
}

/// Restriction on which fields of a matched record are returned.
///
/// An empty projection returns every field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    /// Creates a projection restricted to the given fields (dotted paths allowed).
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { fields: fields.into_iter().map(Into::into).collect() }
    }

    /// Returns `true` when no restriction applies.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The projected field names.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// A structured query for retrieving records.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Filter expression; `None` matches the entire collection.
    pub filter: Option<Expr>,
    /// Sort specification; `None` keeps insertion order.
    pub sort: Option<Sort>,
    /// Returned fields; empty returns everything.
    pub projection: Projection,
    /// Maximum number of records to return; `None` is unlimited.
    pub limit: Option<usize>,
}

impl Query {
    /// Creates a query that matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

/// Helper struct for constructing filter expressions.
///
/// ```ignore
/// use itemlayer::query::Filter;
///
/// let expr = Filter::eq("sid", "8b0c...")
///     .or(Filter::regex("name.last", "^Love"));
/// ```
pub struct Filter;

impl Filter {
    /// Matches records where the field equals the value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Matches records where the field does not equal the value.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    /// Matches records where the field is greater than the value.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    /// Matches records where the field is greater than or equal to the value.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    /// Matches records where the field is less than the value.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    /// Matches records where the field is less than or equal to the value.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    /// Matches records whose string field matches the pattern anywhere (case-sensitive).
    ///
    /// A pattern the backend cannot compile is reported as a storage error when the
    /// query runs.
    pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> Expr {
        Expr::field(field.into(), FieldOp::Regex, Bson::String(pattern.into()))
    }

    /// All expressions must match.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Any expression must match.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter expression for this query.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    /// Sets the maximum number of records to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets the sort field and direction.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort = Some(Sort { field: field.into(), direction });
        self
    }

    /// Restricts the returned fields.
    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.projection = Projection::only(fields);
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

/// Walks a filter expression, producing a backend-specific output.
pub trait QueryVisitor {
    type Output;
    type Error: Into<ItemStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

/// Resolves a dotted path (`"location.city"`) inside a document.
pub fn lookup_path<'a>(document: &'a bson::Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}
