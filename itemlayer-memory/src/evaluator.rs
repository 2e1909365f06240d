//! Query expression evaluation for in-memory record filtering and sorting.
//!
//! Values are compared the way document stores order BSON: first by type bracket
//! (missing/null, numbers, strings, documents, arrays, booleans, dates), then by
//! value within the bracket. Ordered comparisons (`gt`, `lt`, ...) only match values
//! in the same bracket.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document, datetime::DateTime};
use regex::Regex;

use itemlayer_core::{
    query::{QueryVisitor, Expr, FieldOp, lookup_path},
    error::{ItemStoreError, ItemStoreResult},
};


/// Comparable view over a BSON value.
///
/// All numeric types are normalized to f64. BSON types without a meaningful
/// ordering here (binary, object ids, ...) compare as null.
#[derive(Debug, Clone)]
pub(crate) enum Comparable<'a> {
    Null,
    Number(f64),
    String(&'a str),
    Map(Vec<(&'a str, Comparable<'a>)>),
    Array(Vec<Comparable<'a>>),
    Bool(bool),
    DateTime(DateTime),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect()
            ),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect()
            ),
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            _ => Comparable::Null,
        }
    }
}

impl<'a> Comparable<'a> {
    /// Reads a (possibly dotted) field; a missing field reads as null.
    pub(crate) fn field(document: &'a Document, path: &str) -> Self {
        lookup_path(document, path)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null)
    }

    fn bracket(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::Bool(_) => 5,
            Comparable::DateTime(_) => 6,
        }
    }

    /// Total order across every value, used for sorting.
    pub(crate) fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // adding 0.0 folds -0.0 into 0.0
            (Comparable::Number(a), Comparable::Number(b)) => (a + 0.0).total_cmp(&(b + 0.0)),
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            (Comparable::Map(a), Comparable::Map(b)) => a
                .iter()
                .zip(b.iter())
                .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| va.total_cmp(vb)))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Comparable::Array(a), Comparable::Array(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(va, vb)| va.total_cmp(vb))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.cmp(b),
            _ => self.bracket().cmp(&other.bracket()),
        }
    }

    /// Ordering only between values of the same type bracket.
    fn bracketed_cmp(&self, other: &Self) -> Option<Ordering> {
        (self.bracket() == other.bracket()).then(|| self.total_cmp(other))
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }
}


/// Compiled regular expressions, shared across the records of one query.
#[derive(Default)]
pub(crate) struct PatternCache {
    patterns: HashMap<String, Regex>,
}

impl PatternCache {
    fn get(&mut self, pattern: &str) -> ItemStoreResult<&Regex> {
        if !self.patterns.contains_key(pattern) {
            let compiled = Regex::new(pattern).map_err(|e| {
                ItemStoreError::Storage(format!("invalid regular expression {pattern:?}: {e}"))
            })?;
            self.patterns.insert(pattern.to_string(), compiled);
        }

        self.patterns
            .get(pattern)
            .ok_or_else(|| ItemStoreError::Storage(format!("regular expression {pattern:?} not compiled")))
    }
}


pub(crate) struct DocumentEvaluator<'a, 'p> {
    document: &'a Document,
    patterns: &'p mut PatternCache,
}

impl<'a, 'p> DocumentEvaluator<'a, 'p> {
    pub fn new(document: &'a Document, patterns: &'p mut PatternCache) -> Self {
        Self { document, patterns }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> ItemStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns the positions of every matching record, in iteration order.
    ///
    /// A malformed filter (an uncompilable pattern) fails the whole query.
    pub fn matching_positions<'d>(
        documents: impl IntoIterator<Item = &'d Document>,
        expr: &Expr,
    ) -> ItemStoreResult<Vec<usize>> {
        let mut patterns = PatternCache::default();
        let mut positions = Vec::new();

        for (position, document) in documents.into_iter().enumerate() {
            if DocumentEvaluator::new(document, &mut patterns).evaluate(expr)? {
                positions.push(position);
            }
        }

        Ok(positions)
    }
}

impl<'a, 'p> QueryVisitor for DocumentEvaluator<'a, 'p> {
    type Output = bool;
    type Error = ItemStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let left = Comparable::field(self.document, field);
        let right = Comparable::from(value);

        match op {
            FieldOp::Eq => Ok(left == right),
            FieldOp::Ne => Ok(left != right),
            FieldOp::Gt => Ok(left.bracketed_cmp(&right) == Some(Ordering::Greater)),
            FieldOp::Gte => Ok(matches!(left.bracketed_cmp(&right), Some(Ordering::Greater | Ordering::Equal))),
            FieldOp::Lt => Ok(left.bracketed_cmp(&right) == Some(Ordering::Less)),
            FieldOp::Lte => Ok(matches!(left.bracketed_cmp(&right), Some(Ordering::Less | Ordering::Equal))),
            FieldOp::Regex => {
                let Bson::String(pattern) = value else {
                    return Err(ItemStoreError::Storage(format!(
                        "regex operator on {field} requires a string pattern"
                    )));
                };
                let regex = self.patterns.get(pattern)?;

                Ok(match left {
                    Comparable::String(text) => regex.is_match(text),
                    _ => false,
                })
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use itemlayer_core::query::Filter;

    fn matches(document: &Document, expr: &Expr) -> ItemStoreResult<bool> {
        DocumentEvaluator::new(document, &mut PatternCache::default()).evaluate(expr)
    }

    #[test]
    fn equality_treats_integers_and_doubles_alike() {
        let document = doc! { "registered": 1_700_000_000_000_i64, "count": 3 };

        assert!(matches(&document, &Filter::eq("count", 3.0)).unwrap());
        assert!(matches(&document, &Filter::eq("registered", 1_700_000_000_000_i64)).unwrap());
        assert!(!matches(&document, &Filter::eq("count", "3")).unwrap());
    }

    #[test]
    fn missing_fields_read_as_null() {
        let document = doc! { "major": "CS" };

        assert!(!matches(&document, &Filter::eq("gpa", "3.9")).unwrap());
        assert!(matches(&document, &Filter::ne("gpa", "3.9")).unwrap());
        assert!(matches(&document, &Filter::eq("gpa", Bson::Null)).unwrap());
    }

    #[test]
    fn regex_is_case_sensitive_and_unanchored() {
        let document = doc! { "major": "Computer Science" };

        assert!(matches(&document, &Filter::regex("major", "Comp")).unwrap());
        assert!(matches(&document, &Filter::regex("major", "Sci")).unwrap());
        assert!(!matches(&document, &Filter::regex("major", "comp")).unwrap());
        assert!(matches(&document, &Filter::regex("major", "^Comp.*ce$")).unwrap());
    }

    #[test]
    fn regex_only_matches_strings() {
        let document = doc! { "gpa": 3.5 };

        assert!(!matches(&document, &Filter::regex("gpa", "3")).unwrap());
    }

    #[test]
    fn invalid_pattern_is_a_storage_error() {
        let document = doc! { "major": "CS" };

        assert!(matches!(
            matches(&document, &Filter::regex("major", "(unclosed")),
            Err(ItemStoreError::Storage(_))
        ));
    }

    #[test]
    fn ordered_comparisons_stay_within_type_bracket() {
        let document = doc! { "gpa": "3.5", "credits": 90 };

        assert!(matches(&document, &Filter::gt("gpa", "3.0")).unwrap());
        assert!(matches(&document, &Filter::lte("credits", 90)).unwrap());
        assert!(!matches(&document, &Filter::gt("credits", "1")).unwrap());
        assert!(!matches(&document, &Filter::lt("credits", "1")).unwrap());
    }

    #[test]
    fn dotted_paths_reach_sub_documents() {
        let document = doc! { "name": { "first": "Ada", "last": "Lovelace" } };

        assert!(matches(&document, &Filter::eq("name.first", "Ada")).unwrap());
        assert!(matches(&document, &Filter::regex("name.last", "^Love")).unwrap());
    }

    #[test]
    fn logical_combinators() {
        let document = doc! { "major": "CS", "gpa": "3.9" };

        let both = Filter::and([Filter::eq("major", "CS"), Filter::eq("gpa", "3.9")]);
        let either = Filter::or([Filter::eq("major", "Math"), Filter::eq("gpa", "3.9")]);
        let neither = Filter::or([Filter::eq("major", "Math"), Filter::eq("gpa", "2.0")]);

        assert!(matches(&document, &both).unwrap());
        assert!(matches(&document, &either).unwrap());
        assert!(!matches(&document, &neither).unwrap());
    }

    #[test]
    fn total_order_follows_type_brackets() {
        let null = Bson::Null;
        let number = Bson::Int32(7);
        let string = Bson::String("a".into());
        let boolean = Bson::Boolean(false);

        assert_eq!(Comparable::from(&null).total_cmp(&Comparable::from(&number)), Ordering::Less);
        assert_eq!(Comparable::from(&number).total_cmp(&Comparable::from(&string)), Ordering::Less);
        assert_eq!(Comparable::from(&string).total_cmp(&Comparable::from(&boolean)), Ordering::Less);
    }
}
