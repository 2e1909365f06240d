//! Query translation from the itemlayer filter model to MongoDB filter documents.

use bson::{Document, Bson, doc};

use itemlayer_core::{
    query::{QueryVisitor, Expr, FieldOp},
    error::ItemStoreError,
};


/// Translates itemlayer filter expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = ItemStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        // MongoDB rejects an empty $and; an empty conjunction matches everything
        if exprs.is_empty() {
            return Ok(doc! {});
        }

        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        // an empty disjunction matches nothing
        if exprs.is_empty() {
            return Ok(doc! { "_id": { "$exists": false } });
        }

        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::Regex => match value {
                    Bson::String(pattern) => doc! { "$regex": pattern },
                    _ => return Err(ItemStoreError::Storage(format!("regex operator on {field} requires a string pattern"))),
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itemlayer_core::query::Filter;

    fn translate(expr: &Expr) -> Result<Document, ItemStoreError> {
        MongoQueryTranslator.visit_expr(expr)
    }

    #[test]
    fn equality_on_identifier() {
        assert_eq!(
            translate(&Filter::eq("sid", "s-1")).unwrap(),
            doc! { "sid": { "$eq": "s-1" } }
        );
    }

    #[test]
    fn regex_has_no_case_insensitive_option() {
        assert_eq!(
            translate(&Filter::regex("major", "Comp")).unwrap(),
            doc! { "major": { "$regex": "Comp" } }
        );
    }

    #[test]
    fn dotted_paths_pass_through() {
        assert_eq!(
            translate(&Filter::gte("name.first", "A")).unwrap(),
            doc! { "name.first": { "$gte": "A" } }
        );
    }

    #[test]
    fn combinators_nest() {
        let expr = Filter::or([
            Filter::eq("major", "CS"),
            Filter::and([Filter::lt("gpa", "2.0"), Filter::ne("modifiedby", "admin")]),
        ]);

        assert_eq!(
            translate(&expr).unwrap(),
            doc! {
                "$or": [
                    { "major": { "$eq": "CS" } },
                    { "$and": [
                        { "gpa": { "$lt": "2.0" } },
                        { "modifiedby": { "$ne": "admin" } },
                    ] },
                ]
            }
        );
    }

    #[test]
    fn empty_combinators() {
        assert_eq!(translate(&Filter::and([])).unwrap(), doc! {});
        assert_eq!(translate(&Filter::or([])).unwrap(), doc! { "_id": { "$exists": false } });
    }

    #[test]
    fn regex_requires_string_pattern() {
        let expr = Expr::field("major".into(), FieldOp::Regex, Bson::Int32(1));

        assert!(matches!(translate(&expr), Err(ItemStoreError::Storage(_))));
    }
}
