//! Query-language validation
//!
//! Two phases: a nom grammar builds the document AST, then structural
//! checks walk it against a `SchemaDocument`. Both phases report every
//! problem they find; the outcome carries them joined in source order.

pub mod ast;
pub mod parser;
pub mod schema;
pub mod validate;

pub use ast::{Document, Operation, OperationKind};
pub use schema::{SchemaDocument, SchemaError, SchemaProvider, SchemaSet};

use crate::outcome::ValidationOutcome;

/// Validate one query code block against `schema`.
pub fn validate(code: &str, schema: &SchemaDocument) -> ValidationOutcome {
    if code.trim().is_empty() {
        return ValidationOutcome::invalid_input("query code block is empty");
    }

    let doc = match parser::parse_document(code) {
        Ok(doc) => doc,
        Err(problem) => {
            let detail = match problem.span {
                Some(span) => format!(
                    "Query code block has syntax error at line {}, column {}",
                    span.start_line, span.start_col
                ),
                None => "Query code block has syntax error".to_string(),
            };
            return ValidationOutcome::failed(detail);
        }
    };

    let kinds: Vec<&str> = doc.operations().map(|op| op.kind.as_str()).collect();
    if kinds.is_empty() {
        return ValidationOutcome::invalid_input("query document contains no operations");
    }

    let violations = validate::validate_document(&doc, schema);
    if violations.is_empty() {
        let detail = if kinds.len() == 1 {
            format!("Query code block contains a valid {} operation", kinds[0])
        } else {
            format!(
                "Query code block contains {} valid operations ({})",
                kinds.len(),
                kinds.join(", ")
            )
        };
        ValidationOutcome::success(detail)
    } else {
        ValidationOutcome::failed(format!(
            "Query code block failed schema validation: {}",
            violations.join("; ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::schema::FieldDef;
    use super::*;
    use crate::outcome::Verdict;

    fn schema() -> SchemaDocument {
        let mut schema = SchemaDocument::new();
        schema.add_object(
            "Product",
            vec![FieldDef::new("id", "ID"), FieldDef::new("title", "String")],
        );
        schema.add_object("Query", vec![FieldDef::new("product", "Product")]);
        schema.set_query_type("Query");
        schema
    }

    #[test]
    fn test_valid_query_names_operation_kind() {
        let outcome = validate("query { product { id title } }", &schema());
        assert_eq!(outcome.verdict, Verdict::Success);
        assert!(outcome.detail.contains("query operation"));
    }

    #[test]
    fn test_shorthand_query_is_a_query() {
        let outcome = validate("{ product { id } }", &schema());
        assert!(outcome.is_success());
        assert!(outcome.detail.contains("query"));
    }

    #[test]
    fn test_empty_input() {
        let outcome = validate("  \n ", &schema());
        assert_eq!(outcome.verdict, Verdict::Failed);
        assert!(outcome.detail.starts_with("Invalid input:"));
    }

    #[test]
    fn test_syntax_error_is_positioned() {
        let outcome = validate("query {\n  product {\n", &schema());
        assert_eq!(outcome.verdict, Verdict::Failed);
        assert!(outcome.detail.contains("syntax error at line"));
    }

    #[test]
    fn test_structural_violation_reported() {
        let outcome = validate("{ product { price } }", &schema());
        assert_eq!(outcome.verdict, Verdict::Failed);
        assert!(outcome
            .detail
            .contains("Cannot query field \"price\" on type \"Product\"."));
    }

    #[test]
    fn test_fragment_only_document_is_invalid_input() {
        let outcome = validate("fragment Bits on Product { id }", &schema());
        assert!(outcome.detail.starts_with("Invalid input:"));
    }

    #[test]
    fn test_multiple_operations_counted() {
        let mut schema = schema();
        schema.add_object("Mutation", vec![FieldDef::new("touch", "ID")]);
        schema.set_mutation_type("Mutation");
        let outcome = validate(
            "query A { product { id } }\nmutation B { touch }",
            &schema,
        );
        assert!(outcome.is_success());
        assert!(outcome.detail.contains("2 valid operations"));
        assert!(outcome.detail.contains("query, mutation"));
    }
}
