//! Systems-language syntax validator
//!
//! Rust snippets are parsed with `syn`. Assistant snippets are often a bare
//! statement list rather than items, so a file-level parse failure falls
//! back to parsing the snippet as a function body before the original
//! file-level error is reported.

use crate::outcome::ValidationOutcome;

fn position_of(err: &syn::Error) -> (usize, usize) {
    let start = err.span().start();
    // proc-macro2 lines are already 1-based; columns are 0-based.
    (start.line, start.column + 1)
}

/// Validate a Rust snippet. Any parse error fails with a positioned
/// "syntax error" detail; otherwise the snippet has valid syntax.
pub fn validate(code: &str) -> ValidationOutcome {
    if code.trim().is_empty() {
        return ValidationOutcome::invalid_input("no systems-language code to validate");
    }

    let file_err = match syn::parse_file(code) {
        Ok(_) => {
            return ValidationOutcome::success("Systems-language code block has valid syntax")
        }
        Err(err) => err,
    };

    // Statement-list fallback: wrap and retry.
    let wrapped = format!("fn __snippet() {{\n{}\n}}", code);
    if syn::parse_file(&wrapped).is_ok() {
        return ValidationOutcome::success("Systems-language code block has valid syntax");
    }

    let (line, column) = position_of(&file_err);
    ValidationOutcome::failed(format!(
        "Systems-language code block has syntax error at line {}, column {}: {}",
        line, column, file_err
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_item() {
        let outcome = validate("fn add(a: i32, b: i32) -> i32 { a + b }");
        assert!(outcome.is_success());
        assert!(outcome.detail.contains("valid syntax"));
    }

    #[test]
    fn test_valid_statement_list() {
        let outcome = validate("let x = 1;\nlet y = x + 2;\nprintln!(\"{}\", y);");
        assert!(outcome.is_success());
    }

    #[test]
    fn test_unbalanced_item_fails_with_position() {
        let outcome = validate("fn broken( {");
        assert!(!outcome.is_success());
        assert!(outcome.detail.contains("syntax error"));
        assert!(outcome.detail.contains("line"));
    }

    #[test]
    fn test_struct_and_impl() {
        let outcome = validate(
            "struct Point { x: f64, y: f64 }\nimpl Point {\n    fn norm(&self) -> f64 { (self.x * self.x + self.y * self.y).sqrt() }\n}",
        );
        assert!(outcome.is_success());
    }

    #[test]
    fn test_empty_input_is_invalid() {
        let outcome = validate("");
        assert!(outcome.detail.starts_with("Invalid input:"));
    }

    #[test]
    fn test_garbage_fails() {
        let outcome = validate("this is not rust at all ???");
        assert!(!outcome.is_success());
        assert!(outcome.detail.contains("syntax error"));
    }
}
