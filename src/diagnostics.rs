//! Shared diagnostics
//!
//! Single positioned-problem type used by every checker in the crate, so
//! that per-block details all read the same way regardless of grammar.

use serde::{Deserialize, Serialize};

/// Source location span, 1-based lines and columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl SourceSpan {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Create a span from byte offsets (requires source text for line/col calculation)
    pub fn from_byte_offset(source: &str, start: usize, end: usize) -> Self {
        let (start_line, start_col) = byte_to_line_col(source, start);
        let (end_line, end_col) = byte_to_line_col(source, end);
        Self::new(start_line, start_col, end_line, end_col)
    }

    /// Collapse to the starting point only.
    pub fn point(source: &str, offset: usize) -> Self {
        let (line, col) = byte_to_line_col(source, offset);
        Self::new(line, col, line, col)
    }
}

/// Convert byte offset to 1-based line and column
pub fn byte_to_line_col(source: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;

    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// One reported problem: a message anchored at a source position.
///
/// All checkers produce these; the outcome layer renders them into the
/// human-readable detail string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub message: String,
    pub span: Option<SourceSpan>,
}

impl Problem {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
        }
    }

    pub fn at(message: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            message: message.into(),
            span: Some(span),
        }
    }

    /// Anchor a message at a byte offset within `source`.
    pub fn at_offset(message: impl Into<String>, source: &str, offset: usize) -> Self {
        Self::at(message, SourceSpan::point(source, offset))
    }

    /// Render as `line N, column M: message` (or the bare message when
    /// the producing parser had no location to give).
    pub fn render(&self) -> String {
        match &self.span {
            Some(span) => format!(
                "line {}, column {}: {}",
                span.start_line, span.start_col, self.message
            ),
            None => self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_to_line_col() {
        let source = "line1\nline2\nline3";
        assert_eq!(byte_to_line_col(source, 0), (1, 1));
        assert_eq!(byte_to_line_col(source, 5), (1, 6));
        assert_eq!(byte_to_line_col(source, 6), (2, 1));
        assert_eq!(byte_to_line_col(source, 12), (3, 1));
    }

    #[test]
    fn test_offset_past_end_clamps_to_final_position() {
        let source = "ab\ncd";
        assert_eq!(byte_to_line_col(source, 999), (2, 3));
    }

    #[test]
    fn test_problem_render_with_span() {
        let p = Problem::at_offset("unexpected token", "ab\ncd", 3);
        assert_eq!(p.render(), "line 2, column 1: unexpected token");
    }

    #[test]
    fn test_problem_render_without_span() {
        let p = Problem::new("something went wrong");
        assert_eq!(p.render(), "something went wrong");
    }
}
