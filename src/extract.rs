//! Extraction layer
//!
//! Pure text transformations that isolate a code payload from its markdown
//! wrapper. No parsing happens here: each pass is a string-to-string
//! cleanup, independently toggleable, composed left-to-right, and
//! idempotent (re-applying a pass to its own output is a no-op).

use serde::{Deserialize, Serialize};

use crate::diagnostics::SourceSpan;

// ============================================================================
// Options and presets
// ============================================================================

/// Which cleanup passes to apply. Never mutated after construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOptions {
    /// Strip one leading/trailing fenced-code delimiter line.
    pub remove_fences: bool,
    /// Remove `<!-- ... -->` comments (full pairs only).
    pub remove_html_comments: bool,
    /// Remove `/* ... */` blocks and whole-line `//` comments.
    pub remove_c_comments: bool,
    /// Remove whole lines starting with `#`.
    pub remove_hash_comments: bool,
    /// Collapse runs of blank lines left behind by comment removal.
    pub collapse_blank_lines: bool,
    /// Trim leading/trailing whitespace.
    pub trim: bool,
    /// Query-language only: strip `@directive(...)` applications.
    pub strip_directives: bool,
    /// Query-language only: drop `fragment X on Y { ... }` definitions.
    pub strip_fragment_definitions: bool,
    /// Query-language only: drop the `(...)` variable-definition list
    /// following an operation name.
    pub strip_variable_definitions: bool,
}

/// Named, fixed combinations of passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    /// No cleanup at all.
    Raw,
    /// Fence removal only.
    FenceOnly,
    /// Markup snippets: fence + HTML comments + collapse + trim.
    Markup,
    /// Script / systems snippets: fence + C comments + collapse + trim.
    Script,
    /// Query snippets: fence + `#` comments + collapse + trim.
    Query,
    /// Query plus the deeper normalization passes used before structural
    /// comparison.
    QueryNormalized,
}

impl Preset {
    pub fn options(self) -> ExtractionOptions {
        match self {
            Preset::Raw => ExtractionOptions::default(),
            Preset::FenceOnly => ExtractionOptions {
                remove_fences: true,
                ..Default::default()
            },
            Preset::Markup => ExtractionOptions {
                remove_fences: true,
                remove_html_comments: true,
                collapse_blank_lines: true,
                trim: true,
                ..Default::default()
            },
            Preset::Script => ExtractionOptions {
                remove_fences: true,
                remove_c_comments: true,
                collapse_blank_lines: true,
                trim: true,
                ..Default::default()
            },
            Preset::Query => ExtractionOptions {
                remove_fences: true,
                remove_hash_comments: true,
                collapse_blank_lines: true,
                trim: true,
                ..Default::default()
            },
            Preset::QueryNormalized => ExtractionOptions {
                remove_fences: true,
                remove_hash_comments: true,
                collapse_blank_lines: true,
                trim: true,
                strip_directives: true,
                strip_fragment_definitions: true,
                strip_variable_definitions: true,
                ..Default::default()
            },
        }
    }
}

/// Apply the configured passes, left-to-right.
pub fn extract(raw: &str, options: &ExtractionOptions) -> String {
    let mut text = raw.to_string();
    if options.remove_fences {
        text = remove_fences(&text);
    }
    if options.remove_html_comments {
        text = remove_html_comments(&text);
    }
    if options.remove_c_comments {
        text = remove_c_comments(&text);
    }
    if options.remove_hash_comments {
        text = remove_hash_comments(&text);
    }
    if options.strip_directives {
        text = strip_directives(&text);
    }
    if options.strip_fragment_definitions {
        text = strip_fragment_definitions(&text);
    }
    if options.strip_variable_definitions {
        text = strip_variable_definitions(&text);
    }
    if options.collapse_blank_lines {
        text = collapse_blank_lines(&text);
    }
    if options.trim {
        text = text.trim().to_string();
    }
    text
}

/// Apply a named preset.
pub fn extract_preset(raw: &str, preset: Preset) -> String {
    extract(raw, &preset.options())
}

// ============================================================================
// Individual passes
// ============================================================================

fn is_fence_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    if !trimmed.starts_with("```") {
        return false;
    }
    let rest = trimmed.trim_start_matches('`');
    // Opener may carry a language tag; anything with spaces or punctuation
    // beyond a tag word is not a fence line.
    rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Strip a single leading fence line (optionally tagged) and a single
/// trailing fence line when present. Absent delimiters leave the text
/// unchanged.
fn remove_fences(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut start = 0;
    let mut end = lines.len();

    // Skip leading blank lines when looking for the opener.
    let first_content = lines.iter().position(|l| !l.trim().is_empty());
    if let Some(idx) = first_content {
        if is_fence_line(lines[idx]) {
            start = idx + 1;
        }
    }

    let last_content = lines.iter().rposition(|l| !l.trim().is_empty());
    if let Some(idx) = last_content {
        if idx >= start && is_fence_line(lines[idx]) && lines[idx].trim().chars().all(|c| c == '`')
        {
            end = idx;
        }
    }

    if start == 0 && end == lines.len() {
        return text.to_string();
    }
    lines[start..end.max(start)].join("\n")
}

/// Remove `<!-- ... -->` pairs. Unterminated openers are left alone.
fn remove_html_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find("<!--") {
        match rest[open + 4..].find("-->") {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + 4 + close + 3..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Remove `/* ... */` blocks and `//` comments that start a line. Quoted
/// strings are copied verbatim, so `"/*"` in a literal is not an opener.
/// Tail comments after code are left alone so that string contents like
/// URLs survive. An unterminated `/*` is kept as-is.
fn remove_c_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' | '\'' | '`' => {
                out.push(c);
                while let Some((_, sc)) = chars.next() {
                    out.push(sc);
                    if sc == '\\' {
                        if let Some((_, esc)) = chars.next() {
                            out.push(esc);
                        }
                    } else if sc == c || (sc == '\n' && c != '`') {
                        break;
                    }
                }
            }
            '/' if chars.peek().map(|&(_, n)| n) == Some('*') => {
                match text[i + 2..].find("*/") {
                    Some(close) => {
                        let end = i + 2 + close + 2;
                        while chars.peek().map_or(false, |&(j, _)| j < end) {
                            chars.next();
                        }
                    }
                    None => {
                        out.push_str(&text[i..]);
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out.lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove whole lines whose first non-whitespace character is `#`.
fn remove_hash_comments(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse runs of two or more blank lines into one.
fn collapse_blank_lines(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut prev_blank = false;
    for line in text.lines() {
        let blank = line.trim().is_empty();
        if blank && prev_blank {
            continue;
        }
        out.push(line);
        prev_blank = blank;
    }
    out.join("\n")
}

/// Strip `@directive` and `@directive(...)` applications.
fn strip_directives(text: &str) -> String {
    let bytes: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == '@'
            && i + 1 < bytes.len()
            && (bytes[i + 1].is_ascii_alphabetic() || bytes[i + 1] == '_')
        {
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == '_') {
                i += 1;
            }
            // Optional argument list.
            if i < bytes.len() && bytes[i] == '(' {
                let mut depth = 0usize;
                while i < bytes.len() {
                    match bytes[i] {
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                i += 1;
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
            }
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

/// Drop `fragment Name on Type { ... }` definitions (balanced braces).
fn strip_fragment_definitions(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        let Some(pos) = find_keyword(rest, "fragment") else {
            out.push_str(rest);
            break;
        };
        let after = &rest[pos..];
        match balanced_brace_end(after) {
            Some(end) => {
                out.push_str(&rest[..pos]);
                rest = &rest[pos + end..];
            }
            None => {
                out.push_str(rest);
                break;
            }
        }
    }
    out
}

/// Drop the parenthesized variable-definition list after an operation name.
fn strip_variable_definitions(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        let op = ["query", "mutation", "subscription"]
            .iter()
            .filter_map(|kw| find_keyword(rest, kw).map(|p| (p, kw.len())))
            .min();
        let Some((pos, kw_len)) = op else {
            out.push_str(rest);
            break;
        };
        let mut idx = pos + kw_len;
        let chars: Vec<(usize, char)> = rest.char_indices().collect();
        let mut ci = chars.iter().position(|(o, _)| *o >= idx).unwrap_or(chars.len());
        // Skip whitespace and an optional operation name.
        while ci < chars.len() && chars[ci].1.is_whitespace() {
            ci += 1;
        }
        while ci < chars.len() && (chars[ci].1.is_ascii_alphanumeric() || chars[ci].1 == '_') {
            ci += 1;
        }
        while ci < chars.len() && chars[ci].1.is_whitespace() {
            ci += 1;
        }
        if ci < chars.len() && chars[ci].1 == '(' {
            let paren_start = chars[ci].0;
            let mut depth = 0usize;
            let mut close = None;
            for (o, c) in &chars[ci..] {
                match c {
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            close = Some(o + c.len_utf8());
                            break;
                        }
                    }
                    _ => {}
                }
            }
            if let Some(close) = close {
                out.push_str(&rest[..paren_start]);
                rest = &rest[close..];
                continue;
            }
        }
        idx = if ci < chars.len() { chars[ci].0 } else { rest.len() };
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
    }
    out
}

/// Find `keyword` at a word boundary.
fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    let mut search = 0;
    while let Some(rel) = text[search..].find(keyword) {
        let pos = search + rel;
        let before_ok = pos == 0
            || !text[..pos]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        let after = pos + keyword.len();
        let after_ok = after >= text.len()
            || !text[after..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        if before_ok && after_ok {
            return Some(pos);
        }
        search = pos + keyword.len();
    }
    None
}

/// Byte length of `text` up to and including the closing brace that
/// balances the first `{`.
fn balanced_brace_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut seen_open = false;
    for (offset, c) in text.char_indices() {
        match c {
            '{' => {
                depth += 1;
                seen_open = true;
            }
            '}' => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
                if depth == 0 && seen_open {
                    return Some(offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

// ============================================================================
// Fenced-block discovery
// ============================================================================

/// One fenced code block pulled out of a markdown payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FencedBlock {
    /// Language tag following the opening fence, if any.
    pub lang: Option<String>,
    /// Block body, fences excluded.
    pub body: String,
    /// Position of the body within the original markdown.
    pub span: SourceSpan,
}

/// Enumerate fenced blocks. An unterminated final fence still yields a
/// block running to the end of input.
pub fn fenced_blocks(markdown: &str) -> Vec<FencedBlock> {
    let mut blocks = Vec::new();
    let mut body_lines: Vec<&str> = Vec::new();
    let mut lang: Option<String> = None;
    let mut in_fence = false;
    let mut body_start = 0usize;
    let mut offset = 0usize;

    for line in markdown.split_inclusive('\n') {
        let bare = line.strip_suffix('\n').unwrap_or(line);
        let trimmed = bare.trim_start();
        let is_fence = trimmed.starts_with("```");
        if !in_fence && is_fence {
            let tag = trimmed.trim_start_matches('`').trim();
            lang = if tag.is_empty() {
                None
            } else {
                Some(tag.to_string())
            };
            in_fence = true;
            body_lines.clear();
            body_start = offset + line.len();
        } else if in_fence && is_fence && trimmed.chars().all(|c| c == '`') {
            blocks.push(FencedBlock {
                lang: lang.take(),
                body: body_lines.join(""),
                span: SourceSpan::from_byte_offset(markdown, body_start, offset),
            });
            in_fence = false;
        } else if in_fence {
            body_lines.push(line);
        }
        offset += line.len();
    }

    if in_fence {
        blocks.push(FencedBlock {
            lang,
            body: body_lines.join(""),
            span: SourceSpan::from_byte_offset(markdown, body_start, markdown.len()),
        });
    }

    for b in &mut blocks {
        // Bodies keep interior newlines but not a dangling final one.
        if b.body.ends_with('\n') {
            b.body.pop();
        }
    }
    blocks
}

fn looks_like_operation(body: &str) -> bool {
    let trimmed = body.trim_start();
    trimmed.starts_with('{')
        || ["query", "mutation", "subscription", "fragment"]
            .iter()
            .any(|kw| {
                trimmed.starts_with(kw)
                    && trimmed[kw.len()..]
                        .chars()
                        .next()
                        .map_or(true, |c| !c.is_ascii_alphanumeric() && c != '_')
            })
}

/// Locate candidate query-language operations inside arbitrary markdown.
///
/// Strict pass first: fenced blocks explicitly tagged as a query language.
/// Only when that yields nothing, a fallback pass accepts any fenced block
/// whose content structurally resembles an operation. Generated text labels
/// its fences inconsistently, hence the two tiers.
pub fn query_operation_blocks(markdown: &str) -> Vec<String> {
    let blocks = fenced_blocks(markdown);

    let strict: Vec<String> = blocks
        .iter()
        .filter(|b| {
            matches!(
                b.lang.as_deref().map(str::to_ascii_lowercase).as_deref(),
                Some("graphql") | Some("gql")
            )
        })
        .map(|b| b.body.clone())
        .collect();
    if !strict.is_empty() {
        return strict;
    }

    blocks
        .into_iter()
        .filter(|b| looks_like_operation(&b.body))
        .map(|b| b.body)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
