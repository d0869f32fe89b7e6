//! Error-tolerant scanner for markup with expression attributes
//!
//! Recognizes elements, quoted/braced/bare attribute values, boolean
//! shorthand, self-closing tags, text, `{expression}` interpolations and
//! HTML comments. Malformed input degrades to text or truncated nodes;
//! the scanner never fails.

use super::ast::{Attribute, AttributeValue, Element, Node};

pub fn parse_markup(source: &str) -> Vec<Node> {
    let mut scanner = Scanner::new(source);
    scanner.parse_nodes(None)
}

struct Scanner<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|&(_, c)| c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|&(o, _)| o)
            .unwrap_or(self.source.len())
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_ws(&mut self) {
        while self.peek().map(|c| c.is_whitespace()).unwrap_or(false) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        let a = self
            .chars
            .get(start)
            .map(|&(o, _)| o)
            .unwrap_or(self.source.len());
        let b = self
            .chars
            .get(end)
            .map(|&(o, _)| o)
            .unwrap_or(self.source.len());
        &self.source[a..b]
    }

    /// Parse sibling nodes until EOF or the matching close tag.
    fn parse_nodes(&mut self, closing: Option<&str>) -> Vec<Node> {
        let mut nodes = Vec::new();
        loop {
            let Some(c) = self.peek() else {
                return nodes;
            };
            if c == '<' && self.peek_at(1) == Some('/') {
                let save = self.pos;
                self.pos += 2;
                let tag = self.take_name();
                self.skip_to_after('>');
                match closing {
                    Some(open) if open == tag => return nodes,
                    // Stray or mismatched close tag. Dropping it keeps the
                    // walk going without inventing structure.
                    _ => {
                        if self.pos == save {
                            self.pos += 1;
                        }
                    }
                }
            } else if self.at_str("<!--") {
                let offset = self.offset();
                self.pos += 4;
                self.skip_to_after_str("-->");
                nodes.push(Node::Comment { offset });
            } else if c == '<' && self.peek_at(1).map(is_name_start).unwrap_or(false) {
                nodes.push(Node::Element(self.parse_element()));
            } else if c == '{' {
                let offset = self.offset();
                let source = self.take_braced();
                nodes.push(Node::Expression { source, offset });
            } else {
                let offset = self.offset();
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == '<' || c == '{' {
                        break;
                    }
                    self.pos += 1;
                }
                let text = self.slice(start, self.pos);
                if self.pos == start {
                    // Lone '<' that opens nothing. Consume as text.
                    self.pos += 1;
                }
                if !text.trim().is_empty() {
                    nodes.push(Node::Text {
                        text: text.to_string(),
                        offset,
                    });
                }
            }
        }
    }

    fn parse_element(&mut self) -> Element {
        let offset = self.offset();
        self.pos += 1; // '<'
        let tag = self.take_name();
        let mut attributes = Vec::new();

        loop {
            self.skip_ws();
            match self.peek() {
                None => {
                    // Unterminated open tag; keep what was scanned.
                    return Element {
                        tag,
                        attributes,
                        children: Vec::new(),
                        self_closing: false,
                        offset,
                    };
                }
                Some('/') if self.peek_at(1) == Some('>') => {
                    self.pos += 2;
                    return Element {
                        tag,
                        attributes,
                        children: Vec::new(),
                        self_closing: true,
                        offset,
                    };
                }
                Some('>') => {
                    self.pos += 1;
                    let children = self.parse_nodes(Some(&tag));
                    return Element {
                        tag,
                        attributes,
                        children,
                        self_closing: false,
                        offset,
                    };
                }
                Some(c) if is_name_start(c) => {
                    attributes.push(self.parse_attribute());
                }
                // Noise inside the open tag.
                Some(_) => {
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_attribute(&mut self) -> Attribute {
        let offset = self.offset();
        let name = self.take_name();
        self.skip_ws();
        if !self.eat('=') {
            // Bare presence is boolean shorthand.
            return Attribute {
                name,
                value: AttributeValue::Bool(true),
                offset,
            };
        }
        self.skip_ws();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == q {
                        break;
                    }
                    self.pos += 1;
                }
                let text = self.slice(start, self.pos).to_string();
                self.eat(q);
                AttributeValue::Str(text)
            }
            Some('{') => AttributeValue::Expression(self.take_braced()),
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || c == '>' || c == '/' {
                        break;
                    }
                    self.pos += 1;
                }
                classify_bare(self.slice(start, self.pos))
            }
        };
        Attribute {
            name,
            value,
            offset,
        }
    }

    /// Consume a balanced `{...}` group, string-aware, and return the inner
    /// source trimmed. An unbalanced group extends to EOF.
    fn take_braced(&mut self) -> String {
        self.pos += 1; // '{'
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                '"' | '\'' | '`' => {
                    let q = c;
                    self.pos += 1;
                    while let Some(c2) = self.peek() {
                        if c2 == '\\' {
                            self.pos += 1;
                        } else if c2 == q {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        let inner = self.slice(start, self.pos).trim().to_string();
        self.eat('}');
        inner
    }

    fn take_name(&mut self) -> String {
        let start = self.pos;
        while self.peek().map(is_name_char).unwrap_or(false) {
            self.pos += 1;
        }
        self.slice(start, self.pos).to_string()
    }

    fn at_str(&self, s: &str) -> bool {
        self.source[self.offset()..].starts_with(s)
    }

    fn skip_to_after(&mut self, end: char) {
        while let Some(c) = self.bump() {
            if c == end {
                return;
            }
        }
    }

    fn skip_to_after_str(&mut self, end: &str) {
        while self.pos < self.chars.len() {
            if self.at_str(end) {
                self.pos += end.chars().count();
                return;
            }
            self.pos += 1;
        }
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' || c == ':'
}

fn classify_bare(text: &str) -> AttributeValue {
    match text {
        "true" => AttributeValue::Bool(true),
        "false" => AttributeValue::Bool(false),
        _ => match text.parse::<f64>() {
            Ok(n) => AttributeValue::Number(n),
            Err(_) => AttributeValue::Str(text.to_string()),
        },
    }
}
