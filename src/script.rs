//! General-script syntax validator
//!
//! Error-tolerant checker for JavaScript-shaped snippets. The parser never
//! aborts: malformed regions become explicit `Error` nodes and required
//! tokens that are absent become `Missing` nodes, so a single walk over the
//! finished tree yields every problem with a 1-based line/column.
//!
//! Only syntax is judged. Nothing is executed or type-checked.

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Problem, SourceSpan};
use crate::outcome::ValidationOutcome;

// ============================================================================
// Node tree
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Program,
    /// `{ ... }`
    Block,
    /// `( ... )`
    Paren,
    /// `[ ... ]`
    Bracket,
    /// Any ordinary token (identifier, literal, operator).
    Token,
    /// Malformed region with a description of what went wrong.
    Error(String),
    /// A token the grammar required but the source did not supply.
    Missing(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    /// Byte offset where the node starts.
    pub offset: usize,
    pub children: Vec<Node>,
}

impl Node {
    fn leaf(kind: NodeKind, offset: usize) -> Self {
        Self {
            kind,
            offset,
            children: vec![],
        }
    }
}

// ============================================================================
// Tolerant lexer
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Word(String),
    Punct(char),
    /// Literal (string, template, number) that lexed cleanly.
    Literal,
    /// Lexical error with a description.
    Broken(String),
}

struct Lexed {
    token: Token,
    offset: usize,
}

struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    fn tokens(mut self) -> Vec<Lexed> {
        let mut out = Vec::new();
        while let Some(&(pos, ch)) = self.chars.peek() {
            match ch {
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '/' => {
                    if let Some(tok) = self.comment_or_slash(pos) {
                        out.push(tok);
                    }
                }
                '"' | '\'' => {
                    out.push(self.string(pos, ch));
                }
                '`' => {
                    out.push(self.template(pos));
                }
                c if c.is_ascii_digit() => {
                    out.push(self.number(pos));
                }
                c if c.is_alphabetic() || c == '_' || c == '$' => {
                    out.push(self.word(pos));
                }
                _ => {
                    self.chars.next();
                    out.push(Lexed {
                        token: Token::Punct(ch),
                        offset: pos,
                    });
                }
            }
        }
        out
    }

    /// `//` and `/* */` are skipped; a lone `/` is an operator. An
    /// unterminated block comment is a lexical error.
    fn comment_or_slash(&mut self, pos: usize) -> Option<Lexed> {
        self.chars.next();
        match self.chars.peek().map(|&(_, c)| c) {
            Some('/') => {
                while let Some((_, c)) = self.chars.next() {
                    if c == '\n' {
                        break;
                    }
                }
                None
            }
            Some('*') => {
                self.chars.next();
                let mut prev = ' ';
                for (_, c) in self.chars.by_ref() {
                    if prev == '*' && c == '/' {
                        return None;
                    }
                    prev = c;
                }
                Some(Lexed {
                    token: Token::Broken("unterminated block comment".into()),
                    offset: pos,
                })
            }
            _ => Some(Lexed {
                token: Token::Punct('/'),
                offset: pos,
            }),
        }
    }

    fn string(&mut self, pos: usize, quote: char) -> Lexed {
        self.chars.next();
        while let Some((_, c)) = self.chars.next() {
            match c {
                '\\' => {
                    self.chars.next();
                }
                '\n' => {
                    return Lexed {
                        token: Token::Broken("unterminated string literal".into()),
                        offset: pos,
                    };
                }
                c if c == quote => {
                    return Lexed {
                        token: Token::Literal,
                        offset: pos,
                    };
                }
                _ => {}
            }
        }
        Lexed {
            token: Token::Broken("unterminated string literal".into()),
            offset: pos,
        }
    }

    /// Template literal, including nested `${ ... }` interpolations.
    fn template(&mut self, pos: usize) -> Lexed {
        self.chars.next();
        let mut interp_depth = 0usize;
        while let Some((_, c)) = self.chars.next() {
            match c {
                '\\' => {
                    self.chars.next();
                }
                '$' if self.chars.peek().map(|&(_, c)| c) == Some('{') => {
                    self.chars.next();
                    interp_depth += 1;
                }
                '{' if interp_depth > 0 => interp_depth += 1,
                '}' if interp_depth > 0 => interp_depth -= 1,
                '`' if interp_depth == 0 => {
                    return Lexed {
                        token: Token::Literal,
                        offset: pos,
                    };
                }
                _ => {}
            }
        }
        Lexed {
            token: Token::Broken("unterminated template literal".into()),
            offset: pos,
        }
    }

    fn number(&mut self, pos: usize) -> Lexed {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
                self.chars.next();
            } else {
                break;
            }
        }
        Lexed {
            token: Token::Literal,
            offset: pos,
        }
    }

    fn word(&mut self, pos: usize) -> Lexed {
        let start = pos;
        let mut end = pos;
        while let Some(&(o, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                end = o + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        Lexed {
            token: Token::Word(self.source[start..end].to_string()),
            offset: pos,
        }
    }
}

// ============================================================================
// Tolerant structure parser
// ============================================================================

fn closer_for(open: char) -> char {
    match open {
        '{' => '}',
        '(' => ')',
        '[' => ']',
        _ => unreachable!(),
    }
}

fn group_kind(open: char) -> NodeKind {
    match open {
        '{' => NodeKind::Block,
        '(' => NodeKind::Paren,
        _ => NodeKind::Bracket,
    }
}

struct Parser {
    tokens: Vec<Lexed>,
    pos: usize,
    source_len: usize,
}

impl Parser {
    fn new(tokens: Vec<Lexed>, source_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            source_len,
        }
    }

    fn peek(&self) -> Option<&Lexed> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&Lexed> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_program(mut self) -> Node {
        let mut root = Node {
            kind: NodeKind::Program,
            offset: 0,
            children: vec![],
        };
        while self.peek().is_some() {
            let node = self.parse_item(None);
            root.children.push(node);
        }
        root
    }

    /// Parse one token or delimiter group. `closing` is the closer of the
    /// enclosing group, used to classify stray closers.
    fn parse_item(&mut self, closing: Option<char>) -> Node {
        let Some(lexed) = self.bump() else {
            return Node::leaf(NodeKind::Token, self.source_len);
        };
        let offset = lexed.offset;
        match &lexed.token {
            Token::Broken(msg) => Node::leaf(NodeKind::Error(msg.clone()), offset),
            Token::Punct(c @ ('{' | '(' | '[')) => {
                let open = *c;
                self.parse_group(open, offset)
            }
            Token::Punct(c @ ('}' | ')' | ']')) => {
                // A closer reaching here never matched an opener.
                let c = *c;
                debug_assert!(closing != Some(c));
                Node::leaf(
                    NodeKind::Error(format!("unexpected \"{}\"", c)),
                    offset,
                )
            }
            Token::Word(w) => {
                let word = w.clone();
                self.parse_keyword_form(&word, offset)
            }
            Token::Punct(_) | Token::Literal => Node::leaf(NodeKind::Token, offset),
        }
    }

    fn parse_group(&mut self, open: char, offset: usize) -> Node {
        let close = closer_for(open);
        let mut node = Node {
            kind: group_kind(open),
            offset,
            children: vec![],
        };
        loop {
            match self.peek() {
                Some(l) if l.token == Token::Punct(close) => {
                    self.bump();
                    return node;
                }
                Some(l) => {
                    // Another group's closer means ours is missing; leave
                    // it for the enclosing group to consume.
                    if let Token::Punct(c @ ('}' | ')' | ']')) = l.token {
                        if c != close {
                            node.children.push(Node::leaf(
                                NodeKind::Missing(format!("expected \"{}\"", close)),
                                l.offset,
                            ));
                            return node;
                        }
                    }
                    let child = self.parse_item(Some(close));
                    node.children.push(child);
                }
                None => {
                    node.children.push(Node::leaf(
                        NodeKind::Missing(format!("expected \"{}\"", close)),
                        self.source_len,
                    ));
                    return node;
                }
            }
        }
    }

    /// Construct-header checks for the handful of keywords whose required
    /// punctuation is worth flagging precisely.
    fn parse_keyword_form(&mut self, word: &str, offset: usize) -> Node {
        let wants_paren_then_block = matches!(word, "function");
        let wants_paren = matches!(word, "if" | "for" | "while" | "switch" | "catch");
        if !wants_paren_then_block && !wants_paren {
            return Node::leaf(NodeKind::Token, offset);
        }

        let mut node = Node::leaf(NodeKind::Token, offset);

        // Optional function name.
        if wants_paren_then_block {
            if let Some(Lexed {
                token: Token::Word(_),
                ..
            }) = self.peek()
            {
                self.bump();
            }
        }

        // `for await (...)` iterates async.
        if word == "for" {
            if let Some(Lexed {
                token: Token::Word(w),
                ..
            }) = self.peek()
            {
                if w == "await" {
                    self.bump();
                }
            }
        }

        match self.peek() {
            Some(l) if l.token == Token::Punct('(') => {
                let open_offset = l.offset;
                self.bump();
                node.children.push(self.parse_group('(', open_offset));
            }
            // `catch { ... }` legally omits the binding.
            _ if word == "catch" => {}
            _ => {
                let at = self.peek().map(|l| l.offset).unwrap_or(self.source_len);
                node.children.push(Node::leaf(
                    NodeKind::Missing(format!("expected \"(\" after \"{}\"", word)),
                    at,
                ));
                return node;
            }
        }

        if wants_paren_then_block {
            match self.peek() {
                Some(l) if l.token == Token::Punct('{') => {
                    let open_offset = l.offset;
                    self.bump();
                    node.children.push(self.parse_group('{', open_offset));
                }
                _ => {
                    let at = self.peek().map(|l| l.offset).unwrap_or(self.source_len);
                    node.children.push(Node::leaf(
                        NodeKind::Missing(format!("expected \"{{\" after \"{}\"", word)),
                        at,
                    ));
                }
            }
        }
        node
    }
}

/// Parse into a tolerant node tree. Public for callers that want the tree
/// rather than an outcome.
pub fn parse_tolerant(code: &str) -> Node {
    let tokens = Lexer::new(code).tokens();
    Parser::new(tokens, code.len()).parse_program()
}

// ============================================================================
// Problem collection and outcome
// ============================================================================

fn collect_problems(node: &Node, source: &str, problems: &mut Vec<Problem>) {
    match &node.kind {
        NodeKind::Error(msg) | NodeKind::Missing(msg) => {
            problems.push(Problem::at(
                msg.clone(),
                SourceSpan::point(source, node.offset),
            ));
        }
        _ => {}
    }
    for child in &node.children {
        collect_problems(child, source, problems);
    }
}

/// Validate a general-script snippet. Empty input fails immediately; any
/// problem found in the tolerant tree fails with every problem listed.
pub fn validate(code: &str) -> ValidationOutcome {
    if code.trim().is_empty() {
        return ValidationOutcome::invalid_input("no script code to validate");
    }

    let tree = parse_tolerant(code);
    let mut problems = Vec::new();
    collect_problems(&tree, code, &mut problems);

    if problems.is_empty() {
        ValidationOutcome::success("Script code block has valid syntax")
    } else {
        let listed: Vec<String> = problems.iter().map(Problem::render).collect();
        ValidationOutcome::failed(format!(
            "Script code block has syntax error(s): {}",
            listed.join("; ")
        ))
    }
}
