//! Markup tree produced by the tolerant scanner

use std::fmt;

/// One attribute value as written in the source.
///
/// Expression values keep their source text and are never evaluated.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Str(String),
    Number(f64),
    Bool(bool),
    Expression(String),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Str(s) => write!(f, "\"{}\"", s),
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Expression(src) => write!(f, "{{{}}}", src),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
    pub offset: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    pub self_closing: bool,
    pub offset: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Element(Element),
    Text { text: String, offset: usize },
    Expression { source: String, offset: usize },
    Comment { offset: usize },
}
