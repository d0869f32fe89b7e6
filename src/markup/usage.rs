//! Component usage discovery
//!
//! Two independent rules feed one `ComponentUsage` stream: markup elements
//! from the tolerant tree, and `name('tag', { attrs })` factory calls found
//! by a string-aware scan of the raw source. Tags on the generic-element
//! denylist are dropped here, before any schema work.

use std::collections::BTreeMap;

use crate::config::WalkerConfig;
use crate::diagnostics::SourceSpan;

use super::ast::{AttributeValue, Node};
use super::parser::parse_markup;

/// One component occurrence, from either discovery rule.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentUsage {
    pub tag_name: String,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub span: SourceSpan,
}

/// Discover every component usage in `source`, in source order per rule.
pub fn collect(source: &str, cfg: &WalkerConfig) -> Vec<ComponentUsage> {
    let mut usages = Vec::new();
    let nodes = parse_markup(source);
    walk_nodes(&nodes, source, cfg, &mut usages);
    collect_factory_calls(source, cfg, &mut usages);
    usages
}

fn walk_nodes(nodes: &[Node], source: &str, cfg: &WalkerConfig, out: &mut Vec<ComponentUsage>) {
    for node in nodes {
        if let Node::Element(el) = node {
            if !cfg.generic_elements.contains(el.tag.as_str()) {
                let mut attributes = BTreeMap::new();
                for attr in &el.attributes {
                    attributes.insert(
                        attr.name.clone(),
                        coerce_numeric(&attr.name, attr.value.clone(), cfg),
                    );
                }
                out.push(ComponentUsage {
                    tag_name: el.tag.clone(),
                    attributes,
                    span: SourceSpan::point(source, el.offset),
                });
            }
            walk_nodes(&el.children, source, cfg, out);
        }
    }
}

/// Markup attribute values are textual; names the config declares numeric
/// are re-read as numbers when the text allows it.
fn coerce_numeric(name: &str, value: AttributeValue, cfg: &WalkerConfig) -> AttributeValue {
    if let AttributeValue::Str(ref s) = value {
        if cfg.numeric_attributes.contains(name) {
            if let Ok(n) = s.trim().parse::<f64>() {
                return AttributeValue::Number(n);
            }
        }
    }
    value
}

/// Scan for two-argument factory calls: an identifier applied to a string
/// (or bare identifier) naming the component and an object literal of
/// attributes. Resumes after the attribute object so calls nested in
/// children arguments are still found.
fn collect_factory_calls(source: &str, cfg: &WalkerConfig, out: &mut Vec<ComponentUsage>) {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i].1;
        match c {
            '/' if next_char(&chars, i) == Some('/') => {
                while i < chars.len() && chars[i].1 != '\n' {
                    i += 1;
                }
            }
            '/' if next_char(&chars, i) == Some('*') => {
                i += 2;
                while i < chars.len() {
                    if chars[i].1 == '*' && next_char(&chars, i) == Some('/') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            '"' | '\'' | '`' => {
                i = skip_string(&chars, i);
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i].1) {
                    i += 1;
                }
                let mut j = i;
                while j < chars.len() && chars[j].1.is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && chars[j].1 == '(' {
                    if let Some((tag, attributes, resume)) = parse_call_args(&chars, j + 1) {
                        if !cfg.generic_elements.contains(tag.as_str()) {
                            let attributes = attributes
                                .into_iter()
                                .map(|(name, value)| {
                                    let value = coerce_numeric(&name, value, cfg);
                                    (name, value)
                                })
                                .collect();
                            out.push(ComponentUsage {
                                tag_name: tag,
                                attributes,
                                span: SourceSpan::point(source, chars[start].0),
                            });
                        }
                        i = resume;
                    }
                }
            }
            _ => i += 1,
        }
    }
}

/// Parse `'tag', { ... }` starting just after the opening paren. Returns the
/// tag, the attribute map and the index just past the object's close brace,
/// or `None` when the call does not match the factory shape.
///
/// The first argument must be a string literal naming the component. A bare
/// identifier there is an ordinary call (`fetch(url, {...})`,
/// `save(e, {...})` inside an expression attribute), not a component usage.
fn parse_call_args(
    chars: &[(usize, char)],
    mut i: usize,
) -> Option<(String, BTreeMap<String, AttributeValue>, usize)> {
    i = skip_ws(chars, i);
    let tag = match chars.get(i)?.1 {
        q @ ('"' | '\'') => {
            i += 1;
            let start = i;
            while i < chars.len() && chars[i].1 != q {
                i += 1;
            }
            let tag: String = chars[start..i].iter().map(|&(_, c)| c).collect();
            i += 1; // closing quote
            tag
        }
        _ => return None,
    };
    if tag.is_empty() {
        return None;
    }

    i = skip_ws(chars, i);
    if chars.get(i)?.1 != ',' {
        return None;
    }
    i = skip_ws(chars, i + 1);
    if chars.get(i)?.1 != '{' {
        return None;
    }
    i += 1;

    let mut attributes = BTreeMap::new();
    loop {
        i = skip_ws(chars, i);
        while chars.get(i).map(|&(_, c)| c) == Some(',') {
            i = skip_ws(chars, i + 1);
        }
        match chars.get(i)?.1 {
            '}' => return Some((tag, attributes, i + 1)),
            q @ ('"' | '\'') => {
                i += 1;
                let start = i;
                while i < chars.len() && chars[i].1 != q {
                    i += 1;
                }
                let key: String = chars[start..i].iter().map(|&(_, c)| c).collect();
                i += 1;
                i = parse_object_value(chars, i, key, &mut attributes)?;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i].1) {
                    i += 1;
                }
                let key: String = chars[start..i].iter().map(|&(_, c)| c).collect();
                i = parse_object_value(chars, i, key, &mut attributes)?;
            }
            // Spreads, computed keys and other noise end the match; the
            // outer scan resumes character by character.
            _ => return None,
        }
    }
}

/// After a key, consume `: value` (or nothing, for shorthand) up to the next
/// top-level comma or close brace. Returns the index of that delimiter.
fn parse_object_value(
    chars: &[(usize, char)],
    mut i: usize,
    key: String,
    attributes: &mut BTreeMap<String, AttributeValue>,
) -> Option<usize> {
    i = skip_ws(chars, i);
    if chars.get(i)?.1 != ':' {
        // `{ disabled }` shorthand references a binding of the same name.
        attributes.insert(key.clone(), AttributeValue::Expression(key));
        return Some(i);
    }
    i = skip_ws(chars, i + 1);

    let start = i;
    let mut depth = 0usize;
    while i < chars.len() {
        let c = chars[i].1;
        match c {
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            ',' if depth == 0 => break,
            '"' | '\'' | '`' => {
                i = skip_string(chars, i);
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    let raw: String = chars[start..i].iter().map(|&(_, c)| c).collect();
    attributes.insert(key, classify_object_value(raw.trim()));
    Some(i)
}

fn classify_object_value(text: &str) -> AttributeValue {
    if text.len() >= 2 {
        let first = text.chars().next();
        let last = text.chars().last();
        if (first == Some('"') && last == Some('"'))
            || (first == Some('\'') && last == Some('\''))
        {
            return AttributeValue::Str(text[1..text.len() - 1].to_string());
        }
    }
    match text {
        "true" => AttributeValue::Bool(true),
        "false" => AttributeValue::Bool(false),
        _ => match text.parse::<f64>() {
            Ok(n) => AttributeValue::Number(n),
            Err(_) => AttributeValue::Expression(text.to_string()),
        },
    }
}

fn next_char(chars: &[(usize, char)], i: usize) -> Option<char> {
    chars.get(i + 1).map(|&(_, c)| c)
}

fn skip_ws(chars: &[(usize, char)], mut i: usize) -> usize {
    while i < chars.len() && chars[i].1.is_whitespace() {
        i += 1;
    }
    i
}

/// Skip a quoted string starting at `i` (the opening quote), honoring
/// backslash escapes. Returns the index just past the closing quote.
fn skip_string(chars: &[(usize, char)], mut i: usize) -> usize {
    let q = chars[i].1;
    i += 1;
    while i < chars.len() {
        match chars[i].1 {
            '\\' => i += 2,
            c if c == q => return i + 1,
            _ => i += 1,
        }
    }
    i
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn usages(source: &str) -> Vec<ComponentUsage> {
        collect(source, &WalkerConfig::default())
    }

    #[test]
    fn test_markup_usage_with_attributes() {
        let found = usages("<s-button variant=\"primary\" disabled>x</s-button>");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag_name, "s-button");
        assert_eq!(
            found[0].attributes.get("variant"),
            Some(&AttributeValue::Str("primary".to_string()))
        );
        assert_eq!(
            found[0].attributes.get("disabled"),
            Some(&AttributeValue::Bool(true))
        );
    }

    #[test]
    fn test_generic_elements_are_ignored() {
        let found = usages("<div class=\"row\"><span>x</span></div>");
        assert!(found.is_empty());
    }

    #[test]
    fn test_component_nested_in_generic_element() {
        let found = usages("<div><s-badge tone=\"info\" /></div>");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag_name, "s-badge");
    }

    #[test]
    fn test_numeric_attribute_coercion() {
        let found = usages("<s-grid width=\"120\" label=\"7\" />");
        assert_eq!(
            found[0].attributes.get("width"),
            Some(&AttributeValue::Number(120.0))
        );
        // Not a configured numeric name, stays a string.
        assert_eq!(
            found[0].attributes.get("label"),
            Some(&AttributeValue::Str("7".to_string()))
        );
    }

    #[test]
    fn test_factory_call_usage() {
        let found = usages("const b = createComponent('s-button', { variant: 'primary', disabled: true });");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag_name, "s-button");
        assert_eq!(
            found[0].attributes.get("variant"),
            Some(&AttributeValue::Str("primary".to_string()))
        );
        assert_eq!(
            found[0].attributes.get("disabled"),
            Some(&AttributeValue::Bool(true))
        );
    }

    #[test]
    fn test_factory_call_expression_value() {
        let found = usages("make('s-badge', { count: items.length, size: 2 })");
        assert_eq!(
            found[0].attributes.get("count"),
            Some(&AttributeValue::Expression("items.length".to_string()))
        );
        assert_eq!(
            found[0].attributes.get("size"),
            Some(&AttributeValue::Number(2.0))
        );
    }

    #[test]
    fn test_factory_call_nested_in_children_argument() {
        let found = usages(
            "root('s-stack', { gap: 2 }, [make('s-button', { variant: 'plain' })])",
        );
        let tags: Vec<&str> = found.iter().map(|u| u.tag_name.as_str()).collect();
        assert_eq!(tags, vec!["s-stack", "s-button"]);
    }

    #[test]
    fn test_non_factory_calls_are_ignored() {
        // Identifier first arguments are ordinary calls, not factory usages.
        let found = usages("console.log('hello', world); fetch(url, { method: 'GET' });");
        assert!(found.is_empty());
        let found = usages("console.log('hello'); sum(1, 2);");
        assert!(found.is_empty());
    }

    #[test]
    fn test_call_inside_expression_attribute_is_not_a_usage() {
        let source = "<s-button variant=\"primary\" onClick={save(e, { id: 1 })}>x</s-button>";
        let found = usages(source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag_name, "s-button");
        assert_eq!(
            found[0].attributes.get("variant"),
            Some(&AttributeValue::Str("primary".to_string()))
        );
    }

    #[test]
    fn test_plain_script_yields_no_usages() {
        let source = "const res = await fetch(url, { method: 'POST' });\nconsole.log(res, { depth: 2 });";
        assert!(usages(source).is_empty());
    }

    #[test]
    fn test_both_rules_merge() {
        let source = "<s-banner tone=\"warning\" />\nmake('s-button', { variant: 'primary' })";
        let found = usages(source);
        let tags: Vec<&str> = found.iter().map(|u| u.tag_name.as_str()).collect();
        assert_eq!(tags, vec!["s-banner", "s-button"]);
    }
}
