//! Query-language parser
//!
//! Nom-based grammar for executable documents. Spans are tracked the same
//! way the rest of the crate's nom code does it: by comparing remaining
//! input length against the original source.

use nom::{
    branch::alt,
    bytes::complete::{escaped, tag, take_while},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace1, none_of, one_of},
    combinator::{all_consuming, cut, map, opt, recognize, value},
    multi::{many0, many1},
    sequence::{pair, preceded, tuple},
    IResult,
};

use crate::diagnostics::Problem;

use super::ast::*;

type PResult<'a, T> = IResult<&'a str, T>;

// ============================================================================
// Public API
// ============================================================================

/// Parse a complete executable document.
///
/// On failure the returned problem points at the byte where parsing gave
/// up, converted to 1-based line/column.
pub fn parse_document(source: &str) -> Result<Document, Problem> {
    let result = all_consuming(tuple((
        many1(preceded(ws, |i| definition(i, source))),
        ws,
    )))(source);

    match result {
        Ok((_, (definitions, _))) => Ok(Document { definitions }),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let offset = source.len() - e.input.len();
            Err(Problem::at_offset("syntax error", source, offset))
        }
        Err(nom::Err::Incomplete(_)) => Err(Problem::new("syntax error: incomplete input")),
    }
}

// ============================================================================
// Lexical helpers
// ============================================================================

/// Ignored tokens: whitespace, commas, and `#` comments.
fn ws(input: &str) -> PResult<'_, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), char(',')),
            value((), pair(char('#'), take_while(|c| c != '\n'))),
        ))),
    )(input)
}

fn name(input: &str) -> PResult<'_, String> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
    .map(|(rest, matched)| (rest, matched.to_string()))
}

fn fail(input: &str) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag))
}

// ============================================================================
// Definitions
// ============================================================================

fn definition<'a>(input: &'a str, original: &'a str) -> PResult<'a, Definition> {
    alt((
        map(|i| fragment_definition(i, original), Definition::Fragment),
        map(|i| operation(i, original), Definition::Operation),
    ))(input)
}

fn operation<'a>(input: &'a str, original: &'a str) -> PResult<'a, Operation> {
    let offset = original.len() - input.len();

    // Shorthand form: a bare selection set is an anonymous query. A
    // failure from inside the set is a committed parse error, not a cue
    // to try the keyword form.
    match selection_set(input, original) {
        Ok((rest, selection_set)) => {
            return Ok((
                rest,
                Operation {
                    kind: OperationKind::Query,
                    name: None,
                    variables: vec![],
                    selection_set,
                    offset,
                },
            ));
        }
        Err(err @ nom::Err::Failure(_)) => return Err(err),
        Err(_) => {}
    }

    let (input, kind_word) = name(input)?;
    let kind = match kind_word.as_str() {
        "query" => OperationKind::Query,
        "mutation" => OperationKind::Mutation,
        "subscription" => OperationKind::Subscription,
        _ => return Err(fail(input)),
    };

    let (input, _) = ws(input)?;
    let (input, op_name) = opt(name)(input)?;
    let (input, variables) = opt(|i| variable_definitions(i, original))(input)?;
    let (input, _) = directives(input)?;
    let (input, selection_set) = cut(|i| selection_set(i, original))(input)?;

    Ok((
        input,
        Operation {
            kind,
            name: op_name,
            variables: variables.unwrap_or_default(),
            selection_set,
            offset,
        },
    ))
}

fn fragment_definition<'a>(input: &'a str, original: &'a str) -> PResult<'a, FragmentDefinition> {
    let offset = original.len() - input.len();
    let (input, kw) = name(input)?;
    if kw != "fragment" {
        return Err(fail(input));
    }
    let (input, _) = ws(input)?;
    let (input, frag_name) = name(input)?;
    if frag_name == "on" {
        return Err(fail(input));
    }
    let (input, _) = ws(input)?;
    let (input, _) = tag("on")(input)?;
    let (input, _) = ws(input)?;
    let (input, type_condition) = cut(name)(input)?;
    let (input, _) = directives(input)?;
    let (input, selection_set) = cut(|i| selection_set(i, original))(input)?;

    Ok((
        input,
        FragmentDefinition {
            name: frag_name,
            type_condition,
            selection_set,
            offset,
        },
    ))
}

// ============================================================================
// Variable definitions and types
// ============================================================================

fn variable_definitions<'a>(
    input: &'a str,
    original: &'a str,
) -> PResult<'a, Vec<VariableDefinition>> {
    let (input, _) = ws(input)?;
    let (input, _) = char('(')(input)?;
    let (input, defs) = many1(|i| variable_definition(i, original))(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = cut(char(')'))(input)?;
    Ok((input, defs))
}

fn variable_definition<'a>(input: &'a str, original: &'a str) -> PResult<'a, VariableDefinition> {
    let (input, _) = ws(input)?;
    let offset = original.len() - input.len();
    let (input, _) = char('$')(input)?;
    let (input, var_name) = cut(name)(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = cut(char(':'))(input)?;
    let (input, var_type) = cut(type_ref)(input)?;
    let (input, default) = opt(preceded(
        tuple((ws, char('='))),
        |i| value_literal(i),
    ))(input)?;

    Ok((
        input,
        VariableDefinition {
            name: var_name,
            var_type,
            default,
            offset,
        },
    ))
}

fn type_ref(input: &str) -> PResult<'_, TypeRef> {
    let (input, _) = ws(input)?;
    let (input, base) = alt((list_type, map(name, TypeRef::Named)))(input)?;
    let (input, bang) = opt(char('!'))(input)?;
    let t = if bang.is_some() {
        TypeRef::NonNull(Box::new(base))
    } else {
        base
    };
    Ok((input, t))
}

fn list_type(input: &str) -> PResult<'_, TypeRef> {
    let (input, _) = char('[')(input)?;
    let (input, inner) = type_ref(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char(']')(input)?;
    Ok((input, TypeRef::List(Box::new(inner))))
}

// ============================================================================
// Selections
// ============================================================================

fn selection_set<'a>(input: &'a str, original: &'a str) -> PResult<'a, Vec<Selection>> {
    let (input, _) = ws(input)?;
    let (input, _) = char('{')(input)?;
    let (input, selections) = many1(|i| selection(i, original))(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = cut(char('}'))(input)?;
    Ok((input, selections))
}

fn selection<'a>(input: &'a str, original: &'a str) -> PResult<'a, Selection> {
    let (input, _) = ws(input)?;
    alt((|i| fragment_selection(i, original), |i| field(i, original)))(input)
}

/// `...Name`, `... on Type { ... }`, or `... { ... }`.
fn fragment_selection<'a>(input: &'a str, original: &'a str) -> PResult<'a, Selection> {
    let offset = original.len() - input.len();
    let (input, _) = tag("...")(input)?;
    let (input, _) = ws(input)?;

    if let Ok((after_name, first)) = name(input) {
        if first == "on" {
            let (input, _) = ws(after_name)?;
            let (input, type_condition) = cut(name)(input)?;
            let (input, _) = directives(input)?;
            let (input, selection_set) = cut(|i| selection_set(i, original))(input)?;
            return Ok((
                input,
                Selection::InlineFragment {
                    type_condition: Some(type_condition),
                    selection_set,
                    offset,
                },
            ));
        }
        let (input, _) = directives(after_name)?;
        return Ok((input, Selection::FragmentSpread { name: first, offset }));
    }

    // Inline fragment without a type condition.
    let (input, _) = directives(input)?;
    let (input, selection_set) = cut(|i| selection_set(i, original))(input)?;
    Ok((
        input,
        Selection::InlineFragment {
            type_condition: None,
            selection_set,
            offset,
        },
    ))
}

fn field<'a>(input: &'a str, original: &'a str) -> PResult<'a, Selection> {
    let offset = original.len() - input.len();
    let (input, first) = name(input)?;
    let (input, _) = ws(input)?;

    // `alias: name`
    let (input, alias, field_name) = match char::<_, nom::error::Error<&str>>(':')(input) {
        Ok((rest, _)) => {
            let (rest, _) = ws(rest)?;
            let (rest, real) = cut(name)(rest)?;
            (rest, Some(first), real)
        }
        Err(_) => (input, None, first),
    };

    let (input, arguments) = opt(argument_list)(input)?;
    let (input, _) = directives(input)?;
    let (input, selection_set) = opt(|i| selection_set(i, original))(input)?;

    Ok((
        input,
        Selection::Field(Field {
            alias,
            name: field_name,
            arguments: arguments.unwrap_or_default(),
            selection_set: selection_set.unwrap_or_default(),
            offset,
        }),
    ))
}

// ============================================================================
// Arguments, directives, values
// ============================================================================

fn argument_list(input: &str) -> PResult<'_, Vec<(String, Value)>> {
    let (input, _) = ws(input)?;
    let (input, _) = char('(')(input)?;
    let (input, args) = many1(argument)(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = cut(char(')'))(input)?;
    Ok((input, args))
}

fn argument(input: &str) -> PResult<'_, (String, Value)> {
    let (input, _) = ws(input)?;
    let (input, arg_name) = name(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char(':')(input)?;
    let (input, arg_value) = cut(value_literal)(input)?;
    Ok((input, (arg_name, arg_value)))
}

/// Directives are parsed and discarded; validating their legality is a
/// schema concern this checker does not model.
fn directives(input: &str) -> PResult<'_, ()> {
    let (input, _) = many0(one_directive)(input)?;
    Ok((input, ()))
}

fn one_directive(input: &str) -> PResult<'_, ()> {
    let (input, _) = ws(input)?;
    let (input, _) = char('@')(input)?;
    let (input, _) = cut(name)(input)?;
    let (input, _) = opt(argument_list)(input)?;
    Ok((input, ()))
}

fn value_literal(input: &str) -> PResult<'_, Value> {
    let (input, _) = ws(input)?;
    alt((
        variable_value,
        string_value,
        number_value,
        list_value,
        object_value,
        word_value,
    ))(input)
}

fn variable_value(input: &str) -> PResult<'_, Value> {
    let (input, _) = char('$')(input)?;
    let (input, var_name) = cut(name)(input)?;
    Ok((input, Value::Variable(var_name)))
}

fn string_value(input: &str) -> PResult<'_, Value> {
    let (input, _) = char('"')(input)?;
    let (input, content) = opt(escaped(none_of("\"\\"), '\\', one_of("\"\\/bfnrtu")))(input)?;
    let (input, _) = cut(char('"'))(input)?;
    Ok((input, Value::Str(content.unwrap_or_default().to_string())))
}

fn number_value(input: &str) -> PResult<'_, Value> {
    let (rest, matched) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)?;

    if matched.contains(['.', 'e', 'E']) {
        match matched.parse::<f64>() {
            Ok(f) => Ok((rest, Value::Float(f))),
            Err(_) => Err(fail(input)),
        }
    } else {
        match matched.parse::<i64>() {
            Ok(i) => Ok((rest, Value::Int(i))),
            Err(_) => Err(fail(input)),
        }
    }
}

fn list_value(input: &str) -> PResult<'_, Value> {
    let (input, _) = char('[')(input)?;
    let (input, items) = many0(value_literal)(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = cut(char(']'))(input)?;
    Ok((input, Value::List(items)))
}

fn object_value(input: &str) -> PResult<'_, Value> {
    let (input, _) = char('{')(input)?;
    let (input, entries) = many0(object_entry)(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = cut(char('}'))(input)?;
    Ok((input, Value::Object(entries)))
}

fn object_entry(input: &str) -> PResult<'_, (String, Value)> {
    let (input, _) = ws(input)?;
    let (input, key) = name(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char(':')(input)?;
    let (input, v) = cut(value_literal)(input)?;
    Ok((input, (key, v)))
}

/// `true` / `false` / `null` / enum value, disambiguated after the fact so
/// that enum values with those prefixes lex correctly.
fn word_value(input: &str) -> PResult<'_, Value> {
    let (input, word) = name(input)?;
    let v = match word.as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => Value::Enum(word),
    };
    Ok((input, v))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorthand_query() {
        let doc = parse_document("{ viewer { login } }").unwrap();
        assert_eq!(doc.definitions.len(), 1);
        let op = doc.operations().next().unwrap();
        assert_eq!(op.kind, OperationKind::Query);
        assert!(op.name.is_none());
    }

    #[test]
    fn test_named_operation_with_variables() {
        let doc =
            parse_document("query GetUser($id: ID!, $first: Int = 10) { user(id: $id) { name } }")
                .unwrap();
        let op = doc.operations().next().unwrap();
        assert_eq!(op.name.as_deref(), Some("GetUser"));
        assert_eq!(op.variables.len(), 2);
        assert_eq!(op.variables[0].name, "id");
        assert_eq!(op.variables[0].var_type.base_name(), "ID");
        assert!(matches!(op.variables[1].default, Some(Value::Int(10))));
    }

    #[test]
    fn test_mutation_kind() {
        let doc = parse_document("mutation { save(input: { title: \"x\" }) { id } }").unwrap();
        assert_eq!(doc.operations().next().unwrap().kind, OperationKind::Mutation);
    }

    #[test]
    fn test_fragments_and_spreads() {
        let doc = parse_document(
            "query { user { ...UserBits ... on Admin { level } } }\nfragment UserBits on User { name }",
        )
        .unwrap();
        assert_eq!(doc.fragments().count(), 1);
        let op = doc.operations().next().unwrap();
        let Selection::Field(user) = &op.selection_set[0] else {
            panic!("expected field");
        };
        assert!(matches!(
            user.selection_set[0],
            Selection::FragmentSpread { .. }
        ));
        assert!(matches!(
            user.selection_set[1],
            Selection::InlineFragment { .. }
        ));
    }

    #[test]
    fn test_aliases_arguments_and_comments() {
        let doc = parse_document(
            "# fetch two sizes\nquery {\n  small: avatar(size: 32)\n  big: avatar(size: 64)\n}",
        )
        .unwrap();
        let op = doc.operations().next().unwrap();
        assert_eq!(op.selection_set.len(), 2);
        let Selection::Field(f) = &op.selection_set[0] else {
            panic!("expected field");
        };
        assert_eq!(f.alias.as_deref(), Some("small"));
        assert_eq!(f.name, "avatar");
        assert_eq!(f.arguments[0].0, "size");
    }

    #[test]
    fn test_directives_are_accepted() {
        let doc =
            parse_document("query Q($flag: Boolean!) { user @include(if: $flag) { name } }")
                .unwrap();
        assert_eq!(doc.operations().count(), 1);
    }

    #[test]
    fn test_value_kinds() {
        let doc = parse_document(
            "{ f(a: 1, b: -2.5, c: \"s\", d: true, e: null, g: RED, h: [1, 2], i: { k: $v }) }",
        )
        .unwrap();
        let op = doc.operations().next().unwrap();
        let Selection::Field(f) = &op.selection_set[0] else {
            panic!("expected field");
        };
        assert_eq!(f.arguments.len(), 8);
        assert!(matches!(f.arguments[1].1, Value::Float(_)));
        assert!(matches!(f.arguments[5].1, Value::Enum(_)));
        let mut vars = Vec::new();
        f.arguments[7].1.variable_names(&mut vars);
        assert_eq!(vars, vec!["v"]);
    }

    #[test]
    fn test_unclosed_selection_set_fails_with_position() {
        let err = parse_document("query { user { name }").unwrap_err();
        assert!(err.message.contains("syntax error"));
        assert!(err.span.is_some());
    }

    #[test]
    fn test_empty_selection_set_fails() {
        assert!(parse_document("query { }").is_err());
    }

    #[test]
    fn test_trailing_garbage_fails() {
        assert!(parse_document("{ a } lorem ipsum").is_err());
    }

    #[test]
    fn test_error_offset_is_line_aware() {
        let err = parse_document("{\n  ok\n  !broken\n}").unwrap_err();
        let span = err.span.unwrap();
        assert_eq!(span.start_line, 3);
    }
}
