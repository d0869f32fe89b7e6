//! Batch dispatch over markdown payloads
//!
//! Discovers the code blocks matching a declared kind, routes each through
//! the kind's extraction preset and validator, and reduces the outcomes.
//! Blocks are independent: nothing propagates across unit boundaries, and
//! one malformed block never suppresses its siblings' verdicts.

use tracing::debug;

use crate::config::WalkerConfig;
use crate::extract::{extract_preset, fenced_blocks, query_operation_blocks, Preset};
use crate::graphql::{self, SchemaProvider};
use crate::markup::{self, ResolverSpec};
use crate::outcome::{aggregate, BatchResult, ValidationOutcome};
use crate::{script, systems};

/// Declared domain of a code block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeKind {
    Script,
    Systems,
    Query,
    Markup,
}

impl CodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            CodeKind::Script => "script",
            CodeKind::Systems => "systems",
            CodeKind::Query => "query",
            CodeKind::Markup => "markup",
        }
    }

    fn preset(&self) -> Preset {
        match self {
            CodeKind::Script | CodeKind::Systems => Preset::Script,
            CodeKind::Query => Preset::Query,
            CodeKind::Markup => Preset::Markup,
        }
    }

    fn matches_fence_tag(&self, tag: &str) -> bool {
        let tag = tag.to_ascii_lowercase();
        let tags: &[&str] = match self {
            CodeKind::Script => &["js", "javascript", "ts", "typescript"],
            CodeKind::Systems => &["rust", "rs"],
            CodeKind::Query => &["graphql", "gql"],
            CodeKind::Markup => &["html", "markup", "jsx", "tsx"],
        };
        tags.contains(&tag.as_str())
    }
}

/// Query-language collaborators for one call.
pub struct QueryContext<'a> {
    pub provider: &'a dyn SchemaProvider,
    pub schema_name: &'a str,
}

/// Markup collaborators for one call.
pub struct MarkupContext<'a> {
    pub spec: &'a ResolverSpec,
    pub config: &'a WalkerConfig,
}

/// Borrowed collaborators a validation call may need. All immutable for
/// the duration of the call, which keeps per-block validation pure and
/// order-free.
#[derive(Default)]
pub struct ValidationContext<'a> {
    pub query: Option<QueryContext<'a>>,
    pub markup: Option<MarkupContext<'a>>,
}

impl<'a> ValidationContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, provider: &'a dyn SchemaProvider, schema_name: &'a str) -> Self {
        self.query = Some(QueryContext {
            provider,
            schema_name,
        });
        self
    }

    pub fn with_markup(mut self, spec: &'a ResolverSpec, config: &'a WalkerConfig) -> Self {
        self.markup = Some(MarkupContext { spec, config });
        self
    }
}

/// Validate one raw code block of the declared kind.
pub fn validate_block(kind: CodeKind, raw: &str, ctx: &ValidationContext) -> ValidationOutcome {
    let code = extract_preset(raw, kind.preset());
    debug!(kind = kind.label(), bytes = code.len(), "validating block");
    match kind {
        CodeKind::Script => script::validate(&code),
        CodeKind::Systems => systems::validate(&code),
        CodeKind::Query => match &ctx.query {
            Some(query) => match query.provider.schema(query.schema_name) {
                Some(schema) => graphql::validate(&code, schema),
                None => ValidationOutcome::failed(format!(
                    "Unsupported schema \"{}\"",
                    query.schema_name
                )),
            },
            None => ValidationOutcome::invalid_input(
                "no schema provider supplied for query validation",
            ),
        },
        CodeKind::Markup => match &ctx.markup {
            Some(markup_ctx) => markup::validate_with_config(&code, markup_ctx.spec, markup_ctx.config),
            None => ValidationOutcome::invalid_input(
                "no resolver specification supplied for markup validation",
            ),
        },
    }
}

/// Validate every block of `kind` found in a markdown payload.
///
/// A payload with no fences at all is treated as one raw block of the
/// declared kind. A payload whose fences all belong to other kinds yields
/// a single skipped outcome.
pub fn validate_markdown(kind: CodeKind, markdown: &str, ctx: &ValidationContext) -> BatchResult {
    let blocks = discover_blocks(kind, markdown);
    debug!(kind = kind.label(), blocks = blocks.len(), "dispatching batch");

    if blocks.is_empty() {
        return aggregate(vec![ValidationOutcome::skipped(format!(
            "no {} code blocks found",
            kind.label()
        ))]);
    }

    let outcomes = blocks
        .iter()
        .map(|block| validate_block(kind, block, ctx))
        .collect();
    aggregate(outcomes)
}

fn discover_blocks(kind: CodeKind, markdown: &str) -> Vec<String> {
    if markdown.trim().is_empty() {
        return Vec::new();
    }

    match kind {
        CodeKind::Query => {
            let blocks = query_operation_blocks(markdown);
            if !blocks.is_empty() {
                return blocks;
            }
        }
        _ => {
            let all = fenced_blocks(markdown);
            let had_fences = !all.is_empty();
            let matching: Vec<String> = all
                .into_iter()
                .filter(|b| {
                    b.lang
                        .as_deref()
                        .map(|tag| kind.matches_fence_tag(tag))
                        .unwrap_or(false)
                })
                .map(|b| b.body)
                .collect();
            if !matching.is_empty() {
                return matching;
            }
            if had_fences {
                return Vec::new();
            }
        }
    }

    if fenced_blocks(markdown).is_empty() {
        // Raw payload, no markdown wrapper.
        vec![markdown.to_string()]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::schema::{FieldDef, SchemaDocument, SchemaSet};
    use crate::markup::{AttributeSpec, AttributeType, StructuralSchema};
    use crate::outcome::{render_report, Verdict};
    use pretty_assertions::assert_eq;

    fn query_schemas() -> SchemaSet {
        let mut schema = SchemaDocument::new();
        schema.add_object(
            "Product",
            vec![FieldDef::new("id", "ID"), FieldDef::new("title", "String")],
        );
        schema.add_object("Query", vec![FieldDef::new("product", "Product")]);
        schema.set_query_type("Query");

        let mut set = SchemaSet::new();
        set.insert("admin", schema);
        set
    }

    fn button_spec() -> ResolverSpec {
        ResolverSpec::explicit(vec![(
            "s-button",
            StructuralSchema::new().attribute(
                "variant",
                AttributeSpec::new(AttributeType::Enum {
                    values: vec!["primary".to_string()],
                }),
            ),
        )])
    }

    #[test]
    fn test_script_blocks_from_markdown() {
        let markdown = "Intro.\n```js\nfunction f(){return 1;}\n```\nOutro.";
        let result = validate_markdown(CodeKind::Script, markdown, &ValidationContext::new());
        assert!(result.overall_valid);
        assert_eq!(result.outcome_count(), 1);
        assert!(result.outcomes[0].detail.contains("valid syntax"));
    }

    #[test]
    fn test_raw_payload_without_fences() {
        let result = validate_markdown(
            CodeKind::Script,
            "function f(){return 1;}",
            &ValidationContext::new(),
        );
        assert!(result.overall_valid);
    }

    #[test]
    fn test_zero_matching_blocks_is_skipped_and_invalid() {
        let markdown = "```rust\nfn main() {}\n```";
        let result = validate_markdown(CodeKind::Script, markdown, &ValidationContext::new());
        assert!(!result.overall_valid);
        assert_eq!(result.outcome_count(), 1);
        assert_eq!(result.outcomes[0].verdict, Verdict::Skipped);
        assert!(result.outcomes[0].detail.contains("no script code blocks"));
    }

    #[test]
    fn test_one_bad_block_does_not_suppress_siblings() {
        let markdown = "```js\nfunction f(){return 1;}\n```\n```js\nfunction g(){\n```";
        let result = validate_markdown(CodeKind::Script, markdown, &ValidationContext::new());
        assert!(!result.overall_valid);
        assert_eq!(result.outcome_count(), 2);
        assert_eq!(result.outcomes[0].verdict, Verdict::Success);
        assert_eq!(result.outcomes[1].verdict, Verdict::Failed);

        let report = render_report(&result);
        assert!(report.starts_with("1."));
        assert!(report.contains("\n2."));
        assert!(report.contains("Overall: invalid"));
    }

    #[test]
    fn test_systems_blocks() {
        let markdown = "```rust\nfn double(x: i32) -> i32 { x * 2 }\n```";
        let result = validate_markdown(CodeKind::Systems, markdown, &ValidationContext::new());
        assert!(result.overall_valid);
    }

    #[test]
    fn test_query_happy_path_and_missing_field() {
        let schemas = query_schemas();
        let ctx = ValidationContext::new().with_query(&schemas, "admin");

        let good = "```graphql\nquery { product { id title } }\n```";
        let result = validate_markdown(CodeKind::Query, good, &ctx);
        assert!(result.overall_valid);
        assert!(result.outcomes[0].detail.contains("query"));

        let bad = "```graphql\nquery { product { id price } }\n```";
        let result = validate_markdown(CodeKind::Query, bad, &ctx);
        assert!(!result.overall_valid);
        assert!(result.outcomes[0].detail.contains("Cannot query field"));
    }

    #[test]
    fn test_query_fallback_fence_detection() {
        let schemas = query_schemas();
        let ctx = ValidationContext::new().with_query(&schemas, "admin");
        // Unlabeled fence whose body resembles an operation.
        let markdown = "```\nquery { product { id } }\n```";
        let result = validate_markdown(CodeKind::Query, markdown, &ctx);
        assert!(result.overall_valid);
    }

    #[test]
    fn test_query_unknown_schema_name() {
        let schemas = query_schemas();
        let ctx = ValidationContext::new().with_query(&schemas, "storefront");
        let result = validate_markdown(
            CodeKind::Query,
            "```graphql\n{ product { id } }\n```",
            &ctx,
        );
        assert!(!result.overall_valid);
        assert!(result.outcomes[0]
            .detail
            .starts_with("Unsupported schema \"storefront\""));
    }

    #[test]
    fn test_query_without_provider_is_invalid_input() {
        let result = validate_markdown(
            CodeKind::Query,
            "```graphql\n{ product { id } }\n```",
            &ValidationContext::new(),
        );
        assert!(!result.overall_valid);
        assert!(result.outcomes[0].detail.starts_with("Invalid input:"));
    }

    #[test]
    fn test_markup_blocks() {
        let spec = button_spec();
        let config = WalkerConfig::default();
        let ctx = ValidationContext::new().with_markup(&spec, &config);

        let good = "```html\n<s-button variant=\"primary\">Go</s-button>\n```";
        let result = validate_markdown(CodeKind::Markup, good, &ctx);
        assert!(result.overall_valid);

        let bad = "```html\n<s-button variant=\"primary\" appearance=\"bold\">Go</s-button>\n```";
        let result = validate_markdown(CodeKind::Markup, bad, &ctx);
        assert!(!result.overall_valid);
        assert!(result.outcomes[0].detail.contains("appearance"));
    }

    #[test]
    fn test_empty_payload_is_skipped() {
        let result = validate_markdown(CodeKind::Markup, "  \n", &ValidationContext::new());
        assert!(!result.overall_valid);
        assert_eq!(result.outcomes[0].verdict, Verdict::Skipped);
    }
}
