//! Component-markup validation
//!
//! Discovers component usages (markup elements and factory calls), resolves
//! each tag to a structural schema, and applies the schema in strict mode.
//! Parse noise never aborts the walk; resolver construction is the only
//! per-call hard failure.

pub mod ast;
pub mod parser;
pub mod resolver;
pub mod schema;
pub mod usage;

pub use ast::AttributeValue;
pub use resolver::{ResolverError, ResolverSpec, SchemaResolver};
pub use schema::{AttributeSpec, AttributeType, SchemaStore, StructuralSchema};
pub use usage::ComponentUsage;

use crate::config::WalkerConfig;
use crate::outcome::ValidationOutcome;

/// Validate one markup code block with the default walker configuration.
pub fn validate(code: &str, spec: &ResolverSpec) -> ValidationOutcome {
    validate_with_config(code, spec, &WalkerConfig::default())
}

pub fn validate_with_config(
    code: &str,
    spec: &ResolverSpec,
    cfg: &WalkerConfig,
) -> ValidationOutcome {
    if code.trim().is_empty() {
        return ValidationOutcome::invalid_input("markup code block is empty");
    }

    let resolver = match SchemaResolver::build(spec) {
        Ok(resolver) => resolver,
        Err(err) => return ValidationOutcome::failed(err.to_string()),
    };

    let usages = usage::collect(code, cfg);
    if usages.is_empty() {
        return ValidationOutcome::success(
            "Markup code block has nothing to validate (no component usages found)",
        );
    }

    let mut violations: Vec<String> = Vec::new();
    let mut validated: Vec<&str> = Vec::new();
    for usage in &usages {
        match resolver.resolve(&usage.tag_name) {
            Some(schema) => {
                let problems = schema.validate(&usage.attributes);
                if problems.is_empty() {
                    if !validated.contains(&usage.tag_name.as_str()) {
                        validated.push(&usage.tag_name);
                    }
                } else {
                    violations.extend(
                        problems
                            .into_iter()
                            .map(|p| format!("{}: {}", usage.tag_name, p)),
                    );
                }
            }
            None => violations.push(format!(
                "{}: unknown component \"<{}>\"",
                usage.tag_name, usage.tag_name
            )),
        }
    }

    if violations.is_empty() {
        ValidationOutcome::success(format!(
            "Markup code block is valid ({})",
            validated.join(", ")
        ))
    } else {
        ValidationOutcome::failed(format!(
            "Markup code block failed schema validation: {}",
            violations.join("; ")
        ))
    }
}
