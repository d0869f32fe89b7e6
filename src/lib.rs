//! blockcheck-core: validation engine for machine-generated code blocks
//!
//! Checks code snippets embedded in markdown for syntactic correctness and,
//! for component markup, structural conformance to a schema, without ever
//! executing the snippet. Pure logic with NO network or database
//! dependencies:
//! - Extraction passes that isolate code payloads from markdown wrappers
//! - Tolerant general-script parser with error/missing nodes
//! - Systems-language checker over real item and statement grammars
//! - Query-language parser plus structural validation against an
//!   introspection schema
//! - Component-usage walker with pluggable schema resolution
//! - Batch dispatch and pure outcome aggregation
//!
//! Schema retrieval and caching stay with the caller; this crate only
//! consumes pre-fetched documents.

pub mod batch;
pub mod config;
pub mod diagnostics;
pub mod extract;
pub mod graphql;
pub mod markup;
pub mod outcome;
pub mod script;
pub mod systems;

// Re-export commonly used types
pub use batch::{validate_block, validate_markdown, CodeKind, ValidationContext};
pub use config::{PackageSpec, SchemaLoader, WalkerConfig};
pub use diagnostics::{byte_to_line_col, Problem, SourceSpan};
pub use extract::{extract, extract_preset, fenced_blocks, ExtractionOptions, Preset};
pub use graphql::{SchemaDocument, SchemaProvider, SchemaSet};
pub use markup::{
    AttributeSpec, AttributeType, AttributeValue, ComponentUsage, ResolverError, ResolverSpec,
    SchemaResolver, SchemaStore, StructuralSchema,
};
pub use outcome::{aggregate, render_report, BatchResult, ValidationOutcome, Verdict};
