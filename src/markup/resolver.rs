//! Schema resolution strategies
//!
//! A resolver maps a component tag name to its structural schema. It is
//! built once per validation call from a `ResolverSpec`; an unsupported
//! package identifier fails construction before any usage is inspected.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config;

use super::schema::{SchemaStore, StructuralSchema};

/// Caller-supplied description of how schemas are found for this call.
#[derive(Clone, Debug)]
pub enum ResolverSpec {
    /// Exact tag-to-schema lookup. No normalization, no fallback naming.
    Explicit(BTreeMap<String, StructuralSchema>),
    /// A named package whose schemas live in the supplied store.
    Package { name: String, store: SchemaStore },
}

impl ResolverSpec {
    pub fn explicit(pairs: Vec<(&str, StructuralSchema)>) -> Self {
        ResolverSpec::Explicit(
            pairs
                .into_iter()
                .map(|(tag, schema)| (tag.to_string(), schema))
                .collect(),
        )
    }

    pub fn package(name: impl Into<String>, store: SchemaStore) -> Self {
        ResolverSpec::Package {
            name: name.into(),
            store,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("Unsupported package \"{0}\"")]
    UnsupportedPackage(String),
}

#[derive(Debug)]
enum Strategy<'a> {
    Explicit(&'a BTreeMap<String, StructuralSchema>),
    /// Package-declared tag mapping; schema registered as `{TypeName}Props`.
    TagMapping {
        tags: &'a BTreeMap<String, String>,
        store: &'a SchemaStore,
    },
    /// Conventional naming: `{PascalTag}Props`, `{PascalTag}`, raw tag.
    Conventional { store: &'a SchemaStore },
}

#[derive(Debug)]
pub struct SchemaResolver<'a> {
    strategy: Strategy<'a>,
}

impl<'a> SchemaResolver<'a> {
    pub fn build(spec: &'a ResolverSpec) -> Result<Self, ResolverError> {
        let strategy = match spec {
            ResolverSpec::Explicit(map) => Strategy::Explicit(map),
            ResolverSpec::Package { name, store } => {
                let package = config::builtin_package(name)
                    .ok_or_else(|| ResolverError::UnsupportedPackage(name.clone()))?;
                if package.tag_types.is_empty() {
                    Strategy::Conventional { store }
                } else {
                    Strategy::TagMapping {
                        tags: &package.tag_types,
                        store,
                    }
                }
            }
        };
        Ok(Self { strategy })
    }

    pub fn resolve(&self, tag: &str) -> Option<&'a StructuralSchema> {
        match &self.strategy {
            Strategy::Explicit(map) => map.get(tag),
            Strategy::TagMapping { tags, store } => tags
                .get(tag)
                .and_then(|type_name| store.get(&format!("{}Props", type_name))),
            Strategy::Conventional { store } => {
                let pascal = pascal_case(tag);
                store
                    .get(&format!("{}Props", pascal))
                    .or_else(|| store.get(&pascal))
                    .or_else(|| store.get(tag))
            }
        }
    }
}

/// "s-button" -> "SButton"
fn pascal_case(tag: &str) -> String {
    tag.split(['-', '_'])
        .filter(|seg| !seg.is_empty())
        .map(|seg| {
            let mut chars = seg.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::schema::{AttributeSpec, AttributeType};

    fn schema_with(attr: &str) -> StructuralSchema {
        StructuralSchema::new().attribute(attr, AttributeSpec::new(AttributeType::Any))
    }

    #[test]
    fn test_explicit_lookup_is_exact() {
        let spec = ResolverSpec::explicit(vec![("s-button", schema_with("variant"))]);
        let resolver = SchemaResolver::build(&spec).unwrap();
        assert!(resolver.resolve("s-button").is_some());
        // No normalization of any kind.
        assert!(resolver.resolve("S-Button").is_none());
        assert!(resolver.resolve("s-badge").is_none());
    }

    #[test]
    fn test_tag_mapping_uses_props_convention() {
        let mut store = SchemaStore::new();
        store.insert("ButtonProps", schema_with("variant"));
        let spec = ResolverSpec::package("polaris", store);
        let resolver = SchemaResolver::build(&spec).unwrap();
        assert!(resolver.resolve("s-button").is_some());
        // Mapped tag whose Props schema is absent.
        assert!(resolver.resolve("s-badge").is_none());
        // Unmapped tag.
        assert!(resolver.resolve("x-widget").is_none());
    }

    #[test]
    fn test_conventional_naming_order() {
        let mut store = SchemaStore::new();
        store.insert("SButtonProps", schema_with("from-props"));
        store.insert("SButton", schema_with("from-pascal"));
        store.insert("s-badge", schema_with("from-raw"));
        let spec = ResolverSpec::package("web-components", store);
        let resolver = SchemaResolver::build(&spec).unwrap();

        let button = resolver.resolve("s-button").unwrap();
        assert!(button.attributes.contains_key("from-props"));
        let badge = resolver.resolve("s-badge").unwrap();
        assert!(badge.attributes.contains_key("from-raw"));
        assert!(resolver.resolve("s-banner").is_none());
    }

    #[test]
    fn test_unsupported_package_is_hard_error() {
        let spec = ResolverSpec::package("mystery-kit", SchemaStore::new());
        let err = SchemaResolver::build(&spec).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported package \"mystery-kit\"");
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("s-button"), "SButton");
        assert_eq!(pascal_case("ui-nav-menu"), "UiNavMenu");
        assert_eq!(pascal_case("badge"), "Badge");
    }
}
