//! Walker configuration and schema module loading
//!
//! Denylists/allowlists are explicit immutable data handed to the walker,
//! not embedded literals, so callers and tests can override them. Schema
//! modules load from a directory of YAML files.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::markup::schema::{SchemaStore, StructuralSchema};

/// Generic markup elements that carry no structural schema by construction.
/// Usages of these tags are ignored, never reported as unknown components.
static GENERIC_ELEMENTS: Lazy<BTreeSet<String>> = Lazy::new(|| {
    [
        "a", "article", "aside", "b", "blockquote", "br", "button", "code", "div", "em",
        "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "i", "img",
        "input", "label", "li", "main", "nav", "ol", "option", "p", "pre", "section",
        "select", "small", "span", "strong", "table", "tbody", "td", "textarea", "th",
        "thead", "tr", "ul",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
});

/// Attribute names whose textual values are read as numbers.
static NUMERIC_ATTRIBUTES: Lazy<BTreeSet<String>> = Lazy::new(|| {
    [
        "cols", "colspan", "height", "max", "maxlength", "min", "minlength", "rows",
        "rowspan", "size", "step", "tabindex", "width",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
});

/// Immutable per-call configuration for the usage walker.
#[derive(Clone, Debug, PartialEq)]
pub struct WalkerConfig {
    pub generic_elements: BTreeSet<String>,
    pub numeric_attributes: BTreeSet<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            generic_elements: GENERIC_ELEMENTS.clone(),
            numeric_attributes: NUMERIC_ATTRIBUTES.clone(),
        }
    }
}

/// Metadata of one external schema module: the package name and, when the
/// package declares one, its markup-tag to logical-type mapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    /// Empty for packages resolved by conventional schema naming.
    #[serde(default)]
    pub tag_types: BTreeMap<String, String>,
}

impl PackageSpec {
    pub fn conventional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag_types: BTreeMap::new(),
        }
    }

    pub fn with_tag_types(name: impl Into<String>, pairs: &[(&str, &str)]) -> Self {
        Self {
            name: name.into(),
            tag_types: pairs
                .iter()
                .map(|(tag, ty)| (tag.to_string(), ty.to_string()))
                .collect(),
        }
    }
}

/// Built-in package identifiers. Anything else is a hard resolver error.
static BUILTIN_PACKAGES: Lazy<BTreeMap<String, PackageSpec>> = Lazy::new(|| {
    let mut packages = BTreeMap::new();
    let polaris = PackageSpec::with_tag_types(
        "polaris",
        &[
            ("s-badge", "Badge"),
            ("s-banner", "Banner"),
            ("s-box", "Box"),
            ("s-button", "Button"),
            ("s-icon", "Icon"),
            ("s-link", "Link"),
            ("s-stack", "Stack"),
            ("s-text", "Text"),
        ],
    );
    packages.insert(polaris.name.clone(), polaris);
    let generic = PackageSpec::conventional("web-components");
    packages.insert(generic.name.clone(), generic);
    packages
});

pub fn builtin_package(name: &str) -> Option<&'static PackageSpec> {
    BUILTIN_PACKAGES.get(name)
}

/// One YAML schema module file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SchemaModule {
    #[serde(default)]
    schemas: BTreeMap<String, StructuralSchema>,
}

/// Loads schema modules from a directory of YAML files.
pub struct SchemaLoader {
    schema_dir: String,
}

impl SchemaLoader {
    pub fn new(schema_dir: impl Into<String>) -> Self {
        Self {
            schema_dir: schema_dir.into(),
        }
    }

    /// Create loader from BLOCKCHECK_SCHEMA_DIR env var or default to "schemas"
    pub fn from_env() -> Self {
        let dir =
            std::env::var("BLOCKCHECK_SCHEMA_DIR").unwrap_or_else(|_| "schemas".to_string());
        Self::new(dir)
    }

    pub fn schema_dir(&self) -> &str {
        &self.schema_dir
    }

    /// Load every `*.yaml`/`*.yml` module in the directory and merge them
    /// into one store. Later files win on schema-name collision.
    pub fn load(&self) -> Result<SchemaStore> {
        let dir = Path::new(&self.schema_dir);
        info!("Loading schema modules from {}", dir.display());

        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read schema directory {}", dir.display()))?;

        let mut paths: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut store = SchemaStore::new();
        for path in paths {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let module: SchemaModule = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            for (name, schema) in module.schemas {
                store.insert(name, schema);
            }
        }

        info!("Loaded {} schemas", store.len());
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_walker_config_contents() {
        let cfg = WalkerConfig::default();
        assert!(cfg.generic_elements.contains("div"));
        assert!(cfg.generic_elements.contains("span"));
        assert!(!cfg.generic_elements.contains("s-button"));
        assert!(cfg.numeric_attributes.contains("width"));
        assert!(!cfg.numeric_attributes.contains("variant"));
    }

    #[test]
    fn test_builtin_packages() {
        let polaris = builtin_package("polaris").unwrap();
        assert_eq!(polaris.tag_types.get("s-button").map(String::as_str), Some("Button"));
        let generic = builtin_package("web-components").unwrap();
        assert!(generic.tag_types.is_empty());
        assert!(builtin_package("mystery-kit").is_none());
    }

    #[test]
    fn test_schema_loader_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("buttons.yaml"),
            "schemas:\n  ButtonProps:\n    attributes:\n      variant:\n        type: enum\n        values: [primary]\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("badges.yml"),
            "schemas:\n  BadgeProps:\n    attributes:\n      tone:\n        type: string\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = SchemaLoader::new(dir.path().to_string_lossy().to_string())
            .load()
            .unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.contains("ButtonProps"));
        assert!(store.contains("BadgeProps"));
    }

    #[test]
    fn test_schema_loader_missing_directory_errors() {
        let err = SchemaLoader::new("/nonexistent/blockcheck-schemas")
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read schema directory"));
    }
}
