//! Schema documents for query validation
//!
//! The schema is an externally supplied, pre-fetched contract - this module
//! only models and deserializes it. Retrieval and caching belong to the
//! caller; the core never mutates or caches schema documents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("introspection document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("introspection document has no __schema object")]
    MissingSchema,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl TypeKind {
    /// Composite types require a sub-selection; leaves must not have one.
    pub fn is_composite(&self) -> bool {
        matches!(self, TypeKind::Object | TypeKind::Interface | TypeKind::Union)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArgDef {
    pub name: String,
    pub type_name: String,
    pub required: bool,
}

impl ArgDef {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            required,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    /// Innermost named type of the field's return type.
    pub type_name: String,
    pub args: BTreeMap<String, ArgDef>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            args: BTreeMap::new(),
        }
    }

    pub fn with_arg(mut self, arg: ArgDef) -> Self {
        self.args.insert(arg.name.clone(), arg);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
    pub fields: BTreeMap<String, FieldDef>,
    pub enum_values: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub query_type: Option<String>,
    pub mutation_type: Option<String>,
    pub subscription_type: Option<String>,
    pub types: BTreeMap<String, TypeDef>,
}

const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

impl SchemaDocument {
    /// Empty schema seeded with the built-in scalars.
    pub fn new() -> Self {
        let mut doc = Self::default();
        for scalar in BUILTIN_SCALARS {
            doc.add_scalar(scalar);
        }
        doc
    }

    pub fn add_scalar(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.types.insert(
            name.clone(),
            TypeDef {
                name,
                kind: TypeKind::Scalar,
                fields: BTreeMap::new(),
                enum_values: vec![],
            },
        );
    }

    pub fn add_enum(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        self.types.insert(
            name.clone(),
            TypeDef {
                name,
                kind: TypeKind::Enum,
                fields: BTreeMap::new(),
                enum_values: values,
            },
        );
    }

    pub fn add_object(&mut self, name: impl Into<String>, fields: Vec<FieldDef>) {
        let name = name.into();
        self.types.insert(
            name.clone(),
            TypeDef {
                name,
                kind: TypeKind::Object,
                fields: fields.into_iter().map(|f| (f.name.clone(), f)).collect(),
                enum_values: vec![],
            },
        );
    }

    /// Set the root query type name (the type must be added separately).
    pub fn set_query_type(&mut self, name: impl Into<String>) {
        self.query_type = Some(name.into());
    }

    pub fn set_mutation_type(&mut self, name: impl Into<String>) {
        self.mutation_type = Some(name.into());
    }

    pub fn set_subscription_type(&mut self, name: impl Into<String>) {
        self.subscription_type = Some(name.into());
    }

    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Parse a standard introspection result. Accepts either the full
    /// `{"data": {"__schema": ...}}` envelope or a bare `{"__schema": ...}`.
    pub fn from_introspection_json(json: &str) -> Result<Self, SchemaError> {
        let root: serde_json::Value = serde_json::from_str(json)?;
        let schema_value = root
            .pointer("/data/__schema")
            .or_else(|| root.pointer("/__schema"))
            .ok_or(SchemaError::MissingSchema)?;
        let raw: IntrospectionSchema = serde_json::from_value(schema_value.clone())?;

        let mut doc = SchemaDocument::new();
        doc.query_type = raw.query_type.map(|t| t.name);
        doc.mutation_type = raw.mutation_type.map(|t| t.name);
        doc.subscription_type = raw.subscription_type.map(|t| t.name);

        for t in raw.types {
            let Some(name) = t.name else { continue };
            let kind = match t.kind.as_str() {
                "OBJECT" => TypeKind::Object,
                "INTERFACE" => TypeKind::Interface,
                "UNION" => TypeKind::Union,
                "ENUM" => TypeKind::Enum,
                "INPUT_OBJECT" => TypeKind::InputObject,
                _ => TypeKind::Scalar,
            };
            let fields = t
                .fields
                .unwrap_or_default()
                .into_iter()
                .map(|f| {
                    let args = f
                        .args
                        .into_iter()
                        .map(|a| {
                            let required =
                                a.arg_type.kind == "NON_NULL" && a.default_value.is_none();
                            (
                                a.name.clone(),
                                ArgDef::new(a.name, a.arg_type.base_name(), required),
                            )
                        })
                        .collect();
                    (
                        f.name.clone(),
                        FieldDef {
                            name: f.name,
                            type_name: f.field_type.base_name(),
                            args,
                        },
                    )
                })
                .collect();
            let enum_values = t
                .enum_values
                .unwrap_or_default()
                .into_iter()
                .map(|v| v.name)
                .collect();
            doc.types.insert(
                name.clone(),
                TypeDef {
                    name,
                    kind,
                    fields,
                    enum_values,
                },
            );
        }
        Ok(doc)
    }
}

/// Capability for looking up pre-fetched schema documents by name. Injected
/// per call; implementations own retrieval and caching.
pub trait SchemaProvider {
    fn schema(&self, name: &str) -> Option<&SchemaDocument>;
}

/// Plain in-memory provider.
#[derive(Clone, Debug, Default)]
pub struct SchemaSet {
    schemas: BTreeMap<String, SchemaDocument>,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, schema: SchemaDocument) {
        self.schemas.insert(name.into(), schema);
    }
}

impl SchemaProvider for SchemaSet {
    fn schema(&self, name: &str) -> Option<&SchemaDocument> {
        self.schemas.get(name)
    }
}

// ============================================================================
// Introspection wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct IntrospectionSchema {
    #[serde(rename = "queryType")]
    query_type: Option<NamedTypeRef>,
    #[serde(rename = "mutationType")]
    mutation_type: Option<NamedTypeRef>,
    #[serde(rename = "subscriptionType")]
    subscription_type: Option<NamedTypeRef>,
    #[serde(default)]
    types: Vec<IntrospectionType>,
}

#[derive(Debug, Deserialize)]
struct NamedTypeRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IntrospectionType {
    kind: String,
    name: Option<String>,
    fields: Option<Vec<IntrospectionField>>,
    #[serde(rename = "enumValues")]
    enum_values: Option<Vec<IntrospectionEnumValue>>,
}

#[derive(Debug, Deserialize)]
struct IntrospectionField {
    name: String,
    #[serde(default)]
    args: Vec<IntrospectionArg>,
    #[serde(rename = "type")]
    field_type: IntrospectionTypeRef,
}

#[derive(Debug, Deserialize)]
struct IntrospectionArg {
    name: String,
    #[serde(rename = "type")]
    arg_type: IntrospectionTypeRef,
    #[serde(rename = "defaultValue")]
    default_value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntrospectionTypeRef {
    kind: String,
    name: Option<String>,
    #[serde(rename = "ofType")]
    of_type: Option<Box<IntrospectionTypeRef>>,
}

impl IntrospectionTypeRef {
    fn base_name(&self) -> String {
        match (&self.name, &self.of_type) {
            (Some(name), _) => name.clone(),
            (None, Some(inner)) => inner.base_name(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IntrospectionEnumValue {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_introspection() -> &'static str {
        r#"{
          "data": {
            "__schema": {
              "queryType": { "name": "Query" },
              "mutationType": null,
              "subscriptionType": null,
              "types": [
                {
                  "kind": "OBJECT",
                  "name": "Query",
                  "fields": [
                    {
                      "name": "user",
                      "args": [
                        {
                          "name": "id",
                          "type": { "kind": "NON_NULL", "name": null, "ofType": { "kind": "SCALAR", "name": "ID", "ofType": null } },
                          "defaultValue": null
                        }
                      ],
                      "type": { "kind": "OBJECT", "name": "User", "ofType": null }
                    }
                  ],
                  "enumValues": null
                },
                {
                  "kind": "OBJECT",
                  "name": "User",
                  "fields": [
                    { "name": "name", "args": [], "type": { "kind": "SCALAR", "name": "String", "ofType": null } }
                  ],
                  "enumValues": null
                },
                {
                  "kind": "ENUM",
                  "name": "Role",
                  "fields": null,
                  "enumValues": [ { "name": "ADMIN" }, { "name": "MEMBER" } ]
                }
              ]
            }
          }
        }"#
    }

    #[test]
    fn test_introspection_round_trip() {
        let doc = SchemaDocument::from_introspection_json(sample_introspection()).unwrap();
        assert_eq!(doc.query_type.as_deref(), Some("Query"));

        let query = doc.type_def("Query").unwrap();
        let user = query.fields.get("user").unwrap();
        assert_eq!(user.type_name, "User");
        let id_arg = user.args.get("id").unwrap();
        assert!(id_arg.required);
        assert_eq!(id_arg.type_name, "ID");

        let role = doc.type_def("Role").unwrap();
        assert_eq!(role.kind, TypeKind::Enum);
        assert_eq!(role.enum_values, vec!["ADMIN", "MEMBER"]);
    }

    #[test]
    fn test_bare_schema_envelope_accepted() {
        let doc = SchemaDocument::from_introspection_json(
            r#"{ "__schema": { "queryType": { "name": "Q" }, "types": [] } }"#,
        )
        .unwrap();
        assert_eq!(doc.query_type.as_deref(), Some("Q"));
    }

    #[test]
    fn test_missing_schema_object_is_an_error() {
        let err = SchemaDocument::from_introspection_json(r#"{ "data": {} }"#).unwrap_err();
        assert!(matches!(err, SchemaError::MissingSchema));
    }

    #[test]
    fn test_builtin_scalars_present() {
        let doc = SchemaDocument::new();
        for scalar in ["Int", "Float", "String", "Boolean", "ID"] {
            assert!(doc.has_type(scalar));
            assert!(!doc.type_def(scalar).unwrap().kind.is_composite());
        }
    }

    #[test]
    fn test_schema_set_lookup() {
        let mut set = SchemaSet::new();
        set.insert("admin", SchemaDocument::new());
        assert!(set.schema("admin").is_some());
        assert!(set.schema("storefront").is_none());
    }
}
