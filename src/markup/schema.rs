//! Structural schemas for component attributes
//!
//! A schema declares the permitted attribute shape of one component.
//! Validation is strict: attributes the schema does not declare are
//! violations, never silently ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ast::AttributeValue;

/// Declared value type of one attribute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Number,
    Boolean,
    Enum { values: Vec<String> },
    Any,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    #[serde(flatten)]
    pub value: AttributeType,
    #[serde(default)]
    pub required: bool,
}

impl AttributeSpec {
    pub fn new(value: AttributeType) -> Self {
        Self {
            value,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// One violation message, or `None` when the value satisfies the spec.
    ///
    /// Expression values cannot be evaluated, so they pass every type check
    /// except an enum's, which demands a literal member.
    fn check(&self, name: &str, value: &AttributeValue) -> Option<String> {
        match (&self.value, value) {
            (AttributeType::Any, _) => None,
            (AttributeType::Enum { .. }, AttributeValue::Expression(src)) => Some(format!(
                "attribute \"{}\" has an unverifiable expression value {{{}}} where an enum literal is required",
                name, src
            )),
            (_, AttributeValue::Expression(_)) => None,
            (AttributeType::String, AttributeValue::Str(_)) => None,
            (AttributeType::String, other) => Some(mismatch(name, "a string", other)),
            (AttributeType::Number, AttributeValue::Number(_)) => None,
            (AttributeType::Number, other) => Some(mismatch(name, "a number", other)),
            (AttributeType::Boolean, AttributeValue::Bool(_)) => None,
            (AttributeType::Boolean, other) => Some(mismatch(name, "a boolean", other)),
            (AttributeType::Enum { values }, AttributeValue::Str(s)) => {
                if values.iter().any(|v| v == s) {
                    None
                } else {
                    Some(format!(
                        "attribute \"{}\" must be one of [{}], got \"{}\"",
                        name,
                        values.join(", "),
                        s
                    ))
                }
            }
            (AttributeType::Enum { .. }, other) => Some(mismatch(name, "an enum string", other)),
        }
    }
}

fn mismatch(name: &str, expected: &str, got: &AttributeValue) -> String {
    format!("attribute \"{}\" expects {}, got {}", name, expected, got)
}

/// Permitted attribute shape of one component.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct StructuralSchema {
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeSpec>,
}

impl StructuralSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, name: impl Into<String>, spec: AttributeSpec) -> Self {
        self.attributes.insert(name.into(), spec);
        self
    }

    /// Strict validation of one usage's attributes. Returns every violation,
    /// in attribute order.
    pub fn validate(&self, attrs: &BTreeMap<String, AttributeValue>) -> Vec<String> {
        let mut violations = Vec::new();
        for (name, value) in attrs {
            match self.attributes.get(name) {
                Some(spec) => {
                    if let Some(violation) = spec.check(name, value) {
                        violations.push(violation);
                    }
                }
                None => violations.push(format!("unknown attribute \"{}\"", name)),
            }
        }
        for (name, spec) in &self.attributes {
            if spec.required && !attrs.contains_key(name) {
                violations.push(format!("required attribute \"{}\" is missing", name));
            }
        }
        violations
    }
}

/// Named schema registry, supplied externally per validation call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaStore {
    schemas: BTreeMap<String, StructuralSchema>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, schema: StructuralSchema) {
        self.schemas.insert(name.into(), schema);
    }

    pub fn get(&self, name: &str) -> Option<&StructuralSchema> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Fold another store in; later entries win on name collision.
    pub fn merge(&mut self, other: SchemaStore) {
        self.schemas.extend(other.schemas);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn button_schema() -> StructuralSchema {
        StructuralSchema::new()
            .attribute(
                "variant",
                AttributeSpec::new(AttributeType::Enum {
                    values: vec!["primary".to_string(), "secondary".to_string()],
                }),
            )
            .attribute("disabled", AttributeSpec::new(AttributeType::Boolean))
            .attribute("width", AttributeSpec::new(AttributeType::Number))
            .attribute(
                "label",
                AttributeSpec::new(AttributeType::String).required(),
            )
    }

    fn attrs(pairs: Vec<(&str, AttributeValue)>) -> BTreeMap<String, AttributeValue> {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_valid_attributes_pass() {
        let violations = button_schema().validate(&attrs(vec![
            ("variant", AttributeValue::Str("primary".to_string())),
            ("disabled", AttributeValue::Bool(true)),
            ("width", AttributeValue::Number(120.0)),
            ("label", AttributeValue::Str("Save".to_string())),
        ]));
        assert!(violations.is_empty(), "{:?}", violations);
    }

    #[test]
    fn test_undeclared_attribute_is_strict_violation() {
        let violations = button_schema().validate(&attrs(vec![
            ("label", AttributeValue::Str("Save".to_string())),
            ("appearance", AttributeValue::Str("bold".to_string())),
        ]));
        assert_eq!(violations, vec!["unknown attribute \"appearance\""]);
    }

    #[test]
    fn test_enum_membership() {
        let violations = button_schema().validate(&attrs(vec![
            ("label", AttributeValue::Str("Save".to_string())),
            ("variant", AttributeValue::Str("tertiary".to_string())),
        ]));
        assert_eq!(
            violations,
            vec!["attribute \"variant\" must be one of [primary, secondary], got \"tertiary\""]
        );
    }

    #[test]
    fn test_type_mismatches() {
        let violations = button_schema().validate(&attrs(vec![
            ("label", AttributeValue::Str("Save".to_string())),
            ("disabled", AttributeValue::Str("yes".to_string())),
            ("width", AttributeValue::Str("wide".to_string())),
        ]));
        assert_eq!(
            violations,
            vec![
                "attribute \"disabled\" expects a boolean, got \"yes\"",
                "attribute \"width\" expects a number, got \"wide\"",
            ]
        );
    }

    #[test]
    fn test_required_attribute_missing() {
        let violations = button_schema().validate(&attrs(vec![(
            "disabled",
            AttributeValue::Bool(true),
        )]));
        assert_eq!(violations, vec!["required attribute \"label\" is missing"]);
    }

    #[test]
    fn test_expression_passes_except_for_enum() {
        let violations = button_schema().validate(&attrs(vec![
            ("label", AttributeValue::Str("Save".to_string())),
            ("width", AttributeValue::Expression("size * 2".to_string())),
        ]));
        assert!(violations.is_empty(), "{:?}", violations);

        let violations = button_schema().validate(&attrs(vec![
            ("label", AttributeValue::Str("Save".to_string())),
            ("variant", AttributeValue::Expression("kind".to_string())),
        ]));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("unverifiable expression"));
    }

    #[test]
    fn test_schema_yaml_round_trip() {
        let yaml = "\
attributes:
  variant:
    type: enum
    values: [primary, secondary]
    required: true
  disabled:
    type: boolean
  width:
    type: number
";
        let schema: StructuralSchema = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(schema.attributes.len(), 3);
        let variant = &schema.attributes["variant"];
        assert!(variant.required);
        assert_eq!(
            variant.value,
            AttributeType::Enum {
                values: vec!["primary".to_string(), "secondary".to_string()]
            }
        );
        assert!(!schema.attributes["disabled"].required);
    }
}
