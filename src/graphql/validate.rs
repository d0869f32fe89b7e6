//! Structural validation of parsed documents against a schema
//!
//! Post-parse checks: field existence, leaf/composite selection discipline,
//! argument presence and literal typing, fragment consistency, and variable
//! consistency. Every violation is reported individually; nothing is merged.

use std::collections::{BTreeMap, BTreeSet};

use super::ast::*;
use super::schema::{SchemaDocument, TypeKind};

/// Validate every operation and fragment in `doc`. Returns one message per
/// violation, in source order.
pub fn validate_document(doc: &Document, schema: &SchemaDocument) -> Vec<String> {
    let mut walker = Walker::new(doc, schema);
    walker.run(doc);
    walker.violations
}

struct Walker<'a> {
    schema: &'a SchemaDocument,
    fragments: BTreeMap<&'a str, &'a FragmentDefinition>,
    violations: Vec<String>,
    used_fragments: BTreeSet<&'a str>,
}

impl<'a> Walker<'a> {
    fn new(doc: &'a Document, schema: &'a SchemaDocument) -> Self {
        let fragments = doc.fragments().map(|f| (f.name.as_str(), f)).collect();
        Self {
            schema,
            fragments,
            violations: Vec::new(),
            used_fragments: BTreeSet::new(),
        }
    }

    fn run(&mut self, doc: &'a Document) {
        for fragment in doc.fragments() {
            self.check_fragment_definition(fragment);
        }
        for op in doc.operations() {
            self.check_operation(op);
        }
        // Unused fragments, reported after all operations had the chance
        // to spread them.
        let unused: Vec<&str> = self
            .fragments
            .keys()
            .filter(|name| !self.used_fragments.contains(*name))
            .copied()
            .collect();
        for name in unused {
            self.violations
                .push(format!("Fragment \"{}\" is never used.", name));
        }
    }

    fn check_fragment_definition(&mut self, fragment: &'a FragmentDefinition) {
        if !self.schema.has_type(&fragment.type_condition) {
            self.violations.push(format!(
                "Unknown type \"{}\" in fragment \"{}\".",
                fragment.type_condition, fragment.name
            ));
            return;
        }
        self.check_selection_set(&fragment.type_condition, &fragment.selection_set);
    }

    fn check_operation(&mut self, op: &'a Operation) {
        let root = match op.kind {
            OperationKind::Query => self.schema.query_type.as_deref(),
            OperationKind::Mutation => self.schema.mutation_type.as_deref(),
            OperationKind::Subscription => self.schema.subscription_type.as_deref(),
        };

        for var in &op.variables {
            let base = var.var_type.base_name();
            if !self.schema.has_type(base) {
                self.violations.push(format!(
                    "Unknown type \"{}\" for variable \"${}\".",
                    base, var.name
                ));
            }
        }

        match root {
            Some(root) => self.check_selection_set(root, &op.selection_set),
            None => self.violations.push(format!(
                "Schema does not define a {} operation type.",
                op.kind.as_str()
            )),
        }

        self.check_variables(op);
    }

    fn check_selection_set(&mut self, type_name: &str, selections: &'a [Selection]) {
        let Some(type_def) = self.schema.type_def(type_name) else {
            return;
        };

        for selection in selections {
            match selection {
                Selection::Field(field) => self.check_field(type_def.name.as_str(), field),
                Selection::FragmentSpread { name, .. } => {
                    match self.fragments.get(name.as_str()) {
                        Some(_) => {
                            self.used_fragments.insert(name.as_str());
                        }
                        None => self
                            .violations
                            .push(format!("Unknown fragment \"{}\".", name)),
                    }
                }
                Selection::InlineFragment {
                    type_condition,
                    selection_set,
                    ..
                } => match type_condition {
                    Some(cond) if !self.schema.has_type(cond) => {
                        self.violations
                            .push(format!("Unknown type \"{}\" in inline fragment.", cond));
                    }
                    Some(cond) => self.check_selection_set(cond, selection_set),
                    None => self.check_selection_set(type_name, selection_set),
                },
            }
        }
    }

    fn check_field(&mut self, parent_type: &str, field: &'a Field) {
        // Introspection meta-fields are always legal; their subtrees follow
        // the meta-schema, which this checker does not model.
        if field.name.starts_with("__") {
            return;
        }

        let field_def = {
            let Some(parent) = self.schema.type_def(parent_type) else {
                return;
            };
            match parent.fields.get(&field.name) {
                Some(def) => def.clone(),
                None => {
                    self.violations.push(format!(
                        "Cannot query field \"{}\" on type \"{}\".",
                        field.name, parent_type
                    ));
                    return;
                }
            }
        };

        // Arguments: unknown, missing-required, literal typing.
        for (arg_name, arg_value) in &field.arguments {
            match field_def.args.get(arg_name) {
                Some(arg_def) => self.check_value(arg_value, &arg_def.type_name, arg_name, field),
                None => self.violations.push(format!(
                    "Unknown argument \"{}\" on field \"{}.{}\".",
                    arg_name, parent_type, field.name
                )),
            }
        }
        for arg_def in field_def.args.values() {
            let provided = field.arguments.iter().any(|(n, _)| n == &arg_def.name);
            if arg_def.required && !provided {
                self.violations.push(format!(
                    "Field \"{}\" argument \"{}\" of type \"{}\" is required, but it was not provided.",
                    field.name, arg_def.name, arg_def.type_name
                ));
            }
        }

        // Leaf/composite discipline, then recursion.
        let composite = self
            .schema
            .type_def(&field_def.type_name)
            .map(|t| t.kind.is_composite())
            .unwrap_or(false);
        if composite && field.selection_set.is_empty() {
            self.violations.push(format!(
                "Field \"{}\" of type \"{}\" must have a selection of subfields.",
                field.name, field_def.type_name
            ));
        } else if !composite && !field.selection_set.is_empty() {
            self.violations.push(format!(
                "Field \"{}\" must not have a selection since type \"{}\" has no subfields.",
                field.name, field_def.type_name
            ));
        } else if composite {
            self.check_selection_set(&field_def.type_name, &field.selection_set);
        }
    }

    fn check_value(&mut self, value: &Value, expected: &str, arg_name: &str, field: &Field) {
        // Variables and nulls are judged by the variable checks, not here.
        match value {
            Value::Variable(_) | Value::Null => return,
            Value::List(items) => {
                for item in items {
                    self.check_value(item, expected, arg_name, field);
                }
                return;
            }
            _ => {}
        }

        let Some(expected_def) = self.schema.type_def(expected) else {
            return;
        };

        let ok = match expected_def.kind {
            TypeKind::Enum => match value {
                Value::Enum(name) => {
                    if expected_def.enum_values.iter().any(|v| v == name) {
                        true
                    } else {
                        self.violations.push(format!(
                            "Value \"{}\" is not a valid value for enum \"{}\".",
                            name, expected
                        ));
                        return;
                    }
                }
                _ => false,
            },
            TypeKind::Scalar => match expected {
                "Int" => matches!(value, Value::Int(_)),
                "Float" => matches!(value, Value::Int(_) | Value::Float(_)),
                "String" => matches!(value, Value::Str(_)),
                "Boolean" => matches!(value, Value::Bool(_)),
                "ID" => matches!(value, Value::Str(_) | Value::Int(_)),
                // Custom scalars accept any literal.
                _ => true,
            },
            TypeKind::InputObject => matches!(value, Value::Object(_)),
            // Composite output types are never argument types; parse noise.
            _ => true,
        };

        if !ok {
            self.violations.push(format!(
                "Argument \"{}\" on field \"{}\" has an invalid value: expected type \"{}\".",
                arg_name, field.name, expected
            ));
        }
    }

    /// Variable declaration/usage consistency for one operation, including
    /// uses inside transitively spread fragments.
    fn check_variables(&mut self, op: &'a Operation) {
        let mut used: BTreeSet<&str> = BTreeSet::new();
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        self.collect_variable_uses(&op.selection_set, &mut used, &mut visited);

        let declared: BTreeSet<&str> = op.variables.iter().map(|v| v.name.as_str()).collect();

        for name in used.difference(&declared) {
            self.violations
                .push(format!("Variable \"${}\" is not defined.", name));
        }
        for name in declared.difference(&used) {
            self.violations
                .push(format!("Variable \"${}\" is never used.", name));
        }
    }

    fn collect_variable_uses(
        &self,
        selections: &'a [Selection],
        used: &mut BTreeSet<&'a str>,
        visited: &mut BTreeSet<&'a str>,
    ) {
        for selection in selections {
            match selection {
                Selection::Field(field) => {
                    for (_, value) in &field.arguments {
                        let mut names = Vec::new();
                        value.variable_names(&mut names);
                        used.extend(names);
                    }
                    self.collect_variable_uses(&field.selection_set, used, visited);
                }
                Selection::FragmentSpread { name, .. } => {
                    if visited.insert(name.as_str()) {
                        if let Some(fragment) = self.fragments.get(name.as_str()) {
                            self.collect_variable_uses(&fragment.selection_set, used, visited);
                        }
                    }
                }
                Selection::InlineFragment { selection_set, .. } => {
                    self.collect_variable_uses(selection_set, used, visited);
                }
            }
        }
    }
}
