//! Model loading and structural validation
//!
//! A model artifact is parsed into a [`ModelDocument`] and then compiled into
//! a [`ModelHandle`]. Compilation is where the structural self-check happens:
//! every field reference is resolved to a slot, every constant is checked for
//! finiteness and every regression table is matched against the declared
//! target categories. A document that fails any check never yields a handle.

use crate::artifact::{
    DataField, Expression, FieldUsage, MiningFunction, ModelDocument, ModelSpec, RegressionSpec,
};
use crate::handle::{
    DerivedSlot, Expr, InputField, ModelHandle, ModelInfo, RegressionGraph, RegressionTable,
    SlotTokenizer, TargetField, Term,
};
use crate::text::Tokenizer;
use docclass_core::{DataType, Error, FieldValue, Result};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Load a model from any byte stream
pub fn load(mut reader: impl Read) -> Result<ModelHandle> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| Error::model_load("artifact", format!("failed to read artifact: {}", e)))?;
    load_bytes(&bytes)
}

/// Load a model from an in-memory artifact
pub fn load_bytes(bytes: &[u8]) -> Result<ModelHandle> {
    let document = ModelDocument::from_slice(bytes)?;
    let handle = compile(document)?;

    info!(
        model = %handle.info().name,
        version = %handle.info().version,
        inputs = handle.input_fields().len(),
        derived_fields = handle.derived_field_count(),
        categories = handle.primary_target().categories.len(),
        "Model loaded and verified"
    );

    Ok(handle)
}

/// Load a model from a file on disk
pub fn load_file(path: impl AsRef<Path>) -> Result<ModelHandle> {
    let path = path.as_ref();
    debug!("Loading model artifact from {}", path.display());

    let file = File::open(path).map_err(|e| {
        Error::model_load(
            format!("artifact '{}'", path.display()),
            format!("cannot open file: {}", e),
        )
    })?;
    load(BufReader::new(file))
}

/// Whether a slot holds text or a number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    Text,
    Numeric,
}

/// Name resolution state while compiling the transformation graph
struct Scope {
    slots: HashMap<String, (usize, SlotKind)>,
    input_count: usize,
    tokenizers: Vec<SlotTokenizer>,
}

impl Scope {
    fn lookup(&self, name: &str, element: &str) -> Result<(usize, SlotKind)> {
        self.slots.get(name).copied().ok_or_else(|| {
            Error::model_load(
                element,
                format!("references unknown or not yet defined field '{}'", name),
            )
        })
    }

    fn intern_tokenizer(
        &mut self,
        slot: usize,
        pattern: &str,
        case_sensitive: bool,
        element: &str,
    ) -> Result<usize> {
        if let Some(idx) = self.tokenizers.iter().position(|t| {
            t.slot == slot
                && t.tokenizer.pattern() == pattern
                && t.tokenizer.case_sensitive() == case_sensitive
        }) {
            return Ok(idx);
        }

        let separator = Regex::new(pattern).map_err(|e| {
            Error::model_load(element, format!("invalid word separator pattern: {}", e))
        })?;
        self.tokenizers.push(SlotTokenizer {
            slot,
            tokenizer: Tokenizer::new(separator, case_sensitive),
        });
        Ok(self.tokenizers.len() - 1)
    }
}

/// Validate a parsed document and compile it into an immutable handle
pub fn compile(document: ModelDocument) -> Result<ModelHandle> {
    if document.header.name.trim().is_empty() {
        return Err(Error::model_load("header", "model name is empty"));
    }

    let dictionary = index_dictionary(&document.data_dictionary)?;
    let (inputs, target) = resolve_mining_schema(&document, &dictionary)?;

    let mut scope = Scope {
        slots: HashMap::new(),
        input_count: inputs.len(),
        tokenizers: Vec::new(),
    };
    for (idx, field) in inputs.iter().enumerate() {
        let kind = match field.data_type {
            DataType::String => SlotKind::Text,
            _ => SlotKind::Numeric,
        };
        scope.slots.insert(field.name.clone(), (idx, kind));
    }

    let mut derived = Vec::with_capacity(document.transformations.len());
    for (idx, field) in document.transformations.iter().enumerate() {
        let element = format!("transformations[{}] '{}'", idx, field.name);
        if field.name.is_empty() {
            return Err(Error::model_load(element, "derived field name is empty"));
        }
        if dictionary.contains_key(field.name.as_str()) || scope.slots.contains_key(&field.name) {
            return Err(Error::model_load(element, "derived field name is already defined"));
        }

        let (expr, kind) = compile_expression(&field.expression, &element, &mut scope)?;
        if kind != SlotKind::Numeric {
            return Err(Error::model_load(element, "derived field must be numeric"));
        }

        let slot = scope.input_count + derived.len();
        scope.slots.insert(field.name.clone(), (slot, SlotKind::Numeric));
        derived.push(DerivedSlot {
            name: field.name.clone(),
            expr,
        });
    }

    let ModelSpec::Regression(spec) = &document.model;
    let regression = compile_regression(spec, &target, &scope)?;

    Ok(ModelHandle {
        info: ModelInfo {
            name: document.header.name.clone(),
            version: document.header.version.clone(),
            description: document.header.description.clone(),
        },
        inputs,
        targets: vec![target],
        tokenizers: scope.tokenizers,
        derived,
        regression,
    })
}

/// Dictionary field with its valid values parsed by the declared type
struct DictionaryEntry<'a> {
    field: &'a DataField,
    values: Vec<FieldValue>,
}

fn index_dictionary(fields: &[DataField]) -> Result<HashMap<&str, DictionaryEntry<'_>>> {
    let mut dictionary = HashMap::with_capacity(fields.len());
    for (idx, field) in fields.iter().enumerate() {
        let element = format!("data_dictionary[{}] '{}'", idx, field.name);
        if field.name.is_empty() {
            return Err(Error::model_load(element, "field name is empty"));
        }

        let mut values = Vec::with_capacity(field.values.len());
        for literal in &field.values {
            let value = field.data_type.parse(literal).ok_or_else(|| {
                Error::model_load(
                    &element,
                    format!("valid value '{}' is not a {} literal", literal, field.data_type),
                )
            })?;
            values.push(value);
        }

        if dictionary
            .insert(field.name.as_str(), DictionaryEntry { field, values })
            .is_some()
        {
            return Err(Error::model_load(element, "duplicate field name"));
        }
    }
    Ok(dictionary)
}

fn resolve_mining_schema(
    document: &ModelDocument,
    dictionary: &HashMap<&str, DictionaryEntry<'_>>,
) -> Result<(Vec<InputField>, TargetField)> {
    let mut seen = HashSet::new();
    let mut inputs = Vec::new();
    let mut targets = Vec::new();

    for mining in &document.mining_schema {
        let element = format!("mining_schema field '{}'", mining.name);
        let entry = dictionary
            .get(mining.name.as_str())
            .ok_or_else(|| Error::model_load(&element, "field is not in the data dictionary"))?;
        let data_field = entry.field;
        if !seen.insert(mining.name.as_str()) {
            return Err(Error::model_load(element, "field is listed twice"));
        }

        match mining.usage {
            FieldUsage::Active => {
                let replacement = match &mining.missing_value_replacement {
                    Some(literal) => {
                        let value = data_field.data_type.parse(literal).ok_or_else(|| {
                            Error::model_load(
                                &element,
                                format!(
                                    "missing value replacement '{}' is not a {} literal",
                                    literal, data_field.data_type
                                ),
                            )
                        })?;
                        Some(value)
                    }
                    None => None,
                };

                let field = InputField {
                    name: mining.name.clone(),
                    data_type: data_field.data_type,
                    valid_values: entry.values.clone(),
                    invalid_value_treatment: mining.invalid_value_treatment,
                    missing_value_replacement: replacement,
                };
                if let Some(value) = &field.missing_value_replacement {
                    if !field.accepts(value) {
                        return Err(Error::model_load(
                            element,
                            "missing value replacement is not a valid value",
                        ));
                    }
                }
                inputs.push(field);
            }
            FieldUsage::Target => {
                if data_field.data_type != DataType::String {
                    return Err(Error::model_load(element, "target field must be string typed"));
                }
                if data_field.values.is_empty() {
                    return Err(Error::model_load(element, "target field declares no categories"));
                }
                let unique: HashSet<&String> = data_field.values.iter().collect();
                if unique.len() != data_field.values.len() {
                    return Err(Error::model_load(element, "target categories are not unique"));
                }
                targets.push(TargetField {
                    name: mining.name.clone(),
                    categories: data_field.values.clone(),
                });
            }
        }
    }

    if inputs.is_empty() {
        return Err(Error::model_load("mining_schema", "no active input field"));
    }
    if targets.len() != 1 {
        return Err(Error::model_load(
            "mining_schema",
            format!("expected exactly one target field, found {}", targets.len()),
        ));
    }

    let target = targets.remove(0);
    Ok((inputs, target))
}

fn compile_expression(
    expression: &Expression,
    element: &str,
    scope: &mut Scope,
) -> Result<(Expr, SlotKind)> {
    match expression {
        Expression::FieldRef { field } => {
            let (slot, kind) = scope.lookup(field, element)?;
            Ok((Expr::Slot(slot), kind))
        }
        Expression::Constant { value } => {
            if !value.is_finite() {
                return Err(Error::model_load(element, "constant is not finite"));
            }
            Ok((Expr::Constant(*value), SlotKind::Numeric))
        }
        Expression::TextIndex(spec) => {
            let (slot, kind) = scope.lookup(&spec.field, element)?;
            if kind != SlotKind::Text || slot >= scope.input_count {
                return Err(Error::model_load(
                    element,
                    format!("text index field '{}' is not a string input field", spec.field),
                ));
            }

            let tokenizer =
                scope.intern_tokenizer(slot, &spec.word_separator, spec.case_sensitive, element)?;
            let term = scope.tokenizers[tokenizer].tokenizer.tokenize(&spec.term);
            if term.is_empty() {
                return Err(Error::model_load(element, "text index term is empty"));
            }

            Ok((
                Expr::TextIndex {
                    slot,
                    tokenizer,
                    term,
                    weights: spec.local_term_weights,
                },
                SlotKind::Numeric,
            ))
        }
        Expression::Apply {
            function,
            arguments,
        } => {
            let (min, max) = function.arity();
            if arguments.len() < min || max.is_some_and(|max| arguments.len() > max) {
                return Err(Error::model_load(
                    element,
                    format!(
                        "function {:?} does not accept {} arguments",
                        function,
                        arguments.len()
                    ),
                ));
            }

            let mut args = Vec::with_capacity(arguments.len());
            for argument in arguments {
                let (arg, kind) = compile_expression(argument, element, scope)?;
                if kind != SlotKind::Numeric {
                    return Err(Error::model_load(
                        element,
                        format!("function {:?} expects numeric arguments", function),
                    ));
                }
                args.push(arg);
            }

            Ok((
                Expr::Apply {
                    function: *function,
                    args,
                },
                SlotKind::Numeric,
            ))
        }
    }
}

fn compile_regression(
    spec: &RegressionSpec,
    target: &TargetField,
    scope: &Scope,
) -> Result<RegressionGraph> {
    if spec.function != MiningFunction::Classification {
        return Err(Error::model_load("model", "only classification models are supported"));
    }
    if spec.target != target.name {
        return Err(Error::model_load(
            "model",
            format!(
                "model target '{}' does not match mining schema target '{}'",
                spec.target, target.name
            ),
        ));
    }
    if spec.tables.len() < 2 {
        return Err(Error::model_load(
            "model.tables",
            "classification needs at least two regression tables",
        ));
    }

    let mut covered = HashSet::new();
    let mut tables = Vec::with_capacity(spec.tables.len());
    for (idx, table) in spec.tables.iter().enumerate() {
        let element = format!("model.tables[{}] '{}'", idx, table.target_category);
        if !target.categories.contains(&table.target_category) {
            return Err(Error::model_load(element, "category is not declared by the target field"));
        }
        if !covered.insert(table.target_category.as_str()) {
            return Err(Error::model_load(element, "category has more than one table"));
        }
        if !table.intercept.is_finite() {
            return Err(Error::model_load(element, "intercept is not finite"));
        }

        let mut terms = Vec::with_capacity(table.predictors.len());
        for predictor in &table.predictors {
            let (slot, kind) = scope.lookup(&predictor.field, &element)?;
            if kind != SlotKind::Numeric {
                return Err(Error::model_load(
                    &element,
                    format!("predictor '{}' is not numeric", predictor.field),
                ));
            }
            if !predictor.coefficient.is_finite() {
                return Err(Error::model_load(
                    &element,
                    format!("coefficient of '{}' is not finite", predictor.field),
                ));
            }
            terms.push(Term {
                slot,
                coefficient: predictor.coefficient,
                exponent: predictor.exponent,
            });
        }

        tables.push(RegressionTable {
            category: table.target_category.clone(),
            intercept: table.intercept,
            terms,
        });
    }

    if let Some(missing) = target.categories.iter().find(|c| !covered.contains(c.as_str())) {
        return Err(Error::model_load(
            "model.tables",
            format!("no regression table for category '{}'", missing),
        ));
    }

    Ok(RegressionGraph {
        target: target.name.clone(),
        normalization: spec.normalization,
        tables,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::prepare_value;

    const VALID: &str = r#"
header: { name: tiny, version: "2" }
data_dictionary:
  - { name: text, data_type: string }
  - { name: y, data_type: string, values: [a, b] }
mining_schema:
  - { name: text, invalid_value_treatment: as_is }
  - { name: y, usage: target }
transformations:
  - name: tf_a
    expression: { type: text_index, field: text, term: a }
  - name: tf_a_scaled
    expression:
      type: apply
      function: multiply
      arguments:
        - { type: field_ref, field: tf_a }
        - { type: constant, value: 2.0 }
model:
  type: regression
  target: y
  normalization: softmax
  tables:
    - { target_category: a, predictors: [ { field: tf_a_scaled, coefficient: 1.0 } ] }
    - { target_category: b }
"#;

    fn load_err(yaml: &str) -> (String, String) {
        match load_bytes(yaml.as_bytes()) {
            Err(Error::ModelLoad { element, reason }) => (element, reason),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected load failure"),
        }
    }

    #[test]
    fn test_valid_model_compiles() {
        let handle = load_bytes(VALID.as_bytes()).unwrap();
        assert_eq!(handle.info().name, "tiny");
        assert_eq!(handle.info().version, "2");
        assert_eq!(handle.input_fields().len(), 1);
        assert_eq!(handle.input_fields()[0].data_type, DataType::String);
        assert_eq!(handle.primary_target().name, "y");
        assert_eq!(handle.primary_target().categories, vec!["a", "b"]);
        assert_eq!(handle.derived_field_count(), 2);
    }

    #[test]
    fn test_forward_reference_is_rejected() {
        let yaml = VALID.replace(
            "expression: { type: text_index, field: text, term: a }",
            "expression: { type: field_ref, field: tf_a_scaled }",
        );
        let (element, reason) = load_err(&yaml);
        assert!(element.contains("tf_a"), "{element}");
        assert!(reason.contains("tf_a_scaled"), "{reason}");
    }

    #[test]
    fn test_unknown_predictor_field() {
        let yaml = VALID.replace("field: tf_a_scaled, coefficient", "field: nope, coefficient");
        let (element, reason) = load_err(&yaml);
        assert!(element.contains("model.tables[0]"), "{element}");
        assert!(reason.contains("nope"));
    }

    #[test]
    fn test_undeclared_category() {
        let yaml = VALID.replace("- { target_category: b }", "- { target_category: c }");
        let (element, _) = load_err(&yaml);
        assert!(element.contains("'c'"), "{element}");
    }

    #[test]
    fn test_uncovered_category() {
        let yaml = VALID.replace("values: [a, b]", "values: [a, b, c]");
        let (_, reason) = load_err(&yaml);
        assert!(reason.contains("'c'"), "{reason}");
    }

    #[test]
    fn test_mining_field_not_in_dictionary() {
        let yaml = VALID.replace("- { name: text, invalid_value_treatment: as_is }", "- { name: body }");
        let (element, _) = load_err(&yaml);
        assert!(element.contains("body"));
    }

    #[test]
    fn test_missing_target() {
        let yaml = VALID.replace("- { name: y, usage: target }", "");
        let (element, _) = load_err(&yaml);
        assert_eq!(element, "mining_schema");
    }

    #[test]
    fn test_text_index_on_derived_field() {
        let yaml = VALID.replace(
            "arguments:\n        - { type: field_ref, field: tf_a }",
            "arguments:\n        - { type: text_index, field: tf_a, term: x }",
        );
        let (_, reason) = load_err(&yaml);
        assert!(reason.contains("not a string input field"), "{reason}");
    }

    #[test]
    fn test_bad_arity() {
        let yaml = VALID.replace("function: multiply", "function: ln");
        let (_, reason) = load_err(&yaml);
        assert!(reason.contains("does not accept 2 arguments"), "{reason}");
    }

    #[test]
    fn test_bad_separator_pattern() {
        let yaml = VALID.replace(
            "term: a }",
            "term: a, word_separator: \"[\" }",
        );
        let (_, reason) = load_err(&yaml);
        assert!(reason.contains("word separator"), "{reason}");
    }

    #[test]
    fn test_single_table_is_rejected() {
        let yaml = VALID
            .replace("values: [a, b]", "values: [a]")
            .replace("    - { target_category: b }\n", "");
        let (element, _) = load_err(&yaml);
        assert_eq!(element, "model.tables");
    }

    #[test]
    fn test_derived_name_collides_with_dictionary() {
        let yaml = VALID.replace("- name: tf_a_scaled", "- name: y");
        let (_, reason) = load_err(&yaml);
        assert!(reason.contains("already defined"));
    }

    #[test]
    fn test_bad_replacement_literal() {
        let yaml = VALID
            .replace("- { name: text, data_type: string }", "- { name: text, data_type: string }\n  - { name: n, data_type: integer }")
            .replace("- { name: y, usage: target }", "- { name: y, usage: target }\n  - { name: n, missing_value_replacement: \"x\" }");
        let (element, _) = load_err(&yaml);
        assert!(element.contains("'n'"));
    }

    const RATED: &str = r#"
header: { name: rated }
data_dictionary:
  - { name: rate, data_type: double, values: ["1.0", "2.5"] }
  - { name: urgent, data_type: boolean, values: ["1", "0"] }
  - { name: y, data_type: string, values: [low, high] }
mining_schema:
  - { name: rate, missing_value_replacement: "1.0" }
  - { name: urgent, missing_value_replacement: "0" }
  - { name: y, usage: target }
model:
  type: regression
  target: y
  normalization: softmax
  tables:
    - { target_category: low, predictors: [ { field: rate, coefficient: -1.0 } ] }
    - { target_category: high, predictors: [ { field: urgent, coefficient: 2.0 } ] }
"#;

    #[test]
    fn test_typed_valid_values_and_replacements() {
        let handle = load_bytes(RATED.as_bytes()).unwrap();

        let rate = handle.input_field("rate").unwrap();
        assert_eq!(
            rate.valid_values,
            vec![FieldValue::Double(1.0), FieldValue::Double(2.5)]
        );
        assert_eq!(rate.missing_value_replacement, Some(FieldValue::Double(1.0)));

        let urgent = handle.input_field("urgent").unwrap();
        assert_eq!(
            urgent.valid_values,
            vec![FieldValue::Boolean(true), FieldValue::Boolean(false)]
        );
        assert_eq!(urgent.missing_value_replacement, Some(FieldValue::Boolean(false)));
    }

    #[test]
    fn test_typed_values_accept_declared_literals() {
        let handle = load_bytes(RATED.as_bytes()).unwrap();
        let rate = handle.input_field("rate").unwrap();
        let urgent = handle.input_field("urgent").unwrap();

        for raw in ["1.0", "1", "2.5"] {
            assert!(prepare_value(rate, Some(raw)).is_ok(), "{raw}");
        }
        assert!(prepare_value(rate, Some("1.5")).is_err());

        assert_eq!(prepare_value(urgent, Some("1")).unwrap(), FieldValue::Boolean(true));
        assert_eq!(prepare_value(urgent, Some("false")).unwrap(), FieldValue::Boolean(false));
    }

    #[test]
    fn test_replacement_outside_typed_values() {
        let yaml = RATED.replace(r#"missing_value_replacement: "1.0""#, r#"missing_value_replacement: "3.0""#);
        let (element, reason) = load_err(&yaml);
        assert!(element.contains("'rate'"), "{element}");
        assert!(reason.contains("not a valid value"), "{reason}");
    }

    #[test]
    fn test_unparseable_valid_value() {
        let yaml = RATED.replace(r#"values: ["1.0", "2.5"]"#, r#"values: ["1.0", "high"]"#);
        let (element, reason) = load_err(&yaml);
        assert!(element.starts_with("data_dictionary[0]"), "{element}");
        assert!(reason.contains("'high'"), "{reason}");
    }

    #[test]
    fn test_misspelled_nested_key_fails_to_load() {
        let yaml = VALID.replace("normalization: softmax", "normalisation: softmax");
        let (element, reason) = load_err(&yaml);
        assert!(element.starts_with("document"), "{element}");
        assert!(reason.contains("normalisation"), "{reason}");
    }

    #[test]
    fn test_shared_tokenizer() {
        let yaml = VALID.replace(
            "  - name: tf_a_scaled",
            "  - name: tf_b\n    expression: { type: text_index, field: text, term: b }\n  - name: tf_a_scaled",
        );
        let handle = load_bytes(yaml.as_bytes()).unwrap();
        assert_eq!(handle.tokenizers.len(), 1);
        assert_eq!(handle.derived_field_count(), 3);
    }
}
