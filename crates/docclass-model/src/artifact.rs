//! Serialized model document
//!
//! The artifact is a YAML (or JSON) document laid out like a PMML regression
//! model: a data dictionary, a mining schema, an ordered list of derived
//! fields and a regression model with one table per target category.
//! These types only describe the document; structural checks happen in
//! [`crate::loader`].

use docclass_core::{DataType, Error, Result};
use serde::{Deserialize, Serialize};

/// Root of a model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDocument {
    /// Model identification
    pub header: Header,

    /// Every raw field the model knows about
    pub data_dictionary: Vec<DataField>,

    /// How the model uses the dictionary fields
    pub mining_schema: Vec<MiningField>,

    /// Derived fields, evaluated in declaration order
    #[serde(default)]
    pub transformations: Vec<DerivedField>,

    /// The scoring model
    pub model: ModelSpec,
}

impl ModelDocument {
    /// Parse a document from raw bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_yaml::from_slice(bytes).map_err(|e| {
            let element = match e.location() {
                Some(loc) => format!("document (line {}, column {})", loc.line(), loc.column()),
                None => "document".to_string(),
            };
            Error::model_load(element, e.to_string())
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Header {
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub description: Option<String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Data dictionary entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataField {
    pub name: String,

    pub data_type: DataType,

    /// Valid values; empty means unrestricted. For the target field these
    /// are the class labels.
    #[serde(default)]
    pub values: Vec<String>,
}

/// Mining schema entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MiningField {
    pub name: String,

    #[serde(default)]
    pub usage: FieldUsage,

    #[serde(default)]
    pub invalid_value_treatment: InvalidValueTreatment,

    /// Literal substituted when the input value is missing
    #[serde(default)]
    pub missing_value_replacement: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldUsage {
    #[default]
    Active,
    Target,
}

/// What the field mapper does with a value that fails coercion or falls
/// outside the valid-value set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidValueTreatment {
    /// Reject the request
    #[default]
    ReturnInvalid,
    /// Keep the raw string (string fields only)
    AsIs,
    /// Treat the value as missing
    AsMissing,
}

/// A named intermediate value computed from input fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DerivedField {
    pub name: String,
    pub expression: Expression,
}

/// Expression node of the transformation graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum Expression {
    /// Value of an active input field or an earlier derived field
    FieldRef { field: String },

    /// Numeric literal
    Constant { value: f64 },

    /// Weighted frequency of a term in a text field
    TextIndex(TextIndexSpec),

    /// Built-in function applied to sub-expressions
    Apply {
        function: Function,
        arguments: Vec<Expression>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextIndexSpec {
    /// Active string field holding the text
    pub field: String,

    /// Term to count; multi-word terms match consecutive tokens
    pub term: String,

    /// Regular expression separating words
    #[serde(default = "default_word_separator")]
    pub word_separator: String,

    #[serde(default)]
    pub case_sensitive: bool,

    #[serde(default)]
    pub local_term_weights: LocalTermWeights,
}

fn default_word_separator() -> String {
    r"\s+".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalTermWeights {
    /// Raw occurrence count
    #[default]
    TermFrequency,
    /// 1 if the term occurs, else 0
    Binary,
    /// log10(1 + count)
    Logarithmic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Function {
    Add,
    Subtract,
    Multiply,
    Divide,
    Ln,
    Exp,
}

impl Function {
    /// Accepted argument count as (min, max)
    pub fn arity(&self) -> (usize, Option<usize>) {
        match self {
            Self::Add | Self::Multiply => (2, None),
            Self::Subtract | Self::Divide => (2, Some(2)),
            Self::Ln | Self::Exp => (1, Some(1)),
        }
    }
}

/// Scoring model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ModelSpec {
    Regression(RegressionSpec),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegressionSpec {
    #[serde(default)]
    pub function: MiningFunction,

    /// Name of the target field in the mining schema
    pub target: String,

    #[serde(default)]
    pub normalization: Normalization,

    /// One table per target category
    pub tables: Vec<RegressionTableSpec>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiningFunction {
    #[default]
    Classification,
    Regression,
}

/// How linear table scores become category scores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// exp(y_k) / sum_j exp(y_j)
    Softmax,
    /// 1 / (1 + exp(-y_k)) per table, not normalized
    Logit,
    /// y_k / sum_j y_j
    Simplemax,
    /// Raw linear score
    #[default]
    #[serde(rename = "none")]
    Identity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegressionTableSpec {
    pub target_category: String,

    #[serde(default)]
    pub intercept: f64,

    #[serde(default)]
    pub predictors: Vec<PredictorSpec>,
}

/// `coefficient * field ^ exponent`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictorSpec {
    pub field: String,

    pub coefficient: f64,

    #[serde(default = "default_exponent")]
    pub exponent: i32,
}

fn default_exponent() -> i32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_document() {
        let yaml = r#"
header: { name: tiny }
data_dictionary:
  - { name: text, data_type: string }
  - { name: y, data_type: string, values: [a, b] }
mining_schema:
  - { name: text }
  - { name: y, usage: target }
transformations:
  - name: tf_a
    expression: { type: text_index, field: text, term: a }
model:
  type: regression
  target: y
  normalization: softmax
  tables:
    - { target_category: a, predictors: [ { field: tf_a, coefficient: 1.0 } ] }
    - { target_category: b }
"#;
        let doc = ModelDocument::from_slice(yaml.as_bytes()).unwrap();
        assert_eq!(doc.header.version, "1.0");
        assert_eq!(doc.mining_schema[0].usage, FieldUsage::Active);
        assert_eq!(
            doc.mining_schema[0].invalid_value_treatment,
            InvalidValueTreatment::ReturnInvalid
        );

        match &doc.transformations[0].expression {
            Expression::TextIndex(spec) => {
                assert_eq!(spec.word_separator, r"\s+");
                assert!(!spec.case_sensitive);
                assert_eq!(spec.local_term_weights, LocalTermWeights::TermFrequency);
            }
            other => panic!("unexpected expression: {other:?}"),
        }

        let ModelSpec::Regression(model) = &doc.model;
        assert_eq!(model.normalization, Normalization::Softmax);
        assert_eq!(model.tables[0].predictors[0].exponent, 1);
        assert_eq!(model.tables[1].intercept, 0.0);
    }

    #[test]
    fn test_normalization_none_keyword() {
        let n: Normalization = serde_yaml::from_str("none").unwrap();
        assert_eq!(n, Normalization::Identity);
    }

    #[test]
    fn test_syntax_error_reports_location() {
        let err = ModelDocument::from_slice(b"header: [unclosed").unwrap_err();
        match err {
            Error::ModelLoad { element, .. } => assert!(element.starts_with("document")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    const NESTED: &str = r#"
header: { name: nested }
data_dictionary:
  - { name: text, data_type: string }
  - { name: y, data_type: string, values: [a, b] }
mining_schema:
  - { name: text }
  - { name: y, usage: target }
transformations:
  - name: tf_a
    expression: { type: text_index, field: text, term: a, local_term_weights: binary }
  - name: scaled
    expression:
      type: apply
      function: multiply
      arguments: [ { type: field_ref, field: tf_a }, { type: constant, value: 2.0 } ]
model:
  type: regression
  target: y
  normalization: softmax
  tables:
    - { target_category: a, predictors: [ { field: scaled, coefficient: 1.0 } ] }
    - { target_category: b }
"#;

    fn assert_rejected(yaml: &str, key: &str) {
        match ModelDocument::from_slice(yaml.as_bytes()) {
            Err(Error::ModelLoad { reason, .. }) => assert!(reason.contains(key), "{reason}"),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("document with unknown key '{key}' was accepted"),
        }
    }

    #[test]
    fn test_nested_document_parses() {
        assert!(ModelDocument::from_slice(NESTED.as_bytes()).is_ok());
    }

    #[test]
    fn test_unknown_model_key_is_rejected() {
        assert_rejected(
            &NESTED.replace("normalization: softmax", "normalisation: softmax"),
            "normalisation",
        );
    }

    #[test]
    fn test_unknown_text_index_key_is_rejected() {
        assert_rejected(
            &NESTED.replace("local_term_weights: binary", "local_term_weight: binary"),
            "local_term_weight",
        );
    }

    #[test]
    fn test_unknown_expression_keys_are_rejected() {
        assert_rejected(
            &NESTED.replace("{ type: constant, value: 2.0 }", "{ type: constant, value: 2.0, scale: 3 }"),
            "scale",
        );
        assert_rejected(
            &NESTED.replace("{ type: field_ref, field: tf_a }", "{ type: field_ref, field: tf_a, cast: double }"),
            "cast",
        );
        assert_rejected(
            &NESTED.replace("function: multiply", "function: multiply\n      mode: strict"),
            "mode",
        );
    }

    #[test]
    fn test_unknown_table_key_is_rejected() {
        assert_rejected(
            &NESTED.replace("- { target_category: b }", "- { target_category: b, bias: 1.0 }"),
            "bias",
        );
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let yaml = "header: { name: x, colour: blue }\ndata_dictionary: []\nmining_schema: []\nmodel: { type: regression, target: y, tables: [] }\n";
        assert!(ModelDocument::from_slice(yaml.as_bytes()).is_err());
    }
}
