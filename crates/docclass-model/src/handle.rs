//! The loaded, immutable model

use crate::artifact::{Function, InvalidValueTreatment, LocalTermWeights, Normalization};
use crate::evaluator::{self, OutputDistribution};
use crate::mapper::PreparedFields;
use crate::text::Tokenizer;
use docclass_core::{DataType, FieldValue, Result};
use serde::Serialize;

/// Model identification taken from the artifact header
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An input slot the model needs a value for
#[derive(Debug, Clone, Serialize)]
pub struct InputField {
    pub name: String,
    pub data_type: DataType,

    /// Allowed values, parsed with the field's data type; empty means
    /// unrestricted
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub valid_values: Vec<FieldValue>,

    pub invalid_value_treatment: InvalidValueTreatment,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_value_replacement: Option<FieldValue>,
}

impl InputField {
    /// Whether a prepared value satisfies the valid-value constraint
    pub fn accepts(&self, value: &FieldValue) -> bool {
        self.valid_values.is_empty() || self.valid_values.contains(value)
    }
}

/// A categorical model output
#[derive(Debug, Clone, Serialize)]
pub struct TargetField {
    pub name: String,
    pub categories: Vec<String>,
}

/// Compiled expression; field references are resolved to slot indices
#[derive(Debug)]
pub(crate) enum Expr {
    Slot(usize),
    Constant(f64),
    TextIndex {
        slot: usize,
        tokenizer: usize,
        term: Vec<String>,
        weights: LocalTermWeights,
    },
    Apply {
        function: Function,
        args: Vec<Expr>,
    },
}

#[derive(Debug)]
pub(crate) struct DerivedSlot {
    pub(crate) name: String,
    pub(crate) expr: Expr,
}

/// Tokenizer bound to the slot of the text field it reads
#[derive(Debug)]
pub(crate) struct SlotTokenizer {
    pub(crate) slot: usize,
    pub(crate) tokenizer: Tokenizer,
}

#[derive(Debug)]
pub(crate) struct Term {
    pub(crate) slot: usize,
    pub(crate) coefficient: f64,
    pub(crate) exponent: i32,
}

#[derive(Debug)]
pub(crate) struct RegressionTable {
    pub(crate) category: String,
    pub(crate) intercept: f64,
    pub(crate) terms: Vec<Term>,
}

#[derive(Debug)]
pub(crate) struct RegressionGraph {
    pub(crate) target: String,
    pub(crate) normalization: Normalization,
    pub(crate) tables: Vec<RegressionTable>,
}

/// Immutable, validated model.
///
/// Slots `0..inputs.len()` hold input field values in declaration order;
/// the following slots hold derived fields in declaration order.
#[derive(Debug)]
pub struct ModelHandle {
    pub(crate) info: ModelInfo,
    pub(crate) inputs: Vec<InputField>,
    pub(crate) targets: Vec<TargetField>,
    pub(crate) tokenizers: Vec<SlotTokenizer>,
    pub(crate) derived: Vec<DerivedSlot>,
    pub(crate) regression: RegressionGraph,
}

impl ModelHandle {
    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    /// Input fields in declaration order
    pub fn input_fields(&self) -> &[InputField] {
        &self.inputs
    }

    /// Target fields in declaration order
    pub fn target_fields(&self) -> &[TargetField] {
        &self.targets
    }

    pub fn input_field(&self, name: &str) -> Option<&InputField> {
        self.inputs.iter().find(|f| f.name == name)
    }

    pub fn target_field(&self, name: &str) -> Option<&TargetField> {
        self.targets.iter().find(|f| f.name == name)
    }

    /// The target field predictions are decoded from by default.
    ///
    /// The loader guarantees at least one target field.
    pub fn primary_target(&self) -> &TargetField {
        &self.targets[0]
    }

    /// Number of derived fields in the transformation graph
    pub fn derived_field_count(&self) -> usize {
        self.derived.len()
    }

    /// Run the model against prepared fields
    pub fn evaluate(&self, fields: &PreparedFields) -> Result<OutputDistribution> {
        evaluator::evaluate(fields, self)
    }
}
