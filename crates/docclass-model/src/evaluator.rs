//! Evaluation engine
//!
//! Runs the compiled transformation graph and regression tables of a
//! [`ModelHandle`] against prepared fields. Evaluation only reads the handle;
//! all intermediate state lives in per-call buffers.

use crate::artifact::{Function, Normalization};
use crate::handle::{Expr, ModelHandle, RegressionGraph};
use crate::mapper::PreparedFields;
use crate::text;
use docclass_core::{DataType, Error, FieldValue, Result};

/// Scores for one categorical target plus the label the model selects
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    label: String,
    scores: Vec<(String, f64)>,
}

impl Classification {
    /// Build a classification from a decided label and its score map
    pub fn new(label: impl Into<String>, scores: Vec<(String, f64)>) -> Self {
        Self {
            label: label.into(),
            scores,
        }
    }

    /// The label the model's own convention selects
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Score of a single candidate label
    pub fn score(&self, label: &str) -> Option<f64> {
        self.scores
            .iter()
            .find(|(candidate, _)| candidate == label)
            .map(|(_, score)| *score)
    }

    /// All candidate labels with scores, in regression table order
    pub fn scores(&self) -> &[(String, f64)] {
        &self.scores
    }
}

/// Raw model output: one classification per target field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputDistribution {
    targets: Vec<(String, Classification)>,
}

impl OutputDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, target: impl Into<String>, classification: Classification) {
        let target = target.into();
        match self.targets.iter_mut().find(|(name, _)| *name == target) {
            Some(entry) => entry.1 = classification,
            None => self.targets.push((target, classification)),
        }
    }

    pub fn get(&self, target: &str) -> Option<&Classification> {
        self.targets
            .iter()
            .find(|(name, _)| name == target)
            .map(|(_, classification)| classification)
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|(name, _)| name.as_str())
    }
}

/// Runtime value of a slot
#[derive(Debug, Clone, Copy)]
enum Value<'a> {
    Text(&'a str),
    Number(f64),
}

/// Per-call evaluation state
struct Frame<'a> {
    handle: &'a ModelHandle,
    slots: Vec<Value<'a>>,
    tokens: Vec<Option<Vec<String>>>,
}

impl<'a> Frame<'a> {
    fn number(&self, slot: usize) -> f64 {
        match self.slots[slot] {
            Value::Number(n) => n,
            // Text slots are never referenced in numeric position after loading
            Value::Text(_) => f64::NAN,
        }
    }

    fn term_count(&mut self, slot: usize, tokenizer: usize, term: &[String]) -> usize {
        if self.tokens[tokenizer].is_none() {
            let text = match self.slots[slot] {
                Value::Text(text) => text,
                Value::Number(_) => "",
            };
            let tokens = self.handle.tokenizers[tokenizer].tokenizer.tokenize(text);
            self.tokens[tokenizer] = Some(tokens);
        }
        self.tokens[tokenizer]
            .as_deref()
            .map(|tokens| text::count_term(tokens, term))
            .unwrap_or(0)
    }

    fn eval(&mut self, expr: &Expr) -> f64 {
        match expr {
            Expr::Slot(slot) => self.number(*slot),
            Expr::Constant(value) => *value,
            Expr::TextIndex {
                slot,
                tokenizer,
                term,
                weights,
            } => {
                let count = self.term_count(*slot, *tokenizer, term);
                text::weigh(count, *weights)
            }
            Expr::Apply { function, args } => {
                let values: Vec<f64> = args.iter().map(|arg| self.eval(arg)).collect();
                apply(*function, &values)
            }
        }
    }
}

fn apply(function: Function, values: &[f64]) -> f64 {
    match function {
        Function::Add => values.iter().sum(),
        Function::Multiply => values.iter().product(),
        Function::Subtract => values[0] - values[1],
        Function::Divide => values[0] / values[1],
        Function::Ln => values[0].ln(),
        Function::Exp => values[0].exp(),
    }
}

/// Evaluate the model against prepared fields
pub fn evaluate(fields: &PreparedFields, handle: &ModelHandle) -> Result<OutputDistribution> {
    let mut slots = Vec::with_capacity(handle.inputs.len() + handle.derived.len());
    for input in &handle.inputs {
        let value = fields
            .get(&input.name)
            .ok_or_else(|| Error::missing_field(&input.name))?;
        slots.push(slot_value(&input.name, input.data_type, value)?);
    }

    let mut frame = Frame {
        handle,
        slots,
        tokens: vec![None; handle.tokenizers.len()],
    };

    for derived in &handle.derived {
        let value = frame.eval(&derived.expr);
        if !value.is_finite() {
            return Err(Error::evaluation(&derived.name, "derived value is not finite"));
        }
        frame.slots.push(Value::Number(value));
    }

    let classification = score(&handle.regression, &frame)?;
    let mut distribution = OutputDistribution::new();
    distribution.insert(handle.regression.target.clone(), classification);
    Ok(distribution)
}

fn slot_value<'a>(name: &str, data_type: DataType, value: &'a FieldValue) -> Result<Value<'a>> {
    if value.data_type() != data_type {
        return Err(Error::evaluation(
            name,
            format!("expected a {} value, got {}", data_type, value.data_type()),
        ));
    }
    Ok(match value {
        FieldValue::Text(text) => Value::Text(text),
        other => Value::Number(other.as_f64().unwrap_or(f64::NAN)),
    })
}

fn score(graph: &RegressionGraph, frame: &Frame<'_>) -> Result<Classification> {
    let raw: Vec<f64> = graph
        .tables
        .iter()
        .map(|table| {
            table.intercept
                + table
                    .terms
                    .iter()
                    .map(|term| term.coefficient * frame.number(term.slot).powi(term.exponent))
                    .sum::<f64>()
        })
        .collect();

    let normalized = normalize(graph.normalization, &raw);
    if normalized.iter().any(|p| !p.is_finite()) {
        return Err(Error::evaluation(&graph.target, "category scores are not finite"));
    }

    // Highest score wins; ties go to the earliest table
    let mut best = 0;
    for (idx, p) in normalized.iter().enumerate() {
        if *p > normalized[best] {
            best = idx;
        }
    }

    let scores = graph
        .tables
        .iter()
        .zip(normalized)
        .map(|(table, p)| (table.category.clone(), p))
        .collect();

    Ok(Classification::new(graph.tables[best].category.clone(), scores))
}

fn normalize(normalization: Normalization, raw: &[f64]) -> Vec<f64> {
    match normalization {
        Normalization::Softmax => {
            let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let exp: Vec<f64> = raw.iter().map(|y| (y - max).exp()).collect();
            let sum: f64 = exp.iter().sum();
            exp.into_iter().map(|e| e / sum).collect()
        }
        Normalization::Logit => raw.iter().map(|y| 1.0 / (1.0 + (-y).exp())).collect(),
        Normalization::Simplemax => {
            let sum: f64 = raw.iter().sum();
            raw.iter().map(|y| y / sum).collect()
        }
        Normalization::Identity => raw.to_vec(),
    }
}
