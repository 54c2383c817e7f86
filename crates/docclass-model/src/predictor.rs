//! Prediction pipeline: field mapping, evaluation and decoding

use crate::decoder;
use crate::evaluator;
use crate::handle::ModelHandle;
use crate::mapper::{self, PreparedFields};
use docclass_core::{Error, Prediction, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Runs the full pipeline against one shared model handle.
///
/// Cloning is cheap; clones share the handle.
#[derive(Debug, Clone)]
pub struct Predictor {
    handle: Arc<ModelHandle>,
    target: String,
}

impl Predictor {
    /// Predict the handle's primary target field
    pub fn new(handle: Arc<ModelHandle>) -> Self {
        let target = handle.primary_target().name.clone();
        Self { handle, target }
    }

    /// Predict a specific target field declared by the handle
    pub fn with_target(handle: Arc<ModelHandle>, target: &str) -> Result<Self> {
        if handle.target_field(target).is_none() {
            return Err(Error::config(format!(
                "model '{}' declares no target field '{}'",
                handle.info().name,
                target
            )));
        }
        Ok(Self {
            handle,
            target: target.to_string(),
        })
    }

    pub fn handle(&self) -> &Arc<ModelHandle> {
        &self.handle
    }

    /// Name of the target field predictions are decoded from
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Classify raw text
    pub fn predict(&self, raw_input: &str) -> Result<Prediction> {
        let fields = mapper::prepare(raw_input, &self.handle)?;
        self.run(&fields)
    }

    /// Classify a structured record keyed by input field name
    pub fn predict_record(&self, record: &HashMap<String, String>) -> Result<Prediction> {
        let fields = mapper::prepare_record(record, &self.handle)?;
        self.run(&fields)
    }

    fn run(&self, fields: &PreparedFields) -> Result<Prediction> {
        debug!(
            fields = ?fields.iter().map(|(name, value)| (name, value.data_type())).collect::<Vec<_>>(),
            target = %self.target,
            "Evaluating model"
        );

        let distribution = evaluator::evaluate(fields, &self.handle)?;
        let prediction = decoder::decode(&distribution, &self.target)?;

        debug!(label = %prediction.label, confidence = prediction.confidence, "Prediction decoded");
        Ok(prediction)
    }
}
