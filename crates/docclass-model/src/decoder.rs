//! Result decoding: output distribution to a single labeled prediction

use crate::evaluator::OutputDistribution;
use docclass_core::{Error, Prediction, Result};

/// Decode the prediction for `target` from a raw output distribution.
///
/// The label is the one the evaluation engine decided; the confidence is
/// that label's own score. Both lookups are checked; an inconsistent
/// distribution is an error, never a default.
pub fn decode(distribution: &OutputDistribution, target: &str) -> Result<Prediction> {
    let classification = distribution
        .get(target)
        .ok_or_else(|| Error::decode(target, "target field is absent from the model output"))?;

    let label = classification.label();
    let confidence = classification.score(label).ok_or_else(|| {
        Error::decode(
            target,
            format!("decided label '{}' has no score in the distribution", label),
        )
    })?;

    Ok(Prediction::new(label, confidence))
}
