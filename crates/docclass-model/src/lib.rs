//! docclass Model
//!
//! Loading and evaluation of the single classification model the service
//! hosts.
//!
//! The pipeline runs bottom-up:
//! - [`loader`] parses and validates a model artifact into an immutable
//!   [`ModelHandle`]
//! - [`mapper`] binds raw request input to the handle's typed input fields
//! - [`evaluator`] runs the transformation graph and regression tables,
//!   producing the full score distribution per target field
//! - [`decoder`] reads the decided label and its own score
//!
//! [`Predictor`] chains the three per-request steps over a shared handle.

pub mod artifact;
pub mod decoder;
pub mod evaluator;
pub mod handle;
pub mod loader;
pub mod mapper;
pub mod predictor;
mod text;

pub use artifact::{InvalidValueTreatment, ModelDocument, Normalization};
pub use decoder::decode;
pub use evaluator::{evaluate, Classification, OutputDistribution};
pub use handle::{InputField, ModelHandle, ModelInfo, TargetField};
pub use loader::{load, load_bytes, load_file};
pub use mapper::{prepare, prepare_record, PreparedFields};
pub use predictor::Predictor;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::handle::{InputField, ModelHandle, TargetField};
    pub use crate::loader::{load, load_bytes, load_file};
    pub use crate::predictor::Predictor;
    pub use docclass_core::{Error, Prediction, Result};
}
