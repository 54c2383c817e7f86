//! docclass Core
//!
//! Types shared across the docclass components.
//!
//! This crate provides:
//! - The error type covering model loading, field preparation, evaluation
//!   and result decoding
//! - Primitive data types and prepared field values
//! - The final prediction result returned to callers

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{DataType, FieldValue, Prediction};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{DataType, FieldValue, Prediction};
}
