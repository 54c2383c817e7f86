//! Error types for docclass

/// Result type alias using docclass's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for docclass operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model artifact is malformed or structurally inconsistent
    #[error("model load error at {element}: {reason}")]
    ModelLoad { element: String, reason: String },

    /// Raw input could not be coerced into a declared input field
    #[error("cannot prepare field '{field}' from {raw_value:?}: {reason}")]
    FieldPreparation {
        field: String,
        raw_value: String,
        reason: String,
    },

    /// Prepared fields do not fit the model's schema or the graph produced
    /// an unusable value
    #[error("evaluation error at field '{field}': {reason}")]
    Evaluation { field: String, reason: String },

    /// The output distribution is inconsistent with the decided label
    #[error("decode error for target '{target}': {reason}")]
    Decode { target: String, reason: String },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new model load error
    pub fn model_load(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModelLoad {
            element: element.into(),
            reason: reason.into(),
        }
    }

    /// Create a new field preparation error
    pub fn field_preparation(
        field: impl Into<String>,
        raw_value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::FieldPreparation {
            field: field.into(),
            raw_value: raw_value.into(),
            reason: reason.into(),
        }
    }

    /// Create a new evaluation error
    pub fn evaluation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Evaluation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Evaluation error for an input field that has no prepared value
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::evaluation(field, "no value supplied for declared input field")
    }

    /// Create a new decode error
    pub fn decode(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Stable snake_case name of the error kind, used in logs, metric labels
    /// and HTTP error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelLoad { .. } => "model_load_error",
            Self::FieldPreparation { .. } => "field_preparation_error",
            Self::Evaluation { .. } => "evaluation_error",
            Self::Decode { .. } => "decode_error",
            Self::Config(_) => "configuration_error",
            Self::Io(_) => "io_error",
        }
    }

    /// Whether the error was caused by the caller's input rather than by
    /// the service or the model
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::FieldPreparation { .. })
    }
}
