use thiserror::Error;

#[derive(Debug, Error)]
pub enum PairsError {
    #[error("Invalid input: {field} ({reason})")]
    InvalidInput { field: String, reason: String },

    #[error("Input mismatch: {0}")]
    InputMismatch(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for PairsError {
    fn from(e: serde_json::Error) -> Self {
        PairsError::SerializationError(e.to_string())
    }
}
