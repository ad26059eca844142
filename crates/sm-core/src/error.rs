//! Errors surfaced by the reporting engine and its collaborators.

use thiserror::Error;

use crate::types::ValidationError;

/// Boxed error from a store or directory implementation.
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that abort a report or an ingestion request.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A date filter that is not `YYYY-MM-DD`.
    #[error("invalid date format: {value}. Use YYYY-MM-DD")]
    InvalidDateFormat { value: String },

    /// A required parameter was absent or blank.
    #[error("{field} is required")]
    MissingRequiredField { field: &'static str },

    /// The operator, machine or line does not exist.
    #[error("{kind} not found: {id}")]
    UnknownEntity { kind: &'static str, id: String },

    /// A submitted mode outside 1..=5.
    #[error("invalid mode: {value}. Valid modes are [1, 2, 3, 4, 5]")]
    InvalidMode { value: i64 },

    /// A submitted field that cannot be read as its expected type.
    #[error("invalid {field} format: {value}")]
    InvalidFieldFormat { field: &'static str, value: String },

    /// A submitted log id that is not a non-negative integer.
    #[error("invalid {field} format: {value}")]
    InvalidLogId { field: &'static str, value: String },

    /// Working-hours configuration that violates its invariants.
    #[error("invalid working-hours policy: {message}")]
    InvalidPolicy { message: String },

    /// The log store or operator directory failed.
    #[error("store error: {source}")]
    Store {
        #[source]
        source: StoreError,
    },
}

impl EngineError {
    /// Wraps a collaborator failure.
    pub fn store(source: impl Into<StoreError>) -> Self {
        Self::Store {
            source: source.into(),
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Empty { field } => Self::MissingRequiredField { field },
            ValidationError::InvalidMode { value } => Self::InvalidMode { value },
            ValidationError::InvalidLogId { field, value } => Self::InvalidLogId { field, value },
            ValidationError::InvalidDate { value } => Self::InvalidDateFormat { value },
        }
    }
}
