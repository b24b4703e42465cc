use crate::property::PropertyKind;
use thiserror::Error;

/// Errors raised by model-level validation.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("property name '{name}' is not a valid machine key: {reason}")]
    InvalidPropertyName { name: String, reason: String },

    #[error("value for property '{property}' does not match its kind {expected}")]
    KindMismatch {
        property: String,
        expected: PropertyKind,
    },

    #[error("range value for property '{property}' has min greater than max")]
    InvalidRange { property: String },
}
