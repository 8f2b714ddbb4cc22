//! Model-layer error types.

use thiserror::Error;

/// Errors surfaced by the model capability interface.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An attribute name the model does not declare.
    #[error("{model} doesn't seem to have a {attribute} attribute")]
    UnknownAttribute {
        /// Model name.
        model: String,
        /// Offending attribute name.
        attribute: String,
    },

    /// Unexpected backing-store failure.
    #[error("storage error: {0}")]
    Storage(String),
}
