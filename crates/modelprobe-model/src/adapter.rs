//! Capability interface between matchers and the model layer.
//!
//! Matchers never see a concrete ORM. They reach the model through two
//! narrow traits: [`Model`] (blank instances, persisted-record queries,
//! column metadata) and [`Record`] (dynamically-named attribute access,
//! persistence, validation). Any backend that can answer these is probeable.

use std::collections::HashMap;

use crate::column::ColumnType;
use crate::error::StoreError;
use crate::value::Value;

/// Default error message recorded for a violated uniqueness rule.
pub const TAKEN_MESSAGE: &str = "has already been taken";

/// A model type: a named collection of persisted records with attribute
/// metadata.
pub trait Model {
    /// Record type produced by this model.
    type Record: Record;

    /// Human-readable model name used in matcher messages.
    fn name(&self) -> &str;

    /// Create a blank, unsaved record.
    fn blank(&self) -> Self::Record;

    /// Column metadata for an attribute, if the model declares it.
    fn column(&self, attribute: &str) -> Option<ColumnType>;

    /// The first persisted record, if any.
    fn first(&self) -> Result<Option<Self::Record>, StoreError>;

    /// All persisted records.
    fn all(&self) -> Result<Vec<Self::Record>, StoreError>;
}

/// A single model instance with dynamically-named attributes.
pub trait Record {
    /// Whether the underlying model declares this attribute.
    fn has_attribute(&self, attribute: &str) -> bool;

    /// Read an attribute value; unset attributes read as [`Value::Null`].
    fn get(&self, attribute: &str) -> Value;

    /// Write an attribute value.
    fn set(&mut self, attribute: &str, value: Value) -> Result<(), StoreError>;

    /// Persist this record without running any validation rules.
    fn save_skipping_validation(&mut self) -> Result<(), StoreError>;

    /// Run validations and report the resulting errors.
    fn validate(&self) -> Result<ValidationErrors, StoreError>;
}

/// Validation errors keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    errors: HashMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// Create an empty error collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error message for an attribute.
    pub fn add(&mut self, attribute: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(attribute.into())
            .or_default()
            .push(message.into());
    }

    /// Error messages recorded for an attribute, in insertion order.
    pub fn of(&self, attribute: &str) -> &[String] {
        self.errors.get(attribute).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check if no errors were recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_errors() {
        let errors = ValidationErrors::new();
        assert!(errors.is_empty());
        assert!(errors.of("slug").is_empty());
    }

    #[test]
    fn test_add_and_read_back() {
        let mut errors = ValidationErrors::new();
        errors.add("slug", TAKEN_MESSAGE);
        errors.add("slug", "is too short");

        assert!(!errors.is_empty());
        assert_eq!(errors.of("slug"), [TAKEN_MESSAGE, "is too short"]);
        assert!(errors.of("title").is_empty());
    }
}
