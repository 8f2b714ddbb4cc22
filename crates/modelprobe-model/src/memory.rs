//! In-memory reference implementation of the model capability interface.
//!
//! [`MemoryModel`] is the stand-in a test suite probes: declared attributes
//! with coarse column types, uniqueness rules, and rows held in a shared
//! in-memory store. Misbehaving models (no rule, unscoped rule,
//! case-sensitive-only rule, nil-rejecting rule) are expressed by
//! configuring the rules wrongly rather than through dedicated switches.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapter::{Model, Record, ValidationErrors, TAKEN_MESSAGE};
use crate::column::ColumnType;
use crate::error::StoreError;
use crate::value::Value;

type Row = HashMap<String, Value>;

/// A uniqueness validation rule on a memory model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniquenessRule {
    attribute: String,
    scopes: Vec<String>,
    case_insensitive: bool,
    allow_nil: bool,
    message: String,
}

impl UniquenessRule {
    /// Create a plain uniqueness rule on `attribute`.
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            scopes: Vec::new(),
            case_insensitive: false,
            allow_nil: false,
            message: TAKEN_MESSAGE.to_string(),
        }
    }

    /// Add a scope attribute; uniqueness is enforced per scope combination.
    pub fn scoped_to(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Treat values differing only in letter case as duplicates.
    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Exempt null values from the rule.
    pub fn allow_nil(mut self) -> Self {
        self.allow_nil = true;
        self
    }

    /// Override the recorded error message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Check a candidate row against the persisted rows, skipping the
    /// candidate's own persisted copy.
    fn check(
        &self,
        candidate: &Row,
        rows: &[Row],
        own_index: Option<usize>,
        errors: &mut ValidationErrors,
    ) {
        let value = candidate.get(&self.attribute).cloned().unwrap_or(Value::Null);
        if value.is_null() && self.allow_nil {
            return;
        }

        let conflict = rows.iter().enumerate().any(|(index, row)| {
            if Some(index) == own_index {
                return false;
            }
            let existing = row.get(&self.attribute).cloned().unwrap_or(Value::Null);
            let same_value = if self.case_insensitive {
                value.eq_ignore_case(&existing)
            } else {
                value == existing
            };
            same_value
                && self.scopes.iter().all(|scope| {
                    candidate.get(scope).unwrap_or(&Value::Null)
                        == row.get(scope).unwrap_or(&Value::Null)
                })
        });

        if conflict {
            errors.add(self.attribute.clone(), self.message.clone());
        }
    }
}

struct ModelInner {
    name: String,
    columns: HashMap<String, ColumnType>,
    rules: Vec<UniquenessRule>,
    rows: RwLock<Vec<Row>>,
}

/// An in-memory model type.
///
/// Cloning yields another handle to the same row store.
#[derive(Clone)]
pub struct MemoryModel {
    inner: Arc<ModelInner>,
}

/// Builder for [`MemoryModel`].
#[derive(Debug, Default)]
pub struct MemoryModelBuilder {
    name: String,
    columns: HashMap<String, ColumnType>,
    rules: Vec<UniquenessRule>,
}

impl MemoryModel {
    /// Start building a model with the given name.
    pub fn named(name: impl Into<String>) -> MemoryModelBuilder {
        MemoryModelBuilder {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Insert a row directly, bypassing validation.
    pub fn seed<S, I>(&self, values: I) -> Result<MemoryRecord, StoreError>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Value)>,
    {
        let mut record = self.blank();
        for (attribute, value) in values {
            record.set(&attribute.into(), value)?;
        }
        record.save_skipping_validation()?;
        Ok(record)
    }

    /// Number of persisted rows.
    pub fn len(&self) -> usize {
        self.inner.rows.read().len()
    }

    /// Check if no rows are persisted.
    pub fn is_empty(&self) -> bool {
        self.inner.rows.read().is_empty()
    }
}

impl MemoryModelBuilder {
    /// Declare an attribute with its column type.
    pub fn with_attribute(mut self, name: impl Into<String>, column: ColumnType) -> Self {
        self.columns.insert(name.into(), column);
        self
    }

    /// Attach a uniqueness rule.
    pub fn with_rule(mut self, rule: UniquenessRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Finish building; the row store starts empty.
    pub fn build(self) -> MemoryModel {
        MemoryModel {
            inner: Arc::new(ModelInner {
                name: self.name,
                columns: self.columns,
                rules: self.rules,
                rows: RwLock::new(Vec::new()),
            }),
        }
    }
}

impl Model for MemoryModel {
    type Record = MemoryRecord;

    fn name(&self) -> &str {
        &self.inner.name
    }

    fn blank(&self) -> MemoryRecord {
        MemoryRecord {
            model: Arc::clone(&self.inner),
            values: HashMap::new(),
            persisted_at: None,
        }
    }

    fn column(&self, attribute: &str) -> Option<ColumnType> {
        self.inner.columns.get(attribute).copied()
    }

    fn first(&self) -> Result<Option<MemoryRecord>, StoreError> {
        let rows = self.inner.rows.read();
        Ok(rows.first().map(|row| MemoryRecord {
            model: Arc::clone(&self.inner),
            values: row.clone(),
            persisted_at: Some(0),
        }))
    }

    fn all(&self) -> Result<Vec<MemoryRecord>, StoreError> {
        let rows = self.inner.rows.read();
        Ok(rows
            .iter()
            .enumerate()
            .map(|(index, row)| MemoryRecord {
                model: Arc::clone(&self.inner),
                values: row.clone(),
                persisted_at: Some(index),
            })
            .collect())
    }
}

/// An unsaved or persisted row of a [`MemoryModel`].
pub struct MemoryRecord {
    model: Arc<ModelInner>,
    values: Row,
    persisted_at: Option<usize>,
}

impl Record for MemoryRecord {
    fn has_attribute(&self, attribute: &str) -> bool {
        self.model.columns.contains_key(attribute)
    }

    fn get(&self, attribute: &str) -> Value {
        self.values.get(attribute).cloned().unwrap_or(Value::Null)
    }

    fn set(&mut self, attribute: &str, value: Value) -> Result<(), StoreError> {
        if !self.has_attribute(attribute) {
            return Err(StoreError::UnknownAttribute {
                model: self.model.name.clone(),
                attribute: attribute.to_string(),
            });
        }
        self.values.insert(attribute.to_string(), value);
        Ok(())
    }

    fn save_skipping_validation(&mut self) -> Result<(), StoreError> {
        let mut rows = self.model.rows.write();
        match self.persisted_at {
            Some(index) => rows[index] = self.values.clone(),
            None => {
                rows.push(self.values.clone());
                self.persisted_at = Some(rows.len() - 1);
                debug!(
                    model = %self.model.name,
                    rows = rows.len(),
                    "persisted record without validation"
                );
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<ValidationErrors, StoreError> {
        let rows = self.model.rows.read();
        let mut errors = ValidationErrors::new();
        for rule in &self.model.rules {
            rule.check(&self.values, &rows, self.persisted_at, &mut errors);
        }
        Ok(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_model() -> MemoryModel {
        MemoryModel::named("Post")
            .with_attribute("slug", ColumnType::Text)
            .with_attribute("journal_id", ColumnType::Numeric)
            .with_rule(UniquenessRule::new("slug").scoped_to("journal_id"))
            .build()
    }

    #[test]
    fn test_blank_record_reads_null() {
        let model = post_model();
        let record = model.blank();
        assert_eq!(record.get("slug"), Value::Null);
        assert!(record.has_attribute("slug"));
        assert!(!record.has_attribute("title"));
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let model = post_model();
        let mut record = model.blank();
        let result = record.set("title", Value::from("nope"));
        assert!(matches!(
            result,
            Err(StoreError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn test_seed_and_query() {
        let model = post_model();
        assert!(model.is_empty());

        model
            .seed([("slug", Value::from("x")), ("journal_id", Value::Int(1))])
            .unwrap();

        assert_eq!(model.len(), 1);
        let first = model.first().unwrap().unwrap();
        assert_eq!(first.get("slug"), Value::from("x"));
        assert_eq!(model.all().unwrap().len(), 1);
    }

    #[test]
    fn test_scoped_rule_conflicts() {
        let model = post_model();
        model
            .seed([("slug", Value::from("x")), ("journal_id", Value::Int(1))])
            .unwrap();

        // Same slug, same journal: conflict.
        let mut dup = model.blank();
        dup.set("slug", Value::from("x")).unwrap();
        dup.set("journal_id", Value::Int(1)).unwrap();
        assert_eq!(dup.validate().unwrap().of("slug"), [TAKEN_MESSAGE]);

        // Same slug, different journal: allowed.
        dup.set("journal_id", Value::Int(2)).unwrap();
        assert!(dup.validate().unwrap().is_empty());
    }

    #[test]
    fn test_own_row_excluded_from_conflict() {
        let model = post_model();
        let saved = model
            .seed([("slug", Value::from("x")), ("journal_id", Value::Int(1))])
            .unwrap();
        assert!(saved.validate().unwrap().is_empty());
    }

    #[test]
    fn test_case_insensitive_rule() {
        let model = MemoryModel::named("Account")
            .with_attribute("key", ColumnType::Text)
            .with_rule(UniquenessRule::new("key").case_insensitive())
            .build();
        model.seed([("key", Value::from("ABC"))]).unwrap();

        let mut dup = model.blank();
        dup.set("key", Value::from("abc")).unwrap();
        assert_eq!(dup.validate().unwrap().of("key"), [TAKEN_MESSAGE]);
    }

    #[test]
    fn test_allow_nil_rule() {
        let model = MemoryModel::named("Account")
            .with_attribute("key", ColumnType::Text)
            .with_rule(UniquenessRule::new("key").allow_nil())
            .build();
        model.seed([("key", Value::Null)]).unwrap();

        let mut record = model.blank();
        record.set("key", Value::Null).unwrap();
        assert!(record.validate().unwrap().is_empty());
    }

    #[test]
    fn test_nil_duplicates_conflict_without_allow_nil() {
        let model = MemoryModel::named("Account")
            .with_attribute("key", ColumnType::Text)
            .with_rule(UniquenessRule::new("key"))
            .build();
        model.seed([("key", Value::Null)]).unwrap();

        let mut record = model.blank();
        record.set("key", Value::Null).unwrap();
        assert_eq!(record.validate().unwrap().of("key"), [TAKEN_MESSAGE]);
    }

    #[test]
    fn test_custom_message() {
        let model = MemoryModel::named("Account")
            .with_attribute("key", ColumnType::Text)
            .with_rule(UniquenessRule::new("key").with_message("is already in use"))
            .build();
        model.seed([("key", Value::from("a"))]).unwrap();

        let mut record = model.blank();
        record.set("key", Value::from("a")).unwrap();
        assert_eq!(record.validate().unwrap().of("key"), ["is already in use"]);
    }

    #[test]
    fn test_resave_updates_in_place() {
        let model = post_model();
        let mut record = model
            .seed([("slug", Value::from("x")), ("journal_id", Value::Int(1))])
            .unwrap();

        record.set("slug", Value::from("y")).unwrap();
        record.save_skipping_validation().unwrap();

        assert_eq!(model.len(), 1);
        let first = model.first().unwrap().unwrap();
        assert_eq!(first.get("slug"), Value::from("y"));
    }
}
