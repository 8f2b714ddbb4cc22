//! Uniqueness validation probe.
//!
//! [`UniquenessProbe`] checks that a model enforces a uniqueness rule on an
//! attribute, optionally scoped to further attributes, case-insensitively,
//! or with nil values exempted. The probe synthesizes one or two records in
//! the backing store as part of the check and never cleans them up;
//! surrounding test isolation is expected to handle that.
//!
//! The walk is a strict AND chain: obtain (or synthesize) an existing
//! record, copy its scope values onto a fresh subject, require the
//! duplicate value to be disallowed, require the duplicate to become
//! allowed once each scope value changes, and finally require nil to be
//! allowed when configured.

use std::cmp::Ordering;

use modelprobe_model::{ColumnType, Model, Record, StoreError, ValidationErrors, Value};
use tracing::debug;

use crate::message::ExpectedMessage;

/// Build a probe asserting that `attribute` must be unique.
pub fn validate_uniqueness_of(attribute: impl Into<String>) -> UniquenessProbe {
    UniquenessProbe::new(attribute)
}

/// Immutable probe configuration, frozen once evaluation starts.
#[derive(Debug, Clone)]
struct ProbeConfig {
    attribute: String,
    scopes: Vec<String>,
    case_insensitive: bool,
    allow_nil: bool,
    expected_message: ExpectedMessage,
}

impl ProbeConfig {
    fn description(&self) -> String {
        let mut description = String::from("require ");
        if !self.case_insensitive {
            description.push_str("case sensitive ");
        }
        description.push_str(&format!("unique value for \"{}\"", self.attribute));
        if !self.scopes.is_empty() {
            description.push_str(&format!(" scoped to ({})", self.scopes.join(", ")));
        }
        description
    }
}

/// Result of one evaluation: the verdict plus both report strings.
#[derive(Debug, Clone)]
struct ProbeOutcome {
    matched: bool,
    failure: String,
    negated: String,
}

/// Matcher asserting that a model enforces uniqueness of an attribute.
///
/// Configuration calls must all happen before the first [`matches`] call;
/// the configuration is frozen once an evaluation starts.
///
/// [`matches`]: UniquenessProbe::matches
pub struct UniquenessProbe {
    config: ProbeConfig,
    outcome: Option<ProbeOutcome>,
}

impl UniquenessProbe {
    /// Create a probe for `attribute` with default options.
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            config: ProbeConfig {
                attribute: attribute.into(),
                scopes: Vec::new(),
                case_insensitive: false,
                allow_nil: false,
                expected_message: ExpectedMessage::default(),
            },
            outcome: None,
        }
    }

    /// Require the attribute to be unique only within the given scopes.
    pub fn scoped_to<S, I>(mut self, scopes: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        self.config.scopes.extend(scopes.into_iter().map(Into::into));
        self.outcome = None;
        self
    }

    /// Expect this exact validation message instead of the default.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.config.expected_message = ExpectedMessage::exact(message);
        self.outcome = None;
        self
    }

    /// Expect a validation message containing `pattern`.
    pub fn with_message_matching(mut self, pattern: impl Into<String>) -> Self {
        self.config.expected_message = ExpectedMessage::pattern(pattern);
        self.outcome = None;
        self
    }

    /// Require differently-cased duplicates to be rejected too.
    pub fn case_insensitive(mut self) -> Self {
        self.config.case_insensitive = true;
        self.outcome = None;
        self
    }

    /// Exempt nil values from the uniqueness requirement.
    pub fn allow_nil(mut self) -> Self {
        self.config.allow_nil = true;
        self.outcome = None;
        self
    }

    /// Evaluate the probe against `model`.
    ///
    /// `Ok(false)` covers both assertion failures and configuration
    /// mistakes (a scope attribute the model lacks); unexpected storage
    /// errors propagate untouched.
    pub fn matches<M: Model>(&mut self, model: &M) -> Result<bool, StoreError> {
        debug!(
            model = %model.name(),
            attribute = %self.config.attribute,
            scopes = self.config.scopes.len(),
            "evaluating uniqueness probe"
        );
        let outcome = Evaluation::new(&self.config, model).run()?;
        let matched = outcome.matched;
        self.outcome = Some(outcome);
        Ok(matched)
    }

    /// One-line summary of the configured expectation.
    pub fn description(&self) -> String {
        self.config.description()
    }

    /// Explanation of why the last evaluation failed.
    pub fn failure_message(&self) -> String {
        match &self.outcome {
            Some(outcome) => outcome.failure.clone(),
            None => format!("Expected the model to {}", self.config.description()),
        }
    }

    /// Explanation for a negated assertion that unexpectedly matched.
    pub fn failure_message_when_negated(&self) -> String {
        match &self.outcome {
            Some(outcome) => outcome.negated.clone(),
            None => format!("Did not expect the model to {}", self.config.description()),
        }
    }
}

/// One walk of the decision tree against one model.
///
/// Owns the transient subject record; borrows the frozen configuration.
struct Evaluation<'a, M: Model> {
    config: &'a ProbeConfig,
    model: &'a M,
    subject: M::Record,
    failure_suffixes: Vec<String>,
    negated_suffixes: Vec<String>,
}

impl<'a, M: Model> Evaluation<'a, M> {
    fn new(config: &'a ProbeConfig, model: &'a M) -> Self {
        Self {
            config,
            model,
            subject: model.blank(),
            failure_suffixes: Vec::new(),
            negated_suffixes: Vec::new(),
        }
    }

    fn run(mut self) -> Result<ProbeOutcome, StoreError> {
        let existing = self.existing_record()?;

        if let Some(scope) = self.copy_scope_values(&existing)? {
            let message = format!(
                "{} doesn't seem to have a {} attribute.",
                self.model.name(),
                scope
            );
            return Ok(self.outcome(false, message));
        }

        let existing_value = self.resolve_existing_value(&existing)?;
        let candidate = self.candidate_for(&existing_value);
        if !self.disallows_value_of(candidate)? {
            let message = self.standard_failure();
            return Ok(self.outcome(false, message));
        }

        if !self.validate_after_scope_change(&existing_value)? {
            let message = self.standard_failure();
            return Ok(self.outcome(false, message));
        }

        if !self.allows_nil(&existing)? {
            let message = format!(
                "Expected {} to allow a nil value for \"{}\", but it did not",
                self.model.name(),
                self.config.attribute
            );
            return Ok(self.outcome(false, message));
        }

        let failure = self.standard_failure();
        Ok(self.outcome(true, failure))
    }

    /// Fetch the first persisted record, synthesizing one when the store is
    /// empty. Synthesis bypasses validation so the probe stays independent
    /// of the rule under test.
    fn existing_record(&self) -> Result<M::Record, StoreError> {
        if let Some(record) = self.model.first()? {
            return Ok(record);
        }
        debug!(
            model = %self.model.name(),
            attribute = %self.config.attribute,
            "no persisted record, synthesizing one"
        );
        self.create_record(Value::from("a"))
    }

    fn create_record(&self, value: Value) -> Result<M::Record, StoreError> {
        let config = self.config;
        let mut record = self.model.blank();
        record.set(&config.attribute, value)?;
        for credential in ["password", "password_confirmation"] {
            if record.has_attribute(credential) {
                record.set(credential, Value::from("password"))?;
            }
        }
        record.save_skipping_validation()?;
        Ok(record)
    }

    /// Copy each scope value from the existing record onto the subject.
    /// Returns the first scope the model does not declare, if any.
    fn copy_scope_values(&mut self, existing: &M::Record) -> Result<Option<String>, StoreError> {
        let config = self.config;
        for scope in &config.scopes {
            if !self.subject.has_attribute(scope) {
                return Ok(Some(scope.clone()));
            }
            self.subject.set(scope, existing.get(scope))?;
        }
        Ok(None)
    }

    /// The value the duplicate check compares against. When nils are
    /// exempted and the existing record holds nil, a second non-nil record
    /// is persisted so the check has a real value to work with.
    fn resolve_existing_value(&mut self, existing: &M::Record) -> Result<Value, StoreError> {
        let config = self.config;
        let value = existing.get(&config.attribute);
        if config.allow_nil && value.is_null() {
            debug!(
                model = %self.model.name(),
                "existing record holds nil, persisting a non-nil comparison record"
            );
            let replacement = self.create_record(Value::from("a"))?;
            return Ok(replacement.get(&config.attribute));
        }
        Ok(value)
    }

    fn candidate_for(&self, existing_value: &Value) -> Value {
        if self.config.case_insensitive {
            existing_value.swap_case()
        } else {
            existing_value.clone()
        }
    }

    /// For each scope: move the subject's scope to a value no persisted
    /// record uses and require the duplicate to become acceptable. All
    /// failing scopes accumulate into the failure message; passing scopes
    /// annotate the negated message symmetrically. The scope value is
    /// restored before the next iteration either way.
    fn validate_after_scope_change(&mut self, existing_value: &Value) -> Result<bool, StoreError> {
        let config = self.config;
        if config.scopes.is_empty() {
            return Ok(true);
        }

        let mut all_passed = true;
        for scope in &config.scopes {
            let previous = self.subject.get(scope);
            let next = self.next_scope_value(scope)?;
            debug!(scope = %scope, next = %next, "re-checking duplicate with changed scope");
            self.subject.set(scope, next)?;

            let candidate = self.candidate_for(existing_value);
            let allowed = !self.disallows_value_of(candidate)?;
            let suffix = format!(" (with different value of {})", scope);
            if allowed {
                self.negated_suffixes.push(suffix);
            } else {
                all_passed = false;
                self.failure_suffixes.push(suffix);
            }

            self.subject.set(scope, previous)?;
        }
        Ok(all_passed)
    }

    /// Successor of the maximum persisted value of `scope`, falling back to
    /// the column-type zero value when nothing usable is persisted.
    fn next_scope_value(&self, scope: &str) -> Result<Value, StoreError> {
        let column = self.model.column(scope).unwrap_or(ColumnType::Text);

        let mut max: Option<Value> = None;
        for record in self.model.all()? {
            let value = record.get(scope);
            if value.is_null() {
                continue;
            }
            let is_greater = match &max {
                Some(current) => value.compare(current) == Some(Ordering::Greater),
                None => true,
            };
            if is_greater {
                max = Some(value);
            }
        }

        let base = max.unwrap_or_else(|| column.zero_value());
        Ok(column.next_value(&base))
    }

    /// Only checked when nils are exempted: a nil-valued record must exist
    /// in the store and the subject must validate cleanly with nil set.
    fn allows_nil(&mut self, existing: &M::Record) -> Result<bool, StoreError> {
        let config = self.config;
        if !config.allow_nil {
            return Ok(true);
        }
        if !existing.get(&config.attribute).is_null() {
            self.create_record(Value::Null)?;
        }
        Ok(!self.disallows_value_of(Value::Null)?)
    }

    /// Set `value` on the subject, validate, and report whether the
    /// expected message appears among the attribute's errors.
    fn disallows_value_of(&mut self, value: Value) -> Result<bool, StoreError> {
        let config = self.config;
        let errors = self.errors_for(value)?;
        Ok(config
            .expected_message
            .is_included_in(errors.of(&config.attribute)))
    }

    fn errors_for(&mut self, value: Value) -> Result<ValidationErrors, StoreError> {
        let config = self.config;
        self.subject.set(&config.attribute, value)?;
        self.subject.validate()
    }

    fn standard_failure(&self) -> String {
        format!(
            "Expected {} to {}, but it did not",
            self.model.name(),
            self.config.description()
        )
    }

    fn outcome(self, matched: bool, failure: String) -> ProbeOutcome {
        let mut failure = failure;
        for suffix in &self.failure_suffixes {
            failure.push_str(suffix);
        }

        let mut negated = format!(
            "Did not expect {} to {}",
            self.model.name(),
            self.config.description()
        );
        for suffix in &self.negated_suffixes {
            negated.push_str(suffix);
        }

        ProbeOutcome {
            matched,
            failure,
            negated,
        }
    }
}
