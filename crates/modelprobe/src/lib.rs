//! Assertion matchers that probe validation behavior on model types.
//!
//! The central matcher is [`validate_uniqueness_of`]: it checks that a
//! model enforces a uniqueness rule on an attribute, with support for
//! scoped uniqueness, case-insensitive comparison, exempted nils, and
//! custom error messages.
//!
//! ```
//! use modelprobe::validate_uniqueness_of;
//! use modelprobe::model::{ColumnType, MemoryModel, UniquenessRule, Value};
//!
//! let post = MemoryModel::named("Post")
//!     .with_attribute("slug", ColumnType::Text)
//!     .with_attribute("journal_id", ColumnType::Numeric)
//!     .with_rule(UniquenessRule::new("slug").scoped_to("journal_id"))
//!     .build();
//! post.seed([("slug", Value::from("x")), ("journal_id", Value::Int(1))])
//!     .unwrap();
//!
//! let mut probe = validate_uniqueness_of("slug").scoped_to(["journal_id"]);
//! assert!(probe.matches(&post).unwrap(), "{}", probe.failure_message());
//! ```

pub mod message;
pub mod uniqueness;

pub use message::ExpectedMessage;
pub use uniqueness::{validate_uniqueness_of, UniquenessProbe};

/// Re-export of the model capability layer.
pub use modelprobe_model as model;
