//! Model-layer capability interface for modelprobe.
//!
//! This crate defines the narrow surface matchers consume from a model
//! backend: scalar [`Value`]s, coarse [`ColumnType`] metadata, the
//! [`Model`]/[`Record`] capability traits, and [`ValidationErrors`]. It also
//! ships [`MemoryModel`], an in-memory reference implementation used by the
//! matcher test suites.

pub mod adapter;
pub mod column;
pub mod error;
pub mod memory;
pub mod value;

pub use adapter::{Model, Record, ValidationErrors, TAKEN_MESSAGE};
pub use column::{generate_uuid, string_succ, ColumnType};
pub use error::StoreError;
pub use memory::{MemoryModel, MemoryModelBuilder, MemoryRecord, UniquenessRule};
pub use value::Value;
