//! Persistent settings for the llama-server console.
//!
//! This crate owns the strongly typed settings record, the validators used
//! when an operator edits a field, and the JSON5 store that keeps the record
//! under the user's home directory between sessions.

mod error;
mod model;
mod store;

/// Errors returned by the store and by field validation.
pub use error::{ConfigError, ValidationError};
/// Settings record and field types.
pub use model::*;
/// Settings persistence.
pub use store::{ConfigStore, LoadStatus, Loaded};
