//! Shared data model and error taxonomy for the `probing` workspace.
//!
//! Every other `probing-*` crate depends on this one for `Value`, `Schema`,
//! `TableConfig` and `ProbingError` so that table definitions, SQL results
//! and REPL replies all agree on the same scalar representation.
#![deny(rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

mod config;
mod error;
mod row;
mod schema;
mod value;

pub use config::{DiscardStrategy, TableConfig};
pub use error::{ProbingError, Result};
pub use row::{Row, Schematic};
pub use schema::{Field, Schema};
pub use value::{DataType, Value};
