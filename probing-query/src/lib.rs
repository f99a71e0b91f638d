//! Virtual table resolution and the SQL engine front,
//! built on an embedded DataFusion query executor.
#![deny(rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

mod engine;
mod error;
mod provider;
mod resolver;
mod virtual_table;

pub use engine::{ConfigSink, Engine, QueryResult, VIRTUAL_SCHEMA};
pub use error::{QueryError, Result};
pub use provider::{to_record_batch, VirtualSchemaProvider};
pub use resolver::materialize;
pub use virtual_table::{HostIntrospector, IntrospectedValue, ResolveError, VirtualExpr};
