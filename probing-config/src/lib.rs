//! Extension lifecycle and configuration knobs, exposed to
//! the SQL front-end through `probing_query::ConfigSink`.
#![deny(rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

mod extension;
mod registry;

pub use extension::{Extension, ExtensionLoader};
pub use registry::ExtensionRegistry;
