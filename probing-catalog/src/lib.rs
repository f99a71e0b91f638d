//! The table registry: a process-wide name -> `Table` map.
#![deny(rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

mod registry;

pub use registry::Registry;
