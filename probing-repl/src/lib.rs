//! The REPL executor: stateful fragment evaluation plus
//! magic-command dispatch.
#![deny(rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

mod backend;
mod executor;
mod magic;
#[cfg(feature = "python")]
mod pyo3_backend;
mod reply;
mod stub_backend;

pub use backend::ReplBackend;
pub use executor::Executor;
pub use magic::{parse_magic_line, MagicCommand, MagicTable};
#[cfg(feature = "python")]
pub use pyo3_backend::PyBackend;
pub use reply::{Reply, Status};
pub use stub_backend::StubBackend;
