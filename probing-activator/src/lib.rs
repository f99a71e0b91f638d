//! The process/script activator: parses the `PROBING`
//! environment variable grammar and decides whether to attach.
#![deny(rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

mod activator;
mod ancestor;
mod grammar;

pub use activator::{apply_child_visibility, current_script_basename, evaluate, evaluate_from_process};
pub use ancestor::already_attached;
pub use grammar::{Grammar, GrammarError, Outcome};
