use crate::reply::Reply;

/// Executes source fragments against a persistent interpreter state.
/// Implementors own whatever state "variables, imports"
/// means for their language; the executor that wraps a `ReplBackend` only
/// handles magic-command dispatch on top.
pub trait ReplBackend: Send {
    fn eval(&mut self, fragment: &str) -> Reply;
}
