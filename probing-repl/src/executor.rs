use crate::backend::ReplBackend;
use crate::magic::{parse_magic_line, MagicTable};
use crate::reply::Reply;

/// The stateful REPL executor: one fragment in, one
/// `{status, output, traceback}` reply out, with state persisting across
/// calls for as long as this `Executor` lives.
pub struct Executor {
    backend: Box<dyn ReplBackend>,
    magic: MagicTable,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("magic_commands", &self.magic.names())
            .finish()
    }
}

impl Executor {
    pub fn new(backend: Box<dyn ReplBackend>, magic: MagicTable) -> Self {
        Self { backend, magic }
    }

    pub fn execute(&mut self, fragment: &str) -> Reply {
        if let Some((name, args)) = parse_magic_line(fragment) {
            return self.magic.dispatch(name, &args);
        }
        self.backend.eval(fragment)
    }
}
