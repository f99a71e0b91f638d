use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::reply::Reply;

/// A privileged introspection entry point, invoked with a
/// `%`-prefixed line instead of being evaluated as source. Handlers return
/// a JSON-stringifiable value rather than a bare string, since most magic
/// commands (`get_objects`, `bt`, ...) are naturally structured.
pub struct MagicCommand {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    handler: Arc<dyn Fn(&[String]) -> Result<JsonValue, String> + Send + Sync>,
}

impl std::fmt::Debug for MagicCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagicCommand")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish()
    }
}

impl MagicCommand {
    pub fn new(
        name: &'static str,
        min_args: usize,
        max_args: usize,
        handler: impl Fn(&[String]) -> Result<JsonValue, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            handler: Arc::new(handler),
        }
    }

    fn invoke(&self, args: &[String]) -> Reply {
        if args.len() < self.min_args || args.len() > self.max_args {
            return Reply::error(
                format!(
                    "{} expects {}..={} arguments, got {}",
                    self.name,
                    self.min_args,
                    self.max_args,
                    args.len()
                ),
                vec![],
            );
        }
        match (self.handler)(args) {
            Ok(value) => Reply::ok(value.to_string()),
            Err(message) => Reply::error(message, vec![]),
        }
    }
}

/// The set of magic commands an executor recognises, keyed by name
/// (`remote_debug`, `tprofile`, `tsummary`, `bt`, `dump_stack`,
/// `get_objects`, `get_torch_tensors`, `get_torch_modules`). Kept as a data
/// table rather than a fixed `match`, since callers register their own
/// host-specific handlers at construction time — generalising the
/// teacher's `SystemSchemaProvider`-style name dispatch.
#[derive(Debug, Default)]
pub struct MagicTable {
    commands: HashMap<&'static str, MagicCommand>,
}

impl MagicTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: MagicCommand) {
        self.commands.insert(command.name, command);
    }

    pub fn dispatch(&self, name: &str, args: &[String]) -> Reply {
        match self.commands.get(name) {
            Some(command) => command.invoke(args),
            None => Reply::error(format!("unknown magic command '{name}'"), vec![]),
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }
}

/// Splits a `%name arg1 arg2` line into its command name and whitespace
/// -separated arguments.
pub fn parse_magic_line(line: &str) -> Option<(&str, Vec<String>)> {
    let rest = line.strip_prefix('%')?;
    let mut parts = rest.split_whitespace();
    let name = parts.next()?;
    let args = parts.map(str::to_string).collect();
    Some((name, args))
}
