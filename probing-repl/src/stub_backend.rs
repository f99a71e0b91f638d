use std::collections::HashMap;

use crate::backend::ReplBackend;
use crate::reply::Reply;

/// A minimal, dependency-free `ReplBackend` for targets without a CPython
/// dev install (the `python` feature disabled) and for this crate's own
/// tests. Understands just enough syntax — `name = <int|string literal>`,
/// bare name lookup, and a trailing `:` as an incomplete-block marker — to
/// exercise the executor's dispatch and state-persistence behaviour without
/// actually embedding a language runtime.
#[derive(Debug, Default)]
pub struct StubBackend {
    vars: HashMap<String, String>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_balanced(fragment: &str) -> bool {
        let mut depth = 0i32;
        for c in fragment.chars() {
            match c {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                _ => {}
            }
        }
        depth == 0
    }
}

impl ReplBackend for StubBackend {
    fn eval(&mut self, fragment: &str) -> Reply {
        let trimmed = fragment.trim();
        if trimmed.ends_with(':') || !Self::is_balanced(trimmed) {
            return Reply::continue_input();
        }
        if trimmed.is_empty() {
            return Reply::ok("");
        }

        if let Some((name, value)) = trimmed.split_once('=') {
            let name = name.trim();
            let value = value.trim();
            if is_identifier(name) {
                self.vars.insert(name.to_string(), value.to_string());
                return Reply::ok("");
            }
        }

        if is_identifier(trimmed) {
            return match self.vars.get(trimmed) {
                Some(value) => Reply::ok(value.clone()),
                None => Reply::error(
                    format!("NameError: name '{trimmed}' is not defined"),
                    vec![format!("NameError: name '{trimmed}' is not defined")],
                ),
            };
        }

        Reply::ok(trimmed.to_string())
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_persists_across_calls() {
        let mut backend = StubBackend::new();
        assert_eq!(backend.eval("x = 1").status, crate::reply::Status::Ok);
        let reply = backend.eval("x");
        assert_eq!(reply.output, "1");
    }

    #[test]
    fn unterminated_block_returns_continue() {
        let mut backend = StubBackend::new();
        let reply = backend.eval("if x:");
        assert_eq!(reply.status, crate::reply::Status::Continue);
    }

    #[test]
    fn unknown_name_is_an_error_with_traceback() {
        let mut backend = StubBackend::new();
        let reply = backend.eval("missing");
        assert_eq!(reply.status, crate::reply::Status::Error);
        assert!(!reply.traceback.is_empty());
    }

    #[test]
    fn unbalanced_brackets_continue() {
        let mut backend = StubBackend::new();
        let reply = backend.eval("foo(1, 2");
        assert_eq!(reply.status, crate::reply::Status::Continue);
    }
}
