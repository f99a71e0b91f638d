use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::backend::ReplBackend;
use crate::reply::Reply;

/// A `ReplBackend` that evaluates fragments against an embedded CPython
/// interpreter via `pyo3`, gated behind the `python` feature so the crate
/// still builds without a CPython dev install (matching the teacher's
/// conditional-compile pattern for optional native dependencies). State
/// persists across calls in a single globals dict held for the lifetime of
/// this backend.
pub struct PyBackend {
    globals: Py<PyDict>,
}

impl std::fmt::Debug for PyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PyBackend").finish()
    }
}

impl PyBackend {
    pub fn new() -> Self {
        Python::with_gil(|py| Self {
            globals: PyDict::new(py).into(),
        })
    }

    /// Uses the standard library's `codeop.compile_command` to tell an
    /// unterminated block apart from a genuine syntax error, the same
    /// mechanism CPython's own interactive console uses.
    fn is_incomplete(py: Python<'_>, fragment: &str) -> bool {
        let Ok(codeop) = py.import("codeop") else {
            return false;
        };
        match codeop.call_method1("compile_command", (fragment,)) {
            Ok(result) => result.is_none(),
            Err(_) => false,
        }
    }
}

impl Default for PyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplBackend for PyBackend {
    fn eval(&mut self, fragment: &str) -> Reply {
        Python::with_gil(|py| {
            if Self::is_incomplete(py, fragment) {
                return Reply::continue_input();
            }

            let globals = self.globals.as_ref(py);
            let (sys, io) = match (py.import("sys"), py.import("io")) {
                (Ok(sys), Ok(io)) => (sys, io),
                _ => return Reply::error("failed to prepare interpreter", vec![]),
            };
            let Ok(captured) = io.call_method0("StringIO") else {
                return Reply::error("failed to capture output", vec![]);
            };
            let old_stdout = sys.getattr("stdout").ok();
            let _ = sys.setattr("stdout", captured);

            let result = py.run(fragment, Some(globals), None);

            if let Some(old_stdout) = old_stdout {
                let _ = sys.setattr("stdout", old_stdout);
            }
            let output = captured
                .call_method0("getvalue")
                .and_then(|v| v.extract::<String>())
                .unwrap_or_default();

            match result {
                Ok(()) => Reply::ok(output),
                Err(err) => {
                    let traceback = format_traceback(py, &err);
                    Reply::error(format!("{output}{err}"), traceback)
                }
            }
        })
    }
}

fn format_traceback(py: Python<'_>, err: &PyErr) -> Vec<String> {
    err.traceback(py)
        .and_then(|tb| tb.format().ok())
        .map(|formatted| formatted.lines().map(str::to_string).collect())
        .unwrap_or_else(|| vec![err.to_string()])
}
