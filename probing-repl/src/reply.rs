use serde::Serialize;

/// The outcome of one executed fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Error,
    /// Sentinel for an unterminated block (e.g. an open `if:` with no
    /// body yet): the caller should send more input before this fragment
    /// can run.
    Continue,
}

/// `{status, output, traceback}`. Every REPL and magic
/// command call returns one of these.
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub status: Status,
    pub output: String,
    pub traceback: Vec<String>,
}

impl Reply {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            output: output.into(),
            traceback: Vec::new(),
        }
    }

    pub fn error(output: impl Into<String>, traceback: Vec<String>) -> Self {
        Self {
            status: Status::Error,
            output: output.into(),
            traceback,
        }
    }

    pub fn continue_input() -> Self {
        Self {
            status: Status::Continue,
            output: String::new(),
            traceback: Vec::new(),
        }
    }
}
