use snafu::Snafu;

/// The caller-observable error kinds. Every `probing-*` crate
/// that can fail returns this enum (directly, or wrapped via `#[snafu(source)]`
/// in a crate-local error), so SQL/REPL responses can uniformly classify
/// failures without downcasting.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProbingError {
    #[snafu(display(
        "schema mismatch for table '{}': expected {:?}, got {:?}",
        table,
        expected,
        actual
    ))]
    SchemaMismatch {
        table: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[snafu(display("unknown table '{}'", name))]
    UnknownTable { name: String },

    #[snafu(display("invalid config: {}", reason))]
    InvalidConfig { reason: String },

    #[snafu(display("span queue overflowed, dropping span"))]
    QueueOverflow,

    #[snafu(display("extension '{}' failed: {}", name, reason))]
    ExtensionFailure { name: String, reason: String },

    #[snafu(display("internal error: {}", reason))]
    InternalError { reason: String },
}

pub type Result<T, E = ProbingError> = std::result::Result<T, E>;

impl ProbingError {
    /// A stable, machine-readable tag for the kind of error, used by the SQL
    /// and REPL front-ends when encoding `{status: "error", ...}` replies.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbingError::SchemaMismatch { .. } => "SchemaMismatch",
            ProbingError::UnknownTable { .. } => "UnknownTable",
            ProbingError::InvalidConfig { .. } => "InvalidConfig",
            ProbingError::QueueOverflow => "QueueOverflow",
            ProbingError::ExtensionFailure { .. } => "ExtensionFailure",
            ProbingError::InternalError { .. } => "InternalError",
        }
    }
}
