use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum QueryError {
    #[snafu(display("unknown table '{}'", name))]
    UnknownTable { name: String },

    #[snafu(display("invalid SET statement: {}", reason))]
    InvalidSet { reason: String },

    #[snafu(display("query planning/execution failed: {}", source))]
    Execution { source: probing_datafusion::error::DataFusionError },

    #[snafu(display("result encoding failed: {}", source))]
    Encoding { source: serde_json::Error },

    #[snafu(display("{}", source))]
    Core { source: probing_core::ProbingError },
}

pub type Result<T, E = QueryError> = std::result::Result<T, E>;

impl From<probing_core::ProbingError> for QueryError {
    fn from(source: probing_core::ProbingError) -> Self {
        QueryError::Core { source }
    }
}
