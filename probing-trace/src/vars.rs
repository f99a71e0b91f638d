use probing_core::Value;

/// Snapshots user variables from the host's current call stack, to trace
/// at a `post_step` boundary. The original reaches
/// into Python frame locals for this; this crate only defines the seam —
/// the top-level `probing` crate supplies the pyo3-backed implementation.
pub trait VariableSource: Send + Sync {
    fn snapshot(&self) -> Vec<(String, Value)>;
}

/// Default source for hosts that have not registered any variables to
/// trace.
#[derive(Debug, Default)]
pub struct NullVariableSource;

impl VariableSource for NullVariableSource {
    fn snapshot(&self) -> Vec<(String, Value)> {
        Vec::new()
    }
}
