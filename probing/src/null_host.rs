use std::sync::Arc;

use probing_config::{Extension, ExtensionLoader};
use probing_core::{ProbingError, Result};
use probing_query::{HostIntrospector, IntrospectedValue, ResolveError, VirtualExpr};

/// The `HostIntrospector`/`ExtensionLoader`/`VariableSource` trio used when
/// the `python` feature is off. There is no embedded interpreter to resolve
/// `python.*` virtual tables, load extension modules, or snapshot frame
/// locals against, so every call reports failure rather than silently
/// fabricating data.
#[derive(Debug, Default)]
pub struct NullHostIntrospector;

impl HostIntrospector for NullHostIntrospector {
    fn eval(&self, expr: &VirtualExpr) -> std::result::Result<IntrospectedValue, ResolveError> {
        Err(ResolveError::EvaluationFailed {
            expr: expr.dotted(),
            reason: "no host runtime embedded (build with the 'python' feature)".to_string(),
        })
    }
}

#[derive(Debug, Default)]
pub struct NullExtensionLoader;

impl ExtensionLoader for NullExtensionLoader {
    fn load(&self, path: &str) -> Result<Arc<dyn Extension>, ProbingError> {
        Err(ProbingError::ExtensionFailure {
            name: path.to_string(),
            reason: "no host runtime embedded (build with the 'python' feature)".to_string(),
        })
    }
}

/// `VariableSource` is already exported as `NullVariableSource` by
/// `probing-trace`; re-exported here under the same name the `python`
/// module's counterpart uses, so `lib.rs` can pick either without the
/// caller needing to know which feature set built the binary.
pub use probing_trace::NullVariableSource;
