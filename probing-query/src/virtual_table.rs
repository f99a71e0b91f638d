use snafu::Snafu;

/// A parsed `python.<expr>` table reference, with the
/// `python.` namespace prefix already stripped.
#[derive(Debug, Clone, PartialEq)]
pub enum VirtualExpr {
    /// A dotted identifier path, e.g. `torch.cuda.memory_allocated`.
    NamePath(Vec<String>),
    /// A call form, e.g. `get_objects(limit=10)`. Arguments are kept as raw
    /// source text; the host introspector is responsible for evaluating
    /// them against its own runtime.
    Call { path: Vec<String>, raw_args: String },
}

impl VirtualExpr {
    /// Parses the expression following the `python.` prefix. Accepts a bare
    /// dotted path, or a path followed by a single parenthesised argument
    /// list (no nested call forms — the grammar is a single
    /// level: name path or call).
    pub fn parse(expr: &str) -> Option<Self> {
        let expr = expr.trim();
        if expr.is_empty() {
            return None;
        }
        if let Some(open) = expr.find('(') {
            if !expr.ends_with(')') {
                return None;
            }
            let path_part = &expr[..open];
            let raw_args = &expr[open + 1..expr.len() - 1];
            let path = split_path(path_part)?;
            Some(VirtualExpr::Call {
                path,
                raw_args: raw_args.to_string(),
            })
        } else {
            split_path(expr).map(VirtualExpr::NamePath)
        }
    }

    pub fn dotted(&self) -> String {
        match self {
            VirtualExpr::NamePath(path) => path.join("."),
            VirtualExpr::Call { path, raw_args } => format!("{}({})", path.join("."), raw_args),
        }
    }
}

fn split_path(s: &str) -> Option<Vec<String>> {
    let parts: Vec<String> = s.split('.').map(|p| p.trim().to_string()).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(parts)
}

/// The value a `HostIntrospector` hands back for a resolved expression,
/// before materialisation into table rows.
#[derive(Debug, Clone, PartialEq)]
pub enum IntrospectedValue {
    Scalar(probing_core::Value),
    Mapping(Vec<(String, probing_core::Value)>),
    Sequence(Vec<IntrospectedValue>),
}

#[derive(Debug, Snafu)]
pub enum ResolveError {
    #[snafu(display("could not parse virtual table expression '{}'", expr))]
    InvalidExpression { expr: String },

    #[snafu(display("host evaluation of '{}' failed: {}", expr, reason))]
    EvaluationFailed { expr: String, reason: String },
}

/// Evaluates a parsed `VirtualExpr` against the embedding host's runtime.
/// `probing-query` never implements this itself (it does not embed a
/// CPython interpreter); the top-level `probing` crate supplies a
/// pyo3-backed implementation, and tests use a fixture.
pub trait HostIntrospector: Send + Sync {
    fn eval(&self, expr: &VirtualExpr) -> Result<IntrospectedValue, ResolveError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_path() {
        assert_eq!(
            VirtualExpr::parse("torch.cuda.memory_allocated"),
            Some(VirtualExpr::NamePath(vec![
                "torch".to_string(),
                "cuda".to_string(),
                "memory_allocated".to_string(),
            ]))
        );
    }

    #[test]
    fn parses_call_form() {
        assert_eq!(
            VirtualExpr::parse("get_objects(limit=10)"),
            Some(VirtualExpr::Call {
                path: vec!["get_objects".to_string()],
                raw_args: "limit=10".to_string(),
            })
        );
    }

    #[test]
    fn rejects_empty_path_segment() {
        assert_eq!(VirtualExpr::parse("torch..cuda"), None);
        assert_eq!(VirtualExpr::parse(""), None);
    }

    #[test]
    fn rejects_unbalanced_call() {
        assert_eq!(VirtualExpr::parse("foo(bar"), None);
    }
}
