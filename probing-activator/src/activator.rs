use probing_observability_deps::tracing::warn;

use crate::ancestor::already_attached;
use crate::grammar::{Grammar, Outcome};

/// Name fragment identifying this crate's own shared object in a process
/// memory map, used by `already_attached`.
const AGENT_SONAME_FRAGMENT: &str = "libprobing";

/// Reads and evaluates the `PROBING` environment variable.
/// Never panics and never returns an error the caller must handle by
/// aborting: any malformed input degrades to `Outcome::Disabled` with a
/// logged warning, so a typo in `PROBING` can never take down the host
/// process.
pub fn evaluate(raw: Option<&str>, script_basename: Option<&str>) -> Outcome {
    let Some(raw) = raw.filter(|v| !v.is_empty()) else {
        return Outcome::Disabled;
    };

    if already_attached(AGENT_SONAME_FRAGMENT) {
        warn!("agent already attached in an ancestor process, refusing to re-attach");
        return Outcome::Disabled;
    }

    match Grammar::parse(raw) {
        Ok(grammar) => grammar.resolve(script_basename),
        Err(err) => {
            warn!(error = %err, raw, "invalid PROBING grammar, disabling");
            Outcome::Disabled
        }
    }
}

/// Reads `PROBING` from the process environment and the current script's
/// basename from `argv[0]`, then evaluates the grammar.
pub fn evaluate_from_process() -> Outcome {
    let raw = std::env::var("PROBING").ok();
    let script = current_script_basename();
    evaluate(raw.as_deref(), script.as_deref())
}

pub fn current_script_basename() -> Option<String> {
    std::env::args()
        .next()
        .and_then(|arg0| {
            std::path::Path::new(&arg0)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
}

/// Applies the "clear the variable for children" rule of `1`/`followed`:
/// children of this process must not re-attach on their
/// own. Non-propagating attachment removes `PROBING` from this process's
/// environment so it is not inherited by subsequently spawned children.
pub fn apply_child_visibility(outcome: &Outcome) {
    if let Outcome::Attach { propagate: false } = outcome {
        std::env::remove_var("PROBING");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_var_disables() {
        assert_eq!(evaluate(None, None), Outcome::Disabled);
    }

    #[test]
    fn empty_var_disables() {
        assert_eq!(evaluate(Some(""), None), Outcome::Disabled);
    }

    #[test]
    fn malformed_regex_degrades_to_disabled_not_panic() {
        assert_eq!(evaluate(Some("regex:("), None), Outcome::Disabled);
    }
}
