use regex::Regex;
use thiserror::Error;

/// The parsed form of the `PROBING` environment variable.
#[derive(Debug, Clone)]
pub enum Grammar {
    Disabled,
    /// `1` / `followed`: attach in this process only.
    AttachLocal,
    /// `2` / `nested`: attach and propagate to children.
    AttachNested,
    /// `regex:PATTERN`: attach iff the current script basename matches.
    AttachIfRegex { pattern: Regex },
    /// `<scriptname>`: attach iff basename equals this name exactly.
    AttachIfScript { name: String },
    /// `init:PATH[+VALUE]`: run `PATH` as initialisation, then re-evaluate
    /// with `VALUE` (default `0`).
    Init { path: String, then_value: String },
}

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("invalid regex in PROBING grammar: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("init: grammar requires a non-empty path")]
    EmptyInitPath,
}

impl Grammar {
    pub fn parse(raw: &str) -> Result<Self, GrammarError> {
        match raw {
            "0" => Ok(Grammar::Disabled),
            "1" | "followed" => Ok(Grammar::AttachLocal),
            "2" | "nested" => Ok(Grammar::AttachNested),
            other => {
                if let Some(pattern) = other.strip_prefix("regex:") {
                    Ok(Grammar::AttachIfRegex {
                        pattern: Regex::new(pattern)?,
                    })
                } else if let Some(rest) = other.strip_prefix("init:") {
                    if rest.is_empty() {
                        return Err(GrammarError::EmptyInitPath);
                    }
                    let (path, then_value) = match rest.split_once('+') {
                        Some((path, value)) => (path.to_string(), value.to_string()),
                        None => (rest.to_string(), "0".to_string()),
                    };
                    if path.is_empty() {
                        return Err(GrammarError::EmptyInitPath);
                    }
                    Ok(Grammar::Init { path, then_value })
                } else {
                    Ok(Grammar::AttachIfScript {
                        name: other.to_string(),
                    })
                }
            }
        }
    }
}

/// What the activator should do, after resolving a `Grammar` against the
/// current script's basename.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Disabled,
    Attach { propagate: bool },
    RunInit { path: String, then_value: String },
}

impl Grammar {
    pub fn resolve(&self, script_basename: Option<&str>) -> Outcome {
        match self {
            Grammar::Disabled => Outcome::Disabled,
            Grammar::AttachLocal => Outcome::Attach { propagate: false },
            Grammar::AttachNested => Outcome::Attach { propagate: true },
            Grammar::AttachIfRegex { pattern } => {
                if script_basename.is_some_and(|s| pattern.is_match(s)) {
                    Outcome::Attach { propagate: true }
                } else {
                    Outcome::Disabled
                }
            }
            Grammar::AttachIfScript { name } => {
                if script_basename == Some(name.as_str()) {
                    Outcome::Attach { propagate: true }
                } else {
                    Outcome::Disabled
                }
            }
            Grammar::Init { path, then_value } => Outcome::RunInit {
                path: path.clone(),
                then_value: then_value.clone(),
            },
        }
    }
}
