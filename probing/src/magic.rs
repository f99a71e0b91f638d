//! Registers the eight magic commands (`remote_debug`, `tprofile`,
//! `tsummary`, `bt`, `dump_stack`, `get_objects`, `get_torch_tensors`,
//! `get_torch_modules`) an executor dispatches `%`-prefixed lines to.
//! `tprofile`/`tsummary` are agent-native (they read tracer state this
//! crate already owns) and so have one implementation regardless of the
//! `python` feature; the rest need a live interpreter to introspect and so
//! have a real pyo3-backed handler under `python` and a host-stub fallback
//! otherwise, following the same split as `default_backend`.

use std::sync::Arc;

use probing_repl::{MagicCommand, MagicTable};
use serde_json::Value as JsonValue;

use crate::agent::Agent;

fn kw<'a>(args: &'a [String], key: &str) -> Option<&'a str> {
    args.iter()
        .find_map(|arg| arg.split_once('=').filter(|(k, _)| *k == key).map(|(_, v)| v))
}

pub(crate) fn build_magic_table(agent: &Arc<Agent>) -> MagicTable {
    let mut table = MagicTable::new();
    table.register(remote_debug_command());
    table.register(tprofile_command(Arc::clone(agent)));
    table.register(tsummary_command(Arc::clone(agent)));
    table.register(bt_command());
    table.register(dump_stack_command());
    table.register(get_objects_command(Arc::clone(agent)));
    table.register(get_torch_tensors_command());
    table.register(get_torch_modules_command());
    table
}

fn remote_debug_command() -> MagicCommand {
    MagicCommand::new("remote_debug", 0, 2, |args| {
        let host = kw(args, "host").unwrap_or("127.0.0.1");
        let port: u16 = kw(args, "port")
            .unwrap_or("5678")
            .parse()
            .map_err(|_| "port must be a u16".to_string())?;
        remote_debug_impl(host, port)
    })
}

#[cfg(feature = "python")]
fn remote_debug_impl(host: &str, port: u16) -> Result<JsonValue, String> {
    crate::python::remote_debug(host, port).map_err(|err| err.to_string())
}

#[cfg(not(feature = "python"))]
fn remote_debug_impl(host: &str, port: u16) -> Result<JsonValue, String> {
    Ok(serde_json::json!({
        "debugger_installed": false,
        "note": format!(
            "no interpreter to attach a debugger to; connect a debugger to {host}:{port} directly, \
             or use this REPL connection as the remote channel"
        ),
    }))
}

/// Reports the named tracer's current phase, step counter and rows
/// appended so far. Defaults to the tracer named `torch` when no argument
/// is given, matching the original `%tprofile` magic's implicit target.
fn tprofile_command(agent: Arc<Agent>) -> MagicCommand {
    MagicCommand::new("tprofile", 0, 1, move |args| {
        let name = kw(args, "mid")
            .or_else(|| args.first().map(String::as_str))
            .unwrap_or("torch");
        let tracer = agent
            .tracer(name)
            .ok_or_else(|| format!("no tracer named '{name}' is enabled"))?;
        let rows = agent
            .get_table(&format!("{name}_trace"))
            .map(|handle| handle.stats().rows_appended)
            .unwrap_or(0);
        Ok(serde_json::json!({
            "tracer": name,
            "state": format!("{:?}", tracer.state()),
            "step": tracer.step(),
            "rows_appended": rows,
        }))
    })
}

/// Summarises every tracer currently enabled on the agent.
fn tsummary_command(agent: Arc<Agent>) -> MagicCommand {
    MagicCommand::new("tsummary", 0, 0, move |_args| {
        let summaries: Vec<JsonValue> = agent
            .tracer_names()
            .into_iter()
            .filter_map(|name| {
                let tracer = agent.tracer(&name)?;
                Some(serde_json::json!({
                    "tracer": name,
                    "state": format!("{:?}", tracer.state()),
                    "step": tracer.step(),
                }))
            })
            .collect();
        Ok(JsonValue::Array(summaries))
    })
}

fn bt_command() -> MagicCommand {
    MagicCommand::new("bt", 0, 0, |_args| bt_impl())
}

#[cfg(feature = "python")]
fn bt_impl() -> Result<JsonValue, String> {
    crate::python::backtrace_text()
        .map(JsonValue::String)
        .map_err(|err| err.to_string())
}

#[cfg(not(feature = "python"))]
fn bt_impl() -> Result<JsonValue, String> {
    Ok(JsonValue::String(
        std::backtrace::Backtrace::force_capture().to_string(),
    ))
}

fn dump_stack_command() -> MagicCommand {
    MagicCommand::new("dump_stack", 0, 0, |_args| dump_stack_impl())
}

#[cfg(feature = "python")]
fn dump_stack_impl() -> Result<JsonValue, String> {
    crate::python::dump_stack().map_err(|err| err.to_string())
}

#[cfg(not(feature = "python"))]
fn dump_stack_impl() -> Result<JsonValue, String> {
    let frames: Vec<JsonValue> = std::backtrace::Backtrace::force_capture()
        .to_string()
        .lines()
        .map(|line| JsonValue::String(line.to_string()))
        .collect();
    Ok(JsonValue::Array(frames))
}

fn get_objects_command(agent: Arc<Agent>) -> MagicCommand {
    MagicCommand::new("get_objects", 0, 2, move |args| {
        let type_name = kw(args, "type");
        let limit = kw(args, "limit").and_then(|v| v.parse::<usize>().ok());
        get_objects_impl(&agent, type_name, limit)
    })
}

#[cfg(feature = "python")]
fn get_objects_impl(_agent: &Arc<Agent>, type_name: Option<&str>, limit: Option<usize>) -> Result<JsonValue, String> {
    crate::python::objects_of_type(type_name, limit).map_err(|err| err.to_string())
}

#[cfg(not(feature = "python"))]
fn get_objects_impl(agent: &Arc<Agent>, type_name: Option<&str>, limit: Option<usize>) -> Result<JsonValue, String> {
    let mut names = agent.table_names();
    if let Some(type_name) = type_name {
        names.retain(|name| name.as_str() == type_name);
    }
    if let Some(limit) = limit {
        names.truncate(limit);
    }
    Ok(JsonValue::Array(
        names
            .into_iter()
            .map(|name| serde_json::json!({"id": name, "class": "probing::Table"}))
            .collect(),
    ))
}

fn get_torch_tensors_command() -> MagicCommand {
    MagicCommand::new("get_torch_tensors", 0, 1, |args| {
        let limit = kw(args, "limit").and_then(|v| v.parse::<usize>().ok());
        torch_objects_impl("tensor", limit)
    })
}

fn get_torch_modules_command() -> MagicCommand {
    MagicCommand::new("get_torch_modules", 0, 1, |args| {
        let limit = kw(args, "limit").and_then(|v| v.parse::<usize>().ok());
        torch_objects_impl("module", limit)
    })
}

#[cfg(feature = "python")]
fn torch_objects_impl(predicate: &str, limit: Option<usize>) -> Result<JsonValue, String> {
    crate::python::torch_objects(predicate, limit).map_err(|err| err.to_string())
}

#[cfg(not(feature = "python"))]
fn torch_objects_impl(_predicate: &str, _limit: Option<usize>) -> Result<JsonValue, String> {
    Ok(serde_json::json!({
        "objects": [],
        "note": "tensor/module introspection requires a live interpreter binding; none is linked into this build",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::null_host::{NullExtensionLoader, NullHostIntrospector, NullVariableSource};
    use probing_trace::{NullDeviceCounters, WallClock};

    fn agent() -> Arc<Agent> {
        Arc::new(Agent::new(
            Arc::new(NullHostIntrospector),
            Arc::new(NullExtensionLoader),
            Arc::new(NullDeviceCounters),
            Arc::new(NullVariableSource),
        ))
    }

    #[test]
    fn all_eight_commands_are_registered() {
        let table = build_magic_table(&agent());
        let mut names = table.names();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "bt",
                "dump_stack",
                "get_objects",
                "get_torch_modules",
                "get_torch_tensors",
                "remote_debug",
                "tprofile",
                "tsummary",
            ]
        );
    }

    #[test]
    fn tprofile_reports_an_enabled_tracer() {
        let agent = agent();
        agent
            .enable_tracer("torch", Arc::new(WallClock::default()), "ordered:1.0", false, 3)
            .unwrap();
        let table = build_magic_table(&agent);
        let reply = table.dispatch("tprofile", &[]);
        assert_eq!(reply.status, probing_repl::Status::Ok);
        assert!(reply.output.contains("Discovery"));
    }

    #[test]
    fn tprofile_rejects_unknown_tracer() {
        let table = build_magic_table(&agent());
        let reply = table.dispatch("tprofile", &["missing".to_string()]);
        assert_eq!(reply.status, probing_repl::Status::Error);
    }

    #[test]
    fn tsummary_lists_every_enabled_tracer() {
        let agent = agent();
        agent
            .enable_tracer("torch", Arc::new(WallClock::default()), "ordered:1.0", false, 3)
            .unwrap();
        let table = build_magic_table(&agent);
        let reply = table.dispatch("tsummary", &[]);
        assert_eq!(reply.status, probing_repl::Status::Ok);
        assert!(reply.output.contains("torch"));
    }

    #[test]
    fn bt_returns_non_empty_output() {
        let table = build_magic_table(&agent());
        let reply = table.dispatch("bt", &[]);
        assert_eq!(reply.status, probing_repl::Status::Ok);
        assert!(!reply.output.is_empty());
    }

    #[test]
    fn get_objects_lists_registered_tables() {
        let agent = agent();
        agent.create_table("metrics", vec!["x"], None).unwrap();
        let table = build_magic_table(&agent);
        let reply = table.dispatch("get_objects", &[]);
        assert_eq!(reply.status, probing_repl::Status::Ok);
        #[cfg(not(feature = "python"))]
        assert!(reply.output.contains("metrics"));
    }

    #[test]
    fn get_torch_tensors_does_not_error_without_a_runtime() {
        let table = build_magic_table(&agent());
        let reply = table.dispatch("get_torch_tensors", &[]);
        assert_eq!(reply.status, probing_repl::Status::Ok);
    }

    #[test]
    fn remote_debug_reports_a_status_without_panicking() {
        let table = build_magic_table(&agent());
        let reply = table.dispatch("remote_debug", &[]);
        assert_eq!(reply.status, probing_repl::Status::Ok);
    }
}
