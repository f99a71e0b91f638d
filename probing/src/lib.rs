//! In-process observability agent: embeds a column-chunked table store, a
//! DataFusion-backed SQL front-end, a per-callsite probe tracer and a
//! WebSocket REPL server behind one process-wide `Agent`.
//!
//! Host processes depend on this crate directly for the Rust API
//! (`Agent::new`/`Agent::attach`, `Handle`); a Python host instead loads the
//! `cdylib` built with the `python` feature and calls the `probing` pymodule
//! functions, which are thin wrappers around the same global `Agent`.
#![deny(rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

mod agent;
mod config;
mod handle;
mod magic;
mod null_host;
#[cfg(feature = "python")]
mod python;

use std::sync::Arc;

use once_cell::sync::OnceCell;
use probing_config::ExtensionLoader;
use probing_query::HostIntrospector;
use probing_trace::{DeviceCounters, NullDeviceCounters, VariableSource};

pub use agent::Agent;
pub use config::AgentConfig;
pub use handle::Handle;
pub use probing_activator::Outcome;
pub use probing_core::{DataType, ProbingError, Result, Row, Schema, TableConfig, Value};
pub use probing_query::QueryResult;
pub use probing_repl::{Executor, MagicCommand, MagicTable, ReplBackend, Reply, StubBackend};
pub use probing_server::Server;
pub use probing_trace::{Sampler, Stage, Tracer, TracerState};

#[cfg(feature = "python")]
pub use python::{PyExtensionLoader, PyHostIntrospector, PyVariableSource};

static AGENT: OnceCell<Arc<Agent>> = OnceCell::new();

fn build_default_agent() -> Agent {
    #[cfg(feature = "python")]
    {
        Agent::new(
            Arc::new(python::PyHostIntrospector),
            Arc::new(python::PyExtensionLoader),
            Arc::new(NullDeviceCounters) as Arc<dyn DeviceCounters>,
            Arc::new(python::PyVariableSource) as Arc<dyn VariableSource>,
        )
    }
    #[cfg(not(feature = "python"))]
    {
        Agent::new(
            Arc::new(null_host::NullHostIntrospector) as Arc<dyn HostIntrospector>,
            Arc::new(null_host::NullExtensionLoader) as Arc<dyn ExtensionLoader>,
            Arc::new(NullDeviceCounters) as Arc<dyn DeviceCounters>,
            Arc::new(null_host::NullVariableSource) as Arc<dyn VariableSource>,
        )
    }
}

/// Returns the process-wide agent, building it lazily on first use.
/// Every call after the first returns the same instance.
pub fn global_agent() -> Arc<Agent> {
    Arc::clone(AGENT.get_or_init(|| Arc::new(build_default_agent())))
}

/// Runs the process attach decision and, if it resolves to
/// attach, installs the result of `build_default_agent` as the global agent
/// and starts its socket server. A no-op if the agent has already been
/// initialised by an earlier call (to `global_agent` or `try_attach`) or if
/// the `PROBING` grammar resolves to `Disabled`.
pub fn try_attach(config: &AgentConfig) -> bool {
    if AGENT.get().is_some() {
        return true;
    }
    let outcome = probing_activator::evaluate_from_process();
    probing_activator::apply_child_visibility(&outcome);
    if matches!(outcome, Outcome::Disabled) {
        return false;
    }

    probing_observability_deps::init_logging();
    let agent = Arc::new(build_default_agent());
    if AGENT.set(Arc::clone(&agent)).is_err() {
        return true;
    }
    spawn_server(config, agent);
    true
}

fn spawn_server(config: &AgentConfig, agent: Arc<Agent>) {
    let bind = config.bind.clone();
    std::thread::Builder::new()
        .name("probing-server".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    probing_observability_deps::tracing::error!(error = %err, "failed to start probing server runtime");
                    return;
                }
            };
            runtime.block_on(async move {
                let executor = tokio::sync::Mutex::new(Executor::new(
                    default_backend(),
                    default_magic_table(&agent),
                ));
                let executor = Arc::new(executor);
                let server = match bind.strip_prefix("unix:") {
                    Some(id) => Server::bind_unix_abstract(id),
                    None => match bind.parse() {
                        Ok(addr) => Server::bind_tcp(addr).await,
                        Err(err) => {
                            probing_observability_deps::tracing::error!(bind, error = %err, "invalid bind address");
                            return;
                        }
                    },
                };
                match server {
                    Ok(server) => {
                        if let Err(err) = server.serve(executor).await {
                            probing_observability_deps::tracing::error!(error = %err, "probing server stopped");
                        }
                    }
                    Err(err) => {
                        probing_observability_deps::tracing::error!(bind, error = %err, "failed to bind probing server");
                    }
                }
            });
        })
        .expect("failed to spawn probing server thread");
}

fn default_magic_table(agent: &Arc<Agent>) -> MagicTable {
    magic::build_magic_table(agent)
}

/// The REPL execution backend the socket server runs: a real CPython
/// interpreter when built with the `python` feature, otherwise the
/// dependency-free `StubBackend`.
#[cfg(feature = "python")]
fn default_backend() -> Box<dyn ReplBackend> {
    Box::new(probing_repl::PyBackend::new())
}

#[cfg(not(feature = "python"))]
fn default_backend() -> Box<dyn ReplBackend> {
    Box::new(StubBackend::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_agent_returns_the_same_instance() {
        let a = global_agent();
        let b = global_agent();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
