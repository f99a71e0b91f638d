use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use probing_activator::Outcome;
use probing_catalog::Registry;
use probing_config::{ExtensionLoader, ExtensionRegistry};
use probing_core::{ProbingError, Result, Schema, TableConfig};
use probing_observability_deps::tracing::info;
use probing_query::{Engine, HostIntrospector, QueryResult};
use probing_trace::{DeviceCounters, Tracer, VariableSource};

use crate::handle::Handle;

/// The embedded agent: owns the table registry, SQL engine,
/// extension registry and any tracer instances that have been enabled. This
/// is the crate's one stateful object — everything else in the public API
/// is a thin method on it or a `Handle` it hands out.
pub struct Agent {
    registry: Arc<Registry>,
    engine: Engine,
    extensions: Arc<ExtensionRegistry>,
    tracers: Mutex<HashMap<String, Arc<Tracer>>>,
    device_counters: Arc<dyn DeviceCounters>,
    var_source: Arc<dyn VariableSource>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("tables", &self.registry.list())
            .field("tracers", &self.tracers.lock().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Agent {
    pub fn new(
        introspector: Arc<dyn HostIntrospector>,
        extension_loader: Arc<dyn ExtensionLoader>,
        device_counters: Arc<dyn DeviceCounters>,
        var_source: Arc<dyn VariableSource>,
    ) -> Self {
        let registry = Arc::new(Registry::new());
        let extensions = Arc::new(ExtensionRegistry::new(
            Arc::clone(&registry),
            extension_loader,
        ));
        let engine = Engine::new(
            Arc::clone(&registry),
            Arc::clone(&extensions) as Arc<dyn probing_query::ConfigSink>,
            introspector,
        );
        Self {
            registry,
            engine,
            extensions,
            tracers: Mutex::new(HashMap::new()),
            device_counters,
            var_source,
        }
    }

    /// Evaluates the process-wide attach decision and, only if attaching,
    /// builds the agent. Returns `None` when the activator
    /// resolves to `Disabled`.
    pub fn attach(
        introspector: Arc<dyn HostIntrospector>,
        extension_loader: Arc<dyn ExtensionLoader>,
        device_counters: Arc<dyn DeviceCounters>,
        var_source: Arc<dyn VariableSource>,
    ) -> Option<Self> {
        let outcome = probing_activator::evaluate_from_process();
        probing_activator::apply_child_visibility(&outcome);
        match outcome {
            Outcome::Disabled => None,
            Outcome::Attach { .. } => {
                info!("probing agent attached");
                Some(Self::new(introspector, extension_loader, device_counters, var_source))
            }
            Outcome::RunInit { path, then_value } => {
                info!(path, then_value, "probing agent running init grammar");
                Some(Self::new(introspector, extension_loader, device_counters, var_source))
            }
        }
    }

    pub fn create_table(
        &self,
        name: &str,
        columns: impl IntoIterator<Item = impl Into<String>>,
        config: Option<TableConfig>,
    ) -> Result<Handle> {
        let schema = Schema::from_names(columns);
        let table = self
            .registry
            .create(name, schema, config.unwrap_or_default())?;
        Ok(Handle::new(table))
    }

    pub fn get_table(&self, name: &str) -> Result<Handle> {
        Ok(Handle::new(self.registry.get(name)?))
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        self.registry.drop_table(name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.registry.list()
    }

    pub async fn query(&self, sql: &str) -> probing_query::Result<QueryResult> {
        self.engine.execute(sql).await
    }

    pub fn load_extension(&self, path: &str) -> Result<()> {
        self.extensions.enable(path)
    }

    pub fn unload_extension(&self, path: &str) -> Result<()> {
        self.extensions.disable(path)
    }

    pub fn extension_enabled(&self, path: &str) -> bool {
        self.extensions.is_enabled(path)
    }

    /// Enables a tracer named `name`, creating its trace and variable tables
    /// in the registry if they do not already exist.
    /// Re-enabling an already-enabled name returns the existing tracer.
    pub fn enable_tracer(
        &self,
        name: &str,
        clock: Arc<dyn probing_trace::DeviceClock>,
        sampler_spec: &str,
        sync_before_timestamp: bool,
        maxtry: u32,
    ) -> Result<Arc<Tracer>> {
        let mut tracers = self.tracers.lock();
        if let Some(existing) = tracers.get(name) {
            return Ok(Arc::clone(existing));
        }

        let trace_schema = Schema::from_names(probing_trace::TorchTrace::field_names());
        let var_schema = Schema::from_names(probing_trace::Variable::field_names());
        let trace_table = self.registry.create(
            &format!("{name}_trace"),
            trace_schema,
            TableConfig::default(),
        )?;
        let var_table = self.registry.create(
            &format!("{name}_vars"),
            var_schema,
            TableConfig::default(),
        )?;

        let tracer = Arc::new(Tracer::new(
            trace_table,
            var_table,
            Arc::clone(&self.device_counters),
            clock,
            Arc::clone(&self.var_source),
            sampler_spec,
            sync_before_timestamp,
            maxtry,
        ));
        tracers.insert(name.to_string(), Arc::clone(&tracer));
        info!(tracer = name, "tracer enabled");
        Ok(tracer)
    }

    pub fn tracer(&self, name: &str) -> Option<Arc<Tracer>> {
        self.tracers.lock().get(name).cloned()
    }

    /// Names of every tracer currently enabled, for callers that need to
    /// summarise agent-wide tracer state without knowing names in advance.
    pub fn tracer_names(&self) -> Vec<String> {
        self.tracers.lock().keys().cloned().collect()
    }

    pub fn disable_tracer(&self, name: &str) -> Option<Arc<Tracer>> {
        self.tracers.lock().remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probing_query::{IntrospectedValue, ResolveError, VirtualExpr};
    use probing_trace::{NullDeviceCounters, NullVariableSource, WallClock};

    struct StubIntrospector;
    impl HostIntrospector for StubIntrospector {
        fn eval(&self, _expr: &VirtualExpr) -> std::result::Result<IntrospectedValue, ResolveError> {
            Ok(IntrospectedValue::Scalar(probing_core::Value::I64(1)))
        }
    }

    struct StubLoader;
    impl ExtensionLoader for StubLoader {
        fn load(&self, path: &str) -> Result<Arc<dyn probing_config::Extension>, ProbingError> {
            Err(ProbingError::ExtensionFailure {
                name: path.to_string(),
                reason: "no extensions in this fixture".to_string(),
            })
        }
    }

    fn agent() -> Agent {
        Agent::new(
            Arc::new(StubIntrospector),
            Arc::new(StubLoader),
            Arc::new(NullDeviceCounters),
            Arc::new(NullVariableSource),
        )
    }

    #[test]
    fn create_then_get_round_trips() {
        let agent = agent();
        agent.create_table("t", vec!["x", "y"], None).unwrap();
        let handle = agent.get_table("t").unwrap();
        assert_eq!(handle.names(), vec!["x".to_string(), "y".to_string()]);
    }

    #[tokio::test]
    async fn show_tables_reflects_created_tables() {
        let agent = agent();
        agent.create_table("metrics", vec!["x"], None).unwrap();
        let result = agent.query("SHOW TABLES").await.unwrap();
        assert_eq!(
            result.cols[0]["name"],
            serde_json::json!(["metrics"])
        );
    }

    #[test]
    fn enable_tracer_is_idempotent_by_name() {
        let agent = agent();
        let a = agent
            .enable_tracer("torch", Arc::new(WallClock::default()), "ordered:1.0", false, 3)
            .unwrap();
        let b = agent
            .enable_tracer("torch", Arc::new(WallClock::default()), "ordered:1.0", false, 3)
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(agent.table_names().contains(&"torch_trace".to_string()));
    }
}
