use std::sync::Arc;

use probing_catalog::Registry;
use probing_core::{ProbingError, Value};
use probing_datafusion::arrow::array::{
    BooleanArray, Float64Array, Int64Array, StringArray, UInt64Array,
};
use probing_datafusion::arrow::datatypes::DataType as ArrowDataType;
use probing_datafusion::arrow::record_batch::RecordBatch;
use probing_datafusion::datasource::MemTable;
use probing_datafusion::prelude::SessionContext;
use probing_observability_deps::tracing::{debug, info};
use serde::Serialize;
use serde_json::Value as JsonValue;
use snafu::{OptionExt, ResultExt};

use crate::error::{ExecutionSnafu, InvalidSetSnafu, Result};
use crate::provider::{to_record_batch, VirtualSchemaProvider};
use crate::virtual_table::HostIntrospector;

pub const VIRTUAL_SCHEMA: &str = "python";

/// Receives `SET probing.<knob> = <value>` dispatches. The SQL front-end
/// only parses and routes; the semantics of any given knob (extension
/// lifecycle, tracer sampling, ...) live entirely in whatever implements
/// this — usually `probing-config`'s extension registry, wired in by the
/// top-level crate so this crate never has to depend on it.
pub trait ConfigSink: Send + Sync {
    fn set(&self, knob: &str, value: &str) -> std::result::Result<(), ProbingError>;
}

#[derive(Debug, Serialize)]
pub struct QueryResult {
    pub names: Vec<String>,
    pub cols: Vec<serde_json::Map<String, JsonValue>>,
}

/// The embedded SQL engine front. Owns a DataFusion
/// `SessionContext` and re-registers every table from the catalog on each
/// query (mirroring the teacher's `SystemSchemaProvider`, which rebuilds
/// its `MemTable`s from live catalog state rather than keeping DataFusion's
/// registration in sync incrementally).
pub struct Engine {
    registry: Arc<Registry>,
    config_sink: Arc<dyn ConfigSink>,
    introspector: Arc<dyn HostIntrospector>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("tables", &self.registry.list())
            .finish()
    }
}

impl Engine {
    pub fn new(
        registry: Arc<Registry>,
        config_sink: Arc<dyn ConfigSink>,
        introspector: Arc<dyn HostIntrospector>,
    ) -> Self {
        Self {
            registry,
            config_sink,
            introspector,
        }
    }

    /// Accepts one statement of SQL text and returns its JSON-encodable
    /// result. Table references resolve virtual-prefix-first, then
    /// registry, then `UnknownTable` — DataFusion's own
    /// catalog search order does this for us once both schema providers are
    /// registered, since the virtual schema only claims names that parse as
    /// a `VirtualExpr`.
    pub async fn execute(&self, sql: &str) -> Result<QueryResult> {
        let trimmed = sql.trim().trim_end_matches(';').trim();

        if trimmed.eq_ignore_ascii_case("show tables") {
            return Ok(self.show_tables());
        }

        if let Some(rest) = strip_prefix_ci(trimmed, "set ") {
            return self.execute_set(rest).map(|()| QueryResult {
                names: Vec::new(),
                cols: Vec::new(),
            });
        }

        self.execute_select(trimmed).await
    }

    fn show_tables(&self) -> QueryResult {
        let names = self.registry.list();
        let schemas: Vec<JsonValue> = names
            .iter()
            .map(|name| match self.registry.get(name) {
                Ok(table) => JsonValue::Array(
                    table
                        .schema()
                        .fields()
                        .iter()
                        .map(|f| JsonValue::String(format!("{}:{:?}", f.name, f.data_type)))
                        .collect(),
                ),
                Err(_) => JsonValue::Array(Vec::new()),
            })
            .collect();

        let mut name_col = serde_json::Map::new();
        name_col.insert(
            "name".to_string(),
            JsonValue::Array(names.iter().map(|n| JsonValue::String(n.clone())).collect()),
        );
        let mut schema_col = serde_json::Map::new();
        schema_col.insert("schema".to_string(), JsonValue::Array(schemas));

        QueryResult {
            names: vec!["name".to_string(), "schema".to_string()],
            cols: vec![name_col, schema_col],
        }
    }

    fn execute_set(&self, rest: &str) -> Result<()> {
        let (lhs, rhs) = rest
            .split_once('=')
            .context(InvalidSetSnafu {
                reason: format!("expected 'probing.<knob> = <value>', got '{rest}'"),
            })?;
        let lhs = lhs.trim();
        let knob = lhs
            .strip_prefix("probing.")
            .context(InvalidSetSnafu {
                reason: format!("knob '{lhs}' is not under the probing. namespace"),
            })?;
        let value = rhs.trim().trim_matches(['\'', '"']);
        info!(knob, value, "SET probing knob");
        self.config_sink.set(knob, value)?;
        Ok(())
    }

    async fn execute_select(&self, sql: &str) -> Result<QueryResult> {
        let ctx = SessionContext::new();
        for name in self.registry.list() {
            let table = self.registry.get(&name)?;
            let schema = table.schema();
            let rows = table.take(usize::MAX);
            let batch = to_record_batch(&schema, &rows).context(ExecutionSnafu)?;
            let mem_table =
                MemTable::try_new(batch.schema(), vec![vec![batch]]).context(ExecutionSnafu)?;
            ctx.register_table(name.as_str(), Arc::new(mem_table))
                .context(ExecutionSnafu)?;
        }
        ctx.register_schema(
            VIRTUAL_SCHEMA,
            Arc::new(VirtualSchemaProvider::new(Arc::clone(&self.introspector))),
        )
        .context(ExecutionSnafu)?;

        debug!(sql, "executing query");
        let df = ctx.sql(sql).await.context(ExecutionSnafu)?;
        let batches = df.collect().await.context(ExecutionSnafu)?;
        Ok(encode_batches(batches))
    }
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

fn encode_batches(batches: Vec<RecordBatch>) -> QueryResult {
    let Some(first) = batches.first() else {
        return QueryResult {
            names: Vec::new(),
            cols: Vec::new(),
        };
    };
    let names: Vec<String> = first
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();

    let mut cols = Vec::with_capacity(names.len());
    for (idx, name) in names.iter().enumerate() {
        let mut values = Vec::new();
        for batch in &batches {
            values.extend(column_to_json(batch.column(idx), batch.schema().field(idx).data_type()));
        }
        let mut map = serde_json::Map::new();
        map.insert(name.clone(), JsonValue::Array(values));
        cols.push(map);
    }

    QueryResult { names, cols }
}

fn column_to_json(
    array: &dyn probing_datafusion::arrow::array::Array,
    data_type: &ArrowDataType,
) -> Vec<JsonValue> {
    let values = extract_values(array, data_type);
    values.iter().map(value_to_json).collect()
}

fn extract_values(
    array: &dyn probing_datafusion::arrow::array::Array,
    data_type: &ArrowDataType,
) -> Vec<Value> {
    match data_type {
        ArrowDataType::Int64 => {
            let a = array.as_any().downcast_ref::<Int64Array>().unwrap();
            a.iter().map(|v| v.map_or(Value::Null, Value::I64)).collect()
        }
        ArrowDataType::UInt64 => {
            let a = array.as_any().downcast_ref::<UInt64Array>().unwrap();
            a.iter().map(|v| v.map_or(Value::Null, Value::U64)).collect()
        }
        ArrowDataType::Float64 => {
            let a = array.as_any().downcast_ref::<Float64Array>().unwrap();
            a.iter().map(|v| v.map_or(Value::Null, Value::F64)).collect()
        }
        ArrowDataType::Utf8 => {
            let a = array.as_any().downcast_ref::<StringArray>().unwrap();
            a.iter()
                .map(|v| v.map_or(Value::Null, |s| Value::Str(s.to_string())))
                .collect()
        }
        ArrowDataType::Boolean => {
            let a = array.as_any().downcast_ref::<BooleanArray>().unwrap();
            a.iter().map(|v| v.map_or(Value::Null, Value::Bool)).collect()
        }
        _ => vec![Value::Null; array.len()],
    }
}

fn value_to_json(v: &Value) -> JsonValue {
    serde_json::to_value(v).unwrap_or(JsonValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_table::{IntrospectedValue, ResolveError, VirtualExpr};
    use probing_core::{DataType, Field, Schema, TableConfig};

    struct StubIntrospector;
    impl HostIntrospector for StubIntrospector {
        fn eval(&self, _expr: &VirtualExpr) -> std::result::Result<IntrospectedValue, ResolveError> {
            Ok(IntrospectedValue::Scalar(Value::I64(42)))
        }
    }

    struct NoopConfigSink;
    impl ConfigSink for NoopConfigSink {
        fn set(&self, _knob: &str, _value: &str) -> std::result::Result<(), ProbingError> {
            Ok(())
        }
    }

    fn engine_with(registry: Arc<Registry>) -> Engine {
        Engine::new(registry, Arc::new(NoopConfigSink), Arc::new(StubIntrospector))
    }

    #[tokio::test]
    async fn show_tables_lists_registry_contents() {
        let registry = Arc::new(Registry::new());
        registry
            .create(
                "metrics",
                Schema::new(vec![Field::new("x", DataType::Int64)]),
                TableConfig::default(),
            )
            .unwrap();
        let engine = engine_with(registry);
        let result = engine.execute("SHOW TABLES").await.unwrap();
        assert_eq!(result.names, vec!["name", "schema"]);
        assert_eq!(
            result.cols[0]["name"],
            JsonValue::Array(vec![JsonValue::String("metrics".to_string())])
        );
        assert_eq!(
            result.cols[1]["schema"],
            JsonValue::Array(vec![JsonValue::Array(vec![JsonValue::String(
                "x:Int64".to_string()
            )])])
        );
    }

    #[tokio::test]
    async fn set_statement_dispatches_to_config_sink() {
        let registry = Arc::new(Registry::new());
        let engine = engine_with(registry);
        let result = engine.execute("SET probing.python.enabled = 'a.b'").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn set_statement_rejects_non_probing_namespace() {
        let registry = Arc::new(Registry::new());
        let engine = engine_with(registry);
        let result = engine.execute("SET other.knob = 1").await;
        assert!(result.is_err());
    }
}
