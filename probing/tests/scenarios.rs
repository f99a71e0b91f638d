//! End-to-end scenarios, run against a fresh `Agent` per
//! test (never the process-global one, so tests can run concurrently
//! without fighting over `OnceCell` state).

use std::sync::Arc;

use probing::{Agent, DataType, ProbingError, Row, Value};
use probing_catalog::Registry;
use probing_config::{Extension, ExtensionLoader};
use probing_core::{DiscardStrategy, Field, Schema, TableConfig};
use probing_query::{HostIntrospector, IntrospectedValue, ResolveError, VirtualExpr};
use probing_trace::{NullDeviceCounters, NullVariableSource};

struct StubIntrospector;
impl HostIntrospector for StubIntrospector {
    fn eval(&self, _expr: &VirtualExpr) -> Result<IntrospectedValue, ResolveError> {
        Ok(IntrospectedValue::Scalar(Value::I64(0)))
    }
}

struct ExampleExtension;
impl Extension for ExampleExtension {
    fn init(&self, registry: &Registry) -> probing_core::Result<Vec<String>> {
        registry.create(
            "example_ext",
            Schema::new(vec![Field::new("x", DataType::Int64)]),
            TableConfig::default(),
        )?;
        Ok(vec!["example_ext".to_string()])
    }

    fn deinit(&self, _registry: &Registry) {}
}

struct ExampleLoader;
impl ExtensionLoader for ExampleLoader {
    fn load(&self, path: &str) -> probing_core::Result<Arc<dyn Extension>, ProbingError> {
        if path == "probing.ext.example" {
            Ok(Arc::new(ExampleExtension))
        } else {
            Err(ProbingError::ExtensionFailure {
                name: path.to_string(),
                reason: "no such extension".to_string(),
            })
        }
    }
}

fn agent() -> Agent {
    Agent::new(
        Arc::new(StubIntrospector),
        Arc::new(ExampleLoader),
        Arc::new(NullDeviceCounters),
        Arc::new(NullVariableSource),
    )
}

fn row(values: &[i64]) -> Row {
    values.iter().map(|v| Value::I64(*v)).collect()
}

/// Scenario 1: create+append+take.
#[test]
fn create_append_take() {
    let agent = agent();
    let table = agent.create_table("t1", vec!["a", "b"], None).unwrap();
    table.append(row(&[1, 1])).unwrap();
    table.append(row(&[2, 2])).unwrap();
    table.append(row(&[3, 3])).unwrap();

    assert_eq!(
        table.take(10),
        vec![row(&[1, 1]), row(&[2, 2]), row(&[3, 3])]
    );
    assert_eq!(table.names(), vec!["a".to_string(), "b".to_string()]);
}

/// Scenario 2: eviction by element count.
#[test]
fn eviction_by_count() {
    let agent = agent();
    let config = TableConfig::new(10, 10, DiscardStrategy::BaseElementCount);
    let table = agent
        .create_table("t2", vec!["x"], Some(config))
        .unwrap();
    for i in 0..30 {
        table.append(row(&[i])).unwrap();
    }
    let rows = table.take(100);
    assert_eq!(rows.len(), 10);
    assert_eq!(rows, (20..30).map(|i| row(&[i])).collect::<Vec<_>>());
}

/// Scenario 3: eviction by memory size.
#[test]
fn eviction_by_memory_size() {
    let agent = agent();
    let generous = TableConfig::new(10_000, 1_000_000_000, DiscardStrategy::BaseMemorySize);
    let table = agent
        .create_table("t3a", vec!["s"], Some(generous))
        .unwrap();
    for i in 0..12 {
        table.append(vec![Value::Str(format!("{i:0>10}"))]).unwrap();
    }
    assert_eq!(table.stats().active_rows, 12);

    let tight = TableConfig::new(10_000, 10, DiscardStrategy::BaseMemorySize);
    let table = agent
        .create_table("t3b", vec!["s"], Some(tight))
        .unwrap();
    for i in 0..12 {
        table.append(vec![Value::Str(format!("{i:0>10}"))]).unwrap();
    }
    let stats = table.stats();
    assert!(stats.active_bytes <= 10 + 10 * 10_000);
}

/// Scenario 4: SQL scalar literal query.
#[tokio::test]
async fn sql_scalar_literal() {
    let agent = agent();
    let result = agent.query("SELECT 1 AS a, 2 AS b").await.unwrap();
    assert_eq!(result.names, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(result.cols[0]["a"], serde_json::json!([1]));
    assert_eq!(result.cols[1]["b"], serde_json::json!([2]));
}

/// Scenario 5: extension lifecycle via SET/SHOW TABLES, including a second
/// enable/disable cycle.
#[tokio::test]
async fn extension_lifecycle() {
    let agent = agent();

    agent
        .query("SET probing.python.enabled = 'probing.ext.example'")
        .await
        .unwrap();
    let tables = agent.query("SHOW TABLES").await.unwrap();
    assert!(names_of(&tables).contains(&"example_ext".to_string()));

    agent
        .query("SET probing.python.disabled = 'probing.ext.example'")
        .await
        .unwrap();
    let tables = agent.query("SHOW TABLES").await.unwrap();
    assert!(!names_of(&tables).contains(&"example_ext".to_string()));

    agent
        .query("SET probing.python.enabled = 'probing.ext.example'")
        .await
        .unwrap();
    let tables = agent.query("SHOW TABLES").await.unwrap();
    assert!(names_of(&tables).contains(&"example_ext".to_string()));
}

fn names_of(result: &probing_query::QueryResult) -> Vec<String> {
    result.cols[0]["name"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

/// Scenario 6 (activator half): a `regex:` grammar attaches for a matching
/// script and not for a non-matching one, without mutating the environment
/// it reads from (the full child-process inheritance check lives in
/// `probing-activator`'s own tests, which can spawn real children).
#[test]
fn activator_regex_matches_by_script_basename() {
    let outcome = probing_activator::evaluate(Some("regex:^train_.*"), Some("train_step.py"));
    assert_eq!(outcome, probing_activator::Outcome::Attach { propagate: true });

    let outcome = probing_activator::evaluate(Some("regex:^train_.*"), Some("serve.py"));
    assert_eq!(outcome, probing_activator::Outcome::Disabled);
}

/// Registry idempotence property.
#[test]
fn registry_idempotence() {
    let agent = agent();
    let schema = vec!["a".to_string()];
    let first = agent.create_table("idem", schema.clone(), None).unwrap();
    let second = agent.create_table("idem", schema, None).unwrap();
    assert_eq!(first.name(), second.name());

    let err = agent
        .create_table("idem", vec!["different".to_string()], None)
        .unwrap_err();
    assert!(matches!(err, ProbingError::SchemaMismatch { .. }));
}
