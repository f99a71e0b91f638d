use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use probing_core::{ProbingError, Result, Schema, TableConfig};
use probing_observability_deps::tracing::info;
use probing_store::Table;

/// Owns every live `Table` by name. `create` is idempotent: calling it again
/// with the same name and an equivalent schema returns the existing table
/// rather than erroring (the
/// teacher's analogous `iox_catalog` namespace registration is strict
/// create-or-fail; this registry intentionally diverges because
/// tracer/REPL call sites re-declare well-known tables on every attach and
/// must not treat that as an error — see DESIGN.md).
#[derive(Debug, Default)]
pub struct Registry {
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a table, or returns the existing one if `name` is already
    /// registered with an equal-shape schema. Returns `SchemaMismatch` if an
    /// existing table under this name has a different column list.
    pub fn create(&self, name: &str, schema: Schema, config: TableConfig) -> Result<Arc<Table>> {
        let mut tables = self.tables.write();
        if let Some(existing) = tables.get(name) {
            if existing.schema().same_shape(&schema) {
                return Ok(Arc::clone(existing));
            }
            return Err(ProbingError::SchemaMismatch {
                table: name.to_string(),
                expected: existing.schema().names().iter().map(|s| s.to_string()).collect(),
                actual: schema.names().iter().map(|s| s.to_string()).collect(),
            });
        }
        let table = Arc::new(Table::create(name, schema, config)?);
        tables.insert(name.to_string(), Arc::clone(&table));
        info!(table = name, "created table");
        Ok(table)
    }

    pub fn get(&self, name: &str) -> Result<Arc<Table>> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ProbingError::UnknownTable {
                name: name.to_string(),
            })
    }

    /// Weak handle for components (tracer, virtual table resolver) that must
    /// not keep a table alive on their own.
    pub fn get_weak(&self, name: &str) -> Option<Weak<Table>> {
        self.tables.read().get(name).map(Arc::downgrade)
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        self.tables
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ProbingError::UnknownTable {
                name: name.to_string(),
            })
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probing_core::{DataType, Field};

    fn schema() -> Schema {
        Schema::new(vec![Field::new("x", DataType::Int64)])
    }

    #[test]
    fn create_is_idempotent_for_same_shape() {
        let reg = Registry::new();
        let t1 = reg.create("t", schema(), TableConfig::default()).unwrap();
        let t2 = reg.create("t", schema(), TableConfig::default()).unwrap();
        assert!(Arc::ptr_eq(&t1, &t2));
    }

    #[test]
    fn create_rejects_conflicting_schema() {
        let reg = Registry::new();
        reg.create("t", schema(), TableConfig::default()).unwrap();
        let other = Schema::new(vec![Field::new("y", DataType::Int64)]);
        let err = reg.create("t", other, TableConfig::default()).unwrap_err();
        assert!(matches!(err, ProbingError::SchemaMismatch { .. }));
    }

    #[test]
    fn get_unknown_table_errors() {
        let reg = Registry::new();
        assert!(matches!(
            reg.get("missing").unwrap_err(),
            ProbingError::UnknownTable { .. }
        ));
    }

    #[test]
    fn drop_then_list_reflects_removal() {
        let reg = Registry::new();
        reg.create("a", schema(), TableConfig::default()).unwrap();
        reg.create("b", schema(), TableConfig::default()).unwrap();
        assert_eq!(reg.list(), vec!["a".to_string(), "b".to_string()]);
        reg.drop_table("a").unwrap();
        assert_eq!(reg.list(), vec!["b".to_string()]);
    }

    #[test]
    fn weak_handle_does_not_keep_table_alive() {
        let reg = Registry::new();
        reg.create("t", schema(), TableConfig::default()).unwrap();
        let weak = reg.get_weak("t").unwrap();
        reg.drop_table("t").unwrap();
        assert!(weak.upgrade().is_none());
    }
}
