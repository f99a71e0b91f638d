use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use probing_catalog::Registry as TableRegistry;
use probing_core::{ProbingError, Result};
use probing_observability_deps::tracing::info;

use crate::extension::{Extension, ExtensionLoader};

struct Loaded {
    extension: Arc<dyn Extension>,
    tables: Vec<String>,
}

/// Process-wide extension lifecycle. Enable/disable cycles
/// are idempotent: enabling an already-loaded extension, or disabling one
/// that isn't loaded, is a no-op rather than an error.
pub struct ExtensionRegistry {
    tables: Arc<TableRegistry>,
    loader: Arc<dyn ExtensionLoader>,
    loaded: Mutex<HashMap<String, Loaded>>,
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("loaded", &self.loaded.lock().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ExtensionRegistry {
    pub fn new(tables: Arc<TableRegistry>, loader: Arc<dyn ExtensionLoader>) -> Self {
        Self {
            tables,
            loader,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn enable(&self, path: &str) -> Result<()> {
        if self.loaded.lock().contains_key(path) {
            return Ok(());
        }
        let extension = self.loader.load(path)?;
        let registered = extension.init(&self.tables)?;
        self.loaded.lock().insert(
            path.to_string(),
            Loaded {
                extension,
                tables: registered,
            },
        );
        info!(extension = path, "extension enabled");
        Ok(())
    }

    pub fn disable(&self, path: &str) -> Result<()> {
        let loaded = self.loaded.lock().remove(path);
        let Some(loaded) = loaded else {
            return Ok(());
        };
        loaded.extension.deinit(&self.tables);
        for table in &loaded.tables {
            let _ = self.tables.drop_table(table);
        }
        info!(extension = path, "extension disabled");
        Ok(())
    }

    pub fn is_enabled(&self, path: &str) -> bool {
        self.loaded.lock().contains_key(path)
    }
}

impl probing_query::ConfigSink for ExtensionRegistry {
    fn set(&self, knob: &str, value: &str) -> std::result::Result<(), ProbingError> {
        match knob {
            "python.enabled" => self.enable(value),
            "python.disabled" => self.disable(value),
            other => Err(ProbingError::InvalidConfig {
                reason: format!("unknown configuration knob 'probing.{other}'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probing_core::{DataType, Field, Schema, TableConfig};

    struct FixtureExtension {
        table_name: &'static str,
    }

    impl Extension for FixtureExtension {
        fn init(&self, registry: &TableRegistry) -> Result<Vec<String>> {
            registry.create(
                self.table_name,
                Schema::new(vec![Field::new("x", DataType::Int64)]),
                TableConfig::default(),
            )?;
            Ok(vec![self.table_name.to_string()])
        }

        fn deinit(&self, _registry: &TableRegistry) {}
    }

    struct FixtureLoader;
    impl ExtensionLoader for FixtureLoader {
        fn load(&self, path: &str) -> Result<Arc<dyn Extension>, ProbingError> {
            Ok(Arc::new(FixtureExtension {
                table_name: if path == "probing.ext.example" {
                    "example_ext"
                } else {
                    "other_ext"
                },
            }))
        }
    }

    fn registry() -> ExtensionRegistry {
        ExtensionRegistry::new(Arc::new(TableRegistry::new()), Arc::new(FixtureLoader))
    }

    #[test]
    fn enable_registers_table_and_is_idempotent() {
        let ext = registry();
        ext.enable("probing.ext.example").unwrap();
        assert!(ext.tables.list().contains(&"example_ext".to_string()));
        ext.enable("probing.ext.example").unwrap();
        assert_eq!(
            ext.tables.list().iter().filter(|n| *n == "example_ext").count(),
            1
        );
    }

    #[test]
    fn disable_drops_registered_tables_and_is_idempotent() {
        let ext = registry();
        ext.enable("probing.ext.example").unwrap();
        ext.disable("probing.ext.example").unwrap();
        assert!(!ext.tables.list().contains(&"example_ext".to_string()));
        ext.disable("probing.ext.example").unwrap();
    }

    #[test]
    fn repeat_enable_disable_cycles_reload_the_table() {
        let ext = registry();
        ext.enable("probing.ext.example").unwrap();
        ext.disable("probing.ext.example").unwrap();
        ext.enable("probing.ext.example").unwrap();
        assert!(ext.tables.list().contains(&"example_ext".to_string()));
    }
}
