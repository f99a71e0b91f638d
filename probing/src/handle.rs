use std::sync::Arc;

use probing_core::{Result, Row, Schema, TableConfig};
use probing_store::{Table, TableStats};

/// A thin, cloneable reference to one registered table. Every clone shares
/// the same underlying `Table`; dropping the
/// last `Handle` does not drop the table — it lives in the `Registry` until
/// explicitly dropped by name.
#[derive(Debug, Clone)]
pub struct Handle {
    table: Arc<Table>,
}

impl Handle {
    pub(crate) fn new(table: Arc<Table>) -> Self {
        Self { table }
    }

    pub fn name(&self) -> &str {
        self.table.name()
    }

    pub fn schema(&self) -> Schema {
        self.table.schema()
    }

    pub fn config(&self) -> TableConfig {
        self.table.config()
    }

    pub fn stats(&self) -> TableStats {
        self.table.stats()
    }

    pub fn append(&self, row: Row) -> Result<()> {
        self.table.append(row)
    }

    pub fn append_many(&self, rows: Vec<Row>) -> Result<()> {
        self.table.append_many(rows)
    }

    /// Returns up to `n` of the oldest still-resident rows.
    pub fn take(&self, n: usize) -> Vec<Row> {
        self.table.take(n)
    }

    /// Column names in schema order, for callers that only know a handle and
    /// need to build rows positionally.
    pub fn names(&self) -> Vec<String> {
        self.table.schema().names().iter().map(|s| s.to_string()).collect()
    }
}
