use std::any::Any;
use std::sync::Arc;

use probing_datafusion::arrow::array::{BooleanArray, Float64Array, Int64Array, NullArray, StringArray, UInt64Array};
use probing_datafusion::arrow::datatypes::{DataType as ArrowDataType, Field as ArrowField, Schema as ArrowSchema};
use probing_datafusion::arrow::record_batch::RecordBatch;
use probing_datafusion::catalog::schema::SchemaProvider;
use probing_datafusion::datasource::{MemTable, TableProvider};
use probing_observability_deps::tracing::warn;
use probing_core::{DataType, Row, Schema, Value};

use crate::resolver::materialize;
use crate::virtual_table::{HostIntrospector, VirtualExpr};

/// Converts a `probing-core` schema + row set into an Arrow `RecordBatch`,
/// the currency DataFusion's `MemTable`/`TableProvider` deal in. Grounded on
/// the teacher's `from_chunk_summaries`/`from_partition_summaries` builders
/// (`other_examples` system_tables fork), which hand-build `RecordBatch`es
/// column by column from domain structs rather than going through Arrow's
/// `From` impls.
pub fn to_record_batch(schema: &Schema, rows: &[Row]) -> probing_datafusion::error::Result<RecordBatch> {
    let arrow_fields: Vec<ArrowField> = schema
        .fields()
        .iter()
        .map(|f| ArrowField::new(&f.name, to_arrow_type(f.data_type), true))
        .collect();
    let arrow_schema = Arc::new(ArrowSchema::new(arrow_fields));

    let mut columns: Vec<Arc<dyn probing_datafusion::arrow::array::Array>> = Vec::new();
    for (idx, field) in schema.fields().iter().enumerate() {
        let column_values: Vec<&Value> = rows.iter().map(|r| &r[idx]).collect();
        columns.push(build_column(field.data_type, &column_values));
    }

    RecordBatch::try_new(arrow_schema, columns)
}

fn to_arrow_type(dt: DataType) -> ArrowDataType {
    match dt {
        DataType::Int64 => ArrowDataType::Int64,
        DataType::UInt64 => ArrowDataType::UInt64,
        DataType::Float64 => ArrowDataType::Float64,
        DataType::Utf8 => ArrowDataType::Utf8,
        DataType::Boolean => ArrowDataType::Boolean,
        DataType::Null => ArrowDataType::Null,
    }
}

fn build_column(
    declared: DataType,
    values: &[&Value],
) -> Arc<dyn probing_datafusion::arrow::array::Array> {
    match declared {
        DataType::Int64 => Arc::new(Int64Array::from_iter(values.iter().map(|v| match v {
            Value::I64(n) => Some(*n),
            Value::Null => None,
            _ => None,
        }))),
        DataType::UInt64 => Arc::new(UInt64Array::from_iter(values.iter().map(|v| match v {
            Value::U64(n) => Some(*n),
            Value::Null => None,
            _ => None,
        }))),
        DataType::Float64 => Arc::new(Float64Array::from_iter(values.iter().map(|v| match v {
            Value::F64(n) => Some(*n),
            Value::Null => None,
            _ => None,
        }))),
        DataType::Utf8 => Arc::new(StringArray::from_iter(values.iter().map(|v| match v {
            Value::Str(s) => Some(s.as_str()),
            Value::Null => None,
            _ => None,
        }))),
        DataType::Boolean => Arc::new(BooleanArray::from_iter(values.iter().map(|v| match v {
            Value::Bool(b) => Some(*b),
            Value::Null => None,
            _ => None,
        }))),
        DataType::Null => Arc::new(NullArray::new(values.len())),
    }
}

/// Wraps a resolved virtual table expression behind DataFusion's
/// `SchemaProvider`, so `SELECT * FROM python."torch.cuda.memory_allocated"`
/// resolves through the same catalog lookup path as a registered table.
/// Table names under this provider are never enumerable ahead of time (an
/// arbitrary expression is a valid name), so `table_names()` is empty;
/// `SHOW TABLES` lists only the registry.
#[derive(Debug)]
pub struct VirtualSchemaProvider {
    introspector: Arc<dyn HostIntrospector>,
}

impl VirtualSchemaProvider {
    pub fn new(introspector: Arc<dyn HostIntrospector>) -> Self {
        Self { introspector }
    }
}

#[async_trait::async_trait]
impl SchemaProvider for VirtualSchemaProvider {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn table_names(&self) -> Vec<String> {
        Vec::new()
    }

    async fn table(&self, name: &str) -> Option<Arc<dyn TableProvider>> {
        let expr = VirtualExpr::parse(name)?;
        let value = self
            .introspector
            .eval(&expr)
            .map_err(|e| warn!(error = %e, expr = name, "virtual table evaluation failed"))
            .ok()?;
        let (schema, rows) = materialize(name, value)
            .map_err(|e| warn!(error = %e, expr = name, "virtual table materialization failed"))
            .ok()?;
        let batch = to_record_batch(&schema, &rows)
            .map_err(|e| warn!(error = %e, expr = name, "virtual table record batch failed"))
            .ok()?;
        let mem_table = MemTable::try_new(batch.schema(), vec![vec![batch]]).ok()?;
        Some(Arc::new(mem_table))
    }

    fn table_exist(&self, name: &str) -> bool {
        VirtualExpr::parse(name).is_some()
    }
}
