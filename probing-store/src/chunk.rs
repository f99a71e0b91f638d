use probing_core::{Row, Value};

/// A contiguous slab of up to `chunk_size` rows, spanning every column of a
/// table. Keeping one row count across all columns is what makes the
/// "equal active row count" invariant structural rather than
/// something that has to be checked after the fact: a `Chunk` simply cannot
/// represent columns of differing length.
#[derive(Debug)]
pub struct Chunk {
    /// `columns[i]` holds this chunk's values for schema field `i`.
    columns: Vec<Vec<Value>>,
    capacity: usize,
    sealed: bool,
}

impl Chunk {
    pub fn new(arity: usize, capacity: usize) -> Self {
        Self {
            columns: vec![Vec::new(); arity],
            capacity,
            sealed: false,
        }
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_full(&self) -> bool {
        self.row_count() >= self.capacity
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Appends one already-validated row. Panics if called on a full chunk;
    /// callers (`Table::append`) always seal and rotate before this would
    /// happen.
    pub fn push_row(&mut self, row: Row) {
        debug_assert!(!self.is_full(), "pushed into a full chunk");
        debug_assert_eq!(row.len(), self.columns.len());
        for (col, value) in self.columns.iter_mut().zip(row) {
            col.push(value);
        }
    }

    /// Byte footprint of this chunk's live data, accounting for strings by
    /// UTF-8 byte length.
    pub fn byte_size(&self) -> usize {
        self.columns
            .iter()
            .flat_map(|c| c.iter())
            .map(Value::byte_size)
            .sum()
    }

    /// Returns the last `n` rows of this chunk (row-major), in insertion
    /// order. `n` may exceed `row_count()`, in which case all rows are
    /// returned.
    pub fn last_rows(&self, n: usize) -> Vec<Row> {
        let len = self.row_count();
        let take = n.min(len);
        let start = len - take;
        (start..len)
            .map(|i| self.columns.iter().map(|c| c[i].clone()).collect())
            .collect()
    }

    pub fn rows(&self) -> Vec<Row> {
        self.last_rows(self.row_count())
    }
}
