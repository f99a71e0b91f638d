use probing_core::{Row, Schematic, Value};

/// One sampled row of the probe trace table. Implements `Schematic`,
/// standing in for the original's per-dataclass table decorator.
#[derive(Debug, Clone)]
pub struct TorchTrace {
    pub step: u64,
    pub module_id: String,
    pub stage: &'static str,
    pub offset: u64,
    pub wall_offset_ns: u64,
    /// `None` while the row sits on the pending list awaiting a device
    /// timing pair; filled in before the row is finally appended.
    pub duration_ns: Option<u64>,
    pub allocated: u64,
    pub max_allocated: u64,
    pub cached: u64,
    pub max_cached: u64,
}

impl Schematic for TorchTrace {
    fn field_names() -> Vec<&'static str> {
        vec![
            "step",
            "module_id",
            "stage",
            "offset",
            "wall_offset_ns",
            "duration_ns",
            "allocated",
            "max_allocated",
            "cached",
            "max_cached",
        ]
    }

    fn into_row(self) -> Row {
        vec![
            Value::U64(self.step),
            Value::Str(self.module_id),
            Value::Str(self.stage.to_string()),
            Value::U64(self.offset),
            Value::U64(self.wall_offset_ns),
            self.duration_ns.map_or(Value::Null, Value::U64),
            Value::U64(self.allocated),
            Value::U64(self.max_allocated),
            Value::U64(self.cached),
            Value::U64(self.max_cached),
        ]
    }
}

/// A single user variable snapshot, traced from the call stack at a
/// `post_step` boundary.
#[derive(Debug, Clone)]
pub struct Variable {
    pub step: u64,
    pub name: String,
    pub value: Value,
}

impl Schematic for Variable {
    fn field_names() -> Vec<&'static str> {
        vec!["step", "name", "value"]
    }

    fn into_row(self) -> Row {
        vec![Value::U64(self.step), Value::Str(self.name), self.value]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn torch_trace_row_matches_field_order() {
        let trace = TorchTrace {
            step: 1,
            module_id: "m".to_string(),
            stage: "pre_forward",
            offset: 2,
            wall_offset_ns: 100,
            duration_ns: None,
            allocated: 0,
            max_allocated: 0,
            cached: 0,
            max_cached: 0,
        };
        let row = trace.into_row();
        assert_eq!(row.len(), TorchTrace::field_names().len());
        assert_eq!(row[5], Value::Null);
    }
}
