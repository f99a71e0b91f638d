use crate::value::Value;

/// A single row of values, in schema column order.
pub type Row = Vec<Value>;

/// Translates a Rust struct into a declared field order and a `Row` encoder,
/// standing in for the original's per-dataclass table decorator.
/// Implementors declare their field
/// names once in `field_names()` and their per-instance values in
/// `into_row()`; `probing-catalog::Handle::save` calls both to append.
pub trait Schematic {
    fn field_names() -> Vec<&'static str>;
    fn into_row(self) -> Row;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    struct Point {
        x: i64,
        y: i64,
    }

    impl Schematic for Point {
        fn field_names() -> Vec<&'static str> {
            vec!["x", "y"]
        }

        fn into_row(self) -> Row {
            vec![Value::I64(self.x), Value::I64(self.y)]
        }
    }

    #[test]
    fn schematic_round_trips_field_order() {
        let p = Point { x: 1, y: 2 };
        assert_eq!(Point::field_names(), vec!["x", "y"]);
        assert_eq!(p.into_row(), vec![Value::I64(1), Value::I64(2)]);
    }
}
