use serde::{Serialize, Serializer};

/// A single column element.
///
/// Mirrors the scalar types callers can append into a table: signed and
/// unsigned integers, floating point, UTF-8 strings, booleans, and a
/// null-aware variant for absent values (used when a virtual table
/// materializes a sequence of mappings with differing keys).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
    Bool(bool),
    Null,
}

impl Value {
    /// The `DataType` this value would be stored as in a `Schema`.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::I64(_) => DataType::Int64,
            Value::U64(_) => DataType::UInt64,
            Value::F64(_) => DataType::Float64,
            Value::Str(_) => DataType::Utf8,
            Value::Bool(_) => DataType::Boolean,
            Value::Null => DataType::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Size of this value's payload in bytes, for `BaseMemorySize` eviction
    /// accounting. Strings are measured by UTF-8 byte length per spec.
    pub fn byte_size(&self) -> usize {
        match self {
            Value::I64(_) => std::mem::size_of::<i64>(),
            Value::U64(_) => std::mem::size_of::<u64>(),
            Value::F64(_) => std::mem::size_of::<f64>(),
            Value::Bool(_) => std::mem::size_of::<bool>(),
            Value::Str(s) => s.len(),
            Value::Null => 0,
        }
    }

    /// Returns true if `self` is type-compatible with `other` for the
    /// purposes of schema/append validation. `Null` is compatible with any
    /// type, since a virtual table's union-of-keys materialization can
    /// legitimately produce nulls in any column.
    pub fn type_compatible(&self, other: &DataType) -> bool {
        matches!(self, Value::Null) || self.data_type() == *other
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::I64(v) => serializer.serialize_i64(*v),
            Value::U64(v) => serializer.serialize_u64(*v),
            Value::F64(v) => serializer.serialize_f64(*v),
            Value::Str(v) => serializer.serialize_str(v),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Null => serializer.serialize_none(),
        }
    }
}

/// The element type of a `Column`, fixed at table-creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int64,
    UInt64,
    Float64,
    Utf8,
    Boolean,
    /// Only ever produced by a virtual table materializing an all-null
    /// column; never used as a stored column's declared type.
    Null,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_compatible_with_every_type() {
        assert!(Value::Null.type_compatible(&DataType::Int64));
        assert!(Value::Null.type_compatible(&DataType::Utf8));
    }

    #[test]
    fn string_byte_size_is_utf8_len_not_char_count() {
        let v = Value::Str("héllo".to_string());
        assert_eq!(v.byte_size(), "héllo".len());
        assert_ne!(v.byte_size(), "héllo".chars().count());
    }
}
