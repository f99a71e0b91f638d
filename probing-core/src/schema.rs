use crate::value::DataType;

/// A single named, typed column slot within a `Schema`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// The ordered, fixed field list of a table. Two schemas are equal iff their
/// field names *and* positions match; this is deliberately stricter than
/// "same set of columns" because append order matters for `Row` encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Builds a schema from bare names with an unknown/placeholder type.
    /// Used when a table is declared from a column-name list alone (as in
    /// end-to-end scenario 1 of the spec) and types are inferred from the
    /// first append.
    pub fn from_names(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new(
            names
                .into_iter()
                .map(|n| Field::new(n, DataType::Null))
                .collect(),
        )
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Whether `self` is assignable-compatible with an `AlreadyExists` check:
    /// the teacher's registry idempotence rule is "same name path" not
    /// "structurally equal fields", so this checks names only.
    pub fn same_shape(&self, other: &Schema) -> bool {
        self.names() == other.names()
    }
}
