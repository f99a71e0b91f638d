use std::collections::BTreeSet;

use probing_core::{Row, Schema, Value};

use crate::virtual_table::{EvaluationFailedSnafu, IntrospectedValue, ResolveError};

/// Materialises a resolved `IntrospectedValue` into a one-shot table
/// (schema + rows), per the four shapes a value can take. The resulting
/// table is never registered; it is built fresh for a single query and
/// discarded afterwards.
pub fn materialize(expr_text: &str, value: IntrospectedValue) -> Result<(Schema, Vec<Row>), ResolveError> {
    match value {
        IntrospectedValue::Scalar(v) => {
            let schema = Schema::from_names(["value"]);
            Ok((schema, vec![vec![v]]))
        }
        IntrospectedValue::Mapping(pairs) => {
            let names: Vec<String> = pairs.iter().map(|(k, _)| k.clone()).collect();
            let schema = Schema::from_names(names);
            let row: Row = pairs.into_iter().map(|(_, v)| v).collect();
            Ok((schema, vec![row]))
        }
        IntrospectedValue::Sequence(items) => materialize_sequence(expr_text, items),
    }
}

fn materialize_sequence(
    expr_text: &str,
    items: Vec<IntrospectedValue>,
) -> Result<(Schema, Vec<Row>), ResolveError> {
    if items.is_empty() {
        return Ok((Schema::from_names(["value"]), Vec::new()));
    }

    if items.iter().all(|i| matches!(i, IntrospectedValue::Scalar(_))) {
        let schema = Schema::from_names(["value"]);
        let rows = items
            .into_iter()
            .map(|i| match i {
                IntrospectedValue::Scalar(v) => vec![v],
                _ => unreachable!(),
            })
            .collect();
        return Ok((schema, rows));
    }

    if items.iter().all(|i| matches!(i, IntrospectedValue::Mapping(_))) {
        let mut ordered_keys: Vec<String> = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mappings: Vec<Vec<(String, Value)>> = items
            .into_iter()
            .map(|i| match i {
                IntrospectedValue::Mapping(pairs) => pairs,
                _ => unreachable!(),
            })
            .collect();
        for pairs in &mappings {
            for (k, _) in pairs {
                if seen.insert(k.clone()) {
                    ordered_keys.push(k.clone());
                }
            }
        }

        let schema = Schema::from_names(ordered_keys.clone());
        let rows = mappings
            .into_iter()
            .map(|pairs| {
                ordered_keys
                    .iter()
                    .map(|key| {
                        pairs
                            .iter()
                            .find(|(k, _)| k == key)
                            .map(|(_, v)| v.clone())
                            .unwrap_or(Value::Null)
                    })
                    .collect()
            })
            .collect();
        return Ok((schema, rows));
    }

    EvaluationFailedSnafu {
        expr: expr_text.to_string(),
        reason: "sequence elements are not uniformly scalar or uniformly mappings".to_string(),
    }
    .fail()
}
