//! Decoded result rows. Values always cross the wire in Postgres's text
//! format (see [`crate::message::parse_bind_execute`]); this module's only
//! job is coercing that text into the handful of typed shapes the
//! document-reply encoder needs, keyed off the column's reported oid.
use std::sync::Arc;

use bytes::Bytes;

use crate::message::ColumnInfo;
use crate::oid;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Text(String),
}

fn decode_text(type_oid: u32, text: &str) -> BackendValue {
    match type_oid {
        oid::BOOL => match text {
            "t" => BackendValue::Bool(true),
            "f" => BackendValue::Bool(false),
            _ => BackendValue::Text(text.to_string()),
        },
        oid::INT2 | oid::INT4 => text
            .parse::<i32>()
            .map(BackendValue::Int32)
            .unwrap_or_else(|_| BackendValue::Text(text.to_string())),
        oid::INT8 => text
            .parse::<i64>()
            .map(BackendValue::Int64)
            .unwrap_or_else(|_| BackendValue::Text(text.to_string())),
        oid::FLOAT4 | oid::FLOAT8 | oid::NUMERIC => text
            .parse::<f64>()
            .map(BackendValue::Float64)
            .unwrap_or_else(|_| BackendValue::Text(text.to_string())),
        _ => BackendValue::Text(text.to_string()),
    }
}

/// One row of a result set, paired with the column metadata of the
/// statement it came from.
#[derive(Debug, Clone)]
pub struct BackendRow {
    pub(crate) columns: Arc<[ColumnInfo]>,
    pub(crate) values: Vec<Option<Bytes>>,
}

impl BackendRow {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn column_name(&self, index: usize) -> &str {
        &self.columns[index].name
    }

    pub fn get(&self, index: usize) -> BackendValue {
        match &self.values[index] {
            None => BackendValue::Null,
            Some(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                decode_text(self.columns[index].type_oid, &text)
            }
        }
    }

    /// Iterate `(column name, decoded value)` pairs in statement order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, BackendValue)> + '_ {
        (0..self.values.len()).map(|i| (self.column_name(i), self.get(i)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn row(columns: Vec<(&str, u32)>, values: Vec<Option<&str>>) -> BackendRow {
        BackendRow {
            columns: columns
                .into_iter()
                .map(|(name, type_oid)| ColumnInfo { name: name.to_string(), type_oid })
                .collect(),
            values: values.into_iter().map(|v| v.map(|s| Bytes::copy_from_slice(s.as_bytes()))).collect(),
        }
    }

    #[test]
    fn decodes_typed_columns() {
        let r = row(
            vec![("id", oid::INT4), ("name", oid::TEXT), ("active", oid::BOOL)],
            vec![Some("7"), Some("alice"), Some("t")],
        );
        assert_eq!(r.get(0), BackendValue::Int32(7));
        assert_eq!(r.get(1), BackendValue::Text("alice".to_string()));
        assert_eq!(r.get(2), BackendValue::Bool(true));
    }

    #[test]
    fn null_value_is_null() {
        let r = row(vec![("n", oid::INT8)], vec![None]);
        assert_eq!(r.get(0), BackendValue::Null);
    }
}
