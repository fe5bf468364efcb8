use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NeoQueryError, Result};

/// Sends compiled SQL to the backend. Implemented by the transport layer
/// (HTTP or gRPC client); the compiler never performs I/O itself.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn query(&self, sql: &str) -> Result<QueryResult>;
}

/// Column-oriented result set as returned by the backend's query endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub lengths: Vec<i32>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct Envelope {
    data: QueryResult,
}

impl QueryResult {
    /// Decode a response body, with or without the `{"data": ...}` envelope.
    pub fn from_response(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)?;
        if value.get("data").is_some() {
            let envelope: Envelope = serde_json::from_value(value)?;
            Ok(envelope.data)
        } else {
            Ok(serde_json::from_value(value)?)
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    fn cell(&self, row: usize, col: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Value::Null)
    }

    /// Pivot rows into typed columns.
    pub fn into_frame(self, name: impl Into<String>) -> Result<Frame> {
        if !self.types.is_empty() && self.types.len() != self.columns.len() {
            return Err(NeoQueryError::Execution(format!(
                "response has {} columns but {} types",
                self.columns.len(),
                self.types.len()
            )));
        }
        let fields = self
            .columns
            .iter()
            .enumerate()
            .map(|(col, column)| {
                let kind = self.types.get(col).map(String::as_str).unwrap_or("");
                let cells = (0..self.rows.len()).map(|row| self.cell(row, col));
                Field {
                    name: column.clone(),
                    values: FieldValues::collect(kind, cells),
                }
            })
            .collect();
        Ok(Frame {
            name: name.into(),
            fields,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValues {
    Int16(Vec<Option<i16>>),
    Int32(Vec<Option<i32>>),
    Int64(Vec<Option<i64>>),
    Float32(Vec<Option<f32>>),
    Float64(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    /// Epoch nanoseconds.
    Time(Vec<Option<i64>>),
    Binary(Vec<Option<Vec<u8>>>),
    /// Column types without a typed representation.
    Json(Vec<Value>),
}

impl FieldValues {
    fn collect<'a>(kind: &str, cells: impl Iterator<Item = &'a Value>) -> Self {
        match kind {
            "int16" => FieldValues::Int16(cells.map(|v| v.as_f64().map(|n| n as i16)).collect()),
            "int32" => FieldValues::Int32(cells.map(|v| v.as_f64().map(|n| n as i32)).collect()),
            "int64" => FieldValues::Int64(cells.map(as_i64).collect()),
            "datetime" => FieldValues::Time(cells.map(as_i64).collect()),
            "float" => FieldValues::Float32(cells.map(|v| v.as_f64().map(|n| n as f32)).collect()),
            "double" => FieldValues::Float64(cells.map(Value::as_f64).collect()),
            "string" | "ipv4" | "ipv6" => {
                FieldValues::Text(cells.map(|v| v.as_str().map(str::to_string)).collect())
            }
            "binary" => FieldValues::Binary(cells.map(as_bytes).collect()),
            _ => FieldValues::Json(cells.cloned().collect()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldValues::Int16(v) => v.len(),
            FieldValues::Int32(v) => v.len(),
            FieldValues::Int64(v) | FieldValues::Time(v) => v.len(),
            FieldValues::Float32(v) => v.len(),
            FieldValues::Float64(v) => v.len(),
            FieldValues::Text(v) => v.len(),
            FieldValues::Binary(v) => v.len(),
            FieldValues::Json(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|n| n as i64))
}

/// Binary cells arrive either as a JSON byte array or as the string the HTTP
/// endpoint renders them to; the string is kept byte for byte.
fn as_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::String(s) => Some(s.as_bytes().to_vec()),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect(),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub values: FieldValues,
}

/// One series returned for a target.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Frame {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn row_count(&self) -> usize {
        self.fields.first().map_or(0, |f| f.values.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "success": true,
        "data": {
            "columns": ["TIME", "avg(VALUE)", "NAME"],
            "types": ["datetime", "double", "string"],
            "rows": [
                [1700000000000000000, 1.5, "a"],
                [1700000010000000000, null, "b"]
            ]
        }
    }"#;

    #[test]
    fn decodes_enveloped_response() {
        let result = QueryResult::from_response(BODY.as_bytes()).unwrap();
        assert_eq!(result.columns.len(), 3);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.column_index("time"), Some(0));
    }

    #[test]
    fn decodes_bare_response() {
        let body = r#"{"columns": ["C"], "types": ["int32"], "rows": [[7]]}"#;
        let result = QueryResult::from_response(body.as_bytes()).unwrap();
        let frame = result.into_frame("A").unwrap();
        assert_eq!(frame.fields[0].values, FieldValues::Int32(vec![Some(7)]));
    }

    #[test]
    fn pivots_rows_into_typed_fields() {
        let frame = QueryResult::from_response(BODY.as_bytes())
            .unwrap()
            .into_frame("A")
            .unwrap();
        assert_eq!(frame.row_count(), 2);
        assert_eq!(
            frame.field("TIME").unwrap().values,
            FieldValues::Time(vec![Some(1_700_000_000_000_000_000), Some(1_700_000_010_000_000_000)])
        );
        assert_eq!(
            frame.field("avg(VALUE)").unwrap().values,
            FieldValues::Float64(vec![Some(1.5), None])
        );
        assert_eq!(
            frame.field("name").unwrap().values,
            FieldValues::Text(vec![Some("a".to_string()), Some("b".to_string())])
        );
    }

    #[test]
    fn mismatched_types_are_rejected() {
        let result = QueryResult {
            columns: vec!["A".to_string(), "B".to_string()],
            types: vec!["double".to_string()],
            ..QueryResult::default()
        };
        assert!(matches!(result.into_frame("x"), Err(NeoQueryError::Execution(_))));
    }

    #[test]
    fn binary_columns_decode_to_bytes() {
        let result = QueryResult {
            columns: vec!["B".to_string()],
            types: vec!["binary".to_string()],
            lengths: vec![16],
            rows: vec![
                vec![Value::String("AAEC".to_string())],
                vec![serde_json::json!([0, 1, 255])],
                vec![Value::Null],
                vec![serde_json::json!([256])],
            ],
        };
        let frame = result.into_frame("x").unwrap();
        assert_eq!(
            frame.fields[0].values,
            FieldValues::Binary(vec![
                Some(b"AAEC".to_vec()),
                Some(vec![0, 1, 255]),
                None,
                None,
            ])
        );
    }

    #[test]
    fn unknown_types_pass_through_as_json() {
        let result = QueryResult {
            columns: vec!["J".to_string()],
            types: vec!["json".to_string()],
            rows: vec![vec![serde_json::json!({"k": 1})]],
            ..QueryResult::default()
        };
        let frame = result.into_frame("x").unwrap();
        assert_eq!(
            frame.fields[0].values,
            FieldValues::Json(vec![serde_json::json!({"k": 1})])
        );
    }
}
