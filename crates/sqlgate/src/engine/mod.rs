use std::path::{Path, PathBuf};

use anyhow::{Context, Error, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, params_from_iter};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Value, json};

use crate::error::GatewayError;

/// One result row. Field order is the result set's column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    fields: Vec<(String, SqlValue)>,
}

impl Row {
    #[must_use]
    pub fn new(fields: Vec<(String, SqlValue)>) -> Self {
        Self { fields }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&SqlValue> {
        self.fields.get(index).map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, &json_value_from_sql(value))?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    pub column_names: Vec<String>,
    pub rows: Vec<Row>,
    pub truncated: bool,
}

impl QueryOutput {
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Runs already-validated SQL over a connection SQLite itself keeps
/// read-only. A fresh connection is opened per call and closed when the
/// call returns, on every path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOnlyEngine {
    db_path: PathBuf,
}

impl ReadOnlyEngine {
    #[must_use]
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn open(&self) -> std::result::Result<Connection, GatewayError> {
        open_read_only_connection(&self.db_path)
    }

    pub fn execute(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> std::result::Result<Vec<Row>, GatewayError> {
        self.execute_capped(sql, params, None)
            .map(|output| output.rows)
    }

    pub fn execute_capped(
        &self,
        sql: &str,
        params: &[SqlValue],
        row_cap: Option<usize>,
    ) -> std::result::Result<QueryOutput, GatewayError> {
        let connection = self.open()?;
        tracing::info!(
            db = %self.db_path.display(),
            params = params.len(),
            sql,
            "executing read-only query"
        );

        let output = run_query(&connection, sql, params, row_cap).map_err(|error| {
            tracing::warn!(%error, "read-only query failed");
            GatewayError::storage(&error)
        })?;
        tracing::debug!(
            rows = output.rows.len(),
            truncated = output.truncated,
            "read-only query finished"
        );
        Ok(output)
    }
}

pub fn open_read_only_connection(path: &Path) -> std::result::Result<Connection, GatewayError> {
    let unavailable = |error: rusqlite::Error| GatewayError::StorageUnavailable {
        path: path.to_path_buf(),
        message: error.to_string(),
    };

    let connection = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(unavailable)?;
    connection
        .execute_batch("PRAGMA query_only = ON;")
        .map_err(unavailable)?;
    Ok(connection)
}

fn run_query(
    connection: &Connection,
    sql: &str,
    params: &[SqlValue],
    row_cap: Option<usize>,
) -> rusqlite::Result<QueryOutput> {
    let mut statement = connection.prepare(sql)?;
    let column_names = statement
        .column_names()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    let mut rows = statement.query(params_from_iter(params.iter()))?;
    let mut result_rows = Vec::new();
    let mut truncated = false;
    while let Some(row) = rows.next()? {
        if row_cap.is_some_and(|cap| result_rows.len() >= cap) {
            truncated = true;
            break;
        }

        let mut fields = Vec::with_capacity(column_names.len());
        for (index, column_name) in column_names.iter().enumerate() {
            fields.push((column_name.clone(), row.get::<usize, SqlValue>(index)?));
        }
        result_rows.push(Row::new(fields));
    }

    Ok(QueryOutput {
        column_names,
        rows: result_rows,
        truncated,
    })
}

/// Positional parameters from JSON: `null` or blank means none, a scalar is
/// one parameter, an array is one parameter per entry.
pub fn parse_params(params_json: Option<&str>) -> Result<Vec<SqlValue>> {
    let Some(raw) = params_json else {
        return Ok(Vec::new());
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let parsed =
        serde_json::from_str::<Value>(trimmed).context("params must be valid JSON if provided")?;
    match parsed {
        Value::Null => Ok(Vec::new()),
        Value::Array(values) => values
            .into_iter()
            .map(sql_value_from_json)
            .collect::<Result<Vec<_>>>(),
        value => Ok(vec![sql_value_from_json(value)?]),
    }
}

fn sql_value_from_json(value: Value) -> Result<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(flag) => Ok(SqlValue::Integer(i64::from(flag))),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                Ok(SqlValue::Integer(integer))
            } else if number.is_u64() {
                Err(Error::msg("params integer exceeds sqlite INTEGER range"))
            } else if let Some(real) = number.as_f64() {
                Ok(SqlValue::Real(real))
            } else {
                Err(Error::msg("unsupported numeric param value"))
            }
        }
        Value::String(text) => Ok(SqlValue::Text(text)),
        Value::Array(_) | Value::Object(_) => {
            Err(Error::msg("params entries must be scalar JSON values"))
        }
    }
}

#[must_use]
pub fn json_value_from_sql(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(value) => json!(value),
        SqlValue::Real(value) => json!(value),
        SqlValue::Text(value) => json!(value),
        SqlValue::Blob(value) => json!(encode_blob_hex(value)),
    }
}

fn encode_blob_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push(HEX[(byte >> 4) as usize] as char);
        output.push(HEX[(byte & 0x0f) as usize] as char);
    }
    output
}
