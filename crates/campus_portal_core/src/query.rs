//! crates/campus_portal_core/src/query.rs
//!
//! Value objects describing a read against the row store, plus the helpers that
//! move domain structs in and out of JSON rows.

use crate::ports::{PortError, PortResult};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

/// A table row as the store returns it: column name to JSON value.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq { column: String, value: Value },
    /// `a = x OR b = y OR ...`
    AnyEq(Vec<(String, Value)>),
    IsNull(String),
    NotNull(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub column: String,
    pub direction: Direction,
}

/// A filtered, optionally ordered read of one table. Filters are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub struct RowQuery {
    pub table: String,
    pub filters: Vec<Filter>,
    pub ordering: Option<Ordering>,
}

impl RowQuery {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            filters: Vec::new(),
            ordering: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl Serialize) -> PortResult<Self> {
        self.filters.push(Filter::Eq {
            column: column.to_string(),
            value: filter_value(column, value)?,
        });
        Ok(self)
    }

    pub fn any_eq<V: Serialize>(mut self, pairs: Vec<(&str, V)>) -> PortResult<Self> {
        let pairs = pairs
            .into_iter()
            .map(|(column, value)| filter_value(column, value).map(|v| (column.to_string(), v)))
            .collect::<PortResult<Vec<_>>>()?;
        self.filters.push(Filter::AnyEq(pairs));
        Ok(self)
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::IsNull(column.to_string()));
        self
    }

    pub fn not_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::NotNull(column.to_string()));
        self
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.ordering = Some(Ordering {
            column: column.to_string(),
            direction,
        });
        self
    }
}

fn filter_value(column: &str, value: impl Serialize) -> PortResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| PortError::Unexpected(format!("cannot filter on {}: {}", column, e)))
}

//=========================================================================================
// Row conversion
//=========================================================================================

/// Serializes a struct (or a `json!` literal) into a row.
pub fn to_row<T: Serialize>(value: &T) -> PortResult<Row> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(PortError::Unexpected(format!(
            "expected a JSON object for a row, got {}",
            other
        ))),
        Err(e) => Err(PortError::Unexpected(e.to_string())),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> PortResult<T> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| PortError::Unexpected(format!("malformed row: {}", e)))
}

pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> PortResult<Vec<T>> {
    rows.into_iter().map(from_row).collect()
}
