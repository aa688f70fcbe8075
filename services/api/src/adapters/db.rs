//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `RowStore` port from the `core` crate. Rows travel as JSON objects: writes go
//! through `jsonb_populate_record` so Postgres does the column typing, and reads come
//! back as `to_jsonb(t)`.

use async_trait::async_trait;
use campus_portal_core::ports::{PortError, PortResult, RowStore};
use campus_portal_core::query::{Direction, Filter, Row, RowQuery};
use regex::Regex;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::sync::LazyLock;
use tracing::debug;
use uuid::Uuid;

/// Table and column names are interpolated into SQL, so they must be plain identifiers.
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("identifier pattern is valid")
});

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `RowStore` port.
#[derive(Clone)]
pub struct PgRowStore {
    pool: PgPool,
}

impl PgRowStore {
    /// Creates a new `PgRowStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// SQL Building
//=========================================================================================

fn ident(name: &str) -> PortResult<&str> {
    if IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(PortError::Validation(format!("'{}' is not a valid identifier", name)))
    }
}

/// Filters compare on the text form of the column, which matches how JSON carries
/// uuids, dates, booleans and enum labels.
fn filter_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_eq(qb: &mut QueryBuilder<'static, Postgres>, column: &str, value: &Value) -> PortResult<()> {
    let column = ident(column)?;
    if value.is_null() {
        qb.push(format!("t.{} IS NULL", column));
    } else {
        qb.push(format!("t.{}::text = ", column));
        qb.push_bind(filter_text(value));
    }
    Ok(())
}

fn push_filter(qb: &mut QueryBuilder<'static, Postgres>, filter: &Filter) -> PortResult<()> {
    match filter {
        Filter::Eq { column, value } => push_eq(qb, column, value)?,
        Filter::AnyEq(pairs) if pairs.is_empty() => {
            qb.push("FALSE");
        }
        Filter::AnyEq(pairs) => {
            qb.push("(");
            for (i, (column, value)) in pairs.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                push_eq(qb, column, value)?;
            }
            qb.push(")");
        }
        Filter::IsNull(column) => {
            qb.push(format!("t.{} IS NULL", ident(column)?));
        }
        Filter::NotNull(column) => {
            qb.push(format!("t.{} IS NOT NULL", ident(column)?));
        }
    }
    Ok(())
}

pub(crate) fn build_select(query: &RowQuery) -> PortResult<QueryBuilder<'static, Postgres>> {
    let table = ident(&query.table)?;
    let mut qb = QueryBuilder::new(format!("SELECT to_jsonb(t) FROM {} AS t", table));
    for (i, filter) in query.filters.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        push_filter(&mut qb, filter)?;
    }
    if let Some(ordering) = &query.ordering {
        let direction = match ordering.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        qb.push(format!(" ORDER BY t.{} {}", ident(&ordering.column)?, direction));
    }
    Ok(qb)
}

fn columns_of(row: &Row) -> PortResult<Vec<&str>> {
    if row.is_empty() {
        return Err(PortError::Validation("cannot write an empty row".to_string()));
    }
    row.keys().map(|key| ident(key)).collect()
}

/// `INSERT ... SELECT` from the populated record, optionally with an upsert clause.
pub(crate) fn build_insert(
    table: &str,
    row: &Row,
    conflict_keys: Option<&[&str]>,
) -> PortResult<QueryBuilder<'static, Postgres>> {
    let table = ident(table)?;
    let columns = columns_of(row)?;
    let list = columns.join(", ");

    let mut qb = QueryBuilder::new(format!(
        "INSERT INTO {table} AS t ({list}) SELECT {list} FROM jsonb_populate_record(NULL::{table}, "
    ));
    qb.push_bind(Value::Object(row.clone()));
    qb.push(")");

    if let Some(keys) = conflict_keys {
        let keys = keys.iter().map(|key| ident(key)).collect::<PortResult<Vec<_>>>()?;
        let first_key = keys
            .first()
            .ok_or_else(|| PortError::Validation("upsert needs at least one conflict key".to_string()))?;
        let mut updates: Vec<String> = columns
            .iter()
            .copied()
            .filter(|column| !keys.contains(column) && *column != "id")
            .map(|column| format!("{column} = EXCLUDED.{column}"))
            .collect();
        if updates.is_empty() {
            // Still take the DO UPDATE path so RETURNING yields the existing row.
            updates.push(format!("{first_key} = EXCLUDED.{first_key}"));
        }
        qb.push(format!(
            " ON CONFLICT ({}) DO UPDATE SET {}",
            keys.join(", "),
            updates.join(", ")
        ));
    }

    qb.push(" RETURNING to_jsonb(t)");
    Ok(qb)
}

pub(crate) fn build_update(table: &str, id: Uuid, patch: &Row) -> PortResult<QueryBuilder<'static, Postgres>> {
    let table = ident(table)?;
    let assignments: Vec<String> = columns_of(patch)?
        .into_iter()
        .filter(|column| *column != "id")
        .map(|column| format!("{column} = r.{column}"))
        .collect();
    if assignments.is_empty() {
        return Err(PortError::Validation("nothing to update".to_string()));
    }

    let mut qb = QueryBuilder::new(format!(
        "UPDATE {table} AS t SET {} FROM jsonb_populate_record(NULL::{table}, ",
        assignments.join(", ")
    ));
    qb.push_bind(Value::Object(patch.clone()));
    qb.push(") AS r WHERE t.id = ");
    qb.push_bind(id);
    qb.push(" RETURNING to_jsonb(t)");
    Ok(qb)
}

//=========================================================================================
// Error and Row Mapping
//=========================================================================================

fn map_sqlx(table: &str, e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(format!("No matching row in {}", table)),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Rule(format!("A matching entry already exists in {}", table))
        }
        sqlx::Error::Database(db) if db.is_check_violation() || db.is_foreign_key_violation() => {
            PortError::Validation(db.message().to_string())
        }
        other => PortError::Unexpected(other.to_string()),
    }
}

fn into_row(value: Value) -> PortResult<Row> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(PortError::Unexpected(format!(
            "expected a JSON object row, got {}",
            other
        ))),
    }
}

//=========================================================================================
// `RowStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl RowStore for PgRowStore {
    async fn query(&self, query: RowQuery) -> PortResult<Vec<Row>> {
        let mut qb = build_select(&query)?;
        debug!(sql = qb.sql(), "Row query");
        let values = qb
            .build_query_scalar::<Value>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx(&query.table, e))?;
        values.into_iter().map(into_row).collect()
    }

    async fn insert(&self, table: &str, row: Row) -> PortResult<Row> {
        let mut qb = build_insert(table, &row, None)?;
        let value = qb
            .build_query_scalar::<Value>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx(table, e))?;
        into_row(value)
    }

    async fn update(&self, table: &str, id: Uuid, patch: Row) -> PortResult<Row> {
        let mut qb = build_update(table, id, &patch)?;
        let value = qb
            .build_query_scalar::<Value>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx(table, e))?
            .ok_or_else(|| PortError::NotFound(format!("Row {} not found in {}", id, table)))?;
        into_row(value)
    }

    async fn upsert(&self, table: &str, row: Row, conflict_keys: &[&str]) -> PortResult<Row> {
        let mut qb = build_insert(table, &row, Some(conflict_keys))?;
        let value = qb
            .build_query_scalar::<Value>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx(table, e))?;
        into_row(value)
    }

    async fn delete(&self, table: &str, id: Uuid) -> PortResult<()> {
        let table = ident(table)?;
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx(table, e))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Row {} not found in {}", id, table)));
        }
        Ok(())
    }
}
