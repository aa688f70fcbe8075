//! In-memory stand-ins for the backend ports, used by the unit tests.

use crate::domain::{AuthSession, AuthUser};
use crate::ports::{AnalysisModel, AuthProvider, ObjectStorage, PortError, PortResult, RowStore};
use crate::query::{Direction, Filter, Row, RowQuery};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

//=========================================================================================
// Rows
//=========================================================================================

#[derive(Default)]
pub struct InMemoryRowStore {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    /// Upserts whose `subject` column equals this value fail.
    pub fail_subject: Mutex<Option<String>>,
}

impl InMemoryRowStore {
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn seed(&self, table: &str, row: Value) -> Row {
        let Value::Object(row) = row else {
            panic!("seed rows must be objects");
        };
        let row = with_defaults(row);
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        row
    }
}

fn with_defaults(mut row: Row) -> Row {
    row.entry("id")
        .or_insert_with(|| json!(Uuid::new_v4()));
    row.entry("created_at").or_insert_with(|| json!(Utc::now()));
    row
}

fn matches(filter: &Filter, row: &Row) -> bool {
    let is_null = |column: &str| row.get(column).map_or(true, Value::is_null);
    match filter {
        Filter::Eq { column, value } => row.get(column) == Some(value),
        Filter::AnyEq(pairs) => pairs
            .iter()
            .any(|(column, value)| row.get(column) == Some(value)),
        Filter::IsNull(column) => is_null(column),
        Filter::NotNull(column) => !is_null(column),
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn same_id(row: &Row, id: Uuid) -> bool {
    row.get("id") == Some(&json!(id))
}

#[async_trait]
impl RowStore for InMemoryRowStore {
    async fn query(&self, query: RowQuery) -> PortResult<Vec<Row>> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Row> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| matches(f, row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Some(ordering) = &query.ordering {
            rows.sort_by(|a, b| {
                let ord = compare(a.get(&ordering.column), b.get(&ordering.column));
                match ordering.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Row) -> PortResult<Row> {
        let row = with_defaults(row);
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, id: Uuid, patch: Row) -> PortResult<Row> {
        let mut tables = self.tables.lock().unwrap();
        let row = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| same_id(row, id)))
            .ok_or_else(|| PortError::NotFound(format!("{} row {} not found", table, id)))?;
        row.extend(patch);
        Ok(row.clone())
    }

    async fn upsert(&self, table: &str, row: Row, conflict_keys: &[&str]) -> PortResult<Row> {
        if let Some(subject) = self.fail_subject.lock().unwrap().clone() {
            if row.get("subject") == Some(&Value::String(subject)) {
                return Err(PortError::Unexpected("simulated network failure".to_string()));
            }
        }

        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        let existing = rows
            .iter_mut()
            .find(|existing| conflict_keys.iter().all(|key| existing.get(*key) == row.get(*key)));
        match existing {
            Some(existing) => {
                for (column, value) in row {
                    if column != "id" {
                        existing.insert(column, value);
                    }
                }
                Ok(existing.clone())
            }
            None => {
                let row = with_defaults(row);
                rows.push(row.clone());
                Ok(row)
            }
        }
    }

    async fn delete(&self, table: &str, id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| PortError::NotFound(format!("{} row {} not found", table, id)))?;
        let before = rows.len();
        rows.retain(|row| !same_id(row, id));
        if rows.len() == before {
            return Err(PortError::NotFound(format!("{} row {} not found", table, id)));
        }
        Ok(())
    }
}

//=========================================================================================
// Storage
//=========================================================================================

#[derive(Default)]
pub struct InMemoryStorage {
    pub objects: Mutex<HashMap<String, Bytes>>,
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn upload_file(&self, bucket: &str, path: &str, bytes: Bytes) -> PortResult<String> {
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{}/{}", bucket, path), bytes);
        Ok(self.public_url(bucket, path))
    }

    async fn remove_file(&self, bucket: &str, path: &str) -> PortResult<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(&format!("{}/{}", bucket, path))
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(format!("{}/{}", bucket, path)))
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{}/{}", bucket, path)
    }
}

//=========================================================================================
// Auth
//=========================================================================================

#[derive(Default)]
pub struct InMemoryAuth {
    users: Mutex<Vec<(AuthUser, String)>>,
    sessions: Mutex<HashMap<String, AuthUser>>,
}

#[async_trait]
impl AuthProvider for InMemoryAuth {
    async fn current_user(&self, token: &str) -> PortResult<Option<AuthUser>> {
        Ok(self.sessions.lock().unwrap().get(token).cloned())
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let user = self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(user, stored)| user.email == email && stored == password)
            .map(|(user, _)| user.clone())
            .ok_or(PortError::Unauthorized)?;
        let token = Uuid::new_v4().to_string();
        self.sessions
            .lock()
            .unwrap()
            .insert(token.clone(), user.clone());
        Ok(AuthSession {
            token,
            user,
            expires_at: Utc::now() + Duration::days(1),
        })
    }

    async fn sign_out(&self, token: &str) -> PortResult<()> {
        self.sessions.lock().unwrap().remove(token);
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str, _metadata: Value) -> PortResult<AuthUser> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|(user, _)| user.email == email) {
            return Err(PortError::Rule("email already registered".to_string()));
        }
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
        };
        users.push((user.clone(), password.to_string()));
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<AuthUser>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(user, _)| user.email == email)
            .map(|(user, _)| user.clone()))
    }
}

//=========================================================================================
// Model
//=========================================================================================

/// Replies with a fixed string and remembers every user prompt it saw.
pub struct CannedModel {
    pub reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl CannedModel {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AnalysisModel for CannedModel {
    async fn complete_json(&self, _system_prompt: &str, user_text: &str) -> PortResult<String> {
        self.prompts.lock().unwrap().push(user_text.to_string());
        Ok(self.reply.clone())
    }
}
