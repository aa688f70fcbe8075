//! crates/campus_portal_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the hosted backend the portal runs on.
//! These traits form the boundary of the hexagonal architecture: auth, relational rows,
//! object storage, function invocation and the generative model all sit behind them.

use crate::domain::{AuthSession, AuthUser};
use crate::query::{Row, RowQuery};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port and service operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Input rejected before any backend call was made.
    #[error("Invalid input: {0}")]
    Validation(String),
    /// A business rule refused the operation.
    #[error("{0}")]
    Rule(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Generic row operations against the hosted relational store.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn query(&self, query: RowQuery) -> PortResult<Vec<Row>>;

    async fn insert(&self, table: &str, row: Row) -> PortResult<Row>;

    /// Applies `patch` to the row with the given id and returns the updated row.
    async fn update(&self, table: &str, id: Uuid, patch: Row) -> PortResult<Row>;

    /// Inserts `row`, or overwrites the non-key columns of the row that already
    /// matches it on every column in `conflict_keys`.
    async fn upsert(&self, table: &str, row: Row, conflict_keys: &[&str]) -> PortResult<Row>;

    async fn delete(&self, table: &str, id: Uuid) -> PortResult<()>;
}

/// Object storage for uploaded PDFs and images.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` under `bucket/path`, replacing any existing object, and
    /// returns its public URL.
    async fn upload_file(&self, bucket: &str, path: &str, bytes: Bytes) -> PortResult<String>;

    async fn remove_file(&self, bucket: &str, path: &str) -> PortResult<()>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolves a session token to its user, or `None` when the token is unknown or expired.
    async fn current_user(&self, token: &str) -> PortResult<Option<AuthUser>>;

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession>;

    async fn sign_out(&self, token: &str) -> PortResult<()>;

    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> PortResult<AuthUser>;

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<AuthUser>>;
}

/// Calls a named serverless function with a JSON payload.
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke_function(&self, name: &str, payload: Value) -> PortResult<Value>;
}

/// A generative-language model that answers with JSON text.
#[async_trait]
pub trait AnalysisModel: Send + Sync {
    /// Returns the raw model reply; callers parse it.
    async fn complete_json(&self, system_prompt: &str, user_text: &str) -> PortResult<String>;
}
