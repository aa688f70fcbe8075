//! services/api/src/adapters/functions.rs
//!
//! In-process implementation of the `FunctionInvoker` port. The hosted backend's
//! serverless functions run here as plain async calls, dispatched by name.

use async_trait::async_trait;
use campus_portal_core::admin::{ensure_admin, AdminIdentity, CREATE_ADMIN_FUNCTION};
use campus_portal_core::ports::{AuthProvider, FunctionInvoker, PortError, PortResult};
use campus_portal_core::profile::ProfileService;
use campus_portal_core::pyq::{AnalyzeRequest, PyqAnalyzer, PYQ_ANALYZER_FUNCTION};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// What `create-admin` needs; absent when no admin identity is configured.
pub struct AdminBootstrap {
    pub auth: Arc<dyn AuthProvider>,
    pub profiles: Arc<ProfileService>,
    pub identity: AdminIdentity,
}

pub struct LocalFunctionRunner {
    analyzer: PyqAnalyzer,
    admin: Option<AdminBootstrap>,
}

impl LocalFunctionRunner {
    pub fn new(analyzer: PyqAnalyzer, admin: Option<AdminBootstrap>) -> Self {
        Self { analyzer, admin }
    }

    async fn analyze_pyq(&self, payload: Value) -> PortResult<Value> {
        let request: AnalyzeRequest = serde_json::from_value(payload)
            .map_err(|e| PortError::Validation(format!("invalid analyzer payload: {}", e)))?;
        let analysis = self.analyzer.analyze(request.into_input()?).await?;
        serde_json::to_value(analysis).map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn create_admin(&self) -> PortResult<Value> {
        let admin = self
            .admin
            .as_ref()
            .ok_or_else(|| PortError::Rule("no admin account is configured".to_string()))?;
        let outcome = ensure_admin(admin.auth.as_ref(), &admin.profiles, &admin.identity).await?;
        Ok(json!({ "status": outcome }))
    }
}

#[async_trait]
impl FunctionInvoker for LocalFunctionRunner {
    async fn invoke_function(&self, name: &str, payload: Value) -> PortResult<Value> {
        info!(function = name, "Invoking function");
        match name {
            PYQ_ANALYZER_FUNCTION => self.analyze_pyq(payload).await,
            CREATE_ADMIN_FUNCTION => self.create_admin().await,
            other => Err(PortError::NotFound(format!("Function '{}' not found", other))),
        }
    }
}
