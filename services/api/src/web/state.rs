//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use campus_portal_core::attendance::AttendanceService;
use campus_portal_core::ports::{AuthProvider, FunctionInvoker};
use campus_portal_core::profile::ProfileService;
use campus_portal_core::resources::ResourceService;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<dyn AuthProvider>,
    pub profiles: Arc<ProfileService>,
    pub attendance: Arc<AttendanceService>,
    pub resources: Arc<ResourceService>,
    pub functions: Arc<dyn FunctionInvoker>,
}
