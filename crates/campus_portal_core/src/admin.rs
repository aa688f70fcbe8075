//! crates/campus_portal_core/src/admin.rs
//!
//! Idempotent bootstrap of the administrator account. The identity comes from
//! deployment configuration; privilege is carried only by the profile's role.

use crate::domain::Role;
use crate::ports::{AuthProvider, PortError, PortResult};
use crate::profile::ProfileService;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

pub const CREATE_ADMIN_FUNCTION: &str = "create-admin";

#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapOutcome {
    /// A new account was created with the admin role.
    Created,
    /// The account already existed; it now carries the admin role.
    AlreadyExists,
}

/// Makes sure the configured admin account exists and has the admin role.
pub async fn ensure_admin(
    auth: &dyn AuthProvider,
    profiles: &ProfileService,
    identity: &AdminIdentity,
) -> PortResult<BootstrapOutcome> {
    if identity.email.trim().is_empty() || identity.password.is_empty() {
        return Err(PortError::Validation("admin email and password are required".to_string()));
    }

    let (user, outcome) = match auth.find_user_by_email(&identity.email).await? {
        Some(user) => (user, BootstrapOutcome::AlreadyExists),
        None => {
            let user = auth
                .sign_up(
                    &identity.email,
                    &identity.password,
                    json!({ "full_name": identity.full_name }),
                )
                .await?;
            (user, BootstrapOutcome::Created)
        }
    };

    let profile = profiles
        .ensure_profile(&user, Some(&identity.full_name), None)
        .await?;
    if profile.role != Role::Admin {
        profiles.set_role(user.id, Role::Admin).await?;
        info!(user_id = %user.id, "Admin role assigned");
    }
    Ok(outcome)
}

/// Checks whether `caller` may invoke the named function. Only administrators may
/// run `create-admin`; every other function is open to any signed-in user.
pub async fn authorize_function(profiles: &ProfileService, caller: Uuid, name: &str) -> PortResult<()> {
    if name == CREATE_ADMIN_FUNCTION {
        profiles.require_admin(caller).await?;
    }
    Ok(())
}
