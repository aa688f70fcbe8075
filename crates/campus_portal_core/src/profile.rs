//! crates/campus_portal_core/src/profile.rs
//!
//! The per-user `profiles` row: display name, semester, role and avatar.

use crate::domain::{AuthUser, Profile, Role};
use crate::ports::{ObjectStorage, PortError, PortResult, RowStore};
use crate::query::{from_row, to_row, RowQuery};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const PROFILES_TABLE: &str = "profiles";
pub const AVATAR_BUCKET: &str = "avatars";
pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

const AVATAR_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Fields a user may change on their own profile. The role is not one of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
}

pub struct ProfileService {
    rows: Arc<dyn RowStore>,
    storage: Arc<dyn ObjectStorage>,
}

impl ProfileService {
    pub fn new(rows: Arc<dyn RowStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { rows, storage }
    }

    pub async fn find(&self, user_id: Uuid) -> PortResult<Option<Profile>> {
        let rows = self
            .rows
            .query(RowQuery::new(PROFILES_TABLE).eq("id", user_id)?)
            .await?;
        rows.into_iter().next().map(from_row::<Profile>).transpose()
    }

    pub async fn get(&self, user_id: Uuid) -> PortResult<Profile> {
        self.find(user_id)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("Profile {} not found", user_id)))
    }

    /// Returns the user's profile, creating a student profile on first sight.
    pub async fn ensure_profile(
        &self,
        user: &AuthUser,
        full_name: Option<&str>,
        semester: Option<&str>,
    ) -> PortResult<Profile> {
        if let Some(existing) = self.find(user.id).await? {
            return Ok(existing);
        }
        let row = to_row(&json!({
            "id": user.id,
            "email": user.email,
            "full_name": full_name.map(str::trim).filter(|s| !s.is_empty()),
            "semester": semester.map(str::trim).filter(|s| !s.is_empty()),
            "role": Role::Student,
            "updated_at": Utc::now(),
        }))?;
        let profile: Profile = from_row(self.rows.insert(PROFILES_TABLE, row).await?)?;
        info!(user_id = %profile.id, "Profile created");
        Ok(profile)
    }

    pub async fn update(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<Profile> {
        let update = ProfileUpdate {
            full_name: update.full_name.map(|s| s.trim().to_string()),
            semester: update.semester.map(|s| s.trim().to_string()),
        };
        if update.full_name.as_deref() == Some("") {
            return Err(PortError::Validation("name cannot be empty".to_string()));
        }
        if update.semester.as_deref() == Some("") {
            return Err(PortError::Validation("semester cannot be empty".to_string()));
        }

        let mut patch = to_row(&update)?;
        if patch.is_empty() {
            return Err(PortError::Validation("nothing to update".to_string()));
        }
        patch.insert("updated_at".to_string(), json!(Utc::now()));
        from_row(self.rows.update(PROFILES_TABLE, user_id, patch).await?)
    }

    /// Stores a new avatar image and points the profile at it.
    pub async fn upload_avatar(&self, user_id: Uuid, file_name: &str, bytes: Bytes) -> PortResult<Profile> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| AVATAR_EXTENSIONS.contains(&ext.as_str()))
            .ok_or_else(|| {
                PortError::Validation("avatar must be a png, jpg, gif or webp image".to_string())
            })?;
        if bytes.is_empty() {
            return Err(PortError::Validation("avatar file is empty".to_string()));
        }
        if bytes.len() > MAX_AVATAR_BYTES {
            return Err(PortError::Validation("avatar must be 2 MB or smaller".to_string()));
        }

        let path = format!("{}/avatar.{}", user_id, extension);
        let url = self.storage.upload_file(AVATAR_BUCKET, &path, bytes).await?;
        let patch = to_row(&json!({ "avatar_url": url, "updated_at": Utc::now() }))?;
        from_row(self.rows.update(PROFILES_TABLE, user_id, patch).await?)
    }

    /// The caller's profile, if it carries the admin role.
    pub async fn require_admin(&self, user_id: Uuid) -> PortResult<Profile> {
        let profile = self.get(user_id).await?;
        if !profile.is_admin() {
            return Err(PortError::Forbidden("administrator access required".to_string()));
        }
        Ok(profile)
    }

    pub(crate) async fn set_role(&self, user_id: Uuid, role: Role) -> PortResult<Profile> {
        let patch = to_row(&json!({ "role": role, "updated_at": Utc::now() }))?;
        from_row(self.rows.update(PROFILES_TABLE, user_id, patch).await?)
    }
}
