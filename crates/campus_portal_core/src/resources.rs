//! crates/campus_portal_core/src/resources.rs
//!
//! Semester-filtered browsing of question papers, notes, syllabus, lab manuals,
//! events, organizers and MAR support, plus the administrator write paths.

use crate::domain::{Profile, Resource, ResourceKind};
use crate::ports::{ObjectStorage, PortError, PortResult, RowStore};
use crate::query::{from_row, from_rows, to_row, Direction, RowQuery};
use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Semester value for resources shown to every semester.
pub const ALL_SEMESTERS: &str = "all";
pub const MAX_RESOURCE_FILE_BYTES: usize = 10 * 1024 * 1024;

const RESOURCE_FILE_EXTENSIONS: [&str; 6] = ["pdf", "png", "jpg", "jpeg", "webp", "docx"];

#[derive(Debug, Clone, Deserialize)]
pub struct NewResource {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub semester: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub event_date: Option<NaiveDate>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

fn require_admin(actor: &Profile) -> PortResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(PortError::Forbidden("only administrators can manage resources".to_string()))
    }
}

/// Keeps ASCII letters, digits, dots, dashes and underscores.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

pub struct ResourceService {
    rows: Arc<dyn RowStore>,
    storage: Arc<dyn ObjectStorage>,
}

impl ResourceService {
    pub fn new(rows: Arc<dyn RowStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { rows, storage }
    }

    /// Lists resources of one kind. With a semester, only that semester's entries and
    /// the ones published for all semesters are returned. Events come soonest first,
    /// everything else newest first.
    pub async fn list(&self, kind: ResourceKind, semester: Option<&str>) -> PortResult<Vec<Resource>> {
        let mut query = RowQuery::new(kind.table());
        if let Some(semester) = semester.map(str::trim).filter(|s| !s.is_empty()) {
            query = query.any_eq(vec![("semester", semester), ("semester", ALL_SEMESTERS)])?;
        }
        query = match kind {
            ResourceKind::Event => query.order_by("event_date", Direction::Asc),
            _ => query.order_by("created_at", Direction::Desc),
        };
        from_rows(self.rows.query(query).await?)
    }

    pub async fn get(&self, kind: ResourceKind, id: Uuid) -> PortResult<Resource> {
        let rows = self
            .rows
            .query(RowQuery::new(kind.table()).eq("id", id)?)
            .await?;
        match rows.into_iter().next() {
            Some(row) => from_row(row),
            None => Err(PortError::NotFound(format!("{} {} not found", kind, id))),
        }
    }

    pub async fn create(&self, actor: &Profile, kind: ResourceKind, new: NewResource) -> PortResult<Resource> {
        require_admin(actor)?;
        let title = new.title.trim();
        if title.is_empty() {
            return Err(PortError::Validation("title is required".to_string()));
        }
        let semester = new.semester.trim();
        if semester.is_empty() {
            return Err(PortError::Validation("semester is required".to_string()));
        }
        if kind == ResourceKind::Event && new.event_date.is_none() {
            return Err(PortError::Validation("events need a date".to_string()));
        }

        let row = to_row(&json!({
            "title": title,
            "description": new.description,
            "semester": semester,
            "subject": new.subject,
            "event_date": new.event_date,
            "link": new.link,
            "created_by": actor.id,
        }))?;
        let resource: Resource = from_row(self.rows.insert(kind.table(), row).await?)?;
        info!(kind = %kind, id = %resource.id, "Resource created");
        Ok(resource)
    }

    pub async fn update(
        &self,
        actor: &Profile,
        kind: ResourceKind,
        id: Uuid,
        patch: ResourcePatch,
    ) -> PortResult<Resource> {
        require_admin(actor)?;
        if patch.title.as_deref().map(str::trim) == Some("") {
            return Err(PortError::Validation("title cannot be empty".to_string()));
        }
        if patch.semester.as_deref().map(str::trim) == Some("") {
            return Err(PortError::Validation("semester cannot be empty".to_string()));
        }
        let patch = to_row(&patch)?;
        if patch.is_empty() {
            return Err(PortError::Validation("nothing to update".to_string()));
        }
        from_row(self.rows.update(kind.table(), id, patch).await?)
    }

    /// Deletes the row, then its attached file. A file that cannot be removed is
    /// logged and left behind.
    pub async fn delete(&self, actor: &Profile, kind: ResourceKind, id: Uuid) -> PortResult<()> {
        require_admin(actor)?;
        let resource = self.get(kind, id).await?;
        self.rows.delete(kind.table(), id).await?;
        if let Some(path) = resource.file_path {
            if let Err(e) = self.storage.remove_file(kind.bucket(), &path).await {
                warn!(kind = %kind, id = %id, "Failed to remove resource file {}: {}", path, e);
            }
        }
        info!(kind = %kind, id = %id, "Resource deleted");
        Ok(())
    }

    /// Uploads a PDF or image and attaches it to an existing resource, replacing any
    /// previous file.
    pub async fn attach_file(
        &self,
        actor: &Profile,
        kind: ResourceKind,
        id: Uuid,
        file_name: &str,
        bytes: Bytes,
    ) -> PortResult<Resource> {
        require_admin(actor)?;
        let file_name = sanitize_file_name(file_name);
        let allowed = file_name
            .rsplit_once('.')
            .map(|(_, ext)| RESOURCE_FILE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !allowed {
            return Err(PortError::Validation(
                "file must be a pdf, docx or image".to_string(),
            ));
        }
        if bytes.is_empty() {
            return Err(PortError::Validation("file is empty".to_string()));
        }
        if bytes.len() > MAX_RESOURCE_FILE_BYTES {
            return Err(PortError::Validation("file must be 10 MB or smaller".to_string()));
        }

        let existing = self.get(kind, id).await?;
        let path = format!("{}/{}", id, file_name);
        let url = self.storage.upload_file(kind.bucket(), &path, bytes).await?;
        if let Some(old) = existing.file_path.filter(|old| *old != path) {
            if let Err(e) = self.storage.remove_file(kind.bucket(), &old).await {
                warn!(kind = %kind, id = %id, "Failed to remove replaced file {}: {}", old, e);
            }
        }

        let patch = to_row(&json!({ "file_url": url, "file_path": path }))?;
        from_row(self.rows.update(kind.table(), id, patch).await?)
    }
}
