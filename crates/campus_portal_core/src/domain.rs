//! crates/campus_portal_core/src/domain.rs
//!
//! Defines the core data structures for the portal.
//! Rows travel through the `RowStore` port as JSON objects, so every persisted
//! type here carries serde derives whose field names match the table columns.

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Attendance
//=========================================================================================

/// The outcome recorded for one class on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    /// Late arrivals count as attended.
    pub fn counts_as_attended(self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassType {
    Theory,
    Lab,
}

/// A subject a student attends, with how often it meets each week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSchedule {
    pub id: Uuid,
    pub student_id: Uuid,
    pub subject: String,
    pub weekly_classes: u32,
    pub class_type: ClassType,
    pub semester: String,
    #[serde(default)]
    pub day_of_week: Option<Weekday>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// One attendance mark. Unique per (student_id, subject, date, class_type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub subject: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub class_type: ClassType,
    pub semester: String,
    #[serde(default)]
    pub marked_by: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

//=========================================================================================
// Timetable
//=========================================================================================

/// How hard a subject is. Ordered so that `Hard` sorts highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Study sessions per week a subject of this difficulty needs.
    pub fn weekly_frequency(self) -> usize {
        match self {
            Difficulty::Hard => 3,
            Difficulty::Medium => 2,
            Difficulty::Easy => 1,
        }
    }
}

/// A subject entered into the timetable generator. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableSubject {
    pub id: Uuid,
    pub name: String,
    pub difficulty: Difficulty,
}

/// One row of a generated timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedTimetableDay {
    pub day: String,
    pub subjects: Vec<TimetableSubject>,
}

/// Full English name of a weekday, as shown in generated timetables.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

//=========================================================================================
// Accounts
//=========================================================================================

/// The identity handed out by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// A signed-in browser session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: AuthUser,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

/// The `profiles` row that sits next to every auth account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

//=========================================================================================
// Academic resources
//=========================================================================================

/// The semester-scoped content an administrator publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    QuestionPaper,
    Note,
    Syllabus,
    LabManual,
    Event,
    Organizer,
    MarSupport,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::QuestionPaper,
        ResourceKind::Note,
        ResourceKind::Syllabus,
        ResourceKind::LabManual,
        ResourceKind::Event,
        ResourceKind::Organizer,
        ResourceKind::MarSupport,
    ];

    /// The table holding rows of this kind.
    pub fn table(self) -> &'static str {
        match self {
            ResourceKind::QuestionPaper => "question_papers",
            ResourceKind::Note => "notes",
            ResourceKind::Syllabus => "syllabus",
            ResourceKind::LabManual => "lab_manuals",
            ResourceKind::Event => "events",
            ResourceKind::Organizer => "organizers",
            ResourceKind::MarSupport => "mar_support",
        }
    }

    /// The storage bucket for files attached to this kind.
    pub fn bucket(self) -> &'static str {
        match self {
            ResourceKind::QuestionPaper => "question-papers",
            ResourceKind::Note => "notes",
            ResourceKind::Syllabus => "syllabus",
            ResourceKind::LabManual => "lab-manuals",
            ResourceKind::Event => "events",
            ResourceKind::Organizer => "organizers",
            ResourceKind::MarSupport => "mar-support",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            ResourceKind::QuestionPaper => "question_paper",
            ResourceKind::Note => "note",
            ResourceKind::Syllabus => "syllabus",
            ResourceKind::LabManual => "lab_manual",
            ResourceKind::Event => "event",
            ResourceKind::Organizer => "organizer",
            ResourceKind::MarSupport => "mar_support",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    /// Accepts the singular slug, the table name, or the bucket name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == wanted || kind.table() == wanted || kind.bucket() == wanted)
            .ok_or_else(|| format!("unknown resource kind '{}'", s))
    }
}

/// A question paper, note, syllabus, lab manual, event, organizer or MAR entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub semester: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub event_date: Option<NaiveDate>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_counts_as_attended() {
        assert!(AttendanceStatus::Present.counts_as_attended());
        assert!(AttendanceStatus::Late.counts_as_attended());
        assert!(!AttendanceStatus::Absent.counts_as_attended());
    }

    #[test]
    fn hard_sorts_above_easy() {
        let mut levels = vec![Difficulty::Easy, Difficulty::Hard, Difficulty::Medium];
        levels.sort_by(|a, b| b.cmp(a));
        assert_eq!(levels, vec![Difficulty::Hard, Difficulty::Medium, Difficulty::Easy]);
    }

    #[test]
    fn resource_kind_parses_every_spelling() {
        assert_eq!("lab_manual".parse::<ResourceKind>(), Ok(ResourceKind::LabManual));
        assert_eq!("lab_manuals".parse::<ResourceKind>(), Ok(ResourceKind::LabManual));
        assert_eq!("lab-manuals".parse::<ResourceKind>(), Ok(ResourceKind::LabManual));
        assert_eq!("Question_Papers".parse::<ResourceKind>(), Ok(ResourceKind::QuestionPaper));
        assert!("homework".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn schedule_reads_from_json_row() {
        let row = serde_json::json!({
            "id": "2b0c8f1e-58a2-4c1a-9d6e-0d8b51f3a111",
            "student_id": "9f7c4b3e-1a2d-4e5f-8a9b-0c1d2e3f4a5b",
            "subject": "Signals",
            "weekly_classes": 4,
            "class_type": "theory",
            "semester": "5th",
            "day_of_week": "Tue",
            "is_active": true,
            "created_at": "2026-09-01T08:00:00+00:00",
        });
        let schedule: SubjectSchedule = serde_json::from_value(row).unwrap();
        assert_eq!(schedule.day_of_week, Some(Weekday::Tue));
        assert_eq!(schedule.class_type, ClassType::Theory);
    }
}
