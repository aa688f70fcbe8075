//! crates/campus_portal_core/src/attendance.rs
//!
//! Attendance tracking: subject schedules, daily marks, and the statistics derived
//! from them. Percentages are never stored; every summary is recomputed from the
//! raw records.

use crate::domain::{AttendanceRecord, AttendanceStatus, ClassType, SubjectSchedule};
use crate::ports::{PortError, PortResult, RowStore};
use crate::query::{from_row, from_rows, to_row, Direction, RowQuery};
use chrono::{Datelike, NaiveDate, Utc, Weekday};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

pub const SUBJECT_SCHEDULES_TABLE: &str = "subject_schedules";
pub const ATTENDANCE_TABLE: &str = "attendance_records";

/// Columns that identify one attendance record.
pub const ATTENDANCE_UPSERT_KEY: [&str; 4] = ["student_id", "subject", "date", "class_type"];

pub const MAX_WEEKLY_CLASSES: u32 = 20;

/// The summary cache is cleared once it holds this many entries.
const MAX_CACHED_SUMMARIES: usize = 1024;

//=========================================================================================
// Statistics
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubjectStats {
    pub present: u32,
    pub absent: u32,
    pub total: u32,
    pub percentage: u32,
    pub expected: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyStats {
    pub percentage: u32,
    pub present: u32,
    pub total: u32,
}

/// Display bucket for a percentage: green, yellow or red.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceBadge {
    Good,
    Warning,
    Critical,
}

impl AttendanceBadge {
    pub fn from_percentage(percentage: u32) -> Self {
        if percentage >= 75 {
            AttendanceBadge::Good
        } else if percentage >= 50 {
            AttendanceBadge::Warning
        } else {
            AttendanceBadge::Critical
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            AttendanceBadge::Good => "green",
            AttendanceBadge::Warning => "yellow",
            AttendanceBadge::Critical => "red",
        }
    }
}

fn ratio_percentage(numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return 0;
    }
    (f64::from(numerator) / f64::from(denominator) * 100.0).round() as u32
}

/// First day of the month `date` falls in.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Whole weeks from `anchor` to `as_of`, plus one, never less than one.
pub fn weeks_elapsed(anchor: NaiveDate, as_of: NaiveDate) -> u32 {
    let weeks = (as_of - anchor).num_days().div_euclid(7) + 1;
    weeks.max(1) as u32
}

/// Per-subject stats. `expected` counts the classes that should have happened by
/// `as_of`, anchored at the subject's earliest record or, without records, at the
/// start of `as_of`'s month.
pub fn compute_subject_stats(
    schedule: &SubjectSchedule,
    records: &[AttendanceRecord],
    as_of: NaiveDate,
) -> SubjectStats {
    let subject_records: Vec<&AttendanceRecord> = records
        .iter()
        .filter(|r| r.subject == schedule.subject && r.class_type == schedule.class_type)
        .collect();

    let total = subject_records.len() as u32;
    let present = subject_records
        .iter()
        .filter(|r| r.status.counts_as_attended())
        .count() as u32;
    let absent = subject_records
        .iter()
        .filter(|r| r.status == AttendanceStatus::Absent)
        .count() as u32;

    let anchor = subject_records
        .iter()
        .map(|r| r.date)
        .min()
        .unwrap_or_else(|| month_start(as_of));
    let expected = schedule
        .weekly_classes
        .saturating_mul(weeks_elapsed(anchor, as_of));

    SubjectStats {
        present,
        absent,
        total,
        percentage: ratio_percentage(present, expected),
        expected,
    }
}

/// `total` is the number of subjects scheduled today, `present` the attended marks.
pub fn compute_today_stats(
    schedules_for_today: &[SubjectSchedule],
    records_for_today: &[AttendanceRecord],
) -> DailyStats {
    let total = schedules_for_today.len() as u32;
    let present = records_for_today
        .iter()
        .filter(|r| r.status.counts_as_attended())
        .count() as u32;
    DailyStats {
        percentage: ratio_percentage(present, total),
        present,
        total,
    }
}

pub fn compute_overall_stats(records: &[AttendanceRecord]) -> DailyStats {
    let total = records.len() as u32;
    let present = records
        .iter()
        .filter(|r| r.status.counts_as_attended())
        .count() as u32;
    DailyStats {
        percentage: ratio_percentage(present, total),
        present,
        total,
    }
}

//=========================================================================================
// Service inputs and outputs
//=========================================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NewSubject {
    pub subject: String,
    pub weekly_classes: u32,
    pub class_type: ClassType,
    pub semester: String,
    #[serde(default)]
    pub day_of_week: Option<Weekday>,
}

/// One day's status for one subject. Class type and semester default to the schedule's.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkAttendance {
    pub subject: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub class_type: Option<ClassType>,
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectSummary {
    pub schedule: SubjectSchedule,
    pub stats: SubjectStats,
    pub badge: AttendanceBadge,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceSummary {
    pub semester: String,
    pub as_of: NaiveDate,
    pub subjects: Vec<SubjectSummary>,
    pub today: DailyStats,
    pub overall: DailyStats,
    pub overall_badge: AttendanceBadge,
}

type SummaryKey = (Uuid, String, NaiveDate);

//=========================================================================================
// AttendanceService
//=========================================================================================

pub struct AttendanceService {
    rows: Arc<dyn RowStore>,
    summaries: Mutex<HashMap<SummaryKey, AttendanceSummary>>,
}

impl AttendanceService {
    pub fn new(rows: Arc<dyn RowStore>) -> Self {
        Self {
            rows,
            summaries: Mutex::new(HashMap::new()),
        }
    }

    /// Adds a subject to the student's active schedule.
    pub async fn add_subject(&self, student_id: Uuid, new: NewSubject) -> PortResult<SubjectSchedule> {
        let subject = new.subject.trim();
        if subject.is_empty() {
            return Err(PortError::Validation("subject name is required".to_string()));
        }
        if new.semester.trim().is_empty() {
            return Err(PortError::Validation("semester is required".to_string()));
        }
        if !(1..=MAX_WEEKLY_CLASSES).contains(&new.weekly_classes) {
            return Err(PortError::Validation(format!(
                "weekly classes must be between 1 and {}",
                MAX_WEEKLY_CLASSES
            )));
        }

        let duplicate = self
            .active_schedules(student_id, subject)
            .await?
            .into_iter()
            .any(|s| s.class_type == new.class_type);
        if duplicate {
            return Err(PortError::Rule(format!("'{}' is already on your schedule", subject)));
        }

        let row = to_row(&json!({
            "student_id": student_id,
            "subject": subject,
            "weekly_classes": new.weekly_classes,
            "class_type": new.class_type,
            "semester": new.semester.trim(),
            "day_of_week": new.day_of_week,
            "is_active": true,
        }))?;
        let schedule: SubjectSchedule = from_row(self.rows.insert(SUBJECT_SCHEDULES_TABLE, row).await?)?;
        info!(student_id = %student_id, subject = %schedule.subject, "Subject added to schedule");
        self.invalidate(student_id);
        Ok(schedule)
    }

    /// Deactivates a schedule. Attendance rows for the subject are left untouched.
    pub async fn remove_subject(&self, student_id: Uuid, schedule_id: Uuid) -> PortResult<()> {
        let rows = self
            .rows
            .query(RowQuery::new(SUBJECT_SCHEDULES_TABLE).eq("id", schedule_id)?)
            .await?;
        let schedule: SubjectSchedule = match rows.into_iter().next() {
            Some(row) => from_row(row)?,
            None => return Err(PortError::NotFound(format!("Subject {} not found", schedule_id))),
        };
        if schedule.student_id != student_id {
            return Err(PortError::Forbidden("subject belongs to another student".to_string()));
        }

        self.rows
            .update(
                SUBJECT_SCHEDULES_TABLE,
                schedule_id,
                to_row(&json!({ "is_active": false }))?,
            )
            .await?;
        info!(student_id = %student_id, subject = %schedule.subject, "Subject deactivated");
        self.invalidate(student_id);
        Ok(())
    }

    /// Active schedules, optionally narrowed to one semester, ordered by subject name.
    pub async fn list_subjects(
        &self,
        student_id: Uuid,
        semester: Option<&str>,
    ) -> PortResult<Vec<SubjectSchedule>> {
        let mut query = RowQuery::new(SUBJECT_SCHEDULES_TABLE)
            .eq("student_id", student_id)?
            .eq("is_active", true)?;
        if let Some(semester) = semester {
            query = query.eq("semester", semester)?;
        }
        let rows = self
            .rows
            .query(query.order_by("subject", Direction::Asc))
            .await?;
        from_rows(rows)
    }

    async fn active_schedules(&self, student_id: Uuid, subject: &str) -> PortResult<Vec<SubjectSchedule>> {
        let rows = self
            .rows
            .query(
                RowQuery::new(SUBJECT_SCHEDULES_TABLE)
                    .eq("student_id", student_id)?
                    .eq("subject", subject)?
                    .eq("is_active", true)?,
            )
            .await?;
        from_rows(rows)
    }

    /// Records one day's status, overwriting any earlier mark for the same key.
    pub async fn mark_attendance(
        &self,
        student_id: Uuid,
        marked_by: Uuid,
        mark: MarkAttendance,
    ) -> PortResult<AttendanceRecord> {
        let result = self.write_mark(student_id, marked_by, mark).await;
        if result.is_ok() {
            self.invalidate(student_id);
        }
        result
    }

    /// Marks every entry concurrently. There is no atomicity across the batch: a
    /// partial failure leaves the successful writes in place and reports one error.
    pub async fn bulk_mark(
        &self,
        student_id: Uuid,
        marked_by: Uuid,
        marks: Vec<MarkAttendance>,
    ) -> PortResult<Vec<AttendanceRecord>> {
        let requested = marks.len();
        let results = join_all(
            marks
                .into_iter()
                .map(|mark| self.write_mark(student_id, marked_by, mark)),
        )
        .await;
        self.invalidate(student_id);

        let mut written = Vec::with_capacity(requested);
        let mut failed = 0;
        for result in results {
            match result {
                Ok(record) => written.push(record),
                Err(e) => {
                    warn!(student_id = %student_id, "Bulk attendance write failed: {}", e);
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            return Err(PortError::Unexpected(format!(
                "{} of {} attendance updates failed",
                failed, requested
            )));
        }
        Ok(written)
    }

    async fn write_mark(
        &self,
        student_id: Uuid,
        marked_by: Uuid,
        mark: MarkAttendance,
    ) -> PortResult<AttendanceRecord> {
        let subject = mark.subject.trim();
        if subject.is_empty() {
            return Err(PortError::Validation("subject name is required".to_string()));
        }

        let schedules = self.active_schedules(student_id, subject).await?;
        let schedule = match mark.class_type {
            Some(class_type) => schedules.iter().find(|s| s.class_type == class_type),
            None if schedules.len() > 1 => {
                return Err(PortError::Validation(format!(
                    "'{}' has both theory and lab classes; choose a class type",
                    subject
                )))
            }
            None => schedules.first(),
        }
        .ok_or_else(|| {
            PortError::Rule(format!("'{}' is not one of your active subjects", subject))
        })?;

        let row = to_row(&json!({
            "student_id": student_id,
            "subject": schedule.subject,
            "date": mark.date,
            "status": mark.status,
            "class_type": schedule.class_type,
            "semester": mark.semester.unwrap_or_else(|| schedule.semester.clone()),
            "marked_by": marked_by,
            "notes": mark.notes,
            "updated_at": Utc::now(),
        }))?;
        let record = self
            .rows
            .upsert(ATTENDANCE_TABLE, row, &ATTENDANCE_UPSERT_KEY)
            .await?;
        from_row(record)
    }

    /// All of a student's records, oldest first.
    pub async fn records(&self, student_id: Uuid) -> PortResult<Vec<AttendanceRecord>> {
        let rows = self
            .rows
            .query(
                RowQuery::new(ATTENDANCE_TABLE)
                    .eq("student_id", student_id)?
                    .order_by("date", Direction::Asc),
            )
            .await?;
        from_rows(rows)
    }

    /// Per-subject, today and all-time statistics for one semester.
    pub async fn summary(
        &self,
        student_id: Uuid,
        semester: &str,
        today: NaiveDate,
    ) -> PortResult<AttendanceSummary> {
        let key = (student_id, semester.to_string(), today);
        if let Some(cached) = self.lock_summaries().get(&key) {
            return Ok(cached.clone());
        }

        let schedules = self.list_subjects(student_id, Some(semester)).await?;
        let records = self.records(student_id).await?;
        let semester_records: Vec<AttendanceRecord> = records
            .iter()
            .filter(|r| r.semester == semester)
            .cloned()
            .collect();

        let subjects = schedules
            .iter()
            .map(|schedule| {
                let stats = compute_subject_stats(schedule, &semester_records, today);
                let badge = AttendanceBadge::from_percentage(stats.percentage);
                SubjectSummary {
                    schedule: schedule.clone(),
                    stats,
                    badge,
                    color: badge.color(),
                }
            })
            .collect();

        let schedules_today: Vec<SubjectSchedule> = schedules
            .iter()
            .filter(|s| s.day_of_week == Some(today.weekday()))
            .cloned()
            .collect();
        let records_today: Vec<AttendanceRecord> = semester_records
            .iter()
            .filter(|r| {
                r.date == today
                    && schedules_today
                        .iter()
                        .any(|s| s.subject == r.subject && s.class_type == r.class_type)
            })
            .cloned()
            .collect();
        let overall = compute_overall_stats(&records);

        let summary = AttendanceSummary {
            semester: semester.to_string(),
            as_of: today,
            subjects,
            today: compute_today_stats(&schedules_today, &records_today),
            overall,
            overall_badge: AttendanceBadge::from_percentage(overall.percentage),
        };
        let mut cache = self.lock_summaries();
        cache.retain(|(_, _, date), _| *date >= today);
        if cache.len() >= MAX_CACHED_SUMMARIES {
            cache.clear();
        }
        cache.insert(key, summary.clone());
        Ok(summary)
    }

    fn lock_summaries(&self) -> std::sync::MutexGuard<'_, HashMap<SummaryKey, AttendanceSummary>> {
        self.summaries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn invalidate(&self, student_id: Uuid) {
        self.lock_summaries().retain(|(owner, _, _), _| *owner != student_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryRowStore;
    use chrono::{DateTime, TimeZone};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, 8, 0, 0).unwrap()
    }

    fn schedule(subject: &str, weekly_classes: u32) -> SubjectSchedule {
        SubjectSchedule {
            id: Uuid::new_v4(),
            student_id: Uuid::nil(),
            subject: subject.to_string(),
            weekly_classes,
            class_type: ClassType::Theory,
            semester: "5th".to_string(),
            day_of_week: None,
            is_active: true,
            created_at: created(),
        }
    }

    fn record(subject: &str, on: NaiveDate, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            id: Uuid::new_v4(),
            student_id: Uuid::nil(),
            subject: subject.to_string(),
            date: on,
            status,
            class_type: ClassType::Theory,
            semester: "5th".to_string(),
            marked_by: None,
            notes: None,
            updated_at: created(),
        }
    }

    fn mark(subject: &str, on: NaiveDate, status: AttendanceStatus) -> MarkAttendance {
        MarkAttendance {
            subject: subject.to_string(),
            date: on,
            status,
            class_type: None,
            semester: None,
            notes: None,
        }
    }

    fn new_subject(subject: &str, weekly_classes: u32, day: Option<Weekday>) -> NewSubject {
        NewSubject {
            subject: subject.to_string(),
            weekly_classes,
            class_type: ClassType::Theory,
            semester: "5th".to_string(),
            day_of_week: day,
        }
    }

    #[test]
    fn no_records_gives_zero_percent_and_at_least_one_week() {
        for n in 1..=MAX_WEEKLY_CLASSES {
            let stats = compute_subject_stats(&schedule("Maths", n), &[], date(2026, 10, 1));
            assert_eq!(stats.percentage, 0);
            assert!(stats.expected >= n);
            assert_eq!(stats.total, 0);
        }
    }

    #[test]
    fn anchor_defaults_to_month_start() {
        // Oct 1 .. Oct 17 is 16 days: 2 whole weeks, plus one.
        let stats = compute_subject_stats(&schedule("Maths", 2), &[], date(2026, 10, 17));
        assert_eq!(stats.expected, 6);
    }

    #[test]
    fn expected_classes_anchor_at_earliest_record() {
        let records = vec![
            record("Maths", date(2026, 9, 7), AttendanceStatus::Present),
            record("Maths", date(2026, 9, 14), AttendanceStatus::Late),
            record("Maths", date(2026, 9, 15), AttendanceStatus::Absent),
            record("Physics", date(2026, 8, 1), AttendanceStatus::Present),
        ];
        let stats = compute_subject_stats(&schedule("Maths", 2), &records, date(2026, 9, 20));

        // Sep 7 .. Sep 20 is 13 days: 1 whole week, plus one.
        assert_eq!(stats.expected, 4);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.present, 2);
        assert_eq!(stats.absent, 1);
        assert_eq!(stats.percentage, 50);
    }

    #[test]
    fn zero_weekly_classes_yields_zero_percent() {
        let records = vec![record("Maths", date(2026, 9, 7), AttendanceStatus::Present)];
        let stats = compute_subject_stats(&schedule("Maths", 0), &records, date(2026, 9, 8));
        assert_eq!(stats.expected, 0);
        assert_eq!(stats.percentage, 0);
    }

    #[test]
    fn extra_present_record_never_lowers_percentage() {
        let sched = schedule("Maths", 3);
        let mut records = vec![
            record("Maths", date(2026, 9, 1), AttendanceStatus::Present),
            record("Maths", date(2026, 9, 2), AttendanceStatus::Absent),
        ];
        let as_of = date(2026, 9, 30);
        let mut previous = compute_subject_stats(&sched, &records, as_of).percentage;
        for day in 3..=28 {
            records.push(record("Maths", date(2026, 9, day), AttendanceStatus::Present));
            let current = compute_subject_stats(&sched, &records, as_of).percentage;
            assert!(current >= previous, "{} dropped to {}", previous, current);
            previous = current;
        }
    }

    #[test]
    fn today_stats_count_scheduled_subjects() {
        let today = vec![schedule("Maths", 3), schedule("Physics", 2)];
        let marks = vec![record("Maths", date(2026, 10, 5), AttendanceStatus::Present)];
        assert_eq!(
            compute_today_stats(&today, &marks),
            DailyStats {
                percentage: 50,
                present: 1,
                total: 2
            }
        );
        assert_eq!(compute_today_stats(&[], &[]).percentage, 0);
    }

    #[test]
    fn overall_stats_treat_late_as_present() {
        let records = vec![
            record("Maths", date(2026, 9, 1), AttendanceStatus::Present),
            record("Maths", date(2026, 9, 2), AttendanceStatus::Late),
            record("Physics", date(2026, 9, 2), AttendanceStatus::Absent),
        ];
        assert_eq!(
            compute_overall_stats(&records),
            DailyStats {
                percentage: 67,
                present: 2,
                total: 3
            }
        );
    }

    #[test]
    fn badges_follow_thresholds() {
        assert_eq!(AttendanceBadge::from_percentage(100), AttendanceBadge::Good);
        assert_eq!(AttendanceBadge::from_percentage(75), AttendanceBadge::Good);
        assert_eq!(AttendanceBadge::from_percentage(74), AttendanceBadge::Warning);
        assert_eq!(AttendanceBadge::from_percentage(50), AttendanceBadge::Warning);
        assert_eq!(AttendanceBadge::from_percentage(49), AttendanceBadge::Critical);
        assert_eq!(AttendanceBadge::Critical.color(), "red");
    }

    fn lab(subject: &str, weekly_classes: u32, day: Option<Weekday>) -> NewSubject {
        NewSubject {
            class_type: ClassType::Lab,
            ..new_subject(subject, weekly_classes, day)
        }
    }

    #[tokio::test]
    async fn theory_and_lab_of_one_subject_are_counted_apart() {
        let service = AttendanceService::new(Arc::new(InMemoryRowStore::default()));
        let student = Uuid::new_v4();
        service.add_subject(student, new_subject("Maths", 3, None)).await.unwrap();
        service.add_subject(student, lab("Maths", 1, None)).await.unwrap();

        let on = date(2026, 10, 5);
        service
            .mark_attendance(
                student,
                student,
                MarkAttendance {
                    class_type: Some(ClassType::Theory),
                    ..mark("Maths", on, AttendanceStatus::Present)
                },
            )
            .await
            .unwrap();

        let summary = service.summary(student, "5th", on).await.unwrap();
        let stats_for = |class_type: ClassType| {
            summary
                .subjects
                .iter()
                .find(|s| s.schedule.class_type == class_type)
                .map(|s| s.stats)
                .unwrap()
        };
        assert_eq!(stats_for(ClassType::Theory).present, 1);
        assert_eq!(stats_for(ClassType::Lab).total, 0);
        assert_eq!(stats_for(ClassType::Lab).present, 0);
    }

    #[tokio::test]
    async fn mark_without_class_type_is_ambiguous_for_theory_and_lab() {
        let store = Arc::new(InMemoryRowStore::default());
        let service = AttendanceService::new(store.clone());
        let student = Uuid::new_v4();
        service.add_subject(student, new_subject("Maths", 3, None)).await.unwrap();
        service.add_subject(student, lab("Maths", 1, None)).await.unwrap();

        let err = service
            .mark_attendance(student, student, mark("Maths", date(2026, 10, 5), AttendanceStatus::Present))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
        assert!(store.rows(ATTENDANCE_TABLE).is_empty());

        let record = service
            .mark_attendance(
                student,
                student,
                MarkAttendance {
                    class_type: Some(ClassType::Lab),
                    ..mark("Maths", date(2026, 10, 5), AttendanceStatus::Present)
                },
            )
            .await
            .unwrap();
        assert_eq!(record.class_type, ClassType::Lab);
    }

    #[tokio::test]
    async fn off_day_marks_do_not_count_toward_today() {
        let service = AttendanceService::new(Arc::new(InMemoryRowStore::default()));
        let student = Uuid::new_v4();
        let monday = date(2026, 10, 5);
        service
            .add_subject(student, new_subject("Maths", 3, Some(Weekday::Mon)))
            .await
            .unwrap();
        service
            .add_subject(student, new_subject("Physics", 2, Some(Weekday::Fri)))
            .await
            .unwrap();
        for subject in ["Maths", "Physics"] {
            service
                .mark_attendance(student, student, mark(subject, monday, AttendanceStatus::Present))
                .await
                .unwrap();
        }

        let summary = service.summary(student, "5th", monday).await.unwrap();
        assert_eq!(
            summary.today,
            DailyStats {
                percentage: 100,
                present: 1,
                total: 1
            }
        );
        assert_eq!(summary.overall.total, 2);
    }

    #[tokio::test]
    async fn summaries_for_past_days_are_evicted() {
        let service = AttendanceService::new(Arc::new(InMemoryRowStore::default()));
        let reader = Uuid::new_v4();
        let other = Uuid::new_v4();
        service.add_subject(reader, new_subject("Maths", 3, None)).await.unwrap();

        service.summary(reader, "5th", date(2026, 10, 5)).await.unwrap();
        service.summary(other, "5th", date(2026, 10, 6)).await.unwrap();

        let cache = service.lock_summaries();
        assert_eq!(cache.len(), 1);
        assert!(cache.keys().all(|(_, _, day)| *day == date(2026, 10, 6)));
    }

    #[tokio::test]
    async fn subject_summary_carries_badge_color() {
        let service = AttendanceService::new(Arc::new(InMemoryRowStore::default()));
        let student = Uuid::new_v4();
        service.add_subject(student, new_subject("Maths", 3, None)).await.unwrap();

        let summary = service.summary(student, "5th", date(2026, 10, 5)).await.unwrap();
        assert_eq!(summary.subjects[0].badge, AttendanceBadge::Critical);
        assert_eq!(summary.subjects[0].color, "red");
    }

    #[tokio::test]
    async fn repeated_mark_keeps_one_record() {
        let store = Arc::new(InMemoryRowStore::default());
        let service = AttendanceService::new(store.clone());
        let student = Uuid::new_v4();
        service.add_subject(student, new_subject("Maths", 3, None)).await.unwrap();

        let on = date(2026, 10, 5);
        service
            .mark_attendance(student, student, mark("Maths", on, AttendanceStatus::Present))
            .await
            .unwrap();
        let first = service.summary(student, "5th", on).await.unwrap();
        service
            .mark_attendance(student, student, mark("Maths", on, AttendanceStatus::Present))
            .await
            .unwrap();
        let second = service.summary(student, "5th", on).await.unwrap();

        assert_eq!(store.rows(ATTENDANCE_TABLE).len(), 1);
        assert_eq!(first.subjects[0].stats, second.subjects[0].stats);
        assert_eq!(second.subjects[0].stats.total, 1);
    }

    #[tokio::test]
    async fn second_mark_overwrites_status() {
        let store = Arc::new(InMemoryRowStore::default());
        let service = AttendanceService::new(store.clone());
        let student = Uuid::new_v4();
        service.add_subject(student, new_subject("Maths", 3, None)).await.unwrap();

        let on = date(2026, 10, 5);
        service
            .mark_attendance(student, student, mark("Maths", on, AttendanceStatus::Present))
            .await
            .unwrap();
        let latest = service
            .mark_attendance(student, student, mark("Maths", on, AttendanceStatus::Absent))
            .await
            .unwrap();

        let records = service.records(student).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AttendanceStatus::Absent);
        assert_eq!(records[0].id, latest.id);
    }

    #[tokio::test]
    async fn marking_unscheduled_subject_is_rejected() {
        let store = Arc::new(InMemoryRowStore::default());
        let service = AttendanceService::new(store.clone());
        let student = Uuid::new_v4();

        let err = service
            .mark_attendance(student, student, mark("Chemistry", date(2026, 10, 5), AttendanceStatus::Present))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Rule(_)));
        assert!(store.rows(ATTENDANCE_TABLE).is_empty());
    }

    #[tokio::test]
    async fn removed_subject_keeps_history_but_blocks_marking() {
        let store = Arc::new(InMemoryRowStore::default());
        let service = AttendanceService::new(store.clone());
        let student = Uuid::new_v4();
        let sched = service.add_subject(student, new_subject("Maths", 3, None)).await.unwrap();
        service
            .mark_attendance(student, student, mark("Maths", date(2026, 10, 5), AttendanceStatus::Present))
            .await
            .unwrap();

        service.remove_subject(student, sched.id).await.unwrap();

        assert!(service.list_subjects(student, None).await.unwrap().is_empty());
        let records = service.records(student).await.unwrap();
        assert_eq!(records.len(), 1);
        let stats = compute_subject_stats(&sched, &records, date(2026, 10, 5));
        assert_eq!(stats.present, 1);

        let err = service
            .mark_attendance(student, student, mark("Maths", date(2026, 10, 6), AttendanceStatus::Present))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Rule(_)));
    }

    #[tokio::test]
    async fn only_owner_can_remove_subject() {
        let service = AttendanceService::new(Arc::new(InMemoryRowStore::default()));
        let owner = Uuid::new_v4();
        let sched = service.add_subject(owner, new_subject("Maths", 3, None)).await.unwrap();

        let err = service.remove_subject(Uuid::new_v4(), sched.id).await.unwrap_err();
        assert!(matches!(err, PortError::Forbidden(_)));
        let err = service.remove_subject(owner, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn weekly_classes_are_bounded() {
        let service = AttendanceService::new(Arc::new(InMemoryRowStore::default()));
        let student = Uuid::new_v4();
        for bad in [0, MAX_WEEKLY_CLASSES + 1] {
            let err = service
                .add_subject(student, new_subject("Maths", bad, None))
                .await
                .unwrap_err();
            assert!(matches!(err, PortError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn summary_is_refreshed_after_marking() {
        let store = Arc::new(InMemoryRowStore::default());
        let service = AttendanceService::new(store.clone());
        let student = Uuid::new_v4();
        let monday = date(2026, 10, 5);
        service
            .add_subject(student, new_subject("Maths", 3, Some(Weekday::Mon)))
            .await
            .unwrap();
        service
            .add_subject(student, new_subject("Physics", 2, Some(Weekday::Mon)))
            .await
            .unwrap();
        service
            .add_subject(student, new_subject("Biology", 1, Some(Weekday::Fri)))
            .await
            .unwrap();

        let before = service.summary(student, "5th", monday).await.unwrap();
        assert_eq!(before.today.total, 2);
        assert_eq!(before.today.present, 0);

        service
            .mark_attendance(student, student, mark("Maths", monday, AttendanceStatus::Present))
            .await
            .unwrap();
        let after = service.summary(student, "5th", monday).await.unwrap();
        assert_eq!(
            after.today,
            DailyStats {
                percentage: 50,
                present: 1,
                total: 2
            }
        );
        assert_eq!(after.overall.total, 1);
        assert_eq!(after.subjects.len(), 3);
    }

    #[tokio::test]
    async fn bulk_mark_reports_partial_failure() {
        let store = Arc::new(InMemoryRowStore::default());
        let service = AttendanceService::new(store.clone());
        let student = Uuid::new_v4();
        service.add_subject(student, new_subject("Maths", 3, None)).await.unwrap();
        service.add_subject(student, new_subject("Physics", 2, None)).await.unwrap();
        *store.fail_subject.lock().unwrap() = Some("Physics".to_string());

        let on = date(2026, 10, 5);
        let err = service
            .bulk_mark(
                student,
                student,
                vec![
                    mark("Maths", on, AttendanceStatus::Present),
                    mark("Physics", on, AttendanceStatus::Present),
                ],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::Unexpected(_)));
        assert_eq!(store.rows(ATTENDANCE_TABLE).len(), 1);
    }

    #[tokio::test]
    async fn bulk_mark_writes_every_entry() {
        let store = Arc::new(InMemoryRowStore::default());
        let service = AttendanceService::new(store.clone());
        let student = Uuid::new_v4();
        service.add_subject(student, new_subject("Maths", 3, None)).await.unwrap();
        service.add_subject(student, new_subject("Physics", 2, None)).await.unwrap();

        let on = date(2026, 10, 5);
        let written = service
            .bulk_mark(
                student,
                student,
                vec![
                    mark("Maths", on, AttendanceStatus::Present),
                    mark("Physics", on, AttendanceStatus::Late),
                ],
            )
            .await
            .unwrap();
        assert_eq!(written.len(), 2);
    }
}
