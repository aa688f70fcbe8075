//! crates/campus_portal_core/src/timetable.rs
//!
//! Study timetable generation. Harder subjects get more sessions per week and each
//! day holds at most two sessions, unless the week is already full.

use crate::domain::{weekday_name, Difficulty, GeneratedTimetableDay, TimetableSubject};
use crate::ports::{PortError, PortResult};
use chrono::Weekday;
use uuid::Uuid;

pub const MAX_SESSIONS_PER_DAY: usize = 2;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Builds a day-by-day plan for the first `study_days` days of the week, from Monday.
///
/// Every subject is repeated by its weekly frequency, the pool is stably sorted
/// hardest-first, and entries are dealt round-robin. When the targeted day is full the
/// next day with room (wrapping) takes the entry instead; the cursor moves on by one
/// either way. If no day has room the entry goes to the targeted day anyway, so
/// sessions are never dropped.
pub fn generate_timetable(subjects: &[TimetableSubject], study_days: usize) -> Vec<GeneratedTimetableDay> {
    let study_days = study_days.min(WEEK.len());
    if study_days == 0 {
        return Vec::new();
    }

    let mut pool: Vec<&TimetableSubject> = subjects
        .iter()
        .flat_map(|subject| std::iter::repeat(subject).take(subject.difficulty.weekly_frequency()))
        .collect();
    pool.sort_by(|a, b| b.difficulty.cmp(&a.difficulty));

    let mut buckets: Vec<Vec<TimetableSubject>> = vec![Vec::new(); study_days];
    for (cursor, subject) in pool.into_iter().enumerate() {
        let target = cursor % study_days;
        let slot = if buckets[target].len() >= MAX_SESSIONS_PER_DAY {
            (1..study_days)
                .map(|offset| (target + offset) % study_days)
                .find(|&i| buckets[i].len() < MAX_SESSIONS_PER_DAY)
                .unwrap_or(target)
        } else {
            target
        };
        buckets[slot].push(subject.clone());
    }

    WEEK.iter()
        .zip(buckets)
        .map(|(day, subjects)| GeneratedTimetableDay {
            day: weekday_name(*day).to_string(),
            subjects,
        })
        .collect()
}

//=========================================================================================
// TimetableDraft (editing state for one generator session)
//=========================================================================================

/// The subjects a user has entered so far. Discarded on reset.
#[derive(Debug, Clone)]
pub struct TimetableDraft {
    subjects: Vec<TimetableSubject>,
    study_days: usize,
}

impl Default for TimetableDraft {
    fn default() -> Self {
        Self {
            subjects: Vec::new(),
            study_days: 5,
        }
    }
}

impl TimetableDraft {
    pub fn subjects(&self) -> &[TimetableSubject] {
        &self.subjects
    }

    pub fn study_days(&self) -> usize {
        self.study_days
    }

    pub fn set_study_days(&mut self, days: usize) -> PortResult<()> {
        if !(1..=WEEK.len()).contains(&days) {
            return Err(PortError::Validation(format!(
                "study days must be between 1 and {}",
                WEEK.len()
            )));
        }
        self.study_days = days;
        Ok(())
    }

    pub fn add_subject(&mut self, name: &str, difficulty: Difficulty) -> PortResult<&TimetableSubject> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PortError::Validation("subject name is required".to_string()));
        }
        if self
            .subjects
            .iter()
            .any(|s| s.name.eq_ignore_ascii_case(name))
        {
            return Err(PortError::Validation(format!("'{}' was already added", name)));
        }
        self.subjects.push(TimetableSubject {
            id: Uuid::new_v4(),
            name: name.to_string(),
            difficulty,
        });
        Ok(&self.subjects[self.subjects.len() - 1])
    }

    pub fn remove_subject(&mut self, id: Uuid) -> bool {
        let before = self.subjects.len();
        self.subjects.retain(|s| s.id != id);
        self.subjects.len() != before
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn generate(&self) -> PortResult<Vec<GeneratedTimetableDay>> {
        if self.subjects.is_empty() {
            return Err(PortError::Validation("add at least one subject".to_string()));
        }
        Ok(generate_timetable(&self.subjects, self.study_days))
    }
}
