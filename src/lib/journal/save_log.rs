//! Ordered, resumable record of the writes one save consists of.
//!
//! A save touches several endpoints one after another and the backend offers
//! no transaction across them. The log remembers which steps already went
//! through, so a retry after a failure continues at the first step that did
//! not.
use std::fmt;

use log::{debug, warn};

use super::{
    error::JournalError,
    journal_api::JournalApi,
    models::lesson_model::{BulkAttendance, GradeUpsert, LessonPatch},
};

#[derive(Debug, Clone, PartialEq)]
pub enum SaveStep {
    Attendance(BulkAttendance),
    Grade(GradeUpsert),
    Status(LessonPatch),
    Topic(LessonPatch),
}

impl SaveStep {
    async fn run<A: JournalApi>(&self, api: &A) -> Result<(), JournalError> {
        match self {
            SaveStep::Attendance(bulk) => api.save_attendance_bulk(bulk).await,
            SaveStep::Grade(grade) => api.upsert_grade(grade).await,
            SaveStep::Status(patch) | SaveStep::Topic(patch) => api.patch_lesson(patch).await,
        }
    }
}

impl fmt::Display for SaveStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveStep::Attendance(bulk) => write!(
                f,
                "attendance of lesson {} ({} records)",
                bulk.lesson_id,
                bulk.records.len()
            ),
            SaveStep::Grade(grade) => write!(
                f,
                "grade {} of student {} in lesson {}",
                grade.grade.value(),
                grade.student_id,
                grade.lesson_id
            ),
            SaveStep::Status(patch) => write!(f, "status of lesson {}", patch.lesson_id),
            SaveStep::Topic(patch) => write!(f, "topic of lesson {}", patch.lesson_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggedStep {
    pub step: SaveStep,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SaveLog {
    steps: Vec<LoggedStep>,
}

impl SaveLog {
    pub fn new(steps: Vec<SaveStep>) -> Self {
        SaveLog {
            steps: steps
                .into_iter()
                .map(|step| LoggedStep {
                    step,
                    completed: false,
                })
                .collect(),
        }
    }

    /// Marks as done every step that already succeeded, with the same payload,
    /// in `previous`.
    pub fn resume_from(mut self, previous: &SaveLog) -> Self {
        for logged in self.steps.iter_mut() {
            logged.completed = previous
                .steps
                .iter()
                .any(|old| old.completed && old.step == logged.step);
        }
        self
    }

    pub fn steps(&self) -> &[LoggedStep] {
        &self.steps
    }

    pub fn pending(&self) -> impl Iterator<Item = &SaveStep> {
        self.steps
            .iter()
            .filter(|logged| !logged.completed)
            .map(|logged| &logged.step)
    }

    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|logged| logged.completed)
    }

    /// Runs the pending steps in order and stops at the first failure.
    pub async fn run<A: JournalApi>(&mut self, api: &A) -> Result<(), JournalError> {
        for logged in self.steps.iter_mut().filter(|logged| !logged.completed) {
            debug!("Saving {}", logged.step);
            if let Err(e) = logged.step.run(api).await {
                warn!("Saving {} failed: {}", logged.step, e);
                return Err(JournalError::SaveStep {
                    step: logged.step.to_string(),
                    source: Box::new(e),
                });
            }
            logged.completed = true;
        }
        Ok(())
    }
}
