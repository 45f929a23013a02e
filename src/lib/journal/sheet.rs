//! Working copy of one lesson's attendance, grades, topic and status.
use std::{collections::BTreeMap, sync::Arc};

use log::{debug, info, warn};

use super::{
    cycle::next_attendance,
    error::JournalError,
    journal_api::JournalApi,
    models::{
        lesson_model::{
            AttendanceRecord, AttendanceStatus, BulkAttendance, Grade, GradeRecord, GradeUpsert,
            LessonData, LessonPatch, LessonStatus, Student, StudentId,
        },
        SheetEdit,
    },
    save_log::{SaveLog, SaveStep},
};

pub type AttendanceMap = BTreeMap<StudentId, Option<AttendanceStatus>>;
pub type GradeMap = BTreeMap<StudentId, Option<Grade>>;

/// Every graded student without a mark is present.
/// Returns the students whose mark was filled in.
pub fn present_if_graded(attendance: &mut AttendanceMap, grades: &GradeMap) -> Vec<StudentId> {
    let mut filled = Vec::new();
    for (student_id, grade) in grades.iter() {
        if grade.is_none() {
            continue;
        }
        match attendance.get_mut(student_id) {
            Some(mark) if mark.is_none() => {
                *mark = Some(AttendanceStatus::Present);
                filled.push(*student_id);
            }
            _ => {}
        }
    }
    filled
}

#[derive(Debug, Clone, PartialEq, Default)]
struct SheetState {
    attendance: AttendanceMap,
    grades: GradeMap,
    topic: String,
    status: LessonStatus,
}

impl SheetState {
    fn empty(lesson: &LessonData) -> Self {
        SheetState {
            topic: lesson.topic.clone(),
            status: lesson.status(),
            ..SheetState::default()
        }
    }
}

pub struct LessonSheet<A> {
    api: Arc<A>,
    lesson: LessonData,
    students: Vec<Student>,
    current: SheetState,
    saved: SheetState,
    has_changes: bool,
    save_log: Option<SaveLog>,
}

impl<A: JournalApi> LessonSheet<A> {
    /// An empty, not yet loaded sheet.
    pub fn new(api: Arc<A>, lesson: LessonData) -> Self {
        let state = SheetState::empty(&lesson);
        LessonSheet {
            api,
            lesson,
            students: Vec::new(),
            current: state.clone(),
            saved: state,
            has_changes: false,
            save_log: None,
        }
    }

    /// Opens a sheet and fills it from the backend. Every call fetches anew.
    pub async fn open(api: Arc<A>, lesson: LessonData) -> Self {
        let mut sheet = Self::new(api, lesson);
        sheet.load().await;
        sheet
    }

    /// Like [`Self::try_load`], but a failure leaves an empty sheet behind.
    pub async fn load(&mut self) {
        if let Err(e) = self.try_load().await {
            warn!("Could not load lesson {}: {}", self.lesson.id, e);
            self.students.clear();
            self.current = SheetState::empty(&self.lesson);
            self.saved = self.current.clone();
            self.has_changes = false;
            self.save_log = None;
        }
    }

    pub async fn try_load(&mut self) -> Result<(), JournalError> {
        info!("Loading lesson {}", self.lesson.id);
        let (students, attendance, grades) = self.fetch().await?;

        let mut state = SheetState::empty(&self.lesson);
        state.attendance = students.iter().map(|s| (s.id, None)).collect();
        state.grades = students.iter().map(|s| (s.id, None)).collect();
        for record in attendance
            .into_iter()
            .filter(|r| r.lesson_id.map_or(true, |id| id == self.lesson.id))
        {
            if let Some(mark) = state.attendance.get_mut(&record.student_id) {
                *mark = Some(record.status);
            }
        }
        for record in grades.into_iter().filter(|r| self.grade_belongs_here(r)) {
            if let Some(grade) = state.grades.get_mut(&record.student_id) {
                *grade = Some(record.grade);
            }
        }

        debug!(
            "Lesson {} has {} student(s)",
            self.lesson.id,
            students.len()
        );
        self.students = students;
        self.current = state.clone();
        self.saved = state;
        self.has_changes = false;
        self.save_log = None;
        Ok(())
    }

    async fn fetch(
        &self,
    ) -> Result<(Vec<Student>, Vec<AttendanceRecord>, Vec<GradeRecord>), JournalError> {
        let roster = self.api.group_roster(self.lesson.group_id).await?;
        let students = match self.lesson.subgroup {
            Some(subgroup) => roster
                .students
                .into_iter()
                .filter(|s| s.subgroup.map_or(true, |own| own == subgroup))
                .collect(),
            None => roster.students,
        };
        let lesson_ids = [self.lesson.id];
        let attendance = self
            .api
            .lesson_attendance(self.lesson.group_id, &lesson_ids)
            .await?;
        let grades = self.api.lesson_grades(&lesson_ids).await?;
        Ok((students, attendance, grades))
    }

    fn grade_belongs_here(&self, record: &GradeRecord) -> bool {
        record.lesson_id.map_or(true, |id| id == self.lesson.id)
            && match (record.work_number, self.lesson.work_number) {
                (Some(theirs), Some(ours)) => theirs == ours,
                _ => true,
            }
    }

    fn mark_changed(&mut self) {
        self.has_changes = true;
        let filled = present_if_graded(&mut self.current.attendance, &self.current.grades);
        if !filled.is_empty() {
            debug!("Marked graded students {:?} as present", filled);
        }
    }

    pub fn cycle_attendance(
        &mut self,
        student_id: StudentId,
    ) -> Result<AttendanceStatus, JournalError> {
        let mark = self
            .current
            .attendance
            .get_mut(&student_id)
            .ok_or(JournalError::UnknownStudent(student_id))?;
        let next = next_attendance(*mark);
        *mark = Some(next);
        self.mark_changed();
        Ok(next)
    }

    /// Sets the grade, or clears it when the same grade is given again.
    pub fn set_grade(
        &mut self,
        student_id: StudentId,
        grade: Grade,
    ) -> Result<Option<Grade>, JournalError> {
        if !self.lesson.lesson_type.supports_grading() {
            warn!(
                "Grading lesson {} of type {:?}",
                self.lesson.id, self.lesson.lesson_type
            );
        }
        let slot = self
            .current
            .grades
            .get_mut(&student_id)
            .ok_or(JournalError::UnknownStudent(student_id))?;
        *slot = if *slot == Some(grade) {
            None
        } else {
            Some(grade)
        };
        let result = *slot;
        self.mark_changed();
        Ok(result)
    }

    pub fn set_topic(&mut self, topic: &str) {
        self.current.topic = topic.to_owned();
        self.mark_changed();
    }

    pub fn set_status(&mut self, status: LessonStatus) {
        self.current.status = status;
        self.mark_changed();
    }

    pub fn apply(&mut self, edit: &SheetEdit) -> Result<(), JournalError> {
        match edit {
            SheetEdit::Cycle { student_id } => {
                self.cycle_attendance(*student_id)?;
            }
            SheetEdit::Grade { student_id, grade } => {
                self.set_grade(*student_id, Grade::new(*grade)?)?;
            }
            SheetEdit::Topic { topic } => self.set_topic(topic),
            SheetEdit::Status { status } => self.set_status(*status),
        }
        Ok(())
    }

    /// Steps a save of the current state consists of, in the order they run:
    /// attendance, grades, status, topic.
    pub fn plan_save(&self) -> SaveLog {
        let lesson_id = self.lesson.id;
        let mut steps = Vec::new();

        let records = self
            .current
            .attendance
            .iter()
            .filter_map(|(student_id, mark)| {
                mark.map(|status| AttendanceRecord {
                    student_id: *student_id,
                    status,
                    lesson_id: None,
                })
            })
            .collect::<Vec<_>>();
        if !records.is_empty() {
            steps.push(SaveStep::Attendance(BulkAttendance { lesson_id, records }));
        }

        for (student_id, grade) in self.current.grades.iter() {
            if let Some(grade) = grade {
                steps.push(SaveStep::Grade(GradeUpsert {
                    lesson_id,
                    student_id: *student_id,
                    grade: *grade,
                    work_number: self.lesson.work_number,
                }));
            }
        }

        if self.current.status != self.saved.status {
            steps.push(SaveStep::Status(LessonPatch::status(
                lesson_id,
                self.current.status,
            )));
        }
        if self.current.topic != self.saved.topic {
            steps.push(SaveStep::Topic(LessonPatch::topic(
                lesson_id,
                &self.current.topic,
            )));
        }

        SaveLog::new(steps)
    }

    /// Persists the sheet. After a failure the sheet keeps its changes and the
    /// next call skips steps that already went through unchanged.
    pub async fn save_all(&mut self) -> Result<(), JournalError> {
        let mut log = self.plan_save();
        if let Some(previous) = &self.save_log {
            log = log.resume_from(previous);
        }
        info!(
            "Saving lesson {}: {} step(s) pending",
            self.lesson.id,
            log.pending().count()
        );

        let result = log.run(self.api.as_ref()).await;
        if let Err(e) = result {
            self.acknowledge(&log);
            self.save_log = Some(log);
            return Err(e);
        }

        self.saved = self.current.clone();
        self.sync_lesson();
        self.has_changes = false;
        self.save_log = None;
        Ok(())
    }

    /// Moves status and topic the backend already took into the baseline,
    /// so that a later revert is planned as a PATCH of its own.
    fn acknowledge(&mut self, log: &SaveLog) {
        for logged in log.steps().iter().filter(|logged| logged.completed) {
            match &logged.step {
                SaveStep::Status(patch) => {
                    if let (Some(is_cancelled), Some(ended_early)) =
                        (patch.is_cancelled, patch.ended_early)
                    {
                        self.saved.status = LessonStatus::from_flags(is_cancelled, ended_early);
                    }
                }
                SaveStep::Topic(patch) => {
                    if let Some(topic) = &patch.topic {
                        self.saved.topic = topic.clone();
                    }
                }
                SaveStep::Attendance(_) | SaveStep::Grade(_) => {}
            }
        }
        self.sync_lesson();
    }

    fn sync_lesson(&mut self) {
        let (is_cancelled, ended_early) = self.saved.status.flags();
        self.lesson.topic = self.saved.topic.clone();
        self.lesson.is_cancelled = is_cancelled;
        self.lesson.ended_early = ended_early;
    }

    /// Drops every unsaved edit, back to what was last loaded or saved.
    pub fn reset_changes(&mut self) {
        self.current = self.saved.clone();
        self.has_changes = false;
        self.save_log = None;
    }

    pub fn lesson(&self) -> &LessonData {
        &self.lesson
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn attendance(&self, student_id: StudentId) -> Option<AttendanceStatus> {
        self.current.attendance.get(&student_id).copied().flatten()
    }

    pub fn attendance_map(&self) -> &AttendanceMap {
        &self.current.attendance
    }

    pub fn grade(&self, student_id: StudentId) -> Option<Grade> {
        self.current.grades.get(&student_id).copied().flatten()
    }

    pub fn grade_map(&self) -> &GradeMap {
        &self.current.grades
    }

    pub fn topic(&self) -> &str {
        &self.current.topic
    }

    pub fn status(&self) -> LessonStatus {
        self.current.status
    }

    pub fn has_changes(&self) -> bool {
        self.has_changes
    }

    /// The log of the last failed save, if any.
    pub fn save_log(&self) -> Option<&SaveLog> {
        self.save_log.as_ref()
    }
}
