//! Sheet for a lecture shared by several groups. Group rosters are fetched
//! only when their section is expanded for the first time.
use std::{collections::BTreeMap, sync::Arc};

use log::{debug, info, warn};

use super::{
    cycle::next_attendance,
    error::JournalError,
    journal_api::JournalApi,
    models::{
        lesson_model::{
            AttendanceRecord, AttendanceStatus, BulkAttendance, GroupId, GroupedLecture,
            LessonId, LessonPatch, LessonStatus, Student, StudentId,
        },
        LectureEdit,
    },
    save_log::{SaveLog, SaveStep},
    sheet::AttendanceMap,
};

#[derive(Debug, Clone, Default)]
pub struct GroupSection {
    pub students: Vec<Student>,
    pub attendance: AttendanceMap,
    pub is_expanded: bool,
    loaded: bool,
    saved_attendance: AttendanceMap,
    saved_topic: String,
}

impl GroupSection {
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn records(&self) -> Vec<AttendanceRecord> {
        self.attendance
            .iter()
            .filter_map(|(student_id, mark)| {
                mark.map(|status| AttendanceRecord {
                    student_id: *student_id,
                    status,
                    lesson_id: None,
                })
            })
            .collect()
    }
}

pub struct LectureSheet<A> {
    api: Arc<A>,
    lecture: GroupedLecture,
    sections: BTreeMap<GroupId, GroupSection>,
    topic: String,
    status: LessonStatus,
    has_changes: bool,
    save_log: Option<SaveLog>,
}

impl<A: JournalApi> LectureSheet<A> {
    pub fn new(api: Arc<A>, lecture: GroupedLecture) -> Self {
        let sections = lecture
            .groups
            .iter()
            .map(|group| {
                let section = GroupSection {
                    saved_topic: lecture.topic.clone(),
                    ..GroupSection::default()
                };
                (group.group_id, section)
            })
            .collect();
        LectureSheet {
            api,
            topic: lecture.topic.clone(),
            status: lecture.status(),
            lecture,
            sections,
            has_changes: false,
            save_log: None,
        }
    }

    fn lesson_of(&self, group_id: GroupId) -> Result<LessonId, JournalError> {
        self.lecture
            .groups
            .iter()
            .find(|group| group.group_id == group_id)
            .map(|group| group.lesson_id)
            .ok_or(JournalError::UnknownGroup(group_id))
    }

    fn section_mut(&mut self, group_id: GroupId) -> Result<&mut GroupSection, JournalError> {
        self.sections
            .get_mut(&group_id)
            .ok_or(JournalError::UnknownGroup(group_id))
    }

    /// Expands or collapses a group. The first expansion loads the group;
    /// a failed load is retried on the next expansion.
    pub async fn toggle_group(&mut self, group_id: GroupId) -> Result<bool, JournalError> {
        let lesson_id = self.lesson_of(group_id)?;
        let section = self.section_mut(group_id)?;
        section.is_expanded = !section.is_expanded;
        let expanded = section.is_expanded;
        if !expanded || section.loaded {
            return Ok(expanded);
        }

        info!("Loading group {} for lesson {}", group_id, lesson_id);
        let fetched = fetch_group(self.api.as_ref(), group_id, lesson_id).await;
        let section = self.section_mut(group_id)?;
        match fetched {
            Ok((students, records)) => {
                let mut attendance: AttendanceMap =
                    students.iter().map(|s| (s.id, None)).collect();
                for record in records
                    .into_iter()
                    .filter(|r| r.lesson_id.map_or(true, |id| id == lesson_id))
                {
                    if let Some(mark) = attendance.get_mut(&record.student_id) {
                        *mark = Some(record.status);
                    }
                }
                debug!("Group {} has {} student(s)", group_id, students.len());
                section.students = students;
                section.saved_attendance = attendance.clone();
                section.attendance = attendance;
                section.loaded = true;
            }
            Err(e) => warn!("Could not load group {}: {}", group_id, e),
        }
        Ok(expanded)
    }

    pub fn cycle_attendance(
        &mut self,
        group_id: GroupId,
        student_id: StudentId,
    ) -> Result<AttendanceStatus, JournalError> {
        let mark = self
            .section_mut(group_id)?
            .attendance
            .get_mut(&student_id)
            .ok_or(JournalError::UnknownStudent(student_id))?;
        let next = next_attendance(*mark);
        *mark = Some(next);
        self.has_changes = true;
        Ok(next)
    }

    pub fn set_topic(&mut self, topic: &str) {
        self.topic = topic.to_owned();
        self.has_changes = true;
    }

    pub fn set_status(&mut self, status: LessonStatus) {
        self.status = status;
        self.has_changes = true;
    }

    pub async fn apply(&mut self, edit: &LectureEdit) -> Result<(), JournalError> {
        match edit {
            LectureEdit::Expand { group_id } => {
                if !self.section(*group_id).is_some_and(|s| s.is_expanded) {
                    self.toggle_group(*group_id).await?;
                }
            }
            LectureEdit::Cycle {
                group_id,
                student_id,
            } => {
                self.cycle_attendance(*group_id, *student_id)?;
            }
            LectureEdit::Topic { topic } => self.set_topic(topic),
            LectureEdit::Status { status } => self.set_status(*status),
        }
        Ok(())
    }

    /// Persists one group's marks for its lesson.
    pub async fn save_attendance(
        &mut self,
        group_id: GroupId,
        lesson_id: LessonId,
    ) -> Result<(), JournalError> {
        let section = self
            .sections
            .get(&group_id)
            .ok_or(JournalError::UnknownGroup(group_id))?;
        let records = section.records();
        if records.is_empty() {
            debug!("Nothing to save for group {}", group_id);
            return Ok(());
        }
        self.api
            .save_attendance_bulk(&BulkAttendance { lesson_id, records })
            .await?;
        let section = self.section_mut(group_id)?;
        section.saved_attendance = section.attendance.clone();
        Ok(())
    }

    /// Per group: the lesson PATCH first, then that group's attendance.
    /// The topic rides along for every group whose lesson holds another one.
    pub fn plan_save(&self) -> SaveLog {
        let mut steps = Vec::new();
        for group in self.lecture.groups.iter() {
            let section = self.sections.get(&group.group_id);
            let mut patch = LessonPatch::status(group.lesson_id, self.status);
            if section.map_or(true, |section| section.saved_topic != self.topic) {
                patch.topic = Some(self.topic.clone());
            }
            steps.push(SaveStep::Status(patch));

            let records = section
                .filter(|section| section.loaded)
                .map(GroupSection::records)
                .unwrap_or_default();
            if !records.is_empty() {
                steps.push(SaveStep::Attendance(BulkAttendance {
                    lesson_id: group.lesson_id,
                    records,
                }));
            }
        }
        SaveLog::new(steps)
    }

    pub async fn save_all(&mut self) -> Result<(), JournalError> {
        let mut log = self.plan_save();
        if let Some(previous) = &self.save_log {
            log = log.resume_from(previous);
        }
        info!(
            "Saving lecture {} #{} for {} group(s)",
            self.lecture.date,
            self.lecture.lesson_number,
            self.lecture.groups.len()
        );

        if let Err(e) = log.run(self.api.as_ref()).await {
            self.acknowledge(&log);
            self.save_log = Some(log);
            return Err(e);
        }

        let (is_cancelled, ended_early) = self.status.flags();
        self.lecture.topic = self.topic.clone();
        self.lecture.is_cancelled = is_cancelled;
        self.lecture.ended_early = ended_early;
        for section in self.sections.values_mut() {
            section.saved_attendance = section.attendance.clone();
            section.saved_topic = self.topic.clone();
        }
        self.has_changes = false;
        self.save_log = None;
        Ok(())
    }

    /// Records per group what the backend took before a save failed.
    fn acknowledge(&mut self, log: &SaveLog) {
        for logged in log.steps().iter().filter(|logged| logged.completed) {
            let lesson_id = match &logged.step {
                SaveStep::Status(patch) | SaveStep::Topic(patch) => patch.lesson_id,
                SaveStep::Attendance(bulk) => bulk.lesson_id,
                SaveStep::Grade(_) => continue,
            };
            let Some(group) = self
                .lecture
                .groups
                .iter()
                .find(|group| group.lesson_id == lesson_id)
            else {
                continue;
            };
            let Some(section) = self.sections.get_mut(&group.group_id) else {
                continue;
            };
            match &logged.step {
                SaveStep::Status(patch) | SaveStep::Topic(patch) => {
                    if let Some(topic) = &patch.topic {
                        section.saved_topic = topic.clone();
                    }
                }
                SaveStep::Attendance(_) => {
                    section.saved_attendance = section.attendance.clone();
                }
                SaveStep::Grade(_) => {}
            }
        }
    }

    /// Drops every unsaved edit across all groups.
    pub fn reset_changes(&mut self) {
        self.topic = self.lecture.topic.clone();
        self.status = self.lecture.status();
        for section in self.sections.values_mut() {
            section.attendance = section.saved_attendance.clone();
        }
        self.has_changes = false;
        self.save_log = None;
    }

    pub fn lecture(&self) -> &GroupedLecture {
        &self.lecture
    }

    pub fn section(&self, group_id: GroupId) -> Option<&GroupSection> {
        self.sections.get(&group_id)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn status(&self) -> LessonStatus {
        self.status
    }

    pub fn has_changes(&self) -> bool {
        self.has_changes
    }

    pub fn save_log(&self) -> Option<&SaveLog> {
        self.save_log.as_ref()
    }
}

async fn fetch_group<A: JournalApi>(
    api: &A,
    group_id: GroupId,
    lesson_id: LessonId,
) -> Result<(Vec<Student>, Vec<AttendanceRecord>), JournalError> {
    let students = api.group_students(group_id).await?;
    let records = api.lesson_attendance(group_id, &[lesson_id]).await?;
    Ok((students, records))
}
