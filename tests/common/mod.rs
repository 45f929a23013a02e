#![allow(dead_code)]
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use chrono::NaiveDate;
use lib::journal::error::JournalError;
use lib::journal::journal_api::JournalApi;
use lib::journal::models::lesson_model::{
    AttendanceRecord, AttendanceStatus, BulkAttendance, GradeRecord, GradeUpsert, GroupId,
    GroupRoster, GroupedLecture, LectureGroup, LessonData, LessonId, LessonPatch, LessonType,
    Student,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GroupRoster(GroupId),
    LessonAttendance(GroupId, Vec<LessonId>),
    SaveAttendanceBulk(BulkAttendance),
    LessonGrades(Vec<LessonId>),
    UpsertGrade(GradeUpsert),
    PatchLesson(LessonPatch),
    GroupStudents(GroupId),
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Call::SaveAttendanceBulk(_) | Call::UpsertGrade(_) | Call::PatchLesson(_)
        )
    }
}

type FailWhen = Box<dyn Fn(&Call) -> bool + Send>;

/// In-memory journal backend recording every call it gets.
#[derive(Default)]
pub struct TestJournal {
    pub rosters: BTreeMap<GroupId, GroupRoster>,
    pub attendance: Vec<AttendanceRecord>,
    pub grades: Vec<GradeRecord>,
    calls: Mutex<Vec<Call>>,
    fail_when: Mutex<Option<FailWhen>>,
}

impl TestJournal {
    pub fn with_roster(mut self, id: GroupId, students: Vec<Student>) -> Self {
        self.rosters.insert(
            id,
            GroupRoster {
                id,
                name: format!("Group {}", id),
                students,
            },
        );
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn fail_when(&self, predicate: impl Fn(&Call) -> bool + Send + 'static) {
        *self.fail_when.lock().unwrap() = Some(Box::new(predicate));
    }

    pub fn heal(&self) {
        *self.fail_when.lock().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call) -> Result<(), JournalError> {
        let failing = self
            .fail_when
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|predicate| predicate(&call));
        self.calls.lock().unwrap().push(call);
        if failing {
            return Err(JournalError::Api {
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl JournalApi for TestJournal {
    async fn group_roster(&self, group_id: GroupId) -> Result<GroupRoster, JournalError> {
        self.record(Call::GroupRoster(group_id))?;
        self.rosters.get(&group_id).cloned().ok_or(JournalError::Api {
            status: 404,
            message: "group not found".to_string(),
        })
    }

    async fn lesson_attendance(
        &self,
        group_id: GroupId,
        lesson_ids: &[LessonId],
    ) -> Result<Vec<AttendanceRecord>, JournalError> {
        self.record(Call::LessonAttendance(group_id, lesson_ids.to_vec()))?;
        Ok(self.attendance.clone())
    }

    async fn save_attendance_bulk(&self, bulk: &BulkAttendance) -> Result<(), JournalError> {
        self.record(Call::SaveAttendanceBulk(bulk.clone()))
    }

    async fn lesson_grades(
        &self,
        lesson_ids: &[LessonId],
    ) -> Result<Vec<GradeRecord>, JournalError> {
        self.record(Call::LessonGrades(lesson_ids.to_vec()))?;
        Ok(self.grades.clone())
    }

    async fn upsert_grade(&self, grade: &GradeUpsert) -> Result<(), JournalError> {
        self.record(Call::UpsertGrade(grade.clone()))
    }

    async fn patch_lesson(&self, patch: &LessonPatch) -> Result<(), JournalError> {
        self.record(Call::PatchLesson(patch.clone()))
    }

    async fn group_students(&self, group_id: GroupId) -> Result<Vec<Student>, JournalError> {
        self.record(Call::GroupStudents(group_id))?;
        self.rosters
            .get(&group_id)
            .map(|roster| roster.students.clone())
            .ok_or(JournalError::Api {
                status: 404,
                message: "group not found".to_string(),
            })
    }
}

pub fn student(id: u32, full_name: &str, subgroup: Option<u8>) -> Student {
    Student {
        id,
        full_name: full_name.to_string(),
        subgroup,
    }
}

pub fn three_students() -> Vec<Student> {
    vec![
        student(1, "Анна Ахматова", None),
        student(2, "Борис Пастернак", None),
        student(3, "Владимир Маяковский", None),
    ]
}

pub fn mark(student_id: u32, status: AttendanceStatus) -> AttendanceRecord {
    AttendanceRecord {
        student_id,
        status,
        lesson_id: None,
    }
}

pub fn lab_lesson() -> LessonData {
    LessonData {
        id: 10,
        date: NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
        lesson_number: 3,
        lesson_type: LessonType::Lab,
        topic: "Связные списки".to_string(),
        subject_name: "Алгоритмы".to_string(),
        work_number: Some(2),
        subgroup: None,
        is_cancelled: false,
        ended_early: false,
        group_id: 1,
        group_name: Some("101".to_string()),
    }
}

pub fn two_group_lecture() -> GroupedLecture {
    GroupedLecture {
        date: NaiveDate::from_ymd_opt(2024, 9, 3).unwrap(),
        lesson_number: 1,
        subject_name: "Алгоритмы".to_string(),
        topic: "Введение".to_string(),
        is_cancelled: false,
        ended_early: false,
        groups: vec![
            LectureGroup {
                group_id: 1,
                group_name: "101".to_string(),
                lesson_id: 101,
            },
            LectureGroup {
                group_id: 2,
                group_name: "102".to_string(),
                lesson_id: 102,
            },
        ],
    }
}
