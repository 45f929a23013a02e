//! Module with lesson and journal models compatible with the journal backend's REST API
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::journal::error::JournalError;

pub type LessonId = u32;
pub type GroupId = u32;
pub type StudentId = u32;

#[derive(Deserialize, Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LessonType {
    Lecture,
    Lab,
    Practice,
    Seminar,
    #[serde(other)]
    Other,
}

impl LessonType {
    /// Only labs and practices carry grades.
    pub fn supports_grading(self) -> bool {
        matches!(self, LessonType::Lab | LessonType::Practice)
    }
}

#[derive(Deserialize, Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    #[default]
    Normal,
    Cancelled,
    Early,
}

impl LessonStatus {
    pub fn from_flags(is_cancelled: bool, ended_early: bool) -> Self {
        if is_cancelled {
            LessonStatus::Cancelled
        } else if ended_early {
            LessonStatus::Early
        } else {
            LessonStatus::Normal
        }
    }

    /// `(is_cancelled, ended_early)`
    pub fn flags(self) -> (bool, bool) {
        match self {
            LessonStatus::Normal => (false, false),
            LessonStatus::Cancelled => (true, false),
            LessonStatus::Early => (false, true),
        }
    }
}

#[derive(Deserialize, Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    Excused,
    Absent,
}

impl AttendanceStatus {
    pub const CYCLE: [AttendanceStatus; 4] = [
        AttendanceStatus::Present,
        AttendanceStatus::Late,
        AttendanceStatus::Excused,
        AttendanceStatus::Absent,
    ];
}

#[derive(Deserialize, Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub struct Grade(u8);

impl Grade {
    pub const MIN: u8 = 2;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, JournalError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Grade(value))
        } else {
            Err(JournalError::InvalidGrade(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Grade {
    type Error = JournalError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Grade::new(value)
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> Self {
        grade.0
    }
}

/// One scheduled class occurrence.
#[derive(Deserialize, Debug, Serialize, Clone, PartialEq)]
pub struct LessonData {
    pub id: LessonId,
    pub date: NaiveDate,
    pub lesson_number: u8,
    pub lesson_type: LessonType,
    #[serde(default)]
    pub topic: String,
    pub subject_name: String,
    #[serde(default)]
    pub work_number: Option<u32>,
    #[serde(default)]
    pub subgroup: Option<u8>,
    #[serde(default)]
    pub is_cancelled: bool,
    #[serde(default)]
    pub ended_early: bool,
    pub group_id: GroupId,
    #[serde(default)]
    pub group_name: Option<String>,
}

impl LessonData {
    pub fn status(&self) -> LessonStatus {
        LessonStatus::from_flags(self.is_cancelled, self.ended_early)
    }
}

#[derive(Deserialize, Debug, Serialize, Clone, PartialEq, Eq)]
pub struct LectureGroup {
    pub group_id: GroupId,
    pub group_name: String,
    pub lesson_id: LessonId,
}

/// A lecture slot taught to several groups at once.
#[derive(Deserialize, Debug, Serialize, Clone, PartialEq)]
pub struct GroupedLecture {
    pub date: NaiveDate,
    pub lesson_number: u8,
    pub subject_name: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub is_cancelled: bool,
    #[serde(default)]
    pub ended_early: bool,
    pub groups: Vec<LectureGroup>,
}

impl GroupedLecture {
    pub fn status(&self) -> LessonStatus {
        LessonStatus::from_flags(self.is_cancelled, self.ended_early)
    }

    /// Folds lecture rows sharing date, slot and subject into one lecture each.
    /// Topic and flags are taken from the first row of every slot.
    pub fn group_lessons(lessons: &[LessonData]) -> Vec<GroupedLecture> {
        let mut slots: BTreeMap<(NaiveDate, u8, &str), GroupedLecture> = BTreeMap::new();
        for lesson in lessons
            .iter()
            .filter(|lesson| lesson.lesson_type == LessonType::Lecture)
        {
            let group = LectureGroup {
                group_id: lesson.group_id,
                group_name: lesson
                    .group_name
                    .clone()
                    .unwrap_or_else(|| lesson.group_id.to_string()),
                lesson_id: lesson.id,
            };
            slots
                .entry((lesson.date, lesson.lesson_number, &lesson.subject_name))
                .or_insert_with(|| GroupedLecture {
                    date: lesson.date,
                    lesson_number: lesson.lesson_number,
                    subject_name: lesson.subject_name.clone(),
                    topic: lesson.topic.clone(),
                    is_cancelled: lesson.is_cancelled,
                    ended_early: lesson.ended_early,
                    groups: Vec::new(),
                })
                .groups
                .push(group);
        }
        slots.into_values().collect()
    }
}

#[derive(Deserialize, Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Student {
    pub id: StudentId,
    pub full_name: String,
    #[serde(default)]
    pub subgroup: Option<u8>,
}

#[derive(Deserialize, Debug, Serialize, Clone, PartialEq, Eq)]
pub struct GroupRoster {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub students: Vec<Student>,
}

#[derive(Deserialize, Debug, Serialize, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub student_id: StudentId,
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing)]
    pub lesson_id: Option<LessonId>,
}

#[derive(Deserialize, Debug, Serialize, Clone, PartialEq, Eq)]
pub struct BulkAttendance {
    pub lesson_id: LessonId,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Deserialize, Debug, Serialize, Clone, PartialEq, Eq)]
pub struct GradeRecord {
    pub student_id: StudentId,
    pub grade: Grade,
    #[serde(default)]
    pub lesson_id: Option<LessonId>,
    #[serde(default)]
    pub work_number: Option<u32>,
}

#[derive(Deserialize, Debug, Serialize, Clone, PartialEq, Eq)]
pub struct GradeUpsert {
    pub lesson_id: LessonId,
    pub student_id: StudentId,
    pub grade: Grade,
    pub work_number: Option<u32>,
}

/// Partial lesson update, only present fields go over the wire.
#[derive(Deserialize, Debug, Serialize, Clone, PartialEq, Eq, Default)]
pub struct LessonPatch {
    #[serde(skip)]
    pub lesson_id: LessonId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_cancelled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_early: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl LessonPatch {
    pub fn status(lesson_id: LessonId, status: LessonStatus) -> Self {
        let (is_cancelled, ended_early) = status.flags();
        LessonPatch {
            lesson_id,
            is_cancelled: Some(is_cancelled),
            ended_early: Some(ended_early),
            topic: None,
        }
    }

    pub fn topic(lesson_id: LessonId, topic: &str) -> Self {
        LessonPatch {
            lesson_id,
            topic: Some(topic.to_owned()),
            ..LessonPatch::default()
        }
    }
}
