use std::path::PathBuf;

use clap::{command, Parser};
use serde::{Deserialize, Serialize};

pub mod lesson_model;

use lesson_model::{GroupId, LessonStatus, StudentId};

/// A model for describing ARGS of the single lesson sheet.
/// Consists of:
/// 1. Path to config.json with the backend address and session settings.
/// 2. Path to a JSON file describing the lesson to open.
/// 3. Path to a JSON file with the edits to replay on the open sheet.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct LessonArgs {
    #[arg(long, value_name = "FILE", default_value = "config.json")]
    pub config_json_path: PathBuf,
    #[arg(long, value_name = "FILE", default_value = "lesson.json")]
    pub lesson_json_path: PathBuf,
    #[arg(long, value_name = "FILE", default_value = "edits.json")]
    pub edits_json_path: PathBuf,
}

/// Same as [`LessonArgs`], but for a lecture shared by several groups.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct LectureArgs {
    #[arg(long, value_name = "FILE", default_value = "config.json")]
    pub config_json_path: PathBuf,
    #[arg(long, value_name = "FILE", default_value = "lecture.json")]
    pub lecture_json_path: PathBuf,
    #[arg(long, value_name = "FILE", default_value = "edits.json")]
    pub edits_json_path: PathBuf,
}

/// A model for describing configuration of the tool.
/// Consists of:
/// 1. Base URL of the journal backend
/// 2. Optional bearer token sent with every request
/// 3. Deep links to the student and teacher bots, passed through untouched
/// 4. Autosave debounce delay in milliseconds
/// 5. Width limits of the resizable sheet panel
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub api_base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub student_bot_url: Option<String>,
    #[serde(default)]
    pub teacher_bot_url: Option<String>,
    #[serde(default = "default_autosave_delay_ms")]
    pub autosave_delay_ms: u64,
    #[serde(default = "default_panel_min_width")]
    pub panel_min_width: f64,
    #[serde(default = "default_panel_max_width")]
    pub panel_max_width: f64,
}

fn default_autosave_delay_ms() -> u64 {
    500
}

fn default_panel_min_width() -> f64 {
    350.0
}

fn default_panel_max_width() -> f64 {
    800.0
}

/// One user action on a lesson sheet, as stored in `edits.json`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SheetEdit {
    Cycle { student_id: StudentId },
    Grade { student_id: StudentId, grade: u8 },
    Topic { topic: String },
    Status { status: LessonStatus },
}

/// One user action on a lecture sheet, as stored in `edits.json`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LectureEdit {
    Expand {
        group_id: GroupId,
    },
    Cycle {
        group_id: GroupId,
        student_id: StudentId,
    },
    Topic {
        topic: String,
    },
    Status {
        status: LessonStatus,
    },
}
