use thiserror::Error;

use super::models::lesson_model::{GroupId, StudentId};

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("request to the journal backend failed")]
    Http(#[from] reqwest::Error),
    #[error("journal backend responded with {status}: {message}")]
    Api { status: u16, message: String },
    #[error("grade must be between 2 and 5, got {0}")]
    InvalidGrade(u8),
    #[error("student {0} is not on this sheet")]
    UnknownStudent(StudentId),
    #[error("group {0} is not part of this lecture")]
    UnknownGroup(GroupId),
    #[error("save step `{step}` failed")]
    SaveStep {
        step: String,
        #[source]
        source: Box<JournalError>,
    },
}
