use super::models::lesson_model::AttendanceStatus;

/// Next mark in the fixed cycle `present -> late -> excused -> absent -> present`.
/// An unmarked student starts at present.
pub fn next_attendance(current: Option<AttendanceStatus>) -> AttendanceStatus {
    match current {
        None => AttendanceStatus::Present,
        Some(AttendanceStatus::Present) => AttendanceStatus::Late,
        Some(AttendanceStatus::Late) => AttendanceStatus::Excused,
        Some(AttendanceStatus::Excused) => AttendanceStatus::Absent,
        Some(AttendanceStatus::Absent) => AttendanceStatus::Present,
    }
}
