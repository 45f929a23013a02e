//! Client-side editing session for lesson and lecture attendance sheets.
pub mod autosave;
pub mod cycle;
pub mod error;
pub mod helpers;
pub mod journal_api;
pub mod lecture_sheet;
pub mod models;
pub mod panel;
pub mod save_log;
pub mod sheet;

#[cfg(test)]
#[path = "tests/tests.rs"]
mod tests;
