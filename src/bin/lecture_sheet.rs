use lib::journal::helpers::{get_config, lecture_autosave, read_json};
use lib::journal::journal_api::HttpJournal;
use lib::journal::lecture_sheet::LectureSheet;
use lib::journal::models::{lesson_model::GroupedLecture, LectureArgs, LectureEdit};

use std::{error::Error, sync::Arc, time::Duration};

use clap::Parser;
use log::{info, warn};
use tokio::sync::Mutex;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    /* Setup logging */
    env_logger::builder()
        .target(env_logger::Target::Stdout)
        .filter_level(log::LevelFilter::Info)
        .init();

    /* Get all the required resources */
    let args = LectureArgs::parse();
    let config = get_config(&args.config_json_path)?;
    let lecture: GroupedLecture = read_json(&args.lecture_json_path)?;
    let edits: Vec<LectureEdit> = read_json(&args.edits_json_path)?;
    let api = Arc::new(HttpJournal::new(reqwest::Client::new(), &config));
    info!(
        "Opening lecture {} on {} for {} group(s)",
        lecture.subject_name,
        lecture.date,
        lecture.groups.len()
    );

    /* Groups are loaded lazily, on first expand */
    let sheet = Arc::new(Mutex::new(LectureSheet::new(api, lecture)));
    let mut autosave = lecture_autosave(
        sheet.clone(),
        Duration::from_millis(config.autosave_delay_ms),
    );

    /* Replay edits, expanding is not an edit and does not arm the autosave */
    for edit in edits.iter() {
        if let Err(e) = sheet.lock().await.apply(edit).await {
            warn!("Skipping edit {:?}: {}", edit, e);
            continue;
        }
        if !matches!(edit, LectureEdit::Expand { .. }) {
            autosave.trigger_save();
        }
    }

    /* Explicit save on close */
    autosave.cancel_save();
    let mut sheet = sheet.lock().await;
    if sheet.has_changes() {
        sheet.save_all().await?;
    }
    info!("Lecture saved for {} group(s)", sheet.lecture().groups.len());
    Ok(())
}
