use lib::journal::helpers::{get_config, lesson_autosave, log_roster, read_json};
use lib::journal::journal_api::HttpJournal;
use lib::journal::models::{lesson_model::LessonData, LessonArgs, SheetEdit};
use lib::journal::sheet::LessonSheet;

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
    let args = LessonArgs::parse();
    let config = get_config(&args.config_json_path)?;
    let lesson: LessonData = read_json(&args.lesson_json_path)?;
    let edits: Vec<SheetEdit> = read_json(&args.edits_json_path)?;
    let api = Arc::new(HttpJournal::new(reqwest::Client::new(), &config));

    /* Open the sheet, always from fresh data */
    let sheet = LessonSheet::open(api, lesson).await;
    info!(
        "Opened lesson {} ({}), {} student(s)",
        sheet.lesson().id,
        sheet.lesson().subject_name,
        sheet.students().len()
    );
    log_roster(sheet.students());
    let sheet = Arc::new(Mutex::new(sheet));
    let mut autosave = lesson_autosave(
        sheet.clone(),
        Duration::from_millis(config.autosave_delay_ms),
    );

    /* Replay edits, every one of them re-arms the autosave */
    for edit in edits.iter() {
        if let Err(e) = sheet.lock().await.apply(edit) {
            warn!("Skipping edit {:?}: {}", edit, e);
            continue;
        }
        autosave.trigger_save();
    }

    /* Explicit save on close */
    autosave.cancel_save();
    let mut sheet = sheet.lock().await;
    if sheet.has_changes() {
        sheet.save_all().await?;
    }
    for student in sheet.students() {
        info!(
            "{}: {:?}, grade {:?}",
            student.full_name,
            sheet.attendance(student.id),
            sheet.grade(student.id).map(|g| g.value())
        );
    }
    info!("Lesson {} saved", sheet.lesson().id);
    Ok(())
}
