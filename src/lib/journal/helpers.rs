use std::{error::Error, fs::File, io::BufReader, path::Path, sync::Arc, time::Duration};

use figment::{
    providers::{Env, Format, Json},
    Figment,
};
use futures::FutureExt;
use log::{debug, info};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use super::{
    autosave::{Autosave, SaveFn},
    journal_api::JournalApi,
    lecture_sheet::LectureSheet,
    models::{lesson_model::Student, Config},
    sheet::LessonSheet,
};

pub fn log_roster(students: &[Student]) -> () {
    for student in students.iter() {
        debug!(
            "On the sheet: {} ({}), subgroup {:?}",
            student.full_name, student.id, student.subgroup
        );
    }
}

/// Reads config.json and lets `JOURNAL_*` environment variables override it.
pub fn get_config(config_json_path: &Path) -> Result<Config, Box<dyn Error>> {
    info!(
        "Reading config.json from {}",
        std::path::absolute(config_json_path)?.display()
    );
    let config: Config = Figment::new()
        .merge(Json::file(config_json_path))
        .merge(Env::prefixed("JOURNAL_"))
        .extract()?;
    Ok(config)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    info!("Reading {}", std::path::absolute(path)?.display());
    let file = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(file)?)
}

/// Autosave that persists a shared lesson sheet when it has unsaved edits.
pub fn lesson_autosave<A: JournalApi + 'static>(
    sheet: Arc<Mutex<LessonSheet<A>>>,
    delay: Duration,
) -> Autosave {
    let on_save: SaveFn = Arc::new(move || {
        let sheet = sheet.clone();
        async move {
            let mut sheet = sheet.lock().await;
            if !sheet.has_changes() {
                return Ok(());
            }
            sheet.save_all().await
        }
        .boxed()
    });
    Autosave::new(delay, on_save)
}

/// Autosave that persists a shared lecture sheet when it has unsaved edits.
pub fn lecture_autosave<A: JournalApi + 'static>(
    sheet: Arc<Mutex<LectureSheet<A>>>,
    delay: Duration,
) -> Autosave {
    let on_save: SaveFn = Arc::new(move || {
        let sheet = sheet.clone();
        async move {
            let mut sheet = sheet.lock().await;
            if !sheet.has_changes() {
                return Ok(());
            }
            sheet.save_all().await
        }
        .boxed()
    });
    Autosave::new(delay, on_save)
}
