//! Debounced autosave: bursts of edits end up in a single save call.
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use futures::future::BoxFuture;
use log::{debug, warn};
use tokio::task::JoinHandle;

use super::error::JournalError;

pub type SaveFn = Arc<dyn Fn() -> BoxFuture<'static, Result<(), JournalError>> + Send + Sync>;

pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

/// What to do when the timer fires while a save is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Drop the fire.
    Skip,
    /// Run one more save as soon as the current one is done.
    #[default]
    Trailing,
}

#[derive(Debug, Default)]
struct SaveState {
    saving: bool,
    rerun: bool,
}

pub struct Autosave {
    delay: Duration,
    on_save: SaveFn,
    policy: OverlapPolicy,
    state: Arc<Mutex<SaveState>>,
    timer: Option<JoinHandle<()>>,
}

impl Autosave {
    pub fn new(delay: Duration, on_save: SaveFn) -> Self {
        Autosave {
            delay,
            on_save,
            policy: OverlapPolicy::default(),
            state: Arc::new(Mutex::new(SaveState::default())),
            timer: None,
        }
    }

    pub fn with_overlap(mut self, policy: OverlapPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restarts the debounce timer. Must be called within a tokio runtime.
    pub fn trigger_save(&mut self) {
        self.cancel_save();
        let delay = self.delay;
        let on_save = self.on_save.clone();
        let state = self.state.clone();
        let policy = self.policy;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detached so that a later trigger cannot abort a save midway.
            tokio::spawn(run_guarded(on_save, state, policy));
        }));
    }

    /// Forgets the pending save, if any. A save already running is not affected.
    pub fn cancel_save(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.timer.as_ref().is_some_and(|timer| !timer.is_finished())
    }

    pub fn is_saving(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .saving
    }
}

impl Drop for Autosave {
    fn drop(&mut self) {
        self.cancel_save();
    }
}

async fn run_guarded(on_save: SaveFn, state: Arc<Mutex<SaveState>>, policy: OverlapPolicy) {
    {
        let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.saving {
            match policy {
                OverlapPolicy::Skip => debug!("Autosave skipped, a save is in flight"),
                OverlapPolicy::Trailing => {
                    debug!("Autosave deferred until the save in flight is done");
                    guard.rerun = true;
                }
            }
            return;
        }
        guard.saving = true;
    }
    let mut flag = SavingFlag {
        state: state.clone(),
        armed: true,
    };

    loop {
        if let Err(e) = (on_save)().await {
            warn!("Autosave failed: {}", e);
        }
        let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.rerun {
            guard.rerun = false;
        } else {
            guard.saving = false;
            flag.armed = false;
            break;
        }
    }
}

/// Clears the in-flight mark when a save task unwinds.
struct SavingFlag {
    state: Arc<Mutex<SaveState>>,
    armed: bool,
}

impl Drop for SavingFlag {
    fn drop(&mut self) {
        if self.armed {
            warn!("Autosave task aborted, clearing the in-flight mark");
            let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            guard.saving = false;
            guard.rerun = false;
        }
    }
}
