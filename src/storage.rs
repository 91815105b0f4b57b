//! Storage layer for learnboard
//!
//! All state lives in one data directory, one JSON file per key:
//!
//! ```text
//! <data dir>/
//!   kanban-tasks.json       # Flat array of tasks
//!   sound-settings.json     # Sound preferences
//!   timer.json              # Active time-tracking session (absent when idle)
//!   learnboard.toml         # Configuration
//!   board.lock              # Held by commands for a read-modify-write cycle
//! ```
//!
//! The data directory defaults to the platform data dir from `directories`
//! and can be overridden with `--data-dir` or `LEARNBOARD_DATA_DIR`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::lock::{self, FileLock};
use crate::sound::SoundSettings;
use crate::store::{ChangeListener, StoreChange, TaskStore};
use crate::task::Task;
use crate::timer::TimerSession;

pub const TASKS_FILE: &str = "kanban-tasks.json";
pub const SOUND_FILE: &str = "sound-settings.json";
pub const TIMER_FILE: &str = "timer.json";
pub const BOARD_LOCK_FILE: &str = "board.lock";
pub const DATA_DIR_ENV: &str = "LEARNBOARD_DATA_DIR";

/// Platform data directory, e.g. `~/.local/share/learnboard` on Linux.
pub fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", "learnboard")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::OperationFailed(format!(
                "could not determine a data directory; pass --data-dir or set {DATA_DIR_ENV}"
            ))
        })
}

/// Hook for future changes to the stored task shape. Currently a no-op.
pub fn migrate_tasks(tasks: Vec<Task>) -> Vec<Task> {
    tasks
}

/// Storage manager for one data directory
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    lock_timeout_ms: u64,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>, lock_timeout_ms: u64) -> Self {
        Self {
            root: root.into(),
            lock_timeout_ms,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn lock_timeout_ms(&self) -> u64 {
        self.lock_timeout_ms
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.root.join(TASKS_FILE)
    }

    pub fn sound_file(&self) -> PathBuf {
        self.root.join(SOUND_FILE)
    }

    pub fn timer_file(&self) -> PathBuf {
        self.root.join(TIMER_FILE)
    }

    /// Hold this for a whole load-mutate-save cycle so two commands cannot
    /// lose each other's edits.
    pub fn lock_board(&self) -> Result<FileLock> {
        FileLock::acquire(self.root.join(BOARD_LOCK_FILE), self.lock_timeout_ms)
    }

    /// Non-blocking variant for interactive callers; `None` while another
    /// process holds the board.
    pub fn try_lock_board(&self) -> Result<Option<FileLock>> {
        FileLock::try_acquire(self.root.join(BOARD_LOCK_FILE))
    }

    // =========================================================================
    // JSON helpers
    // =========================================================================

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        let Some(content) = lock::read_locked_optional(path, self.lock_timeout_ms)? else {
            return Ok(None);
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        let value = serde_json::from_str(&content).map_err(|err| {
            Error::OperationFailed(format!("{} is corrupt: {err}", path.display()))
        })?;
        Ok(Some(value))
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, data: &T) -> Result<()> {
        let mut json = serde_json::to_string_pretty(data)?;
        json.push('\n');
        lock::write_atomic_locked(path, json.as_bytes(), self.lock_timeout_ms)
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub fn load_tasks(&self) -> Result<Vec<Task>> {
        let tasks: Vec<Task> = self.read_json(&self.tasks_file())?.unwrap_or_default();
        Ok(migrate_tasks(tasks))
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        self.write_json(&self.tasks_file(), tasks)
    }

    /// Store loaded from disk with file persistence subscribed.
    pub fn open_store(&self) -> Result<TaskStore> {
        let mut store = TaskStore::new(self.load_tasks()?);
        store.subscribe(FilePersistence::new(self.clone()));
        Ok(store)
    }

    // =========================================================================
    // Sound settings
    // =========================================================================

    pub fn load_sound_settings(&self) -> Result<SoundSettings> {
        Ok(self
            .read_json::<SoundSettings>(&self.sound_file())?
            .unwrap_or_default()
            .sanitized())
    }

    pub fn save_sound_settings(&self, settings: &SoundSettings) -> Result<()> {
        self.write_json(&self.sound_file(), settings)
    }

    // =========================================================================
    // Timer session
    // =========================================================================

    pub fn load_timer(&self) -> Result<Option<TimerSession>> {
        self.read_json(&self.timer_file())
    }

    /// `None` clears the session.
    pub fn save_timer(&self, session: Option<&TimerSession>) -> Result<()> {
        let path = self.timer_file();
        match session {
            Some(session) => self.write_json(&path, session),
            None => {
                let _lock = FileLock::acquire(lock::lock_path_for(&path), self.lock_timeout_ms)?;
                match fs::remove_file(&path) {
                    Ok(()) => Ok(()),
                    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                    Err(err) => Err(err.into()),
                }
            }
        }
    }
}

/// Writes the whole task list back to disk after every store mutation.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    storage: Storage,
}

impl FilePersistence {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

impl ChangeListener for FilePersistence {
    fn on_change(&mut self, change: &StoreChange, tasks: &[Task]) -> Result<()> {
        tracing::debug!(?change, count = tasks.len(), "persisting tasks");
        self.storage.save_tasks(tasks)
    }
}
