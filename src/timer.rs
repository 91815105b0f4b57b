//! Per-task time tracking.
//!
//! One tracking session at a time. The session is persisted between `lb`
//! invocations, so `lb timer start` and `lb timer stop` can run minutes
//! apart; stopping credits whole elapsed minutes to the task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSession {
    pub task_id: String,
    /// Start of the current running stretch.
    pub started_at: DateTime<Utc>,
    /// Seconds banked by earlier stretches (before a pause).
    #[serde(default)]
    pub banked_secs: u64,
    pub running: bool,
}

impl TimerSession {
    pub fn start(task_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            task_id: task_id.into(),
            started_at: now,
            banked_secs: 0,
            running: true,
        }
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        if !self.running {
            return self.banked_secs;
        }
        let stretch = (now - self.started_at).num_seconds().max(0) as u64;
        self.banked_secs + stretch
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.running {
            return Err(Error::InvalidArgument("timer is already paused".to_string()));
        }
        self.banked_secs = self.elapsed_secs(now);
        self.running = false;
        Ok(())
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.running {
            return Err(Error::InvalidArgument("timer is already running".to_string()));
        }
        self.started_at = now;
        self.running = true;
        Ok(())
    }

    /// Close the session. Returns the whole minutes to credit.
    pub fn finish(self, now: DateTime<Utc>) -> StoppedSession {
        let elapsed_secs = self.elapsed_secs(now);
        StoppedSession {
            task_id: self.task_id,
            elapsed_secs,
            minutes: u32::try_from(elapsed_secs / 60).unwrap_or(u32::MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoppedSession {
    pub task_id: String,
    pub elapsed_secs: u64,
    pub minutes: u32,
}

/// Snapshot for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerStatus {
    pub task_id: String,
    pub running: bool,
    pub elapsed_secs: u64,
    pub elapsed: String,
}

impl TimerStatus {
    pub fn of(session: &TimerSession, now: DateTime<Utc>) -> Self {
        let elapsed_secs = session.elapsed_secs(now);
        Self {
            task_id: session.task_id.clone(),
            running: session.running,
            elapsed_secs,
            elapsed: format_elapsed(elapsed_secs),
        }
    }
}

/// `1h 2m 3s`, `2m 3s` or `3s`.
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}
