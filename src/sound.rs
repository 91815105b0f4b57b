//! Sound feedback preferences and playback dispatch.
//!
//! Playback is best effort. A player that fails is logged at `warn` and the
//! triggering operation carries on as if nothing happened.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::{ChangeListener, StoreChange};
use crate::task::Task;
use crate::transition::TransitionSignal;

pub const DEFAULT_VOLUME: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SoundKind {
    TaskComplete,
    TaskMove,
    TaskCreate,
    TaskDelete,
    TimerStart,
    TimerStop,
}

/// Tone parameters for a sound cue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tone {
    pub frequency_hz: f64,
    pub duration_ms: u32,
}

impl SoundKind {
    pub const ALL: [SoundKind; 6] = [
        SoundKind::TaskComplete,
        SoundKind::TaskMove,
        SoundKind::TaskCreate,
        SoundKind::TaskDelete,
        SoundKind::TimerStart,
        SoundKind::TimerStop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SoundKind::TaskComplete => "taskComplete",
            SoundKind::TaskMove => "taskMove",
            SoundKind::TaskCreate => "taskCreate",
            SoundKind::TaskDelete => "taskDelete",
            SoundKind::TimerStart => "timerStart",
            SoundKind::TimerStop => "timerStop",
        }
    }

    /// Kebab-case name used on the command line.
    pub fn flag_name(self) -> &'static str {
        match self {
            SoundKind::TaskComplete => "task-complete",
            SoundKind::TaskMove => "task-move",
            SoundKind::TaskCreate => "task-create",
            SoundKind::TaskDelete => "task-delete",
            SoundKind::TimerStart => "timer-start",
            SoundKind::TimerStop => "timer-stop",
        }
    }

    pub fn tone(self) -> Tone {
        let (frequency_hz, duration_ms) = match self {
            SoundKind::TaskComplete => (880.0, 200),
            SoundKind::TaskMove => (660.0, 50),
            SoundKind::TaskCreate => (523.25, 150),
            SoundKind::TaskDelete => (329.63, 100),
            SoundKind::TimerStart => (587.33, 100),
            SoundKind::TimerStop => (493.88, 150),
        };
        Tone {
            frequency_hz,
            duration_ms,
        }
    }

    pub fn for_signal(signal: &TransitionSignal) -> Self {
        match signal {
            TransitionSignal::Completed { .. } => SoundKind::TaskComplete,
            TransitionSignal::Moved { .. } => SoundKind::TaskMove,
        }
    }

    pub fn for_change(change: &StoreChange) -> Option<Self> {
        match change {
            StoreChange::Created { .. } => Some(SoundKind::TaskCreate),
            StoreChange::Deleted { .. } => Some(SoundKind::TaskDelete),
            StoreChange::StatusChanged { signal } => Some(Self::for_signal(signal)),
            StoreChange::Updated { .. }
            | StoreChange::TimeUpdated { .. }
            | StoreChange::Archived { .. }
            | StoreChange::Replaced { .. } => None,
        }
    }
}

impl fmt::Display for SoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag_name())
    }
}

impl FromStr for SoundKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let needle = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.flag_name().eq_ignore_ascii_case(needle)
                    || kind.as_str().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "unknown sound '{value}' (expected task-complete|task-move|task-create|task-delete|timer-start|timer-stop)"
                ))
            })
    }
}

fn default_true() -> bool {
    true
}

fn default_volume() -> f64 {
    DEFAULT_VOLUME
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundToggles {
    #[serde(default = "default_true")]
    pub task_complete: bool,
    #[serde(default = "default_true")]
    pub task_move: bool,
    #[serde(default = "default_true")]
    pub task_create: bool,
    #[serde(default = "default_true")]
    pub task_delete: bool,
    #[serde(default = "default_true")]
    pub timer_start: bool,
    #[serde(default = "default_true")]
    pub timer_stop: bool,
}

impl Default for SoundToggles {
    fn default() -> Self {
        Self {
            task_complete: true,
            task_move: true,
            task_create: true,
            task_delete: true,
            timer_start: true,
            timer_stop: true,
        }
    }
}

impl SoundToggles {
    pub fn get(&self, kind: SoundKind) -> bool {
        match kind {
            SoundKind::TaskComplete => self.task_complete,
            SoundKind::TaskMove => self.task_move,
            SoundKind::TaskCreate => self.task_create,
            SoundKind::TaskDelete => self.task_delete,
            SoundKind::TimerStart => self.timer_start,
            SoundKind::TimerStop => self.timer_stop,
        }
    }

    pub fn set(&mut self, kind: SoundKind, enabled: bool) {
        let slot = match kind {
            SoundKind::TaskComplete => &mut self.task_complete,
            SoundKind::TaskMove => &mut self.task_move,
            SoundKind::TaskCreate => &mut self.task_create,
            SoundKind::TaskDelete => &mut self.task_delete,
            SoundKind::TimerStart => &mut self.timer_start,
            SoundKind::TimerStop => &mut self.timer_stop,
        };
        *slot = enabled;
    }
}

/// Persisted under `sound-settings.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 0.0 to 1.0
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default)]
    pub sounds: SoundToggles,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: DEFAULT_VOLUME,
            sounds: SoundToggles::default(),
        }
    }
}

/// Partial settings update. Per-sound toggles merge into the existing set
/// instead of replacing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoundPatch {
    pub enabled: Option<bool>,
    pub volume: Option<f64>,
    pub sounds: Vec<(SoundKind, bool)>,
}

impl SoundPatch {
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.volume.is_none() && self.sounds.is_empty()
    }
}

impl SoundSettings {
    pub fn should_play(&self, kind: SoundKind) -> bool {
        self.enabled && self.volume > 0.0 && self.sounds.get(kind)
    }

    pub fn apply(&mut self, patch: &SoundPatch) -> Result<()> {
        if let Some(volume) = patch.volume {
            validate_volume(volume)?;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(volume) = patch.volume {
            self.volume = volume;
        }
        for (kind, enabled) in &patch.sounds {
            self.sounds.set(*kind, *enabled);
        }
        Ok(())
    }

    /// Clamp values read from disk into range.
    pub fn sanitized(mut self) -> Self {
        if !self.volume.is_finite() {
            self.volume = DEFAULT_VOLUME;
        }
        self.volume = self.volume.clamp(0.0, 1.0);
        self
    }
}

pub fn validate_volume(volume: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&volume) {
        return Err(Error::InvalidArgument(format!(
            "volume must be between 0 and 1 (got {volume})"
        )));
    }
    Ok(())
}

pub trait SoundPlayer {
    fn play(&mut self, kind: SoundKind, volume: f64) -> io::Result<()>;
}

/// Rings the terminal bell on stderr.
#[derive(Debug)]
pub struct TerminalBell<W: Write> {
    out: W,
}

impl TerminalBell<io::Stderr> {
    pub fn stderr() -> Self {
        Self { out: io::stderr() }
    }
}

impl<W: Write> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> SoundPlayer for TerminalBell<W> {
    fn play(&mut self, kind: SoundKind, volume: f64) -> io::Result<()> {
        let tone = kind.tone();
        tracing::trace!(
            sound = kind.as_str(),
            frequency_hz = tone.frequency_hz,
            duration_ms = tone.duration_ms,
            volume,
            "bell"
        );
        self.out.write_all(b"\x07")?;
        self.out.flush()
    }
}

/// Routes sound cues through the settings to a player.
#[derive(Debug)]
pub struct SoundDispatcher<P> {
    settings: SoundSettings,
    player: P,
}

impl<P: SoundPlayer> SoundDispatcher<P> {
    pub fn new(settings: SoundSettings, player: P) -> Self {
        Self { settings, player }
    }

    pub fn settings(&self) -> &SoundSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: SoundSettings) {
        self.settings = settings;
    }

    /// Returns whether the cue was played. Never fails.
    pub fn play(&mut self, kind: SoundKind) -> bool {
        if !self.settings.should_play(kind) {
            return false;
        }
        match self.player.play(kind, self.settings.volume) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(sound = kind.as_str(), error = %err, "failed to play sound");
                false
            }
        }
    }
}

impl<P: SoundPlayer> ChangeListener for SoundDispatcher<P> {
    fn on_change(&mut self, change: &StoreChange, _tasks: &[Task]) -> Result<()> {
        if let Some(kind) = SoundKind::for_change(change) {
            self.play(kind);
        }
        Ok(())
    }
}
