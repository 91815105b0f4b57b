//! lb sound commands

use serde::Serialize;

use crate::cli::Context;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::sound::{SoundKind, SoundPatch, SoundSettings};

/// Options for `lb sound set`
pub struct SetOptions {
    pub enabled: Option<bool>,
    pub volume: Option<f64>,
    pub toggles: Vec<(SoundKind, Option<bool>)>,
}

#[derive(Serialize)]
struct TestReport {
    sound: SoundKind,
    played: bool,
}

/// `on`/`off` switch values for clap.
pub fn parse_switch(value: &str) -> std::result::Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(format!("expected on or off, got '{other}'")),
    }
}

fn switch_label(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn settings_human(header: String, settings: &SoundSettings) -> HumanOutput {
    let mut human = HumanOutput::new(header);
    human.push_summary("enabled", switch_label(settings.enabled));
    human.push_summary("volume", format!("{:.2}", settings.volume));
    for kind in SoundKind::ALL {
        human.push_summary(kind.flag_name(), switch_label(settings.sounds.get(kind)));
    }
    if !settings.enabled {
        human.push_next_step("lb sound set --enabled on");
    }
    human
}

pub fn run_show(ctx: &Context) -> Result<()> {
    let settings = ctx.storage.load_sound_settings()?;
    let human = settings_human("lb sound: settings".to_string(), &settings);
    emit_success(ctx.output, "sound show", &settings, Some(&human))
}

pub fn run_set(ctx: &Context, options: SetOptions) -> Result<()> {
    let patch = SoundPatch {
        enabled: options.enabled,
        volume: options.volume,
        sounds: options
            .toggles
            .into_iter()
            .filter_map(|(kind, value)| value.map(|enabled| (kind, enabled)))
            .collect(),
    };
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to change; pass --enabled, --volume or a per-sound flag".to_string(),
        ));
    }

    let _lock = ctx.storage.lock_board()?;
    let mut settings = ctx.storage.load_sound_settings()?;
    settings.apply(&patch)?;
    ctx.storage.save_sound_settings(&settings)?;

    let human = settings_human("lb sound set: saved".to_string(), &settings);
    emit_success(ctx.output, "sound set", &settings, Some(&human))
}

/// Plays the cue even when its toggle is off, but still respects a zero volume.
pub fn run_test(ctx: &Context, kind: SoundKind) -> Result<()> {
    let mut sounds = ctx.sounds()?;
    let mut settings = sounds.settings().clone();
    settings.enabled = !ctx.output.quiet;
    settings.sounds.set(kind, true);
    sounds.set_settings(settings);
    let played = sounds.play(kind);

    let tone = kind.tone();
    let header = if played {
        format!("lb sound test: played {kind}")
    } else {
        format!("lb sound test: {kind} was not played")
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("frequency", format!("{} Hz", tone.frequency_hz));
    human.push_summary("duration", format!("{} ms", tone.duration_ms));
    if !played && sounds.settings().volume <= 0.0 {
        human.push_warning("volume is 0");
    }

    emit_success(
        ctx.output,
        "sound test",
        &TestReport {
            sound: kind,
            played,
        },
        Some(&human),
    )
}
