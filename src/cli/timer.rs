//! lb timer commands
//!
//! The session lives in `timer.json` between invocations. Only one task is
//! tracked at a time; starting another task stops and credits the current one.

use serde::Serialize;

use crate::cli::Context;
use crate::error::{Error, Result};
use crate::events::{Event, EventKind};
use crate::output::{emit_success, HumanOutput};
use crate::sound::SoundKind;
use crate::store::TaskStore;
use crate::timer::{format_elapsed, StoppedSession, TimerSession, TimerStatus};

#[derive(Serialize)]
struct TimerReport<'a> {
    timer: Option<TimerStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stopped: Option<&'a StoppedSession>,
}

fn emit_event<T: Serialize>(ctx: &Context, kind: EventKind, data: T) -> Result<()> {
    if let Some(mut sink) = ctx.event_sink()? {
        sink.emit(&Event::new(kind).with_data(data)?)?;
    }
    Ok(())
}

fn require_session(ctx: &Context) -> Result<TimerSession> {
    ctx.storage
        .load_timer()?
        .ok_or_else(|| Error::InvalidArgument("no timer is active".to_string()))
}

/// Credit a finished session to its task. A task deleted mid-session simply
/// loses the time.
fn credit(store: &mut TaskStore, stopped: &StoppedSession) -> Result<bool> {
    if store.get(&stopped.task_id).is_none() {
        tracing::warn!(task_id = %stopped.task_id, "timer task no longer exists");
        return Ok(false);
    }
    if stopped.minutes > 0 {
        store.add_time(&stopped.task_id, stopped.minutes)?;
    }
    Ok(true)
}

fn title_of<'a>(store: &'a TaskStore, task_id: &str) -> Option<&'a str> {
    store.get(task_id).map(|task| task.title.as_str())
}

pub fn run_start(ctx: &Context, id: &str) -> Result<()> {
    let now = ctx.clock().now();
    let _lock = ctx.storage.lock_board()?;
    let mut store = ctx.open_store()?;
    let id = store.resolve_id(id)?;

    let mut warnings = Vec::new();
    let mut stopped = None;
    let (session, kind) = match ctx.storage.load_timer()? {
        Some(session) if session.task_id == id && session.running => {
            return Err(Error::InvalidArgument(format!(
                "timer is already running for {id}"
            )));
        }
        Some(mut session) if session.task_id == id => {
            session.resume(now)?;
            (session, EventKind::TimerResumed)
        }
        Some(previous) => {
            let finished = previous.finish(now);
            if credit(&mut store, &finished)? {
                warnings.push(format!(
                    "stopped the timer on {} and credited {} min",
                    finished.task_id, finished.minutes
                ));
            }
            emit_event(ctx, EventKind::TimerStopped, &finished)?;
            stopped = Some(finished);
            (TimerSession::start(id.clone(), now), EventKind::TimerStarted)
        }
        None => (TimerSession::start(id.clone(), now), EventKind::TimerStarted),
    };

    ctx.storage.save_timer(Some(&session))?;
    ctx.sounds()?.play(SoundKind::TimerStart);
    let status = TimerStatus::of(&session, now);
    emit_event(ctx, kind, &status)?;

    let title = title_of(&store, &id);
    let mut human = HumanOutput::new(format!(
        "lb timer start: tracking \"{}\"",
        title.unwrap_or(id.as_str())
    ));
    human.push_summary("task", id.clone());
    human.push_summary("elapsed", status.elapsed.clone());
    for warning in warnings {
        human.push_warning(warning);
    }
    human.push_next_step("lb timer stop");

    emit_success(
        ctx.output,
        "timer start",
        &TimerReport {
            timer: Some(status),
            title,
            stopped: stopped.as_ref(),
        },
        Some(&human),
    )
}

pub fn run_stop(ctx: &Context) -> Result<()> {
    let now = ctx.clock().now();
    let _lock = ctx.storage.lock_board()?;
    let session = require_session(ctx)?;
    let mut store = ctx.open_store()?;

    let stopped = session.finish(now);
    let credited = credit(&mut store, &stopped)?;
    ctx.storage.save_timer(None)?;
    ctx.sounds()?.play(SoundKind::TimerStop);
    emit_event(ctx, EventKind::TimerStopped, &stopped)?;

    let title = title_of(&store, &stopped.task_id);
    let mut human = HumanOutput::new(format!(
        "lb timer stop: {} on \"{}\"",
        format_elapsed(stopped.elapsed_secs),
        title.unwrap_or(stopped.task_id.as_str())
    ));
    human.push_summary("task", stopped.task_id.clone());
    human.push_summary("credited minutes", stopped.minutes.to_string());
    if let Some(task) = store.get(&stopped.task_id) {
        human.push_summary("total minutes", task.time_spent.to_string());
    }
    if !credited {
        human.push_warning("task no longer exists; tracked time was discarded");
    } else if stopped.minutes == 0 {
        human.push_warning("less than a minute tracked; nothing credited");
    }

    emit_success(
        ctx.output,
        "timer stop",
        &TimerReport {
            timer: None,
            title,
            stopped: Some(&stopped),
        },
        Some(&human),
    )
}

pub fn run_pause(ctx: &Context) -> Result<()> {
    let now = ctx.clock().now();
    let _lock = ctx.storage.lock_board()?;
    let mut session = require_session(ctx)?;
    session.pause(now)?;
    ctx.storage.save_timer(Some(&session))?;
    emit_session(ctx, "timer pause", EventKind::TimerPaused, &session)
}

pub fn run_resume(ctx: &Context) -> Result<()> {
    let now = ctx.clock().now();
    let _lock = ctx.storage.lock_board()?;
    let mut session = require_session(ctx)?;
    session.resume(now)?;
    ctx.storage.save_timer(Some(&session))?;
    emit_session(ctx, "timer resume", EventKind::TimerResumed, &session)
}

fn emit_session(
    ctx: &Context,
    command: &str,
    kind: EventKind,
    session: &TimerSession,
) -> Result<()> {
    let status = TimerStatus::of(session, ctx.clock().now());
    emit_event(ctx, kind, &status)?;

    let tasks = ctx.storage.load_tasks()?;
    let title = tasks
        .iter()
        .find(|task| task.id == session.task_id)
        .map(|task| task.title.as_str());
    let state = if status.running { "running" } else { "paused" };
    let mut human = HumanOutput::new(format!("lb {command}: {state} at {}", status.elapsed));
    human.push_summary("task", status.task_id.clone());
    if let Some(title) = title {
        human.push_summary("title", title);
    }

    emit_success(
        ctx.output,
        command,
        &TimerReport {
            timer: Some(status),
            title,
            stopped: None,
        },
        Some(&human),
    )
}

pub fn run_status(ctx: &Context) -> Result<()> {
    let Some(session) = ctx.storage.load_timer()? else {
        let mut human = HumanOutput::new("lb timer status: idle");
        human.push_next_step("lb timer start <id>");
        return emit_success(
            ctx.output,
            "timer status",
            &TimerReport {
                timer: None,
                title: None,
                stopped: None,
            },
            Some(&human),
        );
    };

    let status = TimerStatus::of(&session, ctx.clock().now());
    let tasks = ctx.storage.load_tasks()?;
    let title = tasks
        .iter()
        .find(|task| task.id == session.task_id)
        .map(|task| task.title.as_str());
    let state = if status.running { "running" } else { "paused" };

    let mut human = HumanOutput::new(format!("lb timer status: {state}"));
    human.push_summary("task", status.task_id.clone());
    if let Some(title) = title {
        human.push_summary("title", title);
    }
    human.push_summary("elapsed", status.elapsed.clone());
    if title.is_none() {
        human.push_warning("task no longer exists");
    }

    emit_success(
        ctx.output,
        "timer status",
        &TimerReport {
            timer: Some(status),
            title,
            stopped: None,
        },
        Some(&human),
    )
}
