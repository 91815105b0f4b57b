//! lb task commands
//!
//! Single-task mutations (`add`, `edit`, `rm`, `move`, `done`, `time`),
//! `archive`, and the read-only `show`.

use chrono::NaiveDate;
use serde::Serialize;

use crate::cli::Context;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::store::TaskStore;
use crate::task::{
    due_date_format, format_minutes, parse_tag_list, NewTask, Task, TaskPatch, TaskPriority,
    TaskStatus,
};
use crate::transition::{self, TransitionSignal};

/// Options for `lb add`
pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due: Option<String>,
    pub tags: Option<String>,
    pub notes: Option<String>,
}

/// Options for `lb edit`
pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due: Option<String>,
    pub tags: Option<String>,
    pub notes: Option<String>,
}

#[derive(Serialize)]
struct TaskReport<'a> {
    task: &'a Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    transition: Option<&'a TransitionSignal>,
}

#[derive(Serialize)]
struct DeleteReport {
    deleted: Task,
}

#[derive(Serialize)]
struct ArchiveReport {
    removed: usize,
    remaining: usize,
}

#[derive(Serialize)]
struct ShowReport<'a> {
    task: &'a Task,
    overdue: bool,
    progress: f64,
}

fn parse_due(value: &str) -> Result<NaiveDate> {
    due_date_format::parse(value.trim()).map_err(Error::InvalidArgument)
}

/// `none` or an empty value clears the due date.
fn parse_due_patch(value: &str) -> Result<Option<NaiveDate>> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    parse_due(trimmed).map(Some)
}

fn open_resolved(ctx: &Context, id: &str) -> Result<(TaskStore, String)> {
    let store = ctx.open_store()?;
    let resolved = store.resolve_id(id)?;
    Ok((store, resolved))
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("id", task.id.clone());
    human.push_summary("status", task.status.as_str());
    human.push_summary("priority", task.priority.as_str());
    if let Some(due) = task.due_date {
        human.push_summary("due", due.format("%Y-%m-%d").to_string());
    }
    if !task.tags.is_empty() {
        human.push_summary("tags", task.tags.join(", "));
    }
}

fn describe_signal(signal: Option<&TransitionSignal>, task: &Task) -> String {
    match signal {
        Some(TransitionSignal::Completed { from, .. }) => {
            format!("{} -> completed", from.as_str())
        }
        Some(TransitionSignal::Moved { from, to, .. }) => {
            format!("{} -> {}", from.as_str(), to.as_str())
        }
        None => format!("already in {}", task.status.as_str()),
    }
}

pub fn run_add(ctx: &Context, options: AddOptions) -> Result<()> {
    let clock = ctx.clock();
    let due_date = options.due.as_deref().map(parse_due).transpose()?;
    let input = NewTask {
        title: options.title,
        description: options.description.unwrap_or_default(),
        status: options.status,
        priority: Some(options.priority.unwrap_or(ctx.config.board.default_priority)),
        due_date,
        tags: options.tags.as_deref().map(parse_tag_list).unwrap_or_default(),
        notes: options.notes,
    };

    let _lock = ctx.storage.lock_board()?;
    let mut store = ctx.open_store()?;
    let task = store.create(input, clock.now())?;

    let mut human = HumanOutput::new(format!("lb add: created \"{}\"", task.title));
    push_task_summary(&mut human, &task);
    if task.is_overdue(clock.today()) {
        human.push_warning("due date is already in the past");
    }
    if task.status != TaskStatus::Completed {
        human.push_next_step(format!("lb timer start {}", task.id));
    }

    emit_success(
        ctx.output,
        "add",
        &TaskReport {
            task: &task,
            transition: None,
        },
        Some(&human),
    )
}

pub fn run_edit(ctx: &Context, options: EditOptions) -> Result<()> {
    let patch = TaskPatch {
        title: options.title,
        description: options.description,
        status: options.status,
        priority: options.priority,
        due_date: options.due.as_deref().map(parse_due_patch).transpose()?,
        tags: options.tags.as_deref().map(parse_tag_list),
        notes: options
            .notes
            .map(|notes| (!notes.trim().is_empty()).then_some(notes)),
    };
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to edit; pass at least one field flag".to_string(),
        ));
    }

    let clock = ctx.clock();
    let _lock = ctx.storage.lock_board()?;
    let (mut store, id) = open_resolved(ctx, &options.id)?;
    let (task, signal) = store.edit(&id, &patch, clock.now())?;

    let mut human = HumanOutput::new(format!("lb edit: updated \"{}\"", task.title));
    push_task_summary(&mut human, &task);
    if let Some(signal) = signal.as_ref() {
        human.push_detail(describe_signal(Some(signal), &task));
    }

    emit_success(
        ctx.output,
        "edit",
        &TaskReport {
            task: &task,
            transition: signal.as_ref(),
        },
        Some(&human),
    )
}

pub fn run_rm(ctx: &Context, id: &str) -> Result<()> {
    let _lock = ctx.storage.lock_board()?;
    let (mut store, id) = open_resolved(ctx, id)?;
    let deleted = store.delete(&id)?;

    let mut human = HumanOutput::new(format!("lb rm: deleted \"{}\"", deleted.title));
    human.push_summary("id", deleted.id.clone());
    human.push_summary("remaining", store.len().to_string());

    emit_success(ctx.output, "rm", &DeleteReport { deleted }, Some(&human))
}

/// `target` is a column id or another task (by id or prefix).
pub fn run_move(ctx: &Context, id: &str, target: &str) -> Result<()> {
    let clock = ctx.clock();
    let _lock = ctx.storage.lock_board()?;
    let (mut store, id) = open_resolved(ctx, id)?;
    let over_id = match TaskStatus::from_column_id(target.trim()) {
        Some(status) => status.as_str().to_string(),
        None => store.resolve_id(target)?,
    };

    let signal = transition::drop_task(&mut store, &id, &over_id, clock.now())?;
    let task = store
        .get(&id)
        .cloned()
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;
    emit_transition(ctx, "move", &task, signal.as_ref())
}

pub fn run_done(ctx: &Context, id: &str) -> Result<()> {
    let clock = ctx.clock();
    let _lock = ctx.storage.lock_board()?;
    let (mut store, id) = open_resolved(ctx, id)?;
    let signal = store.set_status(&id, TaskStatus::Completed, clock.now())?;
    let task = store
        .get(&id)
        .cloned()
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;
    emit_transition(ctx, "done", &task, signal.as_ref())
}

fn emit_transition(
    ctx: &Context,
    command: &str,
    task: &Task,
    signal: Option<&TransitionSignal>,
) -> Result<()> {
    let mut human = HumanOutput::new(format!(
        "lb {command}: \"{}\" {}",
        task.title,
        describe_signal(signal, task)
    ));
    human.push_summary("id", task.id.clone());
    human.push_summary("status", task.status.as_str());
    if let Some(completed_at) = task.completed_at {
        human.push_summary("completed", completed_at.to_rfc3339());
    }
    if signal.is_none() {
        human.push_warning("status unchanged");
    }

    emit_success(
        ctx.output,
        command,
        &TaskReport {
            task,
            transition: signal,
        },
        Some(&human),
    )
}

pub fn run_archive(ctx: &Context) -> Result<()> {
    let _lock = ctx.storage.lock_board()?;
    let mut store = ctx.open_store()?;
    let removed = store.archive_completed()?;

    let header = if removed == 0 {
        "lb archive: no completed tasks".to_string()
    } else {
        format!("lb archive: removed {removed} completed task(s)")
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("remaining", store.len().to_string());

    emit_success(
        ctx.output,
        "archive",
        &ArchiveReport {
            removed,
            remaining: store.len(),
        },
        Some(&human),
    )
}

pub fn run_time(ctx: &Context, id: &str, minutes: u32) -> Result<()> {
    let _lock = ctx.storage.lock_board()?;
    let (mut store, id) = open_resolved(ctx, id)?;
    let task = store.set_time_spent(&id, minutes)?;

    let mut human = HumanOutput::new(format!(
        "lb time: \"{}\" now at {}",
        task.title,
        format_minutes(task.time_spent)
    ));
    human.push_summary("id", task.id.clone());
    human.push_summary("minutes", task.time_spent.to_string());

    emit_success(
        ctx.output,
        "time",
        &TaskReport {
            task: &task,
            transition: None,
        },
        Some(&human),
    )
}

pub fn run_show(ctx: &Context, id: &str) -> Result<()> {
    let clock = ctx.clock();
    let store = TaskStore::new(ctx.storage.load_tasks()?);
    let id = store.resolve_id(id)?;
    let task = store
        .get(&id)
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;
    let overdue = task.is_overdue(clock.today());

    let mut human = HumanOutput::new(format!("lb show: {}", task.title));
    push_task_summary(&mut human, task);
    human.push_summary("created", task.created_at.to_rfc3339());
    if let Some(completed_at) = task.completed_at {
        human.push_summary("completed", completed_at.to_rfc3339());
    }
    human.push_summary("time spent", format_minutes(task.time_spent));
    human.push_summary("progress", format!("{:.0}%", task.progress()));
    if !task.description.is_empty() {
        human.push_detail(task.description.clone());
    }
    if let Some(notes) = task.notes.as_deref() {
        human.push_detail(format!("notes: {notes}"));
    }
    if overdue {
        human.push_warning("overdue");
    }

    emit_success(
        ctx.output,
        "show",
        &ShowReport {
            task,
            overdue,
            progress: task.progress(),
        },
        Some(&human),
    )
}
