//! Command-line interface for lb
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::io;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::calendar::Clock;
use crate::config::{Config, CONFIG_FILE};
use crate::error::Result;
use crate::events::{EventDestination, EventSink};
use crate::filter::{PriorityFilter, QuickFilter, SortKey};
use crate::output::OutputOptions;
use crate::sound::{SoundDispatcher, SoundKind, TerminalBell};
use crate::storage::{default_data_dir, Storage};
use crate::store::TaskStore;
use crate::task::{TaskPriority, TaskStatus};
use crate::transfer::ExportFormat;

mod analytics;
mod board;
mod sound;
mod task;
mod timer;
mod transfer;

/// lb - learning board
///
/// A three-column kanban board for learning tasks with time tracking,
/// analytics and JSON/CSV export.
#[derive(Parser, Debug)]
#[command(name = "lb")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data directory)
    #[arg(long, global = true, env = "LEARNBOARD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Configuration file (defaults to learnboard.toml in the data directory)
    #[arg(long, global = true, env = "LEARNBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write board events as JSON lines to a file, or `-` for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a task
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,

        /// Starting column: new, learning, completed
        #[arg(long)]
        status: Option<TaskStatus>,

        /// Priority: high, medium, low
        #[arg(short, long)]
        priority: Option<TaskPriority>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Edit task fields
    Edit {
        /// Task id or unique prefix
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// Move to another column
        #[arg(long)]
        status: Option<TaskStatus>,

        /// New priority
        #[arg(short, long)]
        priority: Option<TaskPriority>,

        /// New due date (YYYY-MM-DD, or `none` to clear)
        #[arg(long)]
        due: Option<String>,

        /// Replace tags (comma-separated, empty to clear)
        #[arg(short, long)]
        tags: Option<String>,

        /// Replace notes (empty to clear)
        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a task
    Rm {
        /// Task id or unique prefix
        id: String,
    },

    /// Move a task onto a column or onto another task's column
    Move {
        /// Task id or unique prefix
        id: String,

        /// Column (new, learning, completed) or another task's id
        target: String,
    },

    /// Mark a task completed
    Done {
        /// Task id or unique prefix
        id: String,
    },

    /// Remove all completed tasks
    Archive,

    /// List tasks through the search/filter/sort pipeline
    List(FilterArgs),

    /// Show the three board columns
    Board(FilterArgs),

    /// Show one task
    Show {
        /// Task id or unique prefix
        id: String,
    },

    /// Set the minutes spent on a task
    Time {
        /// Task id or unique prefix
        id: String,

        /// Total minutes spent
        minutes: u32,
    },

    /// Analytics report
    Stats {
        /// Days in the completion trend (defaults to analytics.trend_days)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Export all tasks
    Export {
        /// Output format: json or csv
        #[arg(short, long, default_value_t = ExportFormat::Json)]
        format: ExportFormat,

        /// Output path (`-` for stdout; defaults to learning-tasks-<date>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all tasks with the contents of a JSON export
    Import {
        /// Path to a file produced by `lb export --format json`
        path: PathBuf,
    },

    /// Time tracking
    #[command(subcommand)]
    Timer(TimerCommands),

    /// Sound feedback settings
    #[command(subcommand)]
    Sound(SoundCommands),

    /// Interactive board
    Tui,
}

/// Search, filter and sort flags shared by `list` and `board`
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Case-insensitive text matched against title, description and tags
    #[arg(short, long)]
    pub search: Option<String>,

    /// Quick filter: all, today, overdue, high-priority, has-notes
    #[arg(long, default_value_t = QuickFilter::All)]
    pub filter: QuickFilter,

    /// Priority filter: all, high, medium, low
    #[arg(short, long, default_value_t = PriorityFilter::All)]
    pub priority: PriorityFilter,

    /// Only tasks carrying one of these tags (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Sort: newest, oldest, priority, due_date, alphabetical, board
    #[arg(long)]
    pub sort: Option<SortKey>,
}

/// Timer subcommands
#[derive(Subcommand, Debug)]
pub enum TimerCommands {
    /// Start tracking time on a task
    Start {
        /// Task id or unique prefix
        id: String,
    },

    /// Stop tracking and credit whole minutes to the task
    Stop,

    /// Pause the running timer
    Pause,

    /// Resume a paused timer
    Resume,

    /// Show the active timer
    Status,
}

/// Sound subcommands
#[derive(Subcommand, Debug)]
pub enum SoundCommands {
    /// Show sound settings
    Show,

    /// Change sound settings
    Set {
        /// Master switch (on/off)
        #[arg(long, value_parser = sound::parse_switch)]
        enabled: Option<bool>,

        /// Volume between 0 and 1
        #[arg(long)]
        volume: Option<f64>,

        /// Sound when a task is completed (on/off)
        #[arg(long, value_parser = sound::parse_switch)]
        task_complete: Option<bool>,

        /// Sound when a task changes column (on/off)
        #[arg(long, value_parser = sound::parse_switch)]
        task_move: Option<bool>,

        /// Sound when a task is created (on/off)
        #[arg(long, value_parser = sound::parse_switch)]
        task_create: Option<bool>,

        /// Sound when a task is deleted (on/off)
        #[arg(long, value_parser = sound::parse_switch)]
        task_delete: Option<bool>,

        /// Sound when a timer starts (on/off)
        #[arg(long, value_parser = sound::parse_switch)]
        timer_start: Option<bool>,

        /// Sound when a timer stops (on/off)
        #[arg(long, value_parser = sound::parse_switch)]
        timer_stop: Option<bool>,
    },

    /// Play one sound regardless of its toggle
    Test {
        /// task-complete, task-move, task-create, task-delete, timer-start, timer-stop
        kind: SoundKind,
    },
}

/// Resolved global state shared by every command.
pub(crate) struct Context {
    pub storage: Storage,
    pub config: Config,
    pub output: OutputOptions,
    events: Option<EventDestination>,
}

impl Context {
    fn open(
        data_dir: Option<PathBuf>,
        config_path: Option<PathBuf>,
        json: bool,
        quiet: bool,
        events: Option<&str>,
    ) -> Result<Self> {
        let root = match data_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        let config_path = config_path.unwrap_or_else(|| root.join(CONFIG_FILE));
        let config = Config::load_or_default(&config_path)?;
        let storage = Storage::new(root, config.storage.lock_timeout_ms);
        let events = EventDestination::parse(events);
        // JSON output and a stdout event stream would interleave.
        let json = json && events != Some(EventDestination::Stdout);
        tracing::debug!(root = %storage.root().display(), "opened data directory");

        Ok(Self {
            storage,
            config,
            output: OutputOptions { json, quiet },
            events,
        })
    }

    pub fn clock(&self) -> Clock {
        Clock::system(self.config.board.calendar)
    }

    pub fn sounds(&self) -> Result<SoundDispatcher<TerminalBell<io::Stderr>>> {
        let mut settings = self.storage.load_sound_settings()?;
        if self.output.quiet {
            settings.enabled = false;
        }
        Ok(SoundDispatcher::new(settings, TerminalBell::stderr()))
    }

    pub fn event_sink(&self) -> Result<Option<EventSink>> {
        self.events.as_ref().map(EventDestination::open).transpose()
    }

    /// Store with persistence, sound and event listeners subscribed.
    pub fn open_store(&self) -> Result<TaskStore> {
        let mut store = self.storage.open_store()?;
        store.subscribe(self.sounds()?);
        if let Some(sink) = self.event_sink()? {
            store.subscribe(sink);
        }
        Ok(store)
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let ctx = Context::open(
            self.data_dir,
            self.config,
            self.json,
            self.quiet,
            self.events.as_deref(),
        )?;

        match self.command {
            Commands::Add {
                title,
                description,
                status,
                priority,
                due,
                tags,
                notes,
            } => task::run_add(
                &ctx,
                task::AddOptions {
                    title,
                    description,
                    status,
                    priority,
                    due,
                    tags,
                    notes,
                },
            ),
            Commands::Edit {
                id,
                title,
                description,
                status,
                priority,
                due,
                tags,
                notes,
            } => task::run_edit(
                &ctx,
                task::EditOptions {
                    id,
                    title,
                    description,
                    status,
                    priority,
                    due,
                    tags,
                    notes,
                },
            ),
            Commands::Rm { id } => task::run_rm(&ctx, &id),
            Commands::Move { id, target } => task::run_move(&ctx, &id, &target),
            Commands::Done { id } => task::run_done(&ctx, &id),
            Commands::Archive => task::run_archive(&ctx),
            Commands::Show { id } => task::run_show(&ctx, &id),
            Commands::Time { id, minutes } => task::run_time(&ctx, &id, minutes),
            Commands::List(filters) => board::run_list(&ctx, filters),
            Commands::Board(filters) => board::run_board(&ctx, filters),
            Commands::Stats { days } => analytics::run_stats(&ctx, days),
            Commands::Export { format, output } => transfer::run_export(&ctx, format, output),
            Commands::Import { path } => transfer::run_import(&ctx, &path),
            Commands::Timer(cmd) => match cmd {
                TimerCommands::Start { id } => timer::run_start(&ctx, &id),
                TimerCommands::Stop => timer::run_stop(&ctx),
                TimerCommands::Pause => timer::run_pause(&ctx),
                TimerCommands::Resume => timer::run_resume(&ctx),
                TimerCommands::Status => timer::run_status(&ctx),
            },
            Commands::Sound(cmd) => match cmd {
                SoundCommands::Show => sound::run_show(&ctx),
                SoundCommands::Set {
                    enabled,
                    volume,
                    task_complete,
                    task_move,
                    task_create,
                    task_delete,
                    timer_start,
                    timer_stop,
                } => sound::run_set(
                    &ctx,
                    sound::SetOptions {
                        enabled,
                        volume,
                        toggles: vec![
                            (SoundKind::TaskComplete, task_complete),
                            (SoundKind::TaskMove, task_move),
                            (SoundKind::TaskCreate, task_create),
                            (SoundKind::TaskDelete, task_delete),
                            (SoundKind::TimerStart, timer_start),
                            (SoundKind::TimerStop, timer_stop),
                        ],
                    },
                ),
                SoundCommands::Test { kind } => sound::run_test(&ctx, kind),
            },
            Commands::Tui => crate::ui::board::run(&ctx.storage, &ctx.config),
        }
    }
}
