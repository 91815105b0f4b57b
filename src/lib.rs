//! learnboard - Learning Task Board Library
//!
//! Core functionality for the `lb` CLI: a three-column kanban board for
//! tracking learning tasks, with analytics, time tracking and export/import.
//!
//! # Core Concepts
//!
//! - **Tasks**: Titled learning items with priority, due date, tags and notes
//! - **Columns**: `new`, `learning` and `completed`
//! - **Transitions**: Column moves that stamp or clear completion time
//! - **Analytics**: Completion rate, trends, productivity score and time analysis
//! - **Transfer**: JSON backups and CSV exports
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `learnboard.toml`
//! - `error`: Error types and result aliases
//! - `task`: Task model and validation
//! - `store`: In-memory task collection with change listeners
//! - `transition`: Column moves and drop targets
//! - `filter`: Search, quick filters and sorting
//! - `analytics`: Board statistics
//! - `transfer`: JSON/CSV export and JSON import
//! - `sound`: Sound settings and audible cues
//! - `timer`: Time tracking sessions
//! - `storage`: Data directory layout and persistence
//! - `lock`: File locking and atomic writes
//! - `ui`: Interactive terminal board

pub mod analytics;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod lock;
pub mod output;
pub mod sound;
pub mod storage;
pub mod store;
pub mod task;
pub mod timer;
pub mod transfer;
pub mod transition;
pub mod ui;

pub use error::{Error, Result};
