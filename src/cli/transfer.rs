//! lb export / lb import

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::Context;
use crate::error::{Error, Result};
use crate::lock;
use crate::output::{emit_success, HumanOutput};
use crate::transfer::{self, ExportFormat};

#[derive(Serialize)]
struct ExportReport {
    path: PathBuf,
    format: String,
    tasks: usize,
}

#[derive(Serialize)]
struct ImportReport<'a> {
    path: &'a Path,
    imported: usize,
    replaced: usize,
}

pub fn run_export(ctx: &Context, format: ExportFormat, output: Option<PathBuf>) -> Result<()> {
    let clock = ctx.clock();
    let tasks = ctx.storage.load_tasks()?;
    let mut content = match format {
        ExportFormat::Json => transfer::export_json(&tasks, clock.now())?,
        ExportFormat::Csv => transfer::export_csv(&tasks),
    };
    content.push('\n');

    // `-o -` streams the document itself, so there is no envelope to print.
    if output.as_deref() == Some(Path::new("-")) {
        let mut stdout = io::stdout().lock();
        stdout.write_all(content.as_bytes())?;
        stdout.flush()?;
        return Ok(());
    }

    let path = output
        .unwrap_or_else(|| PathBuf::from(transfer::default_file_name(format, clock.today())));
    lock::write_atomic(&path, content.as_bytes())?;
    tracing::debug!(path = %path.display(), count = tasks.len(), "exported tasks");

    let mut human = HumanOutput::new(format!(
        "lb export: wrote {} task(s) to {}",
        tasks.len(),
        path.display()
    ));
    human.push_summary("format", format.to_string());
    human.push_summary("path", path.display().to_string());
    if format == ExportFormat::Json {
        human.push_next_step(format!("lb import {}", path.display()));
    } else {
        human.push_detail("CSV exports cannot be imported back; use --format json for backups");
    }

    emit_success(
        ctx.output,
        "export",
        &ExportReport {
            path,
            format: format.to_string(),
            tasks: tasks.len(),
        },
        Some(&human),
    )
}

pub fn run_import(ctx: &Context, path: &Path) -> Result<()> {
    let text = fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => {
            Error::InvalidArgument(format!("import file not found: {}", path.display()))
        }
        _ => Error::Io(err),
    })?;

    let _lock = ctx.storage.lock_board()?;
    let mut store = ctx.open_store()?;
    let replaced = store.len();
    let imported = transfer::import_into(&mut store, &text)?;

    let mut human = HumanOutput::new(format!("lb import: imported {imported} task(s)"));
    human.push_summary("path", path.display().to_string());
    human.push_summary("imported", imported.to_string());
    if replaced > 0 {
        human.push_warning(format!("replaced {replaced} existing task(s)"));
    }
    human.push_next_step("lb board");

    emit_success(
        ctx.output,
        "import",
        &ImportReport {
            path,
            imported,
            replaced,
        },
        Some(&human),
    )
}
