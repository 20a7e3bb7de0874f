//! Command runners: open the store, do one step, print the result.
use crate::cli::{
    DataArgs, GuidelinesArgs, LabelArgs, MigrateArgs, NextArgs, PendingArgs, ReviewArgs,
    StatusArgs, VoteArgs,
};
use crate::config::RemoteConfig;
use crate::dataset::Variant;
use crate::guidelines::GuidelineTable;
use crate::migrate::migrate;
use crate::policy::TaskKind;
use crate::recorder::LabelSet;
use crate::review::{run_review, ReviewOptions};
use crate::selector::{next_pending_file, pending_in_file, progress, TaskProgress};
use crate::store::Store;
use crate::sync::SyncTarget;
use crate::view::{write_guidelines, UnitView};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::io::{self, Write};

/// Resolve the sync target and load the dataset.
fn open_store(args: &DataArgs) -> Result<Store> {
    let remote = match RemoteConfig::resolve(&args.overrides()) {
        Ok(config) => Some(config),
        Err(missing) if args.require_remote => return Err(missing.into()),
        Err(missing) => {
            if missing.partial {
                tracing::warn!(
                    error = %missing,
                    data = %args.data.display(),
                    "remote sync partially configured; using local file"
                );
            } else {
                tracing::info!(data = %args.data.display(), "remote sync not configured");
            }
            None
        }
    };
    Store::open(SyncTarget::from_config(&args.data, remote))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{text}");
    Ok(())
}

fn write_next<W: Write>(out: &mut W, store: &Store, task: TaskKind) -> Result<()> {
    match store.next_pending(task) {
        Some(unit) => {
            if let Some(view) = UnitView::build(store.dataset(), &unit) {
                writeln!(out, "next:")?;
                view.write_text(out)?;
            }
        }
        None => writeln!(out, "all columns complete for {task}")?,
    }
    Ok(())
}

pub fn run_next(args: NextArgs) -> Result<()> {
    let store = open_store(&args.data)?;
    let unit = store.next_pending(args.task);
    if args.json {
        let view = unit
            .as_ref()
            .and_then(|unit| UnitView::build(store.dataset(), unit));
        return print_json(&view);
    }
    match unit.and_then(|unit| UnitView::build(store.dataset(), &unit)) {
        Some(view) => view.write_text(&mut io::stdout().lock())?,
        None => println!("all columns complete for {}", args.task),
    }
    Ok(())
}

pub fn run_pending(args: PendingArgs) -> Result<()> {
    let store = open_store(&args.data)?;
    let file = match &args.file {
        Some(file) => Some(file.as_str()),
        None => next_pending_file(store.dataset(), args.task),
    };
    let units = match file {
        Some(file) => pending_in_file(store.dataset(), file, args.task)
            .ok_or_else(|| anyhow!("unknown file {file:?}"))?,
        None => Vec::new(),
    };
    if args.json {
        return print_json(&units);
    }
    let Some(file) = file else {
        println!("all columns complete for {}", args.task);
        return Ok(());
    };
    if units.is_empty() {
        println!("no pending {} work in {file}", args.task);
        return Ok(());
    }
    println!("{file}: {} pending", units.len());
    for unit in &units {
        println!("  {}: {}", unit.column, unit.task);
    }
    Ok(())
}

pub fn run_label(args: LabelArgs) -> Result<()> {
    let mut store = open_store(&args.data)?;
    let variant = Variant::try_from(args.variant).map_err(|err| anyhow!(err))?;
    let labels = LabelSet {
        pii: args.pii,
        pii_sensitivity_level: args.pii_level,
        non_pii: args.non_pii,
        non_pii_sensitivity_level: args.non_pii_level,
    };
    let report = store.record_label(&args.file, &args.column, variant, &labels, args.amend)?;
    let mut out = io::stdout().lock();
    writeln!(
        out,
        "saved {}/{} variant {variant} to {}",
        args.file, args.column, report.target
    )?;
    write_next(&mut out, &store, TaskKind::Label)
}

pub fn run_vote(args: VoteArgs) -> Result<()> {
    let mut store = open_store(&args.data)?;
    let (tally, report) = store.record_vote(&args.file, &args.column, args.key, args.decision)?;
    let mut out = io::stdout().lock();
    writeln!(
        out,
        "saved {} on {}/{} ({} agree / {} reject) to {}",
        args.decision.as_str(),
        args.file,
        args.column,
        tally.agree,
        tally.reject,
        report.target
    )?;
    write_next(&mut out, &store, TaskKind::Vote)
}

#[derive(Serialize)]
struct StatusReport {
    source: String,
    files: usize,
    columns: usize,
    tasks: Vec<TaskStatus>,
}

#[derive(Serialize)]
struct TaskStatus {
    #[serde(flatten)]
    progress: TaskProgress,
    next: Option<UnitView>,
}

pub fn run_status(args: StatusArgs) -> Result<()> {
    let store = open_store(&args.data)?;
    let dataset = store.dataset();
    let tasks: Vec<TaskStatus> = [TaskKind::Label, TaskKind::Vote]
        .into_iter()
        .map(|task| TaskStatus {
            progress: progress(dataset, task),
            next: store
                .next_pending(task)
                .and_then(|unit| UnitView::build(dataset, &unit)),
        })
        .collect();
    let report = StatusReport {
        source: store.target().describe(),
        files: dataset.files.len(),
        columns: dataset.column_count(),
        tasks,
    };
    if args.json {
        return print_json(&report);
    }

    let mut out = io::stdout().lock();
    writeln!(
        out,
        "{}: {} files, {} columns",
        report.source, report.files, report.columns
    )?;
    for task in &report.tasks {
        let progress = &task.progress;
        let unit = match progress.task {
            TaskKind::Label => "label passes",
            TaskKind::Vote => "votes",
        };
        writeln!(
            out,
            "{}: {}/{} columns complete, {} {unit} outstanding",
            progress.task, progress.complete_columns, progress.total_columns, progress.outstanding
        )?;
        match &task.next {
            Some(view) => writeln!(
                out,
                "  next: {}/{} ({})",
                view.unit.file, view.unit.column, view.unit.task
            )?,
            None if progress.is_done() => writeln!(out, "  done")?,
            None => {}
        }
    }
    Ok(())
}

pub fn run_guidelines(args: GuidelinesArgs) -> Result<()> {
    let table = GuidelineTable::load(&args.guidelines)?;
    let mut out = io::stdout().lock();
    match &args.isp {
        Some(isp) => {
            let guidelines = table.get(isp);
            if guidelines.is_none() {
                tracing::warn!(isp = %isp, path = %args.guidelines.display(), "unknown ISP");
            }
            write_guidelines(&mut out, isp, guidelines)?;
        }
        None => {
            writeln!(out, "ISPs in {}:", args.guidelines.display())?;
            for name in table.names() {
                writeln!(out, "  {name}")?;
            }
        }
    }
    Ok(())
}

pub fn run_review_command(args: ReviewArgs) -> Result<()> {
    let mut store = open_store(&args.data)?;
    let guidelines = if args.guidelines.is_file() {
        Some(GuidelineTable::load(&args.guidelines)?)
    } else {
        tracing::info!(path = %args.guidelines.display(), "guidelines file not found");
        None
    };
    let options = ReviewOptions {
        task: args.task,
        file: args.file,
        guidelines,
    };
    let stdin = io::stdin().lock();
    let mut out = io::stdout().lock();
    let summary = run_review(&mut store, &options, stdin, &mut out)?;
    tracing::info!(
        saved = summary.saved,
        refused = summary.refused,
        flush_failures = summary.flush_failures,
        finished = summary.finished,
        unsaved = summary.unsaved,
        "review session ended"
    );
    writeln!(
        out,
        "session: {} saved, {} refused, {} failed saves",
        summary.saved, summary.refused, summary.flush_failures
    )?;
    if summary.unsaved {
        return Err(anyhow!(
            "review ended with a change that was not persisted to {}",
            store.target().describe()
        ));
    }
    Ok(())
}

pub fn run_migrate(args: MigrateArgs) -> Result<()> {
    let mut store = open_store(&args.data)?;
    let mut preview = store.dataset().clone();
    let report = migrate(&mut preview);
    if report.changed() && !args.dry_run {
        let flushed = store.update("Migrate annotation schema", |dataset| {
            migrate(dataset);
        })?;
        tracing::info!(dest = %flushed.target, bytes = flushed.bytes, "migration flushed");
    }
    if args.json {
        return print_json(&report);
    }
    let verb = if args.dry_run { "would promote" } else { "promoted" };
    println!("{verb} {} columns to variant 1", report.promoted.len());
    for column in &report.skipped {
        println!(
            "  skipped {}/{}: incomplete legacy labels",
            column.file, column.column
        );
    }
    if !report.legacy_counters.is_empty() {
        println!(
            "  {} columns carry global agreed/rejected counters (left as is)",
            report.legacy_counters.len()
        );
    }
    Ok(())
}
