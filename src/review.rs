//! Line-oriented review session.
//!
//! The session owns its cursor and current file; the store owns the data.
//! After every save the pending list is rebuilt from the store and the cursor
//! is clamped to it. A failed flush blocks the session until the reviewer
//! retries the flush or quits, so nothing moves on while storage lags.
use crate::dataset::{Decision, ExplanationKey};
use crate::guidelines::GuidelineTable;
use crate::policy::{PendingTask, TaskKind};
use crate::recorder::{
    LabelSet, NonPiiCategory, NonPiiSensitivity, PiiCategory, PiiSensitivity,
};
use crate::selector::{next_pending_file, pending_in_file, PendingUnit};
use crate::session::SessionCursor;
use crate::store::{SaveError, Store};
use crate::view::{write_guidelines, UnitView};
use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use std::io::{BufRead, Write};

const HELP: &str = "\
commands:
  n | next                 move to the next pending column in this file
  p | prev                 move to the previous pending column
  l PII PII_LEVEL NON_PII NON_PII_LEVEL
                           label the selected column (label task)
  a [KEY] | r [KEY]        agree / reject an explanation (vote task);
                           KEY may be omitted when only one is open
  g | guidelines           show the ISP guidelines for this file
  s | retry                retry a failed save
  q | quit                 end the session";

pub struct ReviewOptions {
    pub task: TaskKind,
    /// Stay within one file instead of walking the whole dataset.
    pub file: Option<String>,
    pub guidelines: Option<GuidelineTable>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    pub saved: usize,
    pub refused: usize,
    pub flush_failures: usize,
    /// No pending work remained when the session ended.
    pub finished: bool,
    /// The session ended with a change that only exists in memory.
    pub unsaved: bool,
}

enum Action {
    Next,
    Prev,
    Label(LabelSet),
    Vote(Option<ExplanationKey>, Decision),
    Guidelines,
    Retry,
    Help,
    Quit,
}

struct Session<'a> {
    store: &'a mut Store,
    options: &'a ReviewOptions,
    cursor: SessionCursor,
    file: Option<String>,
    pending: Vec<PendingUnit>,
    /// Set while the last save is only in memory.
    blocked: Option<String>,
    summary: ReviewSummary,
}

/// Run a review session reading commands from `input`.
pub fn run_review<R: BufRead, W: Write>(
    store: &mut Store,
    options: &ReviewOptions,
    mut input: R,
    out: &mut W,
) -> Result<ReviewSummary> {
    if let Some(file) = &options.file {
        if store.dataset().file(file).is_none() {
            return Err(anyhow!("unknown file {file:?}"));
        }
    }
    let mut session = Session {
        store,
        options,
        cursor: SessionCursor::new(),
        file: options.file.clone(),
        pending: Vec::new(),
        blocked: None,
        summary: ReviewSummary::default(),
    };
    let mut line = String::new();
    loop {
        if session.blocked.is_none() {
            session.refresh(out)?;
            let Some(unit) = session.cursor.current(&session.pending) else {
                session.summary.finished = true;
                match &session.file {
                    Some(file) if options.file.is_some() => {
                        writeln!(out, "no pending {} work in {file}", options.task)?
                    }
                    _ => writeln!(out, "all columns complete for {}", options.task)?,
                }
                break;
            };
            if let Some(view) = UnitView::build(session.store.dataset(), unit) {
                writeln!(
                    out,
                    "[{}/{}]",
                    session.cursor.index() + 1,
                    session.pending.len()
                )?;
                view.write_text(out)?;
            }
        }
        write!(out, "> ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line).context("read review command")? == 0 {
            writeln!(out)?;
            session.end(out)?;
            break;
        }
        let action = match parse_action(line.trim(), options.task) {
            Ok(Some(action)) => action,
            Ok(None) => continue,
            Err(message) => {
                writeln!(out, "{message}")?;
                continue;
            }
        };
        if matches!(action, Action::Quit) {
            session.end(out)?;
            break;
        }
        session.handle(action, out)?;
    }
    Ok(session.summary)
}

impl Session<'_> {
    /// Report a change that was never persisted before the session closes.
    fn end<W: Write>(&mut self, out: &mut W) -> Result<()> {
        if let Some(reason) = &self.blocked {
            self.summary.unsaved = true;
            writeln!(out, "the last change was NOT persisted ({reason}) and is discarded")?;
        }
        Ok(())
    }

    /// Rebuild the pending list from the store and clamp the cursor.
    fn refresh<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let task = self.options.task;
        if self.options.file.is_none() {
            let current_done = self
                .file
                .as_deref()
                .and_then(|file| pending_in_file(self.store.dataset(), file, task))
                .is_none_or(|pending| pending.is_empty());
            if current_done {
                let next = next_pending_file(self.store.dataset(), task).map(str::to_string);
                if next.is_some() && next != self.file {
                    self.file = next;
                    self.cursor.reset();
                    self.show_guidelines(out)?;
                }
            }
        }
        self.pending = self
            .file
            .as_deref()
            .and_then(|file| pending_in_file(self.store.dataset(), file, task))
            .unwrap_or_default();
        self.cursor.clamp(self.pending.len());
        Ok(())
    }

    fn show_guidelines<W: Write>(&self, out: &mut W) -> Result<()> {
        let (Some(table), Some(file)) = (&self.options.guidelines, &self.file) else {
            return Ok(());
        };
        if let Some(entry) = self.store.dataset().file(file) {
            let isp = &entry.metadata.isp_used;
            write_guidelines(out, isp, table.get(isp))?;
        }
        Ok(())
    }

    fn handle<W: Write>(&mut self, action: Action, out: &mut W) -> Result<()> {
        if let Some(reason) = &self.blocked {
            if !matches!(action, Action::Retry | Action::Help) {
                writeln!(
                    out,
                    "last save is not persisted ({reason}); use `retry` or `quit`"
                )?;
                return Ok(());
            }
        }
        match action {
            Action::Next => {
                if !self.cursor.forward(self.pending.len()) {
                    writeln!(out, "already at the last pending column")?;
                }
            }
            Action::Prev => {
                if !self.cursor.back() {
                    writeln!(out, "already at the first pending column")?;
                }
            }
            Action::Guidelines => {
                if self.options.guidelines.is_none() {
                    writeln!(out, "no guidelines loaded (pass --guidelines)")?;
                }
                self.show_guidelines(out)?;
            }
            Action::Help => writeln!(out, "{HELP}")?,
            Action::Retry if self.blocked.is_none() => writeln!(out, "nothing to retry")?,
            Action::Retry => match self.store.flush("Update annotations (retry)") {
                Ok(report) => {
                    self.blocked = None;
                    self.summary.saved += 1;
                    writeln!(out, "saved to {}", report.target)?;
                }
                Err(err) => {
                    self.summary.flush_failures += 1;
                    writeln!(out, "NOT SAVED: {err}")?;
                    self.blocked = Some(err.to_string());
                }
            },
            Action::Label(labels) => self.save_label(&labels, out)?,
            Action::Vote(key, decision) => self.save_vote(key, decision, out)?,
            Action::Quit => {}
        }
        Ok(())
    }

    fn save_label<W: Write>(&mut self, labels: &LabelSet, out: &mut W) -> Result<()> {
        let Some(unit) = self.cursor.current(&self.pending).cloned() else {
            return Ok(());
        };
        let PendingTask::Label { variant } = unit.task else {
            writeln!(out, "this session collects votes; use a/r")?;
            return Ok(());
        };
        let result = self
            .store
            .record_label(&unit.file, &unit.column, variant, labels, false)
            .map(|report| report.target);
        self.finish_save(result, out)
    }

    fn save_vote<W: Write>(
        &mut self,
        key: Option<ExplanationKey>,
        decision: Decision,
        out: &mut W,
    ) -> Result<()> {
        let Some(unit) = self.cursor.current(&self.pending).cloned() else {
            return Ok(());
        };
        let PendingTask::Vote { open_keys } = &unit.task else {
            writeln!(out, "this session collects labels; use l")?;
            return Ok(());
        };
        let key = match (key, open_keys.as_slice()) {
            (Some(key), _) => key,
            (None, [only]) => *only,
            (None, _) => {
                let keys = open_keys
                    .iter()
                    .map(|key| key.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(out, "several explanations are open; name one of: {keys}")?;
                return Ok(());
            }
        };
        let result = self
            .store
            .record_vote(&unit.file, &unit.column, key, decision)
            .map(|(_, report)| report.target);
        self.finish_save(result, out)
    }

    fn finish_save<W: Write>(
        &mut self,
        result: Result<String, SaveError>,
        out: &mut W,
    ) -> Result<()> {
        match result {
            Ok(target) => {
                self.summary.saved += 1;
                writeln!(out, "saved to {target}")?;
            }
            Err(SaveError::Record(err)) => {
                self.summary.refused += 1;
                writeln!(out, "refused: {err}")?;
            }
            Err(SaveError::Flush(err)) => {
                self.summary.flush_failures += 1;
                writeln!(out, "NOT SAVED: {err}")?;
                writeln!(out, "the change is held in memory; `retry` to persist it")?;
                self.blocked = Some(err.to_string());
            }
        }
        Ok(())
    }
}

fn parse_action(line: &str, task: TaskKind) -> Result<Option<Action>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();
    let action = match (command, rest.as_slice()) {
        ("n" | "next", []) => Action::Next,
        ("p" | "prev", []) => Action::Prev,
        ("g" | "guidelines", []) => Action::Guidelines,
        ("s" | "retry", []) => Action::Retry,
        ("q" | "quit", []) => Action::Quit,
        ("h" | "help" | "?", []) => Action::Help,
        ("l" | "label", [pii, pii_level, non_pii, non_pii_level]) if task == TaskKind::Label => {
            Action::Label(LabelSet {
                pii: PiiCategory::from_str(pii, true)?,
                pii_sensitivity_level: PiiSensitivity::from_str(pii_level, true)?,
                non_pii: NonPiiCategory::from_str(non_pii, true)?,
                non_pii_sensitivity_level: NonPiiSensitivity::from_str(non_pii_level, true)?,
            })
        }
        ("a" | "agree" | "r" | "reject", keys) if task == TaskKind::Vote && keys.len() <= 1 => {
            let decision = if command.starts_with('a') {
                Decision::Agree
            } else {
                Decision::Reject
            };
            let key = match keys.first() {
                Some(name) => Some(
                    ExplanationKey::parse(name)
                        .ok_or_else(|| format!("unknown explanation key {name:?}"))?,
                ),
                None => None,
            };
            Action::Vote(key, decision)
        }
        _ => return Err(format!("unrecognized command {line:?} (try `help`)")),
    };
    Ok(Some(action))
}
