use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::backend::{delete_until_terminal, RemoteBackend};
use crate::config::CleanerConfig;
use crate::diff::diff_by_key;
use crate::display::DeletionScreen;
use crate::error::{CleanerError, RenderError};
use crate::executor::BatchExecutor;
use crate::jobs::{BatchSnapshot, JobState, WorkItem};
use crate::render::{Renderer, TermSink};

/// Columns kept free on the right of labels in the final report.
const REPORT_MARGIN: u16 = 20;

/// Terminal used for the progress display, opened once deletion starts.
pub struct Screen<S: TermSink> {
    pub renderer: Renderer<S>,
    pub columns: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDeletion {
    pub id: String,
    pub label: String,
    pub error: CleanerError,
}

/// Result of a batch that ran to completion.
#[derive(Debug, Clone)]
pub struct PurgeReport {
    pub total: usize,
    pub deleted: usize,
    pub cancelled: usize,
    pub failures: Vec<FailedDeletion>,
    pub elapsed: Duration,
}

impl PurgeReport {
    pub fn from_snapshot<T: WorkItem>(snapshot: &BatchSnapshot<T>, label_width: usize) -> Self {
        let mut deleted = 0;
        let mut cancelled = 0;
        for (_, state) in snapshot.jobs() {
            match state {
                JobState::Finished => deleted += 1,
                JobState::Cancelled => cancelled += 1,
                _ => {}
            }
        }

        let failures = snapshot
            .failures()
            .into_iter()
            .map(|(item, error)| FailedDeletion {
                id: item.id().to_string(),
                label: item.label(label_width),
                error: error.clone(),
            })
            .collect();

        Self {
            total: snapshot.total,
            deleted,
            cancelled,
            failures,
            elapsed: snapshot.elapsed,
        }
    }
}

#[derive(Debug, Clone)]
pub enum PurgeOutcome {
    /// The keep-set was empty, nothing was attempted.
    NothingToKeep,
    NothingToDelete,
    Declined,
    Completed(PurgeReport),
}

/// Deletes every object of a backend that is not in its keep-set.
pub struct Purger<B: RemoteBackend> {
    backend: Arc<B>,
    config: CleanerConfig,
    cancel: CancellationToken,
}

impl<B: RemoteBackend> Purger<B> {
    pub fn new(backend: B, config: CleanerConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancelling `token` stops the batch: queued objects are skipped and
    /// running deletions stop polling.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Objects present on the server and absent from the keep-set.
    ///
    /// Returns `None` when the keep-set is empty: deleting everything is
    /// almost certainly a listing bug.
    pub async fn plan<W: Write>(&self, output: &mut W) -> Result<Option<Vec<B::Item>>> {
        let noun = self.backend.noun();

        write!(output, "Fetching {} to keep... ", noun)?;
        output.flush()?;
        let keep = self
            .backend
            .list_keep()
            .await
            .with_context(|| format!("Failed to list the {} to keep", noun))?;
        writeln!(output, "OK")?;

        if keep.is_empty() {
            warn!("Empty keep-set, refusing to purge");
            return Ok(None);
        }

        write!(output, "Fetching all {}... ", noun)?;
        output.flush()?;
        let all = self
            .backend
            .list_all()
            .await
            .with_context(|| format!("Failed to list all {}", noun))?;
        writeln!(output, "OK")?;

        writeln!(
            output,
            "{} {} to keep, {} {} in total.",
            keep.len(),
            noun,
            all.len(),
            noun
        )?;

        Ok(Some(diff_by_key(
            all,
            &keep,
            |item| item.id().to_string(),
            |id| id.clone(),
        )))
    }

    /// Full purge: plan, confirm on `input`, delete with a live display.
    ///
    /// `open_screen` is only called once the user confirmed.
    pub async fn run<R, W, S, F>(
        &self,
        input: &mut R,
        output: &mut W,
        open_screen: F,
    ) -> Result<PurgeOutcome>
    where
        R: BufRead,
        W: Write,
        S: TermSink,
        F: FnOnce() -> std::result::Result<Screen<S>, RenderError>,
    {
        let noun = self.backend.noun();

        let Some(to_delete) = self.plan(output).await? else {
            writeln!(
                output,
                "The keep-set is empty, refusing to delete all {}.",
                noun
            )?;
            return Ok(PurgeOutcome::NothingToKeep);
        };

        if to_delete.is_empty() {
            writeln!(output, "No {} to delete.", noun)?;
            return Ok(PurgeOutcome::NothingToDelete);
        }

        if !confirm(input, output, to_delete.len(), noun)? {
            writeln!(output, "Stopping there.")?;
            return Ok(PurgeOutcome::Declined);
        }

        let screen = open_screen().context("Cannot display progress")?;
        let report = self.execute(to_delete, screen, output).await?;
        Ok(PurgeOutcome::Completed(report))
    }

    /// Delete `items`, repainting the screen every display tick, then print
    /// the failures.
    pub async fn execute<W, S>(
        &self,
        items: Vec<B::Item>,
        screen: Screen<S>,
        output: &mut W,
    ) -> Result<PurgeReport>
    where
        W: Write,
        S: TermSink,
    {
        let Screen {
            mut renderer,
            columns,
        } = screen;

        writeln!(output, "Deleting {} {}...\n", items.len(), self.backend.noun())?;
        output.flush()?;

        let backend = self.backend.clone();
        let poll_interval = self.config.poll_interval();
        let executor = BatchExecutor::spawn(
            items,
            self.config.max_concurrent_jobs,
            move |item, token| {
                let backend = backend.clone();
                async move { delete_until_terminal(&*backend, &item, poll_interval, &token).await }
            },
        )?;

        let mut display = DeletionScreen::new(executor.len(), columns, self.config.status_margin);
        let mut cancelled = false;
        let snapshot = loop {
            let snapshot = executor.snapshot();
            if let Err(e) = display.paint(&snapshot, &mut renderer) {
                // Running deletions stop at their next poll before we bail out
                warn!("Progress display failed, cancelling batch: {}", e);
                executor.cancel();
                executor.wait(self.config.tick_interval()).await;
                if let Err(exit_err) = renderer.exit() {
                    warn!("Cannot restore the terminal: {}", exit_err);
                }
                return Err(e).context("Cannot display progress");
            }
            if snapshot.is_done() {
                break snapshot;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.tick_interval()) => {}
                _ = self.cancel.cancelled(), if !cancelled => {
                    executor.cancel();
                    cancelled = true;
                }
            }
        };
        renderer.exit()?;

        let report = PurgeReport::from_snapshot(&snapshot, columns.saturating_sub(REPORT_MARGIN) as usize);
        info!(
            "Batch done in {:?}: {} deleted, {} failed, {} cancelled",
            report.elapsed,
            report.deleted,
            report.failures.len(),
            report.cancelled
        );

        write_report(output, &report, self.backend.noun())?;
        if let Some(hint) = self.backend.completion_hint() {
            writeln!(output, "Task done. {}", hint)?;
        }
        output.flush()?;

        Ok(report)
    }
}

/// Ask for a literal `yes`. Anything else, including end of input, declines.
pub fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    count: usize,
    noun: &str,
) -> io::Result<bool> {
    write!(
        output,
        "\nYou are about to *PERMANENTLY* delete {} {}, do you want to proceed?\n\
         Anything else than \"yes\" will stop the process: ",
        count, noun
    )?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim_end_matches(['\r', '\n']) == "yes")
}

pub fn write_report<W: Write>(output: &mut W, report: &PurgeReport, noun: &str) -> io::Result<()> {
    writeln!(output)?;

    if !report.failures.is_empty() {
        writeln!(
            output,
            "There were {} errors during the process:\n",
            report.failures.len()
        )?;
        for failure in &report.failures {
            writeln!(output, "{}:", failure.label)?;
            writeln!(output, "{}\n", failure.error)?;
        }
    }

    if report.cancelled > 0 {
        writeln!(
            output,
            "{} {} were left untouched because the run was cancelled.",
            report.cancelled, noun
        )?;
    }

    writeln!(
        output,
        "{} failures out of {}",
        report.failures.len(),
        report.total
    )
}
