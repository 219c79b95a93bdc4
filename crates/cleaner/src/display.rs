use std::io;
use std::time::{Duration, Instant};

use crate::jobs::{BatchSnapshot, JobState, WorkItem};
use crate::render::{Renderer, TermSink};
use crate::width::{display_width, pad_with_suffix, right_align};

/// Render a duration rounded to the second, e.g. `42s`, `1m5s`, `1h0m3s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let mut secs = elapsed.as_secs();
    if elapsed.subsec_millis() >= 500 {
        secs += 1;
    }

    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Status suffix of a job line, `None` while the job is still queued.
pub fn status_suffix(state: &JobState, now: Instant) -> Option<String> {
    match state {
        JobState::Queued => None,
        JobState::Started { started_at } => Some(format!(
            " {}",
            format_elapsed(now.saturating_duration_since(*started_at))
        )),
        JobState::Finished => Some(" DELETED".to_string()),
        JobState::Failed(_) => Some(" ERROR".to_string()),
        JobState::Cancelled => Some(" CANCELLED".to_string()),
    }
}

/// Full progress line for `item`, padded so the suffix ends on `columns`.
///
/// The label never takes the suffix's columns, whatever the margin, so the
/// line does not wrap.
pub fn job_line<T: WorkItem>(item: &T, suffix: &str, columns: usize, margin: usize) -> String {
    let reserved = margin.max(display_width(suffix));
    let label = item.label(columns.saturating_sub(reserved));
    pad_with_suffix(&label, display_width(&label), columns, suffix)
}

/// Footer text for `height` rows: blank rows, then the right-aligned
/// `done / total (elapsed)` on the last one.
pub fn footer_text(
    done: usize,
    total: usize,
    elapsed: Duration,
    columns: usize,
    height: usize,
) -> String {
    let counter = format!("{} / {} ({})", done, total, format_elapsed(elapsed));
    let mut footer = "\n".repeat(height.saturating_sub(1));
    footer.push_str(&right_align(&counter, columns));
    footer
}

/// Paints batch snapshots, one call per display tick.
///
/// A job is repainted while it runs and one last time once it is terminal;
/// after that its line is left as is. Jobs cancelled before they started
/// never get a line.
pub struct DeletionScreen {
    settled: Vec<bool>,
    columns: usize,
    margin: usize,
}

impl DeletionScreen {
    pub fn new(total: usize, columns: u16, margin: u16) -> Self {
        Self {
            settled: vec![false; total],
            columns: columns as usize,
            margin: margin as usize,
        }
    }

    pub fn paint<T: WorkItem, S: TermSink>(
        &mut self,
        snapshot: &BatchSnapshot<T>,
        renderer: &mut Renderer<S>,
    ) -> io::Result<()> {
        let now = Instant::now();
        for (index, (item, state)) in snapshot.jobs().enumerate() {
            let Some(settled) = self.settled.get_mut(index) else {
                break;
            };
            if *settled {
                continue;
            }
            if *state == JobState::Cancelled && renderer.row_of(item.id()).is_none() {
                *settled = true;
                continue;
            }
            let Some(suffix) = status_suffix(state, now) else {
                continue;
            };

            let line = job_line(item, &suffix, self.columns, self.margin);
            renderer.print(item.id(), &line)?;
            *settled = state.is_terminal();
        }

        renderer.print_footer(&footer_text(
            snapshot.completed,
            snapshot.total,
            snapshot.elapsed,
            self.columns,
            renderer.footer_height(),
        ))
    }
}
