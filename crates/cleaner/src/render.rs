//! In-place progress rendering.
//!
//! Each line is identified by a key and keeps the row it was given the first
//! time it was printed. Rows are addressed relative to the cursor, which
//! always rests on the row just below the last content line, where the
//! footer block starts.

use crossterm::cursor::{MoveToNextLine, MoveToPreviousLine};
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use std::collections::HashMap;
use std::io::{self, IsTerminal, Stdout, Write};

use crate::error::RenderError;

/// A single terminal control operation emitted by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermOp {
    /// Move to the start of the next row, scrolling at the bottom.
    NewLine,
    Up(u16),
    Down(u16),
    EraseLine,
    Write(String),
}

/// Destination for terminal operations.
pub trait TermSink {
    fn apply(&mut self, op: TermOp) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes operations as ANSI sequences through crossterm.
pub struct CrosstermSink<W: Write> {
    out: W,
}

impl<W: Write> CrosstermSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> TermSink for CrosstermSink<W> {
    fn apply(&mut self, op: TermOp) -> io::Result<()> {
        match op {
            TermOp::NewLine => crossterm::queue!(self.out, Print("\n")),
            TermOp::Up(0) | TermOp::Down(0) => Ok(()),
            TermOp::Up(n) => crossterm::queue!(self.out, MoveToPreviousLine(n)),
            TermOp::Down(n) => crossterm::queue!(self.out, MoveToNextLine(n)),
            TermOp::EraseLine => crossterm::queue!(self.out, Clear(ClearType::CurrentLine)),
            TermOp::Write(text) => crossterm::queue!(self.out, Print(text)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Keeps every operation in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub ops: Vec<TermOp>,
}

impl RecordingSink {
    pub fn take(&mut self) -> Vec<TermOp> {
        std::mem::take(&mut self.ops)
    }
}

impl TermSink for RecordingSink {
    fn apply(&mut self, op: TermOp) -> io::Result<()> {
        self.ops.push(op);
        Ok(())
    }
}

/// Redraws keyed lines in place above a pinned footer.
///
/// Must only be driven from one task: the cursor position is shared state.
/// The terminal height is read once, so a resize during a run gives a best
/// effort layout.
pub struct Renderer<S: TermSink> {
    sink: S,
    rows: HashMap<String, usize>,
    term_height: usize,
    footer_height: usize,
    footer_painted: bool,
}

impl Renderer<CrosstermSink<Stdout>> {
    /// Renderer on standard output. Fails when stdout is not a terminal.
    pub fn stdout(footer_height: u16) -> Result<Self, RenderError> {
        let stdout = io::stdout();
        if !stdout.is_terminal() {
            return Err(RenderError::NotATerminal);
        }
        let (_, height) = crossterm::terminal::size()?;
        Ok(Self::new(CrosstermSink::new(stdout), height, footer_height))
    }
}

impl<S: TermSink> Renderer<S> {
    pub fn new(sink: S, term_height: u16, footer_height: u16) -> Self {
        Self {
            sink,
            rows: HashMap::new(),
            term_height: term_height as usize,
            footer_height: footer_height as usize,
            footer_painted: false,
        }
    }

    /// Replace the line identified by `key` with `text`.
    pub fn print(&mut self, key: &str, text: &str) -> io::Result<()> {
        let row = match self.rows.get(key) {
            Some(&row) => row,
            None => {
                let row = self.rows.len();
                self.rows.insert(key.to_string(), row);
                self.sink.apply(TermOp::NewLine)?;

                // At the bottom of the terminal the footer is pushed down so
                // the newest line stays above it.
                if self.footer_capped() && self.rows.len() > self.content_height() {
                    self.collapse_footer()?;
                }
                row
            }
        };

        let mut distance = self.rows.len() - row;
        if self.footer_capped() && distance > self.content_height() {
            distance = self.content_height();
        }
        let distance = to_u16(distance);

        self.sink.apply(TermOp::Up(distance))?;
        self.sink.apply(TermOp::EraseLine)?;
        if !text.is_empty() {
            self.sink.apply(TermOp::Write(text.to_string()))?;
        }
        self.sink.apply(TermOp::Down(distance))
    }

    /// Repaint the footer block below the content lines.
    ///
    /// `text` is split on newlines, one line per footer row; the cursor is
    /// left on the first footer row.
    pub fn print_footer(&mut self, text: &str) -> io::Result<()> {
        if self.footer_height == 0 {
            return self.sink.flush();
        }

        let mut lines = text.split('\n');
        for i in 0..self.footer_height {
            if i > 0 {
                self.sink.apply(TermOp::NewLine)?;
            }
            self.sink.apply(TermOp::EraseLine)?;
            match lines.next() {
                Some(line) if !line.is_empty() => {
                    self.sink.apply(TermOp::Write(line.to_string()))?
                }
                _ => {}
            }
        }
        self.sink.apply(TermOp::Up(to_u16(self.footer_height - 1)))?;
        self.footer_painted = true;
        self.sink.flush()
    }

    /// Move below the footer so later output does not overwrite it.
    pub fn exit(&mut self) -> io::Result<()> {
        if self.footer_height > 0 && self.footer_painted {
            self.sink.apply(TermOp::Down(to_u16(self.footer_height)))?;
        }
        self.sink.flush()
    }

    /// Row assigned to `key`, if it was printed.
    pub fn row_of(&self, key: &str) -> Option<usize> {
        self.rows.get(key).copied()
    }

    pub fn line_count(&self) -> usize {
        self.rows.len()
    }

    pub fn footer_height(&self) -> usize {
        self.footer_height
    }

    pub fn footer_painted(&self) -> bool {
        self.footer_painted
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn footer_capped(&self) -> bool {
        self.footer_height > 0 && self.footer_painted
    }

    fn content_height(&self) -> usize {
        self.term_height.saturating_sub(self.footer_height)
    }

    fn collapse_footer(&mut self) -> io::Result<()> {
        self.sink.apply(TermOp::EraseLine)?;
        for _ in 1..self.footer_height {
            self.sink.apply(TermOp::NewLine)?;
            self.sink.apply(TermOp::EraseLine)?;
        }
        self.sink
            .apply(TermOp::Up(to_u16(self.footer_height.saturating_sub(1))))
    }
}

fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}
