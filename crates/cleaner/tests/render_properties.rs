use proptest::prelude::*;
use std::collections::HashMap;
use synapse_cleaner::{RecordingSink, Renderer, TermOp};

/// Minimal terminal: a scrollback buffer with a fixed-height viewport.
///
/// Cursor moves clamp to the viewport like a real terminal; a newline on the
/// last row scrolls.
struct VirtualTerminal {
    lines: Vec<String>,
    cursor: usize,
    top: usize,
    height: usize,
}

impl VirtualTerminal {
    fn new(height: usize) -> Self {
        Self {
            lines: vec![String::new()],
            cursor: 0,
            top: 0,
            height,
        }
    }

    fn bottom(&self) -> usize {
        self.top + self.height - 1
    }

    fn ensure_line(&mut self) {
        while self.lines.len() <= self.cursor {
            self.lines.push(String::new());
        }
    }

    fn apply(&mut self, op: &TermOp) {
        match op {
            TermOp::NewLine => {
                if self.cursor == self.bottom() {
                    self.top += 1;
                }
                self.cursor += 1;
                self.ensure_line();
            }
            TermOp::Up(n) => {
                self.cursor = self.cursor.saturating_sub(*n as usize).max(self.top);
            }
            TermOp::Down(n) => {
                self.cursor = (self.cursor + *n as usize).min(self.bottom());
                self.ensure_line();
            }
            TermOp::EraseLine => self.lines[self.cursor].clear(),
            TermOp::Write(text) => self.lines[self.cursor].push_str(text),
        }
    }

    fn replay(height: usize, ops: &[TermOp]) -> Self {
        let mut term = Self::new(height);
        for op in ops {
            term.apply(op);
        }
        term
    }

    fn visible(&self) -> Vec<&str> {
        (self.top..=self.bottom())
            .map(|i| self.lines.get(i).map(String::as_str).unwrap_or(""))
            .collect()
    }
}

fn renderer(term_height: u16, footer_height: u16) -> Renderer<RecordingSink> {
    Renderer::new(RecordingSink::default(), term_height, footer_height)
}

#[test]
fn test_first_print_opens_a_row() {
    let mut r = renderer(24, 2);
    r.print("a", "hello").unwrap();

    assert_eq!(
        r.sink_mut().take(),
        vec![
            TermOp::NewLine,
            TermOp::Up(1),
            TermOp::EraseLine,
            TermOp::Write("hello".to_string()),
            TermOp::Down(1),
        ]
    );
    assert_eq!(r.row_of("a"), Some(0));
}

#[test]
fn test_reprint_moves_to_existing_row() {
    let mut r = renderer(24, 2);
    r.print("a", "one").unwrap();
    r.print("b", "two").unwrap();
    r.sink_mut().take();

    r.print("a", "bye").unwrap();
    assert_eq!(
        r.sink_mut().take(),
        vec![
            TermOp::Up(2),
            TermOp::EraseLine,
            TermOp::Write("bye".to_string()),
            TermOp::Down(2),
        ]
    );
    assert_eq!(r.line_count(), 2);
}

#[test]
fn test_empty_text_only_erases() {
    let mut r = renderer(24, 2);
    r.print("a", "").unwrap();
    assert_eq!(
        r.sink_mut().take(),
        vec![
            TermOp::NewLine,
            TermOp::Up(1),
            TermOp::EraseLine,
            TermOp::Down(1),
        ]
    );
}

#[test]
fn test_footer_paints_every_row_and_returns_to_first() {
    let mut r = renderer(24, 2);
    r.print_footer("\n1 / 2 (0s)").unwrap();

    assert_eq!(
        r.sink_mut().take(),
        vec![
            TermOp::EraseLine,
            TermOp::NewLine,
            TermOp::EraseLine,
            TermOp::Write("1 / 2 (0s)".to_string()),
            TermOp::Up(1),
        ]
    );
    assert!(r.footer_painted());
}

#[test]
fn test_short_footer_text_blanks_remaining_rows() {
    let mut r = renderer(24, 3);
    r.print_footer("only").unwrap();

    assert_eq!(
        r.sink_mut().take(),
        vec![
            TermOp::EraseLine,
            TermOp::Write("only".to_string()),
            TermOp::NewLine,
            TermOp::EraseLine,
            TermOp::NewLine,
            TermOp::EraseLine,
            TermOp::Up(2),
        ]
    );
}

#[test]
fn test_zero_height_footer_is_not_painted() {
    let mut r = renderer(24, 0);
    r.print_footer("ignored").unwrap();
    r.exit().unwrap();
    assert!(r.sink_mut().take().is_empty());
}

#[test]
fn test_exit_moves_below_footer() {
    let mut r = renderer(24, 2);
    r.exit().unwrap();
    assert!(r.sink_mut().take().is_empty());

    r.print_footer("x").unwrap();
    r.sink_mut().take();
    r.exit().unwrap();
    assert_eq!(r.sink_mut().take(), vec![TermOp::Down(2)]);
}

#[test]
fn test_distance_clamped_once_footer_is_painted() {
    // Content area is 5 - 2 = 3 rows
    let mut r = renderer(5, 2);
    for key in ["k0", "k1", "k2", "k3", "k4"] {
        r.print(key, key).unwrap();
    }
    r.print_footer("\nfooter").unwrap();
    r.sink_mut().take();

    r.print("k0", "again").unwrap();
    assert_eq!(
        r.sink_mut().take(),
        vec![
            TermOp::Up(3),
            TermOp::EraseLine,
            TermOp::Write("again".to_string()),
            TermOp::Down(3),
        ]
    );
}

#[test]
fn test_new_row_collapses_full_footer() {
    let mut r = renderer(5, 2);
    r.print_footer("\nfooter").unwrap();
    for key in ["k0", "k1", "k2"] {
        r.print(key, key).unwrap();
    }
    r.sink_mut().take();

    r.print("k3", "k3").unwrap();
    assert_eq!(
        r.sink_mut().take(),
        vec![
            TermOp::NewLine,
            TermOp::EraseLine,
            TermOp::NewLine,
            TermOp::EraseLine,
            TermOp::Up(1),
            TermOp::Up(1),
            TermOp::EraseLine,
            TermOp::Write("k3".to_string()),
            TermOp::Down(1),
        ]
    );
}

#[test]
fn test_screen_layout_without_scrolling() {
    let mut r = renderer(20, 2);
    for i in 0..5 {
        r.print(&format!("k{}", i), &format!("line {}", i)).unwrap();
        r.print_footer(&format!("\n{} / 5", i)).unwrap();
    }
    r.print("k2", "line 2 DELETED").unwrap();
    r.print_footer("\n5 / 5").unwrap();
    r.exit().unwrap();

    let term = VirtualTerminal::replay(20, &r.into_sink().ops);
    assert_eq!(
        &term.lines[..7],
        &[
            "line 0",
            "line 1",
            "line 2 DELETED",
            "line 3",
            "line 4",
            "",
            "5 / 5",
        ]
    );
    // Cursor rests below the footer
    assert_eq!(term.cursor, 7);
}

#[test]
fn test_footer_stays_pinned_when_content_overflows() {
    let mut r = renderer(6, 2);
    for i in 0..8 {
        r.print(&format!("k{}", i), &format!("line {}", i)).unwrap();
        r.print_footer(&format!("\n{} / 8", i + 1)).unwrap();
    }
    // Visible rows can still be updated
    r.print("k6", "line 6 DELETED").unwrap();
    r.print_footer("\n8 / 8").unwrap();

    let term = VirtualTerminal::replay(6, &r.into_sink().ops);
    assert_eq!(
        term.visible(),
        vec![
            "line 4",
            "line 5",
            "line 6 DELETED",
            "line 7",
            "",
            "8 / 8"
        ]
    );
    assert_eq!(&term.lines[..4], &["line 0", "line 1", "line 2", "line 3"]);
}

fn key_sequence() -> impl Strategy<Value = Vec<(u8, u8)>> {
    prop::collection::vec((0u8..12, any::<u8>()), 1..80)
}

proptest! {
    /// Rows are assigned in first-seen order and never change afterwards.
    #[test]
    fn prop_rows_follow_first_seen_order(seq in key_sequence()) {
        let mut r = renderer(200, 2);
        let mut expected: HashMap<String, usize> = HashMap::new();

        for (key, value) in &seq {
            let key = format!("key-{}", key);
            let next = expected.len();
            let row = *expected.entry(key.clone()).or_insert(next);

            r.print(&key, &value.to_string()).unwrap();
            prop_assert_eq!(r.row_of(&key), Some(row));
        }

        prop_assert_eq!(r.line_count(), expected.len());
        for (key, row) in &expected {
            prop_assert_eq!(r.row_of(key), Some(*row));
        }
    }

    /// On a terminal tall enough, each row shows the last text printed for
    /// its key, whatever the interleaving with footer repaints.
    #[test]
    fn prop_rows_hold_latest_text(
        seq in key_sequence(),
        footer_every in 1usize..5,
    ) {
        let mut r = renderer(200, 2);
        let mut latest: HashMap<String, String> = HashMap::new();

        for (i, (key, value)) in seq.iter().enumerate() {
            let key = format!("key-{}", key);
            let text = format!("{} = {}", key, value);
            r.print(&key, &text).unwrap();
            latest.insert(key, text);
            if i % footer_every == 0 {
                r.print_footer(&format!("\n{}", i)).unwrap();
            }
        }
        r.print_footer("\ndone").unwrap();

        let rows: Vec<(String, usize)> = latest
            .keys()
            .map(|key| (key.clone(), r.row_of(key).unwrap()))
            .collect();
        let count = r.line_count();
        let term = VirtualTerminal::replay(200, &r.into_sink().ops);

        for (key, row) in rows {
            prop_assert_eq!(&term.lines[row], &latest[&key]);
        }
        prop_assert_eq!(term.lines[count].as_str(), "");
        prop_assert_eq!(term.lines[count + 1].as_str(), "done");
        prop_assert_eq!(term.cursor, count);
    }
}
