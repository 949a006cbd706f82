//! Integration tests for the rendering engine
//!
//! These tests drive the public `Terminal` API over a headless link and
//! check the rendered rows, the write pattern on the link, and the keys
//! consumed.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use minitel_terminal::caps::Capabilities;
use minitel_terminal::core::Layout;
use minitel_terminal::headless::HeadlessLink;
use minitel_terminal::link::LinkError;
use minitel_terminal::sleeper::MockSleeper;
use minitel_terminal::terminal::{PageOutcome, PagePrompt, Terminal, INPUT_COL, INPUT_LABEL};
use minitel_terminal::transmit::{PacedTransmitter, Pacing};

fn terminal(keys: &[u8]) -> Terminal<HeadlessLink> {
    Terminal::new(HeadlessLink::with_keys(keys), Capabilities::ansi(), Layout::MINITEL)
        .with_sleeper(Arc::new(MockSleeper::new()))
}

fn lines(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("L{:03}", i)).collect()
}

// ============================================================================
// Scrolling
// ============================================================================

#[test]
fn test_scroll_leaves_rows_outside_window_alone() {
    let mut term = terminal(b"");
    term.write_at(3, 1, "HEADER").unwrap();
    term.write_at(10, 1, "FOOTER").unwrap();
    term.input_box(24).unwrap();
    term.scroll_lines(Layout::MINITEL.rows(4, 6), &lines(10), Duration::ZERO)
        .unwrap();

    let rows = term.link().render(80, 24).lines();
    assert_eq!(rows[2], "HEADER");
    assert_eq!(rows[3..6], ["L007", "L008", "L009"]);
    assert_eq!(rows[6], "");
    assert_eq!(rows[9], "FOOTER");
    assert_eq!(rows[23], INPUT_LABEL);
}

#[test]
fn test_scroll_restores_cursor_on_finish() {
    let mut term = terminal(b"");
    let mut scroller = term.scroller(Layout::MINITEL.body()).unwrap();
    scroller.push("one").unwrap();
    assert_eq!(scroller.state().filled(), 1);
    scroller.finish().unwrap();
    assert!(term.link().render(80, 24).cursor_visible());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_scroll_window_shows_last_lines(k in 0usize..40, top in 4u16..10, height in 1u16..8) {
        let window = Layout::MINITEL.rows(top, top + height - 1);
        let mut term = terminal(b"");
        let fed = lines(k);
        term.scroll_lines(window, &fed, Duration::ZERO).unwrap();

        let screen = term.link().render(80, 24);
        let shown = k.min(usize::from(height));
        let expected = &fed[k - shown..];
        for (i, row) in window.rows().enumerate() {
            let want = expected.get(i).map(String::as_str).unwrap_or("");
            prop_assert_eq!(screen.line(row), want);
        }
    }
}

// ============================================================================
// Pagination
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_page_count_and_last_page(total in 1usize..120, height in 1u16..20) {
        let window = Layout::MINITEL.rows(4, 4 + height - 1);
        let mut term = terminal(&[b'\r'; 200]);
        let body = lines(total);
        let outcome = term.paginate(&body, window, &PagePrompt::default()).unwrap();

        let h = usize::from(height);
        let pages = (total + h - 1) / h;
        prop_assert_eq!(outcome, PageOutcome::Finished { pages });
        prop_assert_eq!(term.link().pending_keys(), 200 - (pages - 1));

        let last = match total % h { 0 => h, r => r };
        let screen = term.link().render(80, 24);
        for (i, row) in window.rows().enumerate() {
            if i < last {
                prop_assert_eq!(screen.line(row), body[total - last + i].clone());
            } else {
                prop_assert_eq!(screen.line(row), "");
            }
        }
    }
}

#[test]
fn test_page_never_writes_past_window() {
    let mut term = terminal(b"q");
    let window = Layout::MINITEL.rows(8, 10).with_columns(2, 20);
    let body: Vec<String> = (0..5).map(|_| "w".repeat(60)).collect();
    let outcome = term.paginate(&body, window, &PagePrompt::default()).unwrap();
    assert_eq!(outcome, PageOutcome::Quit { pages: 1 });

    let screen = term.link().render(80, 24);
    assert_eq!(screen.line(8), format!(" {}", "w".repeat(19)));
    assert_eq!(screen.line(11), "");
}

#[test]
fn test_page_link_loss_propagates() {
    let mut term = terminal(b"");
    let result = term.paginate(&lines(30), Layout::MINITEL.body(), &PagePrompt::default());
    assert!(matches!(result, Err(LinkError::Closed)));
}

// ============================================================================
// Line editing
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_line_editor_matches_model(
        keys in proptest::collection::vec(prop_oneof![
            4 => (0x20u8..=0x7e),
            1 => Just(0x08u8),
            1 => Just(0x7fu8),
            1 => Just(0x1bu8),
            1 => (0x80u8..=0xff),
        ], 0..80),
        max_len in 1usize..30,
    ) {
        let mut script = keys.clone();
        script.push(b'\r');
        let mut term = terminal(&script);
        let text = term.read_line(24, INPUT_COL, max_len, true).unwrap();

        let mut model = String::new();
        for &k in &keys {
            match k {
                0x08 | 0x7f => { model.pop(); },
                0x20..=0x7e if model.len() < max_len => model.push(k as char),
                _ => {},
            }
        }
        prop_assert_eq!(&text, &model);

        let screen = term.link().render(80, 24);
        prop_assert_eq!(screen.cursor(), (24, INPUT_COL + model.len() as u16));
        let field = format!("{}{}", " ".repeat(usize::from(INPUT_COL) - 1), model);
        prop_assert_eq!(screen.line(24), field.trim_end());
    }
}

#[test]
fn test_empty_polls_are_waited_out() {
    let link = HeadlessLink::with_keys(b"ok\r").with_idle_polls(3);
    let mut term = Terminal::new(link, Capabilities::ansi(), Layout::MINITEL)
        .with_sleeper(Arc::new(MockSleeper::new()));
    assert_eq!(term.read_line(24, 1, 10, false).unwrap(), "ok");
}

// ============================================================================
// Pacing
// ============================================================================

proptest! {
    #[test]
    fn prop_terminal_output_is_chunked(payload in proptest::collection::vec(any::<u8>(), 0..500)) {
        let sleeper = Arc::new(MockSleeper::new());
        let mut term = Terminal::new(HeadlessLink::new(), Capabilities::ansi(), Layout::MINITEL)
            .with_sleeper(sleeper.clone());
        term.send_bytes(&payload).unwrap();

        let writes = term.link().writes();
        prop_assert_eq!(writes.len(), (payload.len() + 31) / 32);
        prop_assert!(writes.iter().all(|&w| w <= 32));
        prop_assert_eq!(term.link().output(), &payload[..]);
        prop_assert_eq!(sleeper.call_count() as usize, writes.len());
    }
}

#[test]
fn test_custom_pacing() {
    let sleeper = MockSleeper::new();
    let transmitter = PacedTransmitter::new(Pacing {
        chunk_size: 8,
        gap: Duration::from_millis(3),
    });
    let mut link = HeadlessLink::new();
    transmitter.send(&mut link, &[0u8; 20], &sleeper).unwrap();
    assert_eq!(link.writes(), &[8, 8, 4]);
    assert_eq!(sleeper.total_duration(), Duration::from_millis(9));
}
