//! Terminal engine
//!
//! Ties the capability table, the paced transmitter and the link together
//! and exposes the screen primitives the applications are built from:
//! positioned text, banners, status lines, a scrolling window, a pager and
//! a line editor. Every screen mutation is composed into a `Frame` and sent
//! through the `PacedTransmitter`.

use std::io::Write;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use crate::caps::{Capabilities, Capability};
use crate::charset::{self, TextMode};
use crate::core::{
    is_terminator, InputBuffer, KeyOutcome, Layout, PageCursor, ScreenRegion, ScrollState,
    ScrollStep,
};
use crate::link::{Link, LinkError, LinkResult};
use crate::sleeper::{RealSleeper, Sleeper};
use crate::transmit::{PacedTransmitter, Pacing};

/// Label drawn at the start of the input row
pub const INPUT_LABEL: &str = "[ENTER QUERY]";

/// Column where typed text starts, right after the label
pub const INPUT_COL: u16 = 15;

/// Default status message shown between pages
pub const DEFAULT_MORE_PROMPT: &str = "continue: press ENTER, stop: press Q";

/// Interval between loading bar updates
const LOADING_TICK: Duration = Duration::from_millis(50);

/// A batch of output bytes built from capabilities and text
///
/// Frames are sent as one paced payload by `Terminal::draw`.
pub struct Frame<'a> {
    caps: &'a mut Capabilities,
    mode: TextMode,
    cols: u16,
    bytes: Vec<u8>,
}

impl<'a> Frame<'a> {
    fn new(caps: &'a mut Capabilities, mode: TextMode, cols: u16) -> Self {
        Self {
            caps,
            mode,
            cols,
            bytes: Vec::with_capacity(64),
        }
    }

    pub fn capability(&mut self, cap: Capability) -> &mut Self {
        self.bytes.extend_from_slice(self.caps.sequence(cap));
        self
    }

    /// Move the cursor to a 1-based position
    pub fn move_to(&mut self, row: u16, col: u16) -> &mut Self {
        let seq = self.caps.cursor_position(row, col);
        self.bytes.extend_from_slice(seq);
        self
    }

    pub fn erase_line(&mut self) -> &mut Self {
        self.capability(Capability::EraseLine)
    }

    /// Move to the start of `row` and erase it
    pub fn clear_row(&mut self, row: u16, col: u16) -> &mut Self {
        self.move_to(row, col).erase_line()
    }

    /// Encoded text, unclipped
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.bytes.extend(charset::encode(text, self.mode));
        self
    }

    /// Encoded text cut to at most `width` columns
    pub fn clipped(&mut self, text: &str, width: usize) -> &mut Self {
        let mut encoded = charset::encode(text, self.mode);
        encoded.truncate(width);
        self.bytes.extend(encoded);
        self
    }

    /// Text at a position, cut at the right edge of the screen
    pub fn text_at(&mut self, row: u16, col: u16, text: &str) -> &mut Self {
        let room = usize::from(self.cols.saturating_sub(col) + 1);
        self.move_to(row, col).clipped(text, room)
    }

    /// Standout text at a position, cut at the right edge of the screen
    pub fn standout_at(&mut self, row: u16, col: u16, text: &str) -> &mut Self {
        let room = usize::from(self.cols.saturating_sub(col) + 1);
        self.move_to(row, col)
            .capability(Capability::StandoutBegin)
            .clipped(text, room)
            .capability(Capability::StandoutEnd)
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// How a pagination run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Every line was shown
    Finished { pages: usize },
    /// The reader pressed the quit key; remaining lines were discarded
    Quit { pages: usize },
}

impl PageOutcome {
    pub fn pages(&self) -> usize {
        match *self {
            PageOutcome::Finished { pages } | PageOutcome::Quit { pages } => pages,
        }
    }
}

/// Key read while a page waits for the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKey {
    Continue,
    Quit,
}

/// Status line shown between pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePrompt {
    /// Row the message is written on
    pub row: u16,
    pub message: String,
    /// Pause after each written line
    pub line_delay: Duration,
}

impl Default for PagePrompt {
    fn default() -> Self {
        Self {
            row: Layout::MINITEL.input_row(),
            message: DEFAULT_MORE_PROMPT.to_string(),
            line_delay: Duration::ZERO,
        }
    }
}

/// Result of handing the device to another process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handoff {
    Completed,
    /// Launch failure or non-zero exit, already shown on the status row
    Failed { reason: String },
}

/// Screen engine over an exclusively owned link
pub struct Terminal<L: Link> {
    link: L,
    caps: Capabilities,
    transmitter: PacedTransmitter,
    sleeper: Arc<dyn Sleeper>,
    layout: Layout,
    text_mode: TextMode,
}

impl<L: Link> Terminal<L> {
    pub fn new(link: L, caps: Capabilities, layout: Layout) -> Self {
        Self {
            link,
            caps,
            transmitter: PacedTransmitter::new(Pacing::default()),
            sleeper: Arc::new(RealSleeper),
            layout,
            text_mode: TextMode::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.transmitter = PacedTransmitter::new(pacing);
        self
    }

    /// Replace the sleeper used for pacing, scroll delays and the loading bar
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_text_mode(mut self, mode: TextMode) -> Self {
        self.text_mode = mode;
        self
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_link(self) -> L {
        self.link
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn pause(&self, duration: Duration) {
        self.sleeper.sleep(duration);
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Send raw bytes through the paced transmitter
    pub fn send_bytes(&mut self, bytes: &[u8]) -> LinkResult<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.transmitter
            .send(&mut self.link, bytes, self.sleeper.as_ref())
            .map_err(LinkError::from)?;
        Ok(())
    }

    /// Encode text for the link and send it at the cursor
    pub fn send_text(&mut self, text: &str) -> LinkResult<()> {
        let bytes = charset::encode(text, self.text_mode);
        self.send_bytes(&bytes)
    }

    pub fn send_capability(&mut self, cap: Capability) -> LinkResult<()> {
        let bytes = self.caps.sequence(cap).to_vec();
        self.send_bytes(&bytes)
    }

    /// Compose a frame and send it as one payload
    pub fn draw<F>(&mut self, build: F) -> LinkResult<()>
    where
        F: FnOnce(&mut Frame<'_>),
    {
        let bytes = {
            let mut frame = Frame::new(&mut self.caps, self.text_mode, self.layout.cols);
            build(&mut frame);
            frame.bytes
        };
        self.send_bytes(&bytes)
    }

    // ========================================================================
    // Screen model
    // ========================================================================

    pub fn move_to(&mut self, row: u16, col: u16) -> LinkResult<()> {
        self.draw(|f| {
            f.move_to(row, col);
        })
    }

    pub fn erase_line(&mut self) -> LinkResult<()> {
        self.send_capability(Capability::EraseLine)
    }

    pub fn clear_screen(&mut self) -> LinkResult<()> {
        self.send_capability(Capability::Clear)
    }

    pub fn hide_cursor(&mut self) -> LinkResult<()> {
        self.send_capability(Capability::CursorHide)
    }

    pub fn show_cursor(&mut self) -> LinkResult<()> {
        self.send_capability(Capability::CursorShow)
    }

    /// Send the terminal's init string, if any, then clear
    pub fn reset(&mut self) -> LinkResult<()> {
        if let Some(init) = self.caps.init_sequence().map(<[u8]>::to_vec) {
            self.send_bytes(&init)?;
        }
        self.clear_screen()
    }

    /// Erase every row of `region`, starting at its left column
    pub fn clear_region(&mut self, region: &ScreenRegion) -> LinkResult<()> {
        self.draw(|f| {
            for row in region.rows() {
                f.clear_row(row, region.left);
            }
        })
    }

    /// Erase rows `top..=bottom`
    pub fn clear_rows(&mut self, top: u16, bottom: u16) -> LinkResult<()> {
        let region = self.layout.rows(top, bottom);
        self.clear_region(&region)
    }

    /// Two full-width standout rows at the top of the screen
    pub fn draw_border(&mut self) -> LinkResult<()> {
        let border = self.layout.border();
        let blank = " ".repeat(usize::from(border.width()));
        self.draw(|f| {
            for row in border.rows() {
                f.standout_at(row, border.left, &blank);
            }
            // Repaint the edge cells so the frame survives a short title
            for row in border.rows() {
                f.standout_at(row, border.left, " ");
                f.standout_at(row, border.right, " ");
            }
        })
    }

    /// Border, a centered standout title, a subtitle and a separator rule
    pub fn draw_header(&mut self, title: &str, subtitle: &str) -> LinkResult<()> {
        self.reset()?;
        self.draw_border()?;

        let cols = self.layout.cols;
        let width = self.layout.message_width();
        let title_len = title.chars().count().min(width) as u16;
        let title_col = ((cols - title_len) / 2 + 1).max(2);
        let rule = "_".repeat(width);
        self.draw(|f| {
            f.move_to(1, title_col)
                .capability(Capability::StandoutBegin)
                .clipped(title, width)
                .capability(Capability::StandoutEnd);
            if !subtitle.is_empty() {
                f.standout_at(2, 4, subtitle);
            }
            f.text_at(3, 2, &rule);
        })
    }

    /// Text at a position, cut at the right edge
    pub fn write_at(&mut self, row: u16, col: u16, text: &str) -> LinkResult<()> {
        self.draw(|f| {
            f.text_at(row, col, text);
        })
    }

    pub fn write_standout_at(&mut self, row: u16, col: u16, text: &str) -> LinkResult<()> {
        self.draw(|f| {
            f.standout_at(row, col, text);
        })
    }

    /// Replace a row with a message no wider than COLS-2
    pub fn status(&mut self, row: u16, text: &str) -> LinkResult<()> {
        let width = self.layout.message_width();
        self.draw(|f| {
            f.clear_row(row, 1).clipped(text, width);
        })
    }

    /// Draw the query label on `row` and park the cursor after it
    pub fn input_box(&mut self, row: u16) -> LinkResult<()> {
        self.draw(|f| {
            f.clear_row(row, 1).text(INPUT_LABEL).move_to(row, INPUT_COL);
        })
    }

    /// Longest query that fits after the label
    pub fn input_capacity(&self) -> usize {
        usize::from(self.layout.cols.saturating_sub(INPUT_COL))
    }

    /// Blank a typed field and return the cursor to its start
    pub fn clear_field(&mut self, row: u16, col: u16, width: usize) -> LinkResult<()> {
        let blank = " ".repeat(width);
        self.draw(|f| {
            f.move_to(row, col).text(&blank).move_to(row, col);
        })
    }

    /// Full-width `#` bar filled to `fraction` (clamped to 0..=1)
    pub fn progress_bar(&mut self, row: u16, fraction: f64) -> LinkResult<()> {
        let width = usize::from(self.layout.cols);
        let filled = ((fraction.clamp(0.0, 1.0) * width as f64) as usize).min(width);
        let bar = format!("{}{}", "#".repeat(filled), " ".repeat(width - filled));
        self.draw(|f| {
            f.move_to(row, 1).text(&bar);
        })
    }

    /// Animate the bar over `duration`, redrawing only when the whole
    /// percentage changes, then leave it full
    pub fn loading(&mut self, row: u16, duration: Duration) -> LinkResult<()> {
        let mut elapsed = Duration::ZERO;
        let mut last_pct = None;
        while elapsed <= duration {
            let pct = percent(elapsed, duration);
            if last_pct != Some(pct) {
                self.progress_bar(row, f64::from(pct) / 100.0)?;
                last_pct = Some(pct);
            }
            self.sleeper.sleep(LOADING_TICK);
            elapsed += LOADING_TICK;
        }
        self.progress_bar(row, 1.0)
    }

    // ========================================================================
    // Scrolling
    // ========================================================================

    /// Start a scrolling run in `window`: erase it and hide the cursor
    pub fn scroller(&mut self, window: ScreenRegion) -> LinkResult<Scroller<'_, L>> {
        self.clear_region(&window)?;
        self.hide_cursor()?;
        Ok(Scroller {
            state: ScrollState::new(&window),
            window,
            terminal: self,
        })
    }

    /// Scroll every line through `window`, pausing `delay` after each one
    pub fn scroll_lines<S: AsRef<str>>(
        &mut self,
        window: ScreenRegion,
        lines: &[S],
        delay: Duration,
    ) -> LinkResult<()> {
        let mut scroller = self.scroller(window)?;
        for line in lines {
            scroller.push(line.as_ref())?;
            scroller.terminal.pause(delay);
        }
        scroller.finish()
    }

    // ========================================================================
    // Pagination
    // ========================================================================

    /// Show `lines` one window at a time, waiting for the reader between pages
    pub fn paginate<S: AsRef<str>>(
        &mut self,
        lines: &[S],
        window: ScreenRegion,
        prompt: &PagePrompt,
    ) -> LinkResult<PageOutcome> {
        let mut cursor = PageCursor::new(lines.len());
        let mut pages = 0;
        let width = usize::from(window.width());

        while let Some(page) = cursor.next_page(usize::from(window.height())) {
            pages += 1;
            tracing::debug!(page = pages, first = page.start, len = page.len(), "Rendering page");
            self.clear_region(&window)?;
            for (row, line) in window.rows().zip(&lines[page]) {
                self.draw(|f| {
                    f.move_to(row, window.left).clipped(line.as_ref(), width);
                })?;
                self.pause(prompt.line_delay);
            }

            if cursor.is_exhausted() {
                break;
            }
            self.status(prompt.row, &prompt.message)?;
            if self.wait_page_key()? == PageKey::Quit {
                cursor.discard();
                return Ok(PageOutcome::Quit { pages });
            }
        }

        if pages > 0 {
            self.draw(|f| {
                f.clear_row(prompt.row, 1);
            })?;
        }
        Ok(PageOutcome::Finished { pages })
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Block until a byte arrives; empty polls are retried
    pub fn read_key(&mut self) -> LinkResult<u8> {
        loop {
            if let Some(byte) = self.link.read_byte()? {
                return Ok(byte);
            }
        }
    }

    /// Block until CR or LF
    pub fn wait_enter(&mut self) -> LinkResult<()> {
        while !is_terminator(self.read_key()?) {}
        Ok(())
    }

    /// Block until the continue or quit key
    pub fn wait_page_key(&mut self) -> LinkResult<PageKey> {
        loop {
            match self.read_key()? {
                b'q' | b'Q' => return Ok(PageKey::Quit),
                byte if is_terminator(byte) => return Ok(PageKey::Continue),
                _ => {},
            }
        }
    }

    /// Edit one line starting at (`row`, `col`) and return it on CR or LF
    pub fn read_line(&mut self, row: u16, col: u16, max_len: usize, echo: bool) -> LinkResult<String> {
        let mut buffer = InputBuffer::new(col, max_len);
        if echo {
            self.move_to(row, col)?;
        }
        loop {
            let byte = self.read_key()?;
            match buffer.feed(byte) {
                KeyOutcome::Submit => return Ok(buffer.text()),
                KeyOutcome::Appended { ch, .. } if echo => {
                    self.send_bytes(&[ch as u8])?;
                },
                KeyOutcome::Erased { col } if echo => {
                    self.draw(|f| {
                        f.move_to(row, col).raw(b" ").move_to(row, col);
                    })?;
                },
                _ => {},
            }
        }
    }

    /// Write `text` at the start of `row` and read the answer after it
    pub fn prompt(&mut self, row: u16, text: &str, max_len: usize) -> LinkResult<String> {
        self.draw(|f| {
            f.clear_row(row, 1).text(text);
        })?;
        let col = (text.chars().count() as u16).saturating_add(1);
        self.read_line(row, col, max_len, true)
    }

    // ========================================================================
    // Hand-off
    // ========================================================================

    /// Release the link, run `command` to completion, take the link back
    ///
    /// Launch failure or non-zero exit is reported on `status_row`; only a
    /// failure to reopen the device is an error.
    pub fn hand_off(&mut self, command: &mut Command, status_row: u16) -> LinkResult<Handoff> {
        let program = command.get_program().to_string_lossy().into_owned();
        self.link.flush().map_err(LinkError::from)?;
        self.link.release();
        tracing::info!(program = %program, "Handing link to collaborator");

        let result = command.status();
        self.link.reacquire()?;

        let outcome = match result {
            Ok(status) if status.success() => Handoff::Completed,
            Ok(status) => Handoff::Failed {
                reason: format!("{} exited with {}", program, status),
            },
            Err(e) => Handoff::Failed {
                reason: format!("Failed to launch {}: {}", program, e),
            },
        };
        match &outcome {
            Handoff::Completed => tracing::info!(program = %program, "Collaborator finished"),
            Handoff::Failed { reason } => {
                tracing::warn!(program = %program, "{}", reason);
                self.status(status_row, reason)?;
            },
        }
        Ok(outcome)
    }
}

/// A scrolling run over one window
///
/// Lines fill the window top to bottom; once it is full every new line
/// deletes the top row and is written on the bottom row. When rows exist
/// below the window a blank line is inserted at its bottom so they stay put.
pub struct Scroller<'t, L: Link> {
    terminal: &'t mut Terminal<L>,
    window: ScreenRegion,
    state: ScrollState,
}

impl<L: Link> Scroller<'_, L> {
    pub fn state(&self) -> &ScrollState {
        &self.state
    }

    pub fn window(&self) -> ScreenRegion {
        self.window
    }

    /// Add one line, cut to the window width
    pub fn push(&mut self, line: &str) -> LinkResult<ScrollStep> {
        let step = self.state.advance();
        let left = self.window.left;
        let width = usize::from(self.window.width());
        let last_row = self.terminal.layout.lines;
        self.terminal.draw(|f| {
            match step {
                ScrollStep::Fill { row } => {
                    f.clear_row(row, left);
                },
                ScrollStep::Evict { top, bottom } => {
                    f.move_to(top, left).capability(Capability::DeleteLine);
                    if bottom < last_row {
                        f.move_to(bottom, left).capability(Capability::InsertLine);
                    }
                    f.clear_row(bottom, left);
                },
            }
            f.clipped(line, width);
        })?;
        Ok(step)
    }

    /// End the run and show the cursor again
    pub fn finish(self) -> LinkResult<()> {
        self.terminal.show_cursor()
    }
}

fn percent(elapsed: Duration, total: Duration) -> u32 {
    if total.is_zero() {
        return 100;
    }
    let ratio = elapsed.as_secs_f64() / total.as_secs_f64();
    ((ratio * 100.0) as u32).min(100)
}
