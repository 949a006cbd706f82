//! Headless rendering
//!
//! `HeadlessScreen` interprets the ANSI subset the renderer falls back to
//! when no terminal database entry exists, so rendered output can be
//! inspected row by row without a Minitel attached. `HeadlessLink` is an
//! in-memory `Link` with scripted keyboard input and captured output.
//!
//! Supported sequences:
//! - `ESC [ r ; c H` / `ESC [ H`: cursor position
//! - `ESC [ K`: erase to end of line
//! - `ESC [ n M`: delete lines (whole screen shifts up)
//! - `ESC [ n L`: insert lines (whole screen shifts down)
//! - `ESC [ 2 J`: clear screen
//! - `ESC [ 7 m` / `ESC [ 27 m` / `ESC [ 0 m`: standout
//! - `ESC [ ? 25 l` / `ESC [ ? 25 h`: cursor visibility
//! - `ESC E`: next line
//! - CR, LF, BS and printable Latin-1

use std::collections::VecDeque;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::charset;
use crate::link::{Link, LinkError, LinkResult};

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    Csi,
}

/// A character grid driven by the fallback control sequences
#[derive(Debug, Clone)]
pub struct HeadlessScreen {
    cols: usize,
    rows: usize,
    grid: Vec<Vec<u8>>,
    standout: Vec<Vec<bool>>,
    /// 0-indexed cursor row
    row: usize,
    /// 0-indexed cursor column
    col: usize,
    attr_standout: bool,
    cursor_visible: bool,
    state: State,
    params: Vec<u16>,
    current_param: Option<u16>,
    private_marker: bool,
}

impl HeadlessScreen {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            grid: vec![vec![b' '; cols]; rows],
            standout: vec![vec![false; cols]; rows],
            row: 0,
            col: 0,
            attr_standout: false,
            cursor_visible: true,
            state: State::Ground,
            params: Vec::with_capacity(4),
            current_param: None,
            private_marker: false,
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// 1-based (row, col) of the cursor
    pub fn cursor(&self) -> (u16, u16) {
        (self.row as u16 + 1, self.col as u16 + 1)
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    /// Text of a 1-based row without trailing blanks
    pub fn line(&self, row: u16) -> String {
        let Some(cells) = usize::from(row).checked_sub(1).and_then(|r| self.grid.get(r)) else {
            return String::new();
        };
        charset::decode(cells).trim_end().to_string()
    }

    /// Whether the cell at a 1-based position was drawn in standout
    pub fn is_standout(&self, row: u16, col: u16) -> bool {
        let (r, c) = (usize::from(row), usize::from(col));
        r >= 1
            && c >= 1
            && self
                .standout
                .get(r - 1)
                .and_then(|line| line.get(c - 1))
                .copied()
                .unwrap_or(false)
    }

    /// All rows, top to bottom
    pub fn lines(&self) -> Vec<String> {
        (1..=self.rows as u16).map(|r| self.line(r)).collect()
    }

    /// Feed raw output bytes
    pub fn process(&mut self, data: &[u8]) {
        for &byte in data {
            self.process_byte(byte);
        }
    }

    fn process_byte(&mut self, byte: u8) {
        match self.state {
            State::Ground => match byte {
                0x1b => self.state = State::Escape,
                b'\r' => self.col = 0,
                b'\n' => self.linefeed(),
                0x08 => self.col = self.col.saturating_sub(1),
                0x20..=0x7e | 0xa0..=0xff => self.print(byte),
                _ => {},
            },
            State::Escape => {
                self.state = State::Ground;
                match byte {
                    b'[' => {
                        self.params.clear();
                        self.current_param = None;
                        self.private_marker = false;
                        self.state = State::Csi;
                    },
                    b'E' => {
                        self.col = 0;
                        self.linefeed();
                    },
                    _ => {},
                }
            },
            State::Csi => match byte {
                b'0'..=b'9' => {
                    let digit = u16::from(byte - b'0');
                    let value = self.current_param.unwrap_or(0);
                    self.current_param = Some(value.saturating_mul(10).saturating_add(digit));
                },
                b';' => {
                    self.params.push(self.current_param.take().unwrap_or(0));
                },
                b'?' => self.private_marker = true,
                0x40..=0x7e => {
                    if let Some(p) = self.current_param.take() {
                        self.params.push(p);
                    }
                    self.state = State::Ground;
                    self.dispatch_csi(byte);
                },
                _ => {},
            },
        }
    }

    fn param(&self, index: usize, default: u16) -> u16 {
        match self.params.get(index) {
            Some(&0) | None => default,
            Some(&p) => p,
        }
    }

    fn dispatch_csi(&mut self, final_byte: u8) {
        if self.private_marker {
            if self.params.first() == Some(&25) {
                match final_byte {
                    b'h' => self.cursor_visible = true,
                    b'l' => self.cursor_visible = false,
                    _ => {},
                }
            }
            return;
        }

        match final_byte {
            b'H' | b'f' => {
                let row = usize::from(self.param(0, 1)) - 1;
                let col = usize::from(self.param(1, 1)) - 1;
                self.row = row.min(self.rows - 1);
                self.col = col.min(self.cols - 1);
            },
            b'K' => {
                let row = self.row;
                for c in self.col..self.cols {
                    self.grid[row][c] = b' ';
                    self.standout[row][c] = false;
                }
            },
            b'M' => self.delete_lines(usize::from(self.param(0, 1))),
            b'L' => self.insert_lines(usize::from(self.param(0, 1))),
            b'J' => {
                if self.params.first() == Some(&2) {
                    self.clear();
                }
            },
            b'm' => {
                for &p in self.params.iter().chain(self.params.is_empty().then_some(&0)) {
                    match p {
                        0 | 27 => self.attr_standout = false,
                        7 => self.attr_standout = true,
                        _ => {},
                    }
                }
            },
            _ => {},
        }
    }

    fn print(&mut self, byte: u8) {
        if self.col >= self.cols {
            // Minitel wraps onto the next row
            self.col = 0;
            self.linefeed();
        }
        self.grid[self.row][self.col] = byte;
        self.standout[self.row][self.col] = self.attr_standout;
        self.col += 1;
    }

    fn linefeed(&mut self) {
        if self.row + 1 < self.rows {
            self.row += 1;
        } else {
            self.grid.remove(0);
            self.grid.push(vec![b' '; self.cols]);
            self.standout.remove(0);
            self.standout.push(vec![false; self.cols]);
        }
    }

    /// DL: remove lines at the cursor, shifting everything below up
    fn delete_lines(&mut self, n: usize) {
        let n = n.min(self.rows - self.row);
        for _ in 0..n {
            self.grid.remove(self.row);
            self.grid.push(vec![b' '; self.cols]);
            self.standout.remove(self.row);
            self.standout.push(vec![false; self.cols]);
        }
    }

    /// IL: insert blank lines at the cursor, pushing the bottom rows off
    fn insert_lines(&mut self, n: usize) {
        let n = n.min(self.rows - self.row);
        for _ in 0..n {
            self.grid.pop();
            self.grid.insert(self.row, vec![b' '; self.cols]);
            self.standout.pop();
            self.standout.insert(self.row, vec![false; self.cols]);
        }
    }

    fn clear(&mut self) {
        for line in &mut self.grid {
            line.fill(b' ');
        }
        for line in &mut self.standout {
            line.fill(false);
        }
    }

    /// Serializable copy of the visible state
    pub fn snapshot(&self) -> Snapshot {
        let (row, col) = self.cursor();
        Snapshot {
            cols: self.cols,
            rows: self.rows,
            cursor_row: row,
            cursor_col: col,
            cursor_visible: self.cursor_visible,
            lines: self.lines(),
        }
    }
}

/// Deterministic text snapshot of a headless screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cols: usize,
    pub rows: usize,
    pub cursor_row: u16,
    pub cursor_col: u16,
    pub cursor_visible: bool,
    pub lines: Vec<String>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Plain text rendering with a frame showing the screen edge
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Screen ({}x{}), cursor ({}, {})\n",
            self.cols, self.rows, self.cursor_row, self.cursor_col
        ));
        let rule = "-".repeat(self.cols);
        out.push_str(&rule);
        out.push('\n');
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&rule);
        out.push('\n');
        out
    }
}

/// In-memory link: scripted key presses in, captured bytes out
///
/// Once the script runs dry, reads fail with `LinkError::Closed`, which
/// stands for the terminal being unplugged.
#[derive(Debug, Default)]
pub struct HeadlessLink {
    input: VecDeque<u8>,
    output: Vec<u8>,
    writes: Vec<usize>,
    flushes: usize,
    /// Empty polls to report before each scripted byte
    idle_polls: usize,
    pending_idle: usize,
    open: bool,
    releases: usize,
}

impl HeadlessLink {
    pub fn new() -> Self {
        Self {
            open: true,
            ..Self::default()
        }
    }

    /// Link whose keyboard will produce `keys`, in order
    pub fn with_keys(keys: &[u8]) -> Self {
        let mut link = Self::new();
        link.push_keys(keys);
        link
    }

    /// Report `n` empty polls before every scripted byte
    pub fn with_idle_polls(mut self, n: usize) -> Self {
        self.idle_polls = n;
        self.pending_idle = n;
        self
    }

    pub fn push_keys(&mut self, keys: &[u8]) {
        self.input.extend(keys.iter().copied());
    }

    /// Keys not yet consumed
    pub fn pending_keys(&self) -> usize {
        self.input.len()
    }

    /// Every byte written so far
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Size of each individual write call
    pub fn writes(&self) -> &[usize] {
        &self.writes
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// How many times the link was released to a collaborator
    pub fn releases(&self) -> usize {
        self.releases
    }

    /// Render everything written so far onto a fresh screen
    pub fn render(&self, cols: usize, rows: usize) -> HeadlessScreen {
        let mut screen = HeadlessScreen::new(cols, rows);
        screen.process(&self.output);
        screen
    }
}

impl Write for HeadlessLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.open {
            return Err(LinkError::Closed.into_io());
        }
        self.output.extend_from_slice(buf);
        self.writes.push(buf.len());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.open {
            return Err(LinkError::Closed.into_io());
        }
        self.flushes += 1;
        Ok(())
    }
}

impl Link for HeadlessLink {
    fn read_byte(&mut self) -> LinkResult<Option<u8>> {
        if !self.open {
            return Err(LinkError::Closed);
        }
        if self.pending_idle > 0 && !self.input.is_empty() {
            self.pending_idle -= 1;
            return Ok(None);
        }
        match self.input.pop_front() {
            Some(byte) => {
                self.pending_idle = self.idle_polls;
                Ok(Some(byte))
            },
            None => Err(LinkError::Closed),
        }
    }

    fn release(&mut self) {
        if self.open {
            self.open = false;
            self.releases += 1;
        }
    }

    fn reacquire(&mut self) -> LinkResult<()> {
        self.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_position_and_print() {
        let mut screen = HeadlessScreen::new(10, 5);
        screen.process(b"\x1b[3;5HX");
        assert_eq!(screen.line(3), "    X");
        assert_eq!(screen.cursor(), (3, 6));
    }

    #[test]
    fn test_erase_line() {
        let mut screen = HeadlessScreen::new(10, 3);
        screen.process(b"\x1b[1;1Habcdefgh\x1b[1;4H\x1b[K");
        assert_eq!(screen.line(1), "abc");
    }

    #[test]
    fn test_delete_line_shifts_whole_screen() {
        let mut screen = HeadlessScreen::new(10, 4);
        screen.process(b"\x1b[1;1Hone\x1b[2;1Htwo\x1b[3;1Hthree\x1b[4;1Hfour");
        screen.process(b"\x1b[2;1H\x1b[M");
        assert_eq!(screen.lines(), vec!["one", "three", "four", ""]);
    }

    #[test]
    fn test_insert_line_pushes_bottom_off() {
        let mut screen = HeadlessScreen::new(10, 4);
        screen.process(b"\x1b[1;1Hone\x1b[2;1Htwo\x1b[3;1Hthree\x1b[4;1Hfour");
        screen.process(b"\x1b[2;1H\x1b[L");
        assert_eq!(screen.lines(), vec!["one", "", "two", "three"]);
    }

    #[test]
    fn test_clear_and_standout() {
        let mut screen = HeadlessScreen::new(10, 3);
        screen.process(b"junk\x1b[2J\x1b[H\x1b[7mA\x1b[27mB");
        assert_eq!(screen.line(1), "AB");
        assert!(screen.is_standout(1, 1));
        assert!(!screen.is_standout(1, 2));
        assert!(!screen.is_standout(0, 0));
    }

    #[test]
    fn test_cursor_visibility_and_next_line() {
        let mut screen = HeadlessScreen::new(10, 3);
        screen.process(b"\x1b[?25lab\x1bEcd");
        assert!(!screen.cursor_visible());
        assert_eq!(screen.lines(), vec!["ab", "cd", ""]);
        screen.process(b"\x1b[?25h");
        assert!(screen.cursor_visible());
    }

    #[test]
    fn test_latin1_and_backspace() {
        let mut screen = HeadlessScreen::new(10, 2);
        screen.process(b"caf\xe9x\x08 ");
        assert_eq!(screen.line(1), "café");
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let mut screen = HeadlessScreen::new(8, 2);
        screen.process(b"hello");
        let snapshot = screen.snapshot();
        let restored = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(snapshot, restored);
        assert!(snapshot.to_text().contains("hello"));
    }

    #[test]
    fn test_headless_link_script() {
        let mut link = HeadlessLink::with_keys(b"ab").with_idle_polls(1);
        assert_eq!(link.read_byte().unwrap(), None);
        assert_eq!(link.read_byte().unwrap(), Some(b'a'));
        assert_eq!(link.read_byte().unwrap(), None);
        assert_eq!(link.read_byte().unwrap(), Some(b'b'));
        assert!(matches!(link.read_byte(), Err(LinkError::Closed)));
    }

    #[test]
    fn test_headless_link_release() {
        let mut link = HeadlessLink::new();
        link.write_all(b"x").unwrap();
        link.release();
        assert!(!link.is_open());
        assert!(link.write_all(b"y").is_err());
        link.reacquire().unwrap();
        link.write_all(b"z").unwrap();
        assert_eq!(link.output(), b"xz");
        assert_eq!(link.releases(), 1);
    }
}
