//! Screen regions and the fixed Minitel layout
//!
//! All coordinates are 1-based, rows first, matching the terminal's own
//! cursor addressing.

use serde::{Deserialize, Serialize};

/// A rectangle of rows and columns, inclusive on every edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRegion {
    pub top: u16,
    pub bottom: u16,
    pub left: u16,
    pub right: u16,
}

impl ScreenRegion {
    /// Number of rows covered
    pub fn height(&self) -> u16 {
        self.bottom - self.top + 1
    }

    /// Number of columns covered
    pub fn width(&self) -> u16 {
        self.right - self.left + 1
    }

    pub fn contains_row(&self, row: u16) -> bool {
        (self.top..=self.bottom).contains(&row)
    }

    /// Iterate over the region's rows, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = u16> {
        self.top..=self.bottom
    }

    /// Same rows, different columns
    pub fn with_columns(self, left: u16, right: u16) -> Self {
        Self { left, right, ..self }
    }
}

/// Terminal geometry and the named regions derived from it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub cols: u16,
    pub lines: u16,
}

impl Default for Layout {
    fn default() -> Self {
        Self::MINITEL
    }
}

impl Layout {
    /// Minitel 1B in 80-column mode
    pub const MINITEL: Layout = Layout { cols: 80, lines: 24 };

    /// First row of the content window below the header
    pub const CONTENT_TOP: u16 = 4;

    /// Narrowest screen that still fits the input label, the chat labels
    /// and a content column
    pub const MIN_COLS: u16 = 20;

    /// Shortest screen that keeps a reply window between the chat rows and
    /// the status row
    pub const MIN_LINES: u16 = 10;

    /// Create a layout; both dimensions are raised to the minimum usable size
    pub fn new(cols: u16, lines: u16) -> Self {
        Self {
            cols: cols.max(Self::MIN_COLS),
            lines: lines.max(Self::MIN_LINES),
        }
    }

    /// Validated region; `None` if inverted or outside `[1, lines] x [1, cols]`
    pub fn region(&self, top: u16, bottom: u16, left: u16, right: u16) -> Option<ScreenRegion> {
        let valid = top >= 1
            && left >= 1
            && top <= bottom
            && left <= right
            && bottom <= self.lines
            && right <= self.cols;
        valid.then_some(ScreenRegion {
            top,
            bottom,
            left,
            right,
        })
    }

    /// Full-width rows `top..=bottom`, clamped into the screen
    pub fn rows(&self, top: u16, bottom: u16) -> ScreenRegion {
        let top = top.clamp(1, self.lines);
        let bottom = bottom.clamp(top, self.lines);
        ScreenRegion {
            top,
            bottom,
            left: 1,
            right: self.cols,
        }
    }

    /// Two standout border rows at the top
    pub fn border(&self) -> ScreenRegion {
        self.rows(1, 2)
    }

    /// Title, message and separator rows
    pub fn header(&self) -> ScreenRegion {
        self.rows(1, 3)
    }

    /// Row for transient status messages
    pub fn status_row(&self) -> u16 {
        self.lines - 1
    }

    /// Row holding the input box
    pub fn input_row(&self) -> u16 {
        self.lines
    }

    /// Content window from `top` down to the row above the status line
    pub fn content(&self, top: u16) -> ScreenRegion {
        self.rows(top, self.status_row() - 1)
    }

    /// Content window from `top` down to the status line itself
    pub fn content_to_status(&self, top: u16) -> ScreenRegion {
        self.rows(top, self.status_row())
    }

    /// Default content window, rows 4 through LINES-1
    pub fn body(&self) -> ScreenRegion {
        self.content_to_status(Self::CONTENT_TOP)
    }

    /// Everything except the input row
    pub fn above_input(&self) -> ScreenRegion {
        self.rows(1, self.lines - 1)
    }

    /// Widest text that fits a status message
    pub fn message_width(&self) -> usize {
        usize::from(self.cols - 2)
    }
}
