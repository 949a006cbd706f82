//! Line-at-a-time scrolling inside a fixed window
//!
//! The window fills top to bottom. Once full, each new line is placed by
//! deleting the window's top row (the terminal shifts everything below it up
//! by one) and writing the line on the bottom row, so the number of filled
//! rows stays equal to the window height from then on.

use super::region::ScreenRegion;

/// Where the window is in its life cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPhase {
    /// Window not yet full
    Filling,
    /// Window full; every line evicts the top row
    Scrolling,
}

/// What the renderer must do to place the next line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollStep {
    /// Write the line on `row`, which is still empty
    Fill { row: u16 },
    /// Delete `top`, then write the line on `bottom`
    Evict { top: u16, bottom: u16 },
}

impl ScrollStep {
    /// Row the new line ends up on
    pub fn target_row(&self) -> u16 {
        match *self {
            ScrollStep::Fill { row } => row,
            ScrollStep::Evict { bottom, .. } => bottom,
        }
    }
}

/// Fill level of a scrolling window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollState {
    top: u16,
    bottom: u16,
    filled: u16,
}

impl ScrollState {
    /// Empty window covering the rows of `window`
    pub fn new(window: &ScreenRegion) -> Self {
        Self {
            top: window.top,
            bottom: window.bottom,
            filled: 0,
        }
    }

    pub fn top(&self) -> u16 {
        self.top
    }

    pub fn bottom(&self) -> u16 {
        self.bottom
    }

    pub fn height(&self) -> u16 {
        self.bottom - self.top + 1
    }

    /// Rows currently holding a line
    pub fn filled(&self) -> u16 {
        self.filled
    }

    pub fn phase(&self) -> ScrollPhase {
        if self.filled < self.height() {
            ScrollPhase::Filling
        } else {
            ScrollPhase::Scrolling
        }
    }

    /// Account for one more line and say how to draw it
    pub fn advance(&mut self) -> ScrollStep {
        match self.phase() {
            ScrollPhase::Filling => {
                let row = self.top + self.filled;
                self.filled += 1;
                ScrollStep::Fill { row }
            },
            ScrollPhase::Scrolling => ScrollStep::Evict {
                top: self.top,
                bottom: self.bottom,
            },
        }
    }

    /// Forget all lines, as after erasing the window
    pub fn reset(&mut self) {
        self.filled = 0;
    }
}
