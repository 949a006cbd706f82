//! Terminal Core Module
//!
//! Platform-independent screen state. This module contains:
//! - Screen regions and the fixed layout
//! - Scroll window fill state
//! - Page cursor for paginated bodies
//! - Single-line input buffer
//!
//! Nothing here performs I/O; the `terminal` module turns these states into
//! control sequences on the link.

mod input;
mod page;
mod region;
mod scroll;

pub use input::{is_terminator, InputBuffer, KeyOutcome, BS, CR, DEL, LF};
pub use page::PageCursor;
pub use region::{Layout, ScreenRegion};
pub use scroll::{ScrollPhase, ScrollState, ScrollStep};
