//! Minitel Terminal Library
//!
//! Drives a Minitel over a 7E1 serial link with XON/XOFF flow control:
//! fixed-layout screens, scrolling windows, paginated documents and a
//! single-line input box, with keystrokes read back from the same link.
//!
//! - `caps`: logical screen operations resolved to control sequences
//! - `transmit`: paced, chunked output
//! - `core`: layout regions, scroll/page/input state machines
//! - `terminal`: the rendering and input engine over a `Link`
//! - `link`: the serial device and the interrupt flag
//! - `headless`: in-memory screen and link for tests and previews
//! - `app`: configuration and logging for the binaries

pub mod app;
pub mod audio;
pub mod caps;
pub mod charset;
pub mod chat;
pub mod core;
pub mod headless;
pub mod link;
pub mod sleeper;
pub mod terminal;
pub mod text;
pub mod transmit;

pub use caps::{Capabilities, Capability};
pub use link::{Link, LinkError, LinkResult};
pub use terminal::{Handoff, PageOutcome, PagePrompt, Terminal};
