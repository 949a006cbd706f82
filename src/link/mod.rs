//! Serial link to the Minitel
//!
//! This module owns the byte stream that carries both screen output and
//! keyboard input. The link is opened once per process, released before a
//! collaborator process takes the device over, and reacquired afterwards
//! with identical framing.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[cfg(unix)]
mod serial;

#[cfg(unix)]
pub use serial::{baud_rate, SerialLink};

/// Error type for link operations
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to configure line: {0}")]
    Termios(#[source] nix::Error),

    #[error("Unsupported baud rate: {0}")]
    UnsupportedBaud(u32),

    #[error("Failed to poll: {0}")]
    Poll(#[source] nix::Error),

    #[error("Failed to install signal handler: {0}")]
    Signal(#[source] io::Error),

    #[error("Link is closed")]
    Closed,

    #[error("Interrupted by signal")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[source] io::Error),
}

impl LinkError {
    /// Wrap into an `io::Error` that converts back to the same variant
    pub fn into_io(self) -> io::Error {
        let kind = match self {
            LinkError::Closed => io::ErrorKind::NotConnected,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, self)
    }
}

impl From<io::Error> for LinkError {
    fn from(err: io::Error) -> Self {
        if err.get_ref().is_some_and(|inner| inner.is::<LinkError>()) {
            if let Some(inner) = err.into_inner() {
                if let Ok(link_err) = inner.downcast::<LinkError>() {
                    return *link_err;
                }
            }
            return LinkError::Closed;
        }
        LinkError::Io(err)
    }
}

/// Result type for link operations
pub type LinkResult<T> = Result<T, LinkError>;

/// Default device path
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";

/// Default line speed
pub const DEFAULT_BAUD: u32 = 4800;

/// Default read poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Device and speed; framing is always 7 data bits, even parity, 1 stop bit
/// with XON/XOFF flow control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    pub device: PathBuf,
    pub baud: u32,
    /// Longest a single read waits before reporting "no data yet"
    pub poll_interval: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            baud: DEFAULT_BAUD,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// A byte stream to the terminal
///
/// Output goes through `Write`; input is read one byte at a time.
pub trait Link: Write {
    /// Read one byte, `Ok(None)` if nothing arrived within the poll interval
    fn read_byte(&mut self) -> LinkResult<Option<u8>>;

    /// Close the handle so another process can use the device
    fn release(&mut self);

    /// Reopen after `release` with the same settings
    fn reacquire(&mut self) -> LinkResult<()>;

    fn is_open(&self) -> bool;
}

/// Process-wide interruption flag raised by SIGINT or SIGTERM
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    raised: Arc<AtomicBool>,
}

impl Interrupt {
    /// A flag that only `raise` sets
    pub fn new() -> Self {
        Self::default()
    }

    /// Register SIGINT and SIGTERM to raise the returned flag
    #[cfg(unix)]
    pub fn install() -> LinkResult<Self> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let interrupt = Self::new();
        let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(LinkError::Signal)?;
        let flag = interrupt.clone();
        thread::Builder::new()
            .name("signal-handler".to_string())
            .spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    tracing::info!(signal = sig, "Received signal, closing link");
                    flag.raise();
                }
            })
            .map_err(LinkError::Signal)?;
        Ok(interrupt)
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// `Err(Interrupted)` once raised
    pub fn check(&self) -> LinkResult<()> {
        if self.is_raised() {
            Err(LinkError::Interrupted)
        } else {
            Ok(())
        }
    }
}
