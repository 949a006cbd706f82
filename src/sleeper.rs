//! Pauses between bursts and scrolled lines
//!
//! Every deliberate wait in the renderer goes through a `Sleeper`, so tests
//! can record the pauses instead of waiting for them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// Abstraction over `thread::sleep`
pub trait Sleeper: Send + Sync {
    /// Sleep for the specified duration
    fn sleep(&self, duration: Duration);
}

/// Sleeper that actually blocks the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct RealSleeper;

impl Sleeper for RealSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Sleeper that records every requested pause and returns immediately
#[derive(Debug, Default)]
pub struct MockSleeper {
    call_count: AtomicU64,
    durations: Mutex<Vec<Duration>>,
}

impl MockSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `sleep` was called
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Sum of all requested pauses
    pub fn total_duration(&self) -> Duration {
        self.durations().iter().sum()
    }

    /// Every requested pause, in call order
    pub fn durations(&self) -> Vec<Duration> {
        self.durations
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

impl Sleeper for MockSleeper {
    fn sleep(&self, duration: Duration) {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut durations) = self.durations.lock() {
            durations.push(duration);
        }
    }
}
