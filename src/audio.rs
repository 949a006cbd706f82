//! Ambient sound cues
//!
//! A `LoopPlayer` replays a sound file in a background thread while the
//! foreground flow renders (typing noise during a scroll, a rattle during
//! the loading bar). It never touches the serial link; the only contact
//! with the foreground is the stop signal sent over a channel.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often the player thread checks the running process
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Longest `stop` waits for the thread to wind down
pub const STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Default player command
pub const DEFAULT_PLAYER: &str = "aplay";

/// Command line for one playback: the player, its arguments, then the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl PlayerCommand {
    /// Split a configured command line like `"aplay -q"`
    pub fn parse(command: &str) -> Option<Self> {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    fn command(&self, file: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }
}

impl Default for PlayerCommand {
    fn default() -> Self {
        Self {
            program: DEFAULT_PLAYER.to_string(),
            args: vec!["-q".to_string()],
        }
    }
}

/// Play `file` once, blocking until the player exits
///
/// A missing player or a failed playback is logged and otherwise ignored.
pub fn play_once(player: &PlayerCommand, file: &Path) {
    match player.command(file).status() {
        Ok(status) if !status.success() => {
            tracing::debug!(file = %file.display(), %status, "Cue playback failed");
        },
        Ok(_) => {},
        Err(e) => tracing::debug!(player = %player.program, error = %e, "Player unavailable"),
    }
}

/// A sound replayed in the background until stopped
pub struct LoopPlayer {
    /// `None` after `stop()`
    handle: Option<JoinHandle<()>>,
    stop_tx: Option<Sender<()>>,
}

impl LoopPlayer {
    /// Start looping `file` through `player`
    pub fn start(player: &PlayerCommand, file: impl Into<PathBuf>) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel();
        let player = player.clone();
        let file = file.into();

        let handle = thread::Builder::new()
            .name("loop-player".to_string())
            .spawn(move || play_loop(&player, &file, &stop_rx));

        match handle {
            Ok(handle) => Self {
                handle: Some(handle),
                stop_tx: Some(stop_tx),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to spawn audio thread");
                Self::silent()
            },
        }
    }

    /// A player that never plays; used when audio is disabled
    pub fn silent() -> Self {
        Self {
            handle: None,
            stop_tx: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the thread and wait up to `STOP_TIMEOUT` for it to exit
    ///
    /// Idempotent. A thread that outlives the timeout is detached.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        let Some(handle) = self.handle.take() else {
            return;
        };
        let deadline = Instant::now() + STOP_TIMEOUT;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if handle.is_finished() {
            let _ = handle.join();
        } else {
            tracing::warn!("Audio thread did not stop in time");
        }
    }
}

impl Drop for LoopPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn play_loop(player: &PlayerCommand, file: &Path, stop_rx: &mpsc::Receiver<()>) {
    loop {
        let mut child = match player.command(file).spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::debug!(player = %player.program, error = %e, "Player unavailable");
                return;
            },
        };
        if !wait_or_stop(&mut child, stop_rx) {
            return;
        }
    }
}

/// Wait for one playback; false once stop was requested
fn wait_or_stop(child: &mut Child, stop_rx: &mpsc::Receiver<()>) -> bool {
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Ok(None) => {},
            Err(e) => {
                tracing::debug!(error = %e, "Lost track of player process");
                return false;
            },
        }
        match stop_rx.recv_timeout(POLL_INTERVAL) {
            Err(RecvTimeoutError::Timeout) => {},
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                let _ = child.kill();
                let _ = child.wait();
                return false;
            },
        }
    }
}
