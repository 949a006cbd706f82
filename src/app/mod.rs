//! Application glue module
//!
//! Configuration, logging, and the wiring shared by the binaries.

mod config;
pub mod screens;

use std::io;
use std::path::Path;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use config::{
    default_path, Answer, AnswerMatch, AudioConfig, ChatConfig, Config, ConfigError, LinkConfig,
    MenuAction, MenuConfig, MenuItem, PromptConfig, ScrollConfig, TerminalConfig, DEFAULT_TERM, TERM_ENV,
};

use crate::caps::Capabilities;
use crate::link::Link;
use crate::terminal::Terminal;

/// Install the stderr subscriber; `RUST_LOG` wins over `debug`
///
/// Output never goes to the serial link.
pub fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

/// Load `path` if given, the default file otherwise, then the environment
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(),
    };
    config.apply_env();
    Ok(config)
}

/// Build a terminal over `link` from the configured type, geometry and pacing
pub fn build_terminal<L: Link>(link: L, config: &Config) -> Terminal<L> {
    let caps = Capabilities::load(&config.terminal.term);
    Terminal::new(link, caps, config.terminal.layout())
        .with_pacing(config.terminal.pacing())
        .with_text_mode(config.terminal.text_mode)
}
