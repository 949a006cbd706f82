//! Minitel Terminal
//!
//! Drives a Minitel on a serial device: the menu, paged or scrolled
//! documents, the boot sequence, and the chat screen.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use minitel_terminal::app::screens::{self, BootExit, Cues};
use minitel_terminal::app::{self, Config, ConfigError};
use minitel_terminal::chat::{load_system_prompt, CommandChat, Conversation};
use minitel_terminal::link::{Interrupt, LinkError, SerialLink};
use minitel_terminal::Terminal;

#[derive(Parser)]
#[command(name = "minitel-term", version)]
#[command(about = "Drive a Minitel over a 7E1 serial link")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ~/.config/minitel/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serial device
    #[arg(long, global = true)]
    device: Option<PathBuf>,

    /// Line speed
    #[arg(long, global = true)]
    baud: Option<u32>,

    /// terminfo entry name (overrides MINITEL_TERM)
    #[arg(long, global = true)]
    term: Option<String>,

    /// Log received bytes and internal steps to stderr
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show a text file one page at a time
    Page { file: PathBuf },

    /// Scroll a text file through the content window
    Scroll { file: PathBuf },

    /// Art screen, launch question, logo, loading bar, then hand-off
    Boot {
        /// Art shown above the question
        #[arg(long, default_value = "art.txt")]
        art: PathBuf,

        /// Logo scrolled after a positive answer
        #[arg(long, default_value = "logo.txt")]
        logo: PathBuf,

        /// Command given the serial device once the sequence ends
        #[arg(long, num_args = 1.., allow_hyphen_values = true)]
        next: Vec<String>,
    },

    /// Question box backed by the configured chat command
    Chat,

    /// Numbered menu of documents and programs from the config
    Menu,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error("no chat command configured")]
    NoChatCommand,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    app::init_logging(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("minitel-term: {}", e);
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let mut config = app::load_config(cli.config.as_deref())?;
    apply_flags(&mut config, &cli);

    let interrupt = Interrupt::install()?;
    let link = SerialLink::open(config.link.settings())?.with_interrupt(interrupt);
    let mut term = app::build_terminal(link, &config);
    let cues = Cues::from_config(&config.audio);

    let result = dispatch(&mut term, &config, &cues, cli.command);
    match result {
        Err(Error::Link(LinkError::Interrupted)) => {
            tracing::info!("Interrupted, closing link");
            Ok(())
        },
        other => other,
    }
}

fn apply_flags(config: &mut Config, cli: &Cli) {
    if let Some(device) = &cli.device {
        config.link.device = device.clone();
    }
    if let Some(baud) = cli.baud {
        config.link.baud = baud;
    }
    if let Some(term) = &cli.term {
        config.terminal.term = term.clone();
    }
}

fn dispatch(
    term: &mut Terminal<SerialLink>,
    config: &Config,
    cues: &Cues,
    command: Commands,
) -> Result<(), Error> {
    match command {
        Commands::Page { file } => {
            let outcome = screens::page_file(term, config, &file)?;
            tracing::info!(pages = outcome.pages(), "Document closed");
        },
        Commands::Scroll { file } => screens::scroll_file(term, config, cues, &file)?,
        Commands::Boot { art, logo, next } => {
            if screens::boot(term, config, cues, &art, &logo, &next)? == BootExit::Declined {
                tracing::info!("Boot declined");
            }
        },
        Commands::Chat => {
            let mut engine = CommandChat::from_command_line(&config.chat.command).ok_or(Error::NoChatCommand)?;
            let mut conversation = Conversation::new(
                load_system_prompt(&config.chat.system_prompt),
                config.chat.history_limit,
            );
            screens::chat(term, config, cues, &mut engine, &mut conversation)?;
        },
        Commands::Menu => screens::menu(term, config, cues)?,
    }
    Ok(())
}
