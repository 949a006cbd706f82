//! Minitel Headless Runner
//!
//! Renders a text file through the pager or the scroller onto an
//! in-memory screen, with scripted key presses, and prints the final
//! screen as text or JSON. No serial device is needed.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use minitel_terminal::app::screens::{self, Cues};
use minitel_terminal::app::{self, Config};
use minitel_terminal::caps::Capabilities;
use minitel_terminal::core::Layout;
use minitel_terminal::headless::HeadlessLink;
use minitel_terminal::link::LinkError;
use minitel_terminal::sleeper::MockSleeper;
use minitel_terminal::Terminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Page,
    Scroll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "minitel-headless", version)]
#[command(about = "Preview Minitel screens without a terminal attached")]
struct Cli {
    /// Text file to render
    file: PathBuf,

    /// Presentation mode
    #[arg(short, long, value_enum, default_value = "page")]
    mode: Mode,

    /// Keys typed on the keyboard; `\r` stands for ENTER
    #[arg(short, long, default_value = "\\r\\r\\r\\r\\r\\r\\r\\r")]
    keys: String,

    #[arg(short, long, default_value_t = 80)]
    cols: u16,

    #[arg(short, long, default_value_t = 24)]
    rows: u16,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Configuration file for prompts and timing
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    app::init_logging(cli.debug);

    let config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error reading config: {}", e);
                return ExitCode::FAILURE;
            },
        },
        None => Config::default(),
    };

    let layout = Layout::new(cli.cols, cli.rows);
    let link = HeadlessLink::with_keys(&unescape_keys(&cli.keys));
    let mut term = Terminal::new(link, Capabilities::ansi(), layout)
        .with_text_mode(config.terminal.text_mode)
        .with_sleeper(Arc::new(MockSleeper::new()));

    let result = match cli.mode {
        Mode::Page => screens::page_file(&mut term, &config, &cli.file).map(|_| ()),
        Mode::Scroll => screens::scroll_file(&mut term, &config, &Cues::silent(), &cli.file),
    };
    match result {
        Ok(()) => {},
        Err(LinkError::Closed) => tracing::info!("Key script exhausted"),
        Err(e) => {
            eprintln!("Error rendering: {}", e);
            return ExitCode::FAILURE;
        },
    }

    let screen = term
        .link()
        .render(usize::from(layout.cols), usize::from(layout.lines));
    let snapshot = screen.snapshot();
    match cli.format {
        OutputFormat::Text => print!("{}", snapshot.to_text()),
        OutputFormat::Json => match snapshot.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing snapshot: {}", e);
                return ExitCode::FAILURE;
            },
        },
    }

    let _ = io::Write::flush(&mut io::stdout());
    ExitCode::SUCCESS
}

/// Turn `\r`, `\n`, `\b` and `\\` escapes into bytes
fn unescape_keys(keys: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(keys.len());
    let mut chars = keys.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.extend(c.to_string().bytes());
            continue;
        }
        match chars.next() {
            Some('r') => out.push(b'\r'),
            Some('n') => out.push(b'\n'),
            Some('b') => out.push(0x08),
            Some('\\') => out.push(b'\\'),
            Some(other) => {
                out.push(b'\\');
                out.extend(other.to_string().bytes());
            },
            None => out.push(b'\\'),
        }
    }
    out
}
