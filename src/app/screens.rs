//! Application screens
//!
//! The document reader, the boot sequence and the chat screen, written
//! against any `Link` so they run the same on the serial device and on the
//! headless link.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use super::config::{Answer, AudioConfig, Config, MenuAction, MenuItem, TERM_ENV};
use crate::audio::{self, LoopPlayer, PlayerCommand};
use crate::charset;
use crate::chat::{ChatEngine, Conversation};
use crate::core::ScreenRegion;
use crate::link::{Link, LinkResult};
use crate::terminal::{Handoff, PageOutcome, PagePrompt, Terminal, INPUT_COL};
use crate::text;

pub const DOCUMENT_TITLE: &str = "#  -  SEEGSON BIOS 5.3.09.63";
pub const CHAT_TITLE: &str = "#  -  A.P.O.L.L.O -  CENTRAL ARTIFICIAL INTELLIGENCE";
const CHAT_RULE: &str = "================================";

pub const YOU_LABEL: &str = "[YOU] ";
pub const APOLLO_LABEL: &str = "[APOLLO] ";

const MENU_RULE: &str = "============================";

/// Row of the first menu entry
pub const MENU_TOP: u16 = 7;
/// Column the menu entries start at
pub const MENU_COL: u16 = 4;
/// Row of menu status messages, between the header and the entries
pub const MENU_STATUS_ROW: u16 = 6;

/// Row of the echoed question on the chat screen
pub const CHAT_USER_ROW: u16 = 5;
/// Row of the reply label; the reply starts one row below
pub const CHAT_REPLY_ROW: u16 = CHAT_USER_ROW + 2;

/// Pause after a failed hand-off so the message can be read
const HANDOFF_FAILURE_PAUSE: Duration = Duration::from_secs(2);

/// Sound cues for the screens; silent when audio is off
#[derive(Debug, Clone, Default)]
pub struct Cues {
    player: Option<PlayerCommand>,
}

impl Cues {
    pub fn from_config(audio: &AudioConfig) -> Self {
        Self {
            player: audio.player(),
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn once(&self, file: &Path) {
        if let Some(player) = &self.player {
            audio::play_once(player, file);
        }
    }

    /// Loop `file` until the returned player is dropped
    pub fn looping(&self, file: &Path) -> LoopPlayer {
        match &self.player {
            Some(player) => LoopPlayer::start(player, file),
            None => LoopPlayer::silent(),
        }
    }
}

/// How the boot sequence ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootExit {
    /// The operator answered no
    Declined,
    /// The sequence ran and there was nothing to hand off to
    Completed,
}

fn missing(path: &Path) -> String {
    let name = path.file_name().unwrap_or(path.as_os_str());
    format!("[{} not found]", name.to_string_lossy())
}

fn read_body(path: &Path) -> Vec<String> {
    text::prepare(&text::load_lines(path, &missing(path)))
}

fn page_prompt(config: &Config, row: u16) -> PagePrompt {
    PagePrompt {
        row,
        message: config.prompts.more.clone(),
        line_delay: config.scroll.page_line_delay(),
    }
}

/// Header, then `file` one page at a time in the body window
pub fn page_file<L: Link>(term: &mut Terminal<L>, config: &Config, file: &Path) -> LinkResult<PageOutcome> {
    let layout = term.layout();
    term.draw_header(DOCUMENT_TITLE, "")?;
    let lines = read_body(file);
    let outcome = term.paginate(&lines, layout.body(), &page_prompt(config, layout.input_row()))?;
    if let PageOutcome::Finished { .. } = outcome {
        term.status(layout.input_row(), &config.prompts.end)?;
        term.wait_enter()?;
    }
    Ok(outcome)
}

/// Header, then `file` scrolled through the body window with a typing cue
pub fn scroll_file<L: Link>(term: &mut Terminal<L>, config: &Config, cues: &Cues, file: &Path) -> LinkResult<()> {
    let layout = term.layout();
    term.draw_header(DOCUMENT_TITLE, "")?;
    let lines = read_body(file);
    let window = layout.body().with_columns(2, layout.cols - 1);
    {
        let _typing = cues.looping(&config.audio.typing);
        term.scroll_lines(window, &lines, config.scroll.line_delay())?;
    }
    term.status(layout.input_row(), &config.prompts.end)?;
    term.wait_enter()
}

fn show_art<L: Link>(term: &mut Terminal<L>, stage: ScreenRegion, lines: &[String]) -> LinkResult<()> {
    let width = usize::from(stage.width());
    term.draw(|f| {
        for (i, row) in stage.rows().enumerate() {
            let line = lines.get(i).map(String::as_str).unwrap_or("");
            f.clear_row(row, stage.left).clipped(line, width);
        }
    })
}

/// Art screen, yes/no question, logo scroll, loading bar, then hand-off
///
/// A negative answer ends the sequence; any other unrecognized answer asks
/// again. After the collaborator in `next` exits the sequence restarts.
pub fn boot<L: Link>(
    term: &mut Terminal<L>,
    config: &Config,
    cues: &Cues,
    art: &Path,
    logo: &Path,
    next: &[String],
) -> LinkResult<BootExit> {
    let layout = term.layout();
    let stage = layout.above_input();
    let input_row = layout.input_row();

    loop {
        term.clear_screen()?;
        show_art(term, stage, &read_body(art))?;
        cues.once(&config.audio.boot);

        let answer = term.prompt(input_row, &config.prompts.boot, config.prompts.answer_len())?;
        match config.prompts.classify(&answer) {
            Answer::Yes => {},
            Answer::No => return Ok(BootExit::Declined),
            Answer::Other => {
                tracing::debug!(answer = %answer, "Unrecognized answer, asking again");
                continue;
            },
        }

        term.clear_screen()?;
        cues.once(&config.audio.beep);
        {
            let _typing = cues.looping(&config.audio.typing);
            term.scroll_lines(stage, &read_body(logo), config.scroll.line_delay())?;
        }
        {
            let _rattle = cues.looping(&config.audio.rattle);
            term.loading(input_row, config.scroll.loading_duration())?;
        }
        cues.once(&config.audio.final_cue);

        if next.is_empty() {
            return Ok(BootExit::Completed);
        }
        launch(term, config, next, input_row)?;
    }
}

/// Hand the link to `command_line`, with the terminal type in its environment
///
/// A failure is left on `status_row` long enough to be read.
pub fn launch<L: Link>(
    term: &mut Terminal<L>,
    config: &Config,
    command_line: &[String],
    status_row: u16,
) -> LinkResult<Handoff> {
    let Some((program, args)) = command_line.split_first() else {
        let reason = "No command configured".to_string();
        term.status(status_row, &reason)?;
        term.pause(HANDOFF_FAILURE_PAUSE);
        return Ok(Handoff::Failed { reason });
    };
    let mut command = Command::new(program);
    command.args(args).env(TERM_ENV, &config.terminal.term);
    let outcome = term.hand_off(&mut command, status_row)?;
    if let Handoff::Failed { .. } = outcome {
        term.pause(HANDOFF_FAILURE_PAUSE);
    }
    Ok(outcome)
}

/// Header, numbered entries and the input box
pub fn menu_layout<L: Link>(term: &mut Terminal<L>, config: &Config) -> LinkResult<()> {
    let layout = term.layout();
    term.draw_header(DOCUMENT_TITLE, MENU_RULE)?;
    term.clear_rows(layout.header().bottom + 1, layout.status_row())?;

    let last = layout.status_row().saturating_sub(1);
    for (row, item) in (MENU_TOP..=last).zip(&config.menu.items) {
        term.write_standout_at(row, MENU_COL, &item.key)?;
        let col = MENU_COL + item.key.chars().count() as u16;
        term.write_at(row, col, &format!(" - {}", item.label))?;
    }
    term.input_box(layout.input_row())
}

/// Run the action of one menu entry; a failed launch returns its reason
pub fn run_menu_item<L: Link>(
    term: &mut Terminal<L>,
    config: &Config,
    cues: &Cues,
    item: &MenuItem,
) -> LinkResult<Option<String>> {
    tracing::info!(key = %item.key, label = %item.label, "Menu entry chosen");
    match &item.action {
        MenuAction::Page { file } => {
            page_file(term, config, file)?;
        },
        MenuAction::Scroll { file } => scroll_file(term, config, cues, file)?,
        MenuAction::Launch { command } => {
            if let Handoff::Failed { reason } = launch(term, config, command, MENU_STATUS_ROW)? {
                return Ok(Some(reason));
            }
        },
    }
    Ok(None)
}

/// Read menu queries until the link fails
///
/// A known entry runs and the menu is drawn again; anything else is
/// reported on the status row.
pub fn menu<L: Link>(term: &mut Terminal<L>, config: &Config, cues: &Cues) -> LinkResult<()> {
    let row = term.layout().input_row();
    let capacity = term.input_capacity();
    menu_layout(term, config)?;
    loop {
        let query = term.read_line(row, INPUT_COL, capacity, true)?;
        term.clear_field(row, INPUT_COL, capacity)?;
        let query = query.trim();
        if query.is_empty() {
            continue;
        }
        match config.menu.find(query) {
            Some(item) => {
                let failure = run_menu_item(term, config, cues, item)?;
                menu_layout(term, config)?;
                if let Some(reason) = failure {
                    term.status(MENU_STATUS_ROW, &reason)?;
                    term.move_to(row, INPUT_COL)?;
                }
            },
            None => {
                let message = format!("{}{}", config.prompts.unknown_command, query);
                term.status(MENU_STATUS_ROW, &message)?;
                term.move_to(row, INPUT_COL)?;
            },
        }
    }
}

/// Chat header, cleared work area and the input box
pub fn chat_layout<L: Link>(term: &mut Terminal<L>) -> LinkResult<()> {
    let layout = term.layout();
    term.draw_header(CHAT_TITLE, CHAT_RULE)?;
    term.clear_rows(layout.header().bottom + 1, layout.status_row())?;
    term.input_box(layout.input_row())
}

/// One question and its paginated answer
pub fn chat_turn<L, E>(
    term: &mut Terminal<L>,
    config: &Config,
    cues: &Cues,
    engine: &mut E,
    conversation: &mut Conversation,
    query: &str,
) -> LinkResult<PageOutcome>
where
    L: Link,
    E: ChatEngine + ?Sized,
{
    let layout = term.layout();
    let (left, right) = (2, layout.cols - 1);
    let width = usize::from(right - left + 1);

    term.draw(|f| {
        f.clear_row(CHAT_USER_ROW, left)
            .text(YOU_LABEL)
            .clipped(query, width.saturating_sub(YOU_LABEL.len()));
        f.clear_row(CHAT_REPLY_ROW, left).text(APOLLO_LABEL);
    })?;

    let reply = {
        let _thinking = cues.looping(&config.audio.rattle);
        conversation.exchange(engine, query)
    };

    let lines = text::wrap(&charset::sanitize(&reply), width);
    let window = layout
        .rows(CHAT_REPLY_ROW + 1, layout.status_row() - 1)
        .with_columns(left, right);
    let outcome = term.paginate(&lines, window, &page_prompt(config, layout.status_row()))?;
    term.input_box(layout.input_row())?;
    Ok(outcome)
}

/// Read questions from the input box until the link fails
pub fn chat<L, E>(
    term: &mut Terminal<L>,
    config: &Config,
    cues: &Cues,
    engine: &mut E,
    conversation: &mut Conversation,
) -> LinkResult<()>
where
    L: Link,
    E: ChatEngine + ?Sized,
{
    chat_layout(term)?;
    let row = term.layout().input_row();
    let capacity = term.input_capacity();
    loop {
        let query = term.read_line(row, INPUT_COL, capacity, true)?;
        term.clear_field(row, INPUT_COL, capacity)?;
        let query = query.trim();
        if !query.is_empty() {
            chat_turn(term, config, cues, engine, conversation, query)?;
        }
    }
}
