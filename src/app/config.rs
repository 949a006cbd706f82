//! Configuration for the Minitel applications

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::PlayerCommand;
use crate::charset::TextMode;
use crate::core::Layout;
use crate::link::{LinkSettings, DEFAULT_BAUD, DEFAULT_DEVICE};
use crate::terminal::DEFAULT_MORE_PROMPT;
use crate::transmit::{Pacing, DEFAULT_CHUNK_SIZE};

/// Environment variable overriding the terminal type
pub const TERM_ENV: &str = "MINITEL_TERM";

/// Default terminfo entry name
pub const DEFAULT_TERM: &str = "minitel1b-80";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub link: LinkConfig,
    pub terminal: TerminalConfig,
    pub scroll: ScrollConfig,
    pub prompts: PromptConfig,
    pub audio: AudioConfig,
    pub chat: ChatConfig,
    pub menu: MenuConfig,
}

/// Serial device settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub device: PathBuf,
    pub baud: u32,
    /// Read poll interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            baud: DEFAULT_BAUD,
            poll_interval_ms: 100,
        }
    }
}

impl LinkConfig {
    pub fn settings(&self) -> LinkSettings {
        LinkSettings {
            device: self.device.clone(),
            baud: self.baud,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

/// Terminal type, geometry and transmission pacing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// terminfo entry name
    pub term: String,
    pub columns: u16,
    pub lines: u16,
    /// Bytes per paced burst
    pub chunk_size: usize,
    /// Pause after each burst in milliseconds
    pub chunk_gap_ms: u64,
    pub text_mode: TextMode,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            term: DEFAULT_TERM.to_string(),
            columns: Layout::MINITEL.cols,
            lines: Layout::MINITEL.lines,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_gap_ms: 10,
            text_mode: TextMode::default(),
        }
    }
}

impl TerminalConfig {
    pub fn layout(&self) -> Layout {
        Layout::new(self.columns, self.lines)
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            chunk_size: self.chunk_size.max(1),
            gap: Duration::from_millis(self.chunk_gap_ms),
        }
    }
}

/// Scrolling and loading bar timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Pause after each scrolled line in milliseconds
    pub line_delay_ms: u64,
    /// Pause after each paged line in milliseconds
    pub page_line_delay_ms: u64,
    /// Loading bar duration in seconds
    pub loading_seconds: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            line_delay_ms: 100,
            page_line_delay_ms: 20,
            loading_seconds: 10.0,
        }
    }
}

impl ScrollConfig {
    pub fn line_delay(&self) -> Duration {
        Duration::from_millis(self.line_delay_ms)
    }

    pub fn page_line_delay(&self) -> Duration {
        Duration::from_millis(self.page_line_delay_ms)
    }

    /// Loading duration; negative or non-finite values mean zero
    pub fn loading_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.loading_seconds).unwrap_or(Duration::ZERO)
    }
}

/// How typed answers are compared against the answer lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerMatch {
    #[default]
    Exact,
    CaseInsensitive,
}

/// Classification of a yes/no answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// Neither list matched; ask again
    Other,
}

/// Status messages and answer policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Shown between pages
    pub more: String,
    /// Shown once a body has been fully presented
    pub end: String,
    /// Yes/no question of the boot sequence
    pub boot: String,
    pub affirmative: Vec<String>,
    pub negative: Vec<String>,
    pub answer_match: AnswerMatch,
    /// Status prefix for a menu entry nobody configured
    pub unknown_command: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            more: DEFAULT_MORE_PROMPT.to_string(),
            end: "[END. Press ENTER to return]".to_string(),
            boot: "BOOT ? (Y/N) : ".to_string(),
            affirmative: vec!["Y".to_string()],
            negative: Vec::new(),
            answer_match: AnswerMatch::default(),
            unknown_command: "Unknown command: ".to_string(),
        }
    }
}

impl PromptConfig {
    /// Classify a typed answer; surrounding blanks are ignored
    pub fn classify(&self, answer: &str) -> Answer {
        let answer = answer.trim();
        let matches = |candidates: &[String]| {
            candidates.iter().any(|c| match self.answer_match {
                AnswerMatch::Exact => c == answer,
                AnswerMatch::CaseInsensitive => c.eq_ignore_ascii_case(answer),
            })
        };
        if matches(&self.affirmative) {
            Answer::Yes
        } else if matches(&self.negative) {
            Answer::No
        } else {
            Answer::Other
        }
    }

    /// Longest answer worth reading
    pub fn answer_len(&self) -> usize {
        self.affirmative
            .iter()
            .chain(&self.negative)
            .map(|a| a.chars().count())
            .max()
            .unwrap_or(1)
            .max(3)
    }
}

/// Sound cues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    /// Player command line; the cue file is appended
    pub player: String,
    pub boot: PathBuf,
    pub beep: PathBuf,
    pub typing: PathBuf,
    pub rattle: PathBuf,
    pub final_cue: PathBuf,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            player: "aplay -q".to_string(),
            boot: PathBuf::from("boot.wav"),
            beep: PathBuf::from("beep.wav"),
            typing: PathBuf::from("typing_long.wav"),
            rattle: PathBuf::from("subtle_long_type.wav"),
            final_cue: PathBuf::from("horn.wav"),
        }
    }
}

impl AudioConfig {
    /// The player to use, `None` when audio is off or unconfigured
    pub fn player(&self) -> Option<PlayerCommand> {
        if !self.enabled {
            return None;
        }
        PlayerCommand::parse(&self.player)
    }
}

/// Chat collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Command line of the chat engine
    pub command: String,
    pub system_prompt: PathBuf,
    /// History bound, system prompt included
    pub history_limit: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            command: "minitel-chat".to_string(),
            system_prompt: PathBuf::from("prompt.txt"),
            history_limit: crate::chat::DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// What choosing a menu entry does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum MenuAction {
    /// Show a file one page at a time
    Page { file: PathBuf },
    /// Scroll a file through the body window
    Scroll { file: PathBuf },
    /// Hand the link to another program
    Launch { command: Vec<String> },
}

/// One line of the menu and the query that selects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub key: String,
    pub label: String,
    #[serde(flatten)]
    pub action: MenuAction,
}

impl MenuItem {
    pub fn new(key: &str, label: &str, action: MenuAction) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            action,
        }
    }
}

/// Entries of the main menu, in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    pub items: Vec<MenuItem>,
}

impl Default for MenuConfig {
    fn default() -> Self {
        let page = |file: &str| MenuAction::Page {
            file: PathBuf::from(file),
        };
        Self {
            items: vec![
                MenuItem::new(
                    "1",
                    "A.P.O.L.L.O",
                    MenuAction::Launch {
                        command: vec!["minitel-term".to_string(), "boot".to_string()],
                    },
                ),
                MenuItem::new("2", "POWER STATUS", page("2.txt")),
                MenuItem::new("3", "HVAC", page("3.txt")),
                MenuItem::new("4", "LIGHTNING", page("4.txt")),
                MenuItem::new("5", "CONTAINMENT PROTOCOL", page("5.txt")),
            ],
        }
    }
}

impl MenuConfig {
    /// Entry selected by `query`, ignoring surrounding blanks
    pub fn find(&self, query: &str) -> Option<&MenuItem> {
        let query = query.trim();
        self.items.iter().find(|item| item.key == query)
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from the default location or return defaults
    pub fn load_or_default() -> Self {
        if let Some(config_path) = default_path() {
            if config_path.exists() {
                match Self::load(&config_path) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!(path = %config_path.display(), error = %e, "Ignoring config file")
                    },
                }
            }
        }
        Self::default()
    }

    /// Apply `MINITEL_TERM` on top of the loaded values
    pub fn apply_env(&mut self) {
        self.apply_term_override(std::env::var(TERM_ENV).ok());
    }

    fn apply_term_override(&mut self, term: Option<String>) {
        if let Some(term) = term.filter(|t| !t.trim().is_empty()) {
            self.terminal.term = term.trim().to_string();
        }
    }
}

/// `~/.config/minitel/config.json`
pub fn default_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("minitel")
            .join("config.json")
    })
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.link.baud, 4800);
        assert_eq!(config.link.device, PathBuf::from("/dev/ttyUSB0"));
        assert_eq!(config.terminal.term, "minitel1b-80");
        assert_eq!(config.terminal.layout(), Layout::MINITEL);
        assert_eq!(config.terminal.pacing(), Pacing::default());
        assert_eq!(config.scroll.loading_duration(), Duration::from_secs(10));
        assert_eq!(config.chat.history_limit, 40);
    }

    #[test]
    fn test_config_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.terminal.term = "ansi".to_string();
        config.scroll.loading_seconds = 2.0;
        config.save(&path).unwrap();

        let restored = Config::load(&path).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"link": {"baud": 1200}, "prompts": {"answer_match": "case-insensitive"}}"#)
                .unwrap();
        assert_eq!(config.link.baud, 1200);
        assert_eq!(config.link.poll_interval_ms, 100);
        assert_eq!(config.prompts.answer_match, AnswerMatch::CaseInsensitive);
        assert_eq!(config.terminal, TerminalConfig::default());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load(&dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(Config::load(&bad), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_menu_entries_from_json() {
        let config: Config = serde_json::from_str(
            r#"{"menu": {"items": [
                {"key": "A", "label": "Logs", "action": "scroll", "file": "logs.txt"},
                {"key": "B", "label": "Shell", "action": "launch", "command": ["sh", "-c", "true"]}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(config.menu.items.len(), 2);
        assert_eq!(
            config.menu.find(" A ").map(|item| &item.action),
            Some(&MenuAction::Scroll {
                file: PathBuf::from("logs.txt")
            })
        );
        assert!(config.menu.find("C").is_none());
        assert_eq!(config.prompts, PromptConfig::default());
    }

    #[test]
    fn test_default_menu() {
        let menu = MenuConfig::default();
        let keys: Vec<&str> = menu.items.iter().map(|item| item.key.as_str()).collect();
        assert_eq!(keys, ["1", "2", "3", "4", "5"]);
        assert!(matches!(menu.find("1").map(|item| &item.action), Some(MenuAction::Launch { .. })));
    }

    #[test]
    fn test_term_override() {
        let mut config = Config::default();
        config.apply_term_override(None);
        assert_eq!(config.terminal.term, DEFAULT_TERM);
        config.apply_term_override(Some("  ".to_string()));
        assert_eq!(config.terminal.term, DEFAULT_TERM);
        config.apply_term_override(Some("minitel2-80".to_string()));
        assert_eq!(config.terminal.term, "minitel2-80");
    }

    #[test]
    fn test_exact_answers() {
        let prompts = PromptConfig::default();
        assert_eq!(prompts.classify("Y"), Answer::Yes);
        assert_eq!(prompts.classify(" Y "), Answer::Yes);
        assert_eq!(prompts.classify("y"), Answer::Other);
        assert_eq!(prompts.classify("N"), Answer::Other);
    }

    #[test]
    fn test_case_insensitive_answers() {
        let prompts = PromptConfig {
            affirmative: vec!["y".into(), "yes".into(), "oui".into()],
            negative: vec!["n".into(), "non".into()],
            answer_match: AnswerMatch::CaseInsensitive,
            ..PromptConfig::default()
        };
        assert_eq!(prompts.classify("OUI"), Answer::Yes);
        assert_eq!(prompts.classify("Yes"), Answer::Yes);
        assert_eq!(prompts.classify("Non"), Answer::No);
        assert_eq!(prompts.classify("maybe"), Answer::Other);
        assert_eq!(prompts.answer_len(), 3);
    }

    #[test]
    fn test_audio_player() {
        let mut audio = AudioConfig::default();
        assert_eq!(audio.player(), Some(PlayerCommand::default()));
        audio.enabled = false;
        assert_eq!(audio.player(), None);
    }

    #[test]
    fn test_negative_loading_duration() {
        let scroll = ScrollConfig {
            loading_seconds: -1.0,
            ..ScrollConfig::default()
        };
        assert_eq!(scroll.loading_duration(), Duration::ZERO);
    }
}
