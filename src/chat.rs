//! Chat collaborator
//!
//! The chat engine is an opaque text-in/text-out service. `Conversation`
//! keeps the bounded history and turns engine failures into a displayable
//! line, so the screen flow never sees an error from it.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use serde::{Deserialize, Serialize};

/// Default history bound, system prompt included
pub const DEFAULT_HISTORY_LIMIT: usize = 40;

/// Error type for chat engines
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("empty reply")]
    EmptyReply,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of the conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Produces one reply for the history plus a new utterance
pub trait ChatEngine {
    fn ask(&mut self, history: &[Turn], utterance: &str) -> Result<String, ChatError>;
}

/// Bounded conversation history with an optional system prompt
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<Turn>,
    limit: usize,
}

impl Conversation {
    pub fn new(system_prompt: Option<String>, limit: usize) -> Self {
        let turns = system_prompt
            .filter(|p| !p.trim().is_empty())
            .map(|p| vec![Turn::new(Role::System, p.trim())])
            .unwrap_or_default();
        Self {
            turns,
            limit: limit.max(2),
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn has_system_prompt(&self) -> bool {
        self.turns.first().is_some_and(|t| t.role == Role::System)
    }

    /// Ask `engine` about `utterance` and record both sides
    ///
    /// Engine failures come back as `"API error: <reason>"`; the user turn
    /// stays in the history either way.
    pub fn exchange<E: ChatEngine + ?Sized>(&mut self, engine: &mut E, utterance: &str) -> String {
        let result = engine.ask(&self.turns, utterance);
        self.turns.push(Turn::new(Role::User, utterance));
        let reply = match result {
            Ok(reply) => {
                let reply = reply.trim().to_string();
                self.turns.push(Turn::new(Role::Assistant, reply.clone()));
                reply
            },
            Err(e) => {
                tracing::warn!(error = %e, "Chat engine failed");
                format!("API error: {}", e)
            },
        };
        self.trim();
        reply
    }

    /// Drop the oldest turns, keeping the system prompt
    fn trim(&mut self) {
        if self.turns.len() <= self.limit {
            return;
        }
        let keep_from = usize::from(self.has_system_prompt());
        let excess = self.turns.len() - self.limit;
        self.turns.drain(keep_from..keep_from + excess);
    }
}

/// Read a system prompt file; missing or blank files give `None`
pub fn load_system_prompt(path: &Path) -> Option<String> {
    let text = fs::read_to_string(path).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Request written to the command's stdin
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Turn>,
}

/// Engine that delegates each exchange to an external command
///
/// The command receives `{"messages": [...]}` on stdin, the new utterance
/// last, and prints the reply on stdout.
#[derive(Debug, Clone)]
pub struct CommandChat {
    program: String,
    args: Vec<String>,
}

impl CommandChat {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a configured command line on whitespace
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self::new(program, words.collect()))
    }
}

impl ChatEngine for CommandChat {
    fn ask(&mut self, history: &[Turn], utterance: &str) -> Result<String, ChatError> {
        let mut messages = history.to_vec();
        messages.push(Turn::new(Role::User, utterance));
        let request = serde_json::to_vec(&ChatRequest { messages })?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ChatError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&request)?;
        }
        let output = child.wait_with_output()?;

        if !output.status.success() {
            return Err(ChatError::Exit {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let reply = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if reply.is_empty() {
            return Err(ChatError::EmptyReply);
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    /// Replies with the number of turns it was shown
    struct Counting;

    impl ChatEngine for Counting {
        fn ask(&mut self, history: &[Turn], utterance: &str) -> Result<String, ChatError> {
            Ok(format!("  {} turns before {}  ", history.len(), utterance))
        }
    }

    struct Broken;

    impl ChatEngine for Broken {
        fn ask(&mut self, _history: &[Turn], _utterance: &str) -> Result<String, ChatError> {
            Err(ChatError::EmptyReply)
        }
    }

    fn sh(script: &str) -> CommandChat {
        CommandChat::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[test]
    fn test_exchange_records_turns() {
        let mut conversation = Conversation::new(Some("be brief".to_string()), 40);
        let reply = conversation.exchange(&mut Counting, "hello");
        assert_eq!(reply, "1 turns before hello");
        assert_eq!(
            conversation.turns(),
            &[
                Turn::new(Role::System, "be brief"),
                Turn::new(Role::User, "hello"),
                Turn::new(Role::Assistant, "1 turns before hello"),
            ]
        );
    }

    #[test]
    fn test_exchange_error_becomes_text() {
        let mut conversation = Conversation::new(None, 40);
        let reply = conversation.exchange(&mut Broken, "hello");
        assert_eq!(reply, "API error: empty reply");
        assert_eq!(conversation.turns(), &[Turn::new(Role::User, "hello")]);
    }

    #[test]
    fn test_history_bound_keeps_system_prompt() {
        let mut conversation = Conversation::new(Some("sys".to_string()), 40);
        for i in 0..50 {
            conversation.exchange(&mut Counting, &format!("q{}", i));
            assert!(conversation.turns().len() <= 40);
        }
        let turns = conversation.turns();
        assert_eq!(turns[0], Turn::new(Role::System, "sys"));
        assert_eq!(turns[turns.len() - 2], Turn::new(Role::User, "q49"));
    }

    #[test]
    fn test_history_bound_without_system_prompt() {
        let mut conversation = Conversation::new(Some("   ".to_string()), 4);
        assert!(!conversation.has_system_prompt());
        for i in 0..5 {
            conversation.exchange(&mut Counting, &format!("q{}", i));
        }
        let turns = conversation.turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0], Turn::new(Role::User, "q3"));
    }

    #[test]
    fn test_load_system_prompt() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  You are APOLLO.  ").unwrap();
        assert_eq!(load_system_prompt(file.path()).as_deref(), Some("You are APOLLO."));

        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_system_prompt(&dir.path().join("missing.txt")), None);
    }

    #[test]
    fn test_command_chat_reply() {
        let mut engine = sh("cat >/dev/null; echo '  pong  '");
        assert_eq!(engine.ask(&[], "ping").unwrap(), "pong");
    }

    #[test]
    fn test_command_chat_request_format() {
        let mut engine = sh("cat");
        let history = vec![Turn::new(Role::System, "sys")];
        let echoed = engine.ask(&history, "hi").unwrap();
        let request: ChatRequest = serde_json::from_str(&echoed).unwrap();
        assert_eq!(
            request.messages,
            vec![Turn::new(Role::System, "sys"), Turn::new(Role::User, "hi")]
        );
        assert!(echoed.contains("\"role\":\"system\""));
    }

    #[test]
    fn test_command_chat_failures() {
        let mut failing = sh("cat >/dev/null; echo boom >&2; exit 3");
        match failing.ask(&[], "x") {
            Err(ChatError::Exit { stderr, .. }) => assert_eq!(stderr, "boom"),
            other => panic!("unexpected: {:?}", other),
        }

        let mut silent = sh("cat >/dev/null");
        assert!(matches!(silent.ask(&[], "x"), Err(ChatError::EmptyReply)));

        let mut missing = CommandChat::new("/nonexistent/chat-engine", Vec::new());
        let mut conversation = Conversation::new(None, 40);
        let reply = conversation.exchange(&mut missing, "x");
        assert!(reply.starts_with("API error: failed to start /nonexistent/chat-engine"));
    }

    #[test]
    fn test_from_command_line() {
        assert!(CommandChat::from_command_line("").is_none());
        let engine = CommandChat::from_command_line("python3 chat.py --model mini").unwrap();
        assert_eq!(engine.program, "python3");
        assert_eq!(engine.args, vec!["chat.py", "--model", "mini"]);
    }
}
