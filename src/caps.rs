//! Terminal capability resolution
//!
//! Logical screen operations are looked up in the terminal database for the
//! configured terminal type (`tput -T <term> <cap> [args]`). When the
//! lookup fails or comes back empty a built-in ANSI sequence is used
//! instead, so every capability is always satisfiable.

use std::collections::HashMap;
use std::fmt;
use std::process::{Command, Stdio};

/// A logical screen operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Clear the screen and home the cursor
    Clear,
    /// Move the cursor to a 1-based (row, col)
    CursorPosition,
    /// Erase from the cursor to the end of the line
    EraseLine,
    /// Delete the cursor's line, shifting lines below it up
    DeleteLine,
    /// Insert a blank line at the cursor, shifting lines below it down
    InsertLine,
    /// Enter standout (reverse video)
    StandoutBegin,
    /// Leave standout
    StandoutEnd,
    CursorHide,
    CursorShow,
    /// Carriage return plus line feed as one operation
    NewLine,
}

impl Capability {
    pub const ALL: [Capability; 10] = [
        Capability::Clear,
        Capability::CursorPosition,
        Capability::EraseLine,
        Capability::DeleteLine,
        Capability::InsertLine,
        Capability::StandoutBegin,
        Capability::StandoutEnd,
        Capability::CursorHide,
        Capability::CursorShow,
        Capability::NewLine,
    ];

    /// terminfo capability name
    pub fn terminfo_name(self) -> &'static str {
        match self {
            Capability::Clear => "clear",
            Capability::CursorPosition => "cup",
            Capability::EraseLine => "el",
            Capability::DeleteLine => "dl1",
            Capability::InsertLine => "il1",
            Capability::StandoutBegin => "smso",
            Capability::StandoutEnd => "rmso",
            Capability::CursorHide => "civis",
            Capability::CursorShow => "cnorm",
            Capability::NewLine => "nel",
        }
    }

    /// Whether the capability takes numeric parameters
    pub fn is_parameterized(self) -> bool {
        matches!(self, Capability::CursorPosition)
    }

    /// Built-in ANSI sequence used when the database has no answer
    ///
    /// `args` are the 1-based (row, col) for `CursorPosition` and are
    /// ignored by every other capability.
    pub fn fallback(self, args: &[u16]) -> Vec<u8> {
        match self {
            Capability::Clear => b"\x1b[2J\x1b[H".to_vec(),
            Capability::CursorPosition => {
                let row = args.first().copied().unwrap_or(1);
                let col = args.get(1).copied().unwrap_or(1);
                format!("\x1b[{};{}H", row, col).into_bytes()
            },
            Capability::EraseLine => b"\x1b[K".to_vec(),
            Capability::DeleteLine => b"\x1b[M".to_vec(),
            Capability::InsertLine => b"\x1b[L".to_vec(),
            Capability::StandoutBegin => b"\x1b[7m".to_vec(),
            Capability::StandoutEnd => b"\x1b[27m".to_vec(),
            Capability::CursorHide => b"\x1b[?25l".to_vec(),
            Capability::CursorShow => b"\x1b[?25h".to_vec(),
            Capability::NewLine => b"\x1bE".to_vec(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.terminfo_name())
    }
}

/// Source of control strings for a terminal type
///
/// Returning `None` (or an empty sequence) means "unresolvable" and makes
/// the resolver use the fallback.
pub trait CapabilitySource {
    fn query(&self, term: &str, name: &str, args: &[u16]) -> Option<Vec<u8>>;
}

/// Queries the system terminal database through `tput`
#[derive(Debug, Clone, Copy, Default)]
pub struct Tput;

impl CapabilitySource for Tput {
    fn query(&self, term: &str, name: &str, args: &[u16]) -> Option<Vec<u8>> {
        let output = Command::new("tput")
            .arg("-T")
            .arg(term)
            .arg(name)
            .args(args.iter().map(|a| a.to_string()))
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();

        match output {
            Ok(out) if out.status.success() => Some(out.stdout),
            Ok(out) => {
                tracing::debug!(term, name, status = %out.status, "tput lookup failed");
                None
            },
            Err(e) => {
                tracing::debug!(term, name, error = %e, "tput unavailable");
                None
            },
        }
    }
}

/// A source that knows no terminal; every capability uses its fallback
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDatabase;

impl CapabilitySource for NoDatabase {
    fn query(&self, _term: &str, _name: &str, _args: &[u16]) -> Option<Vec<u8>> {
        None
    }
}

/// Resolved capability table for one terminal type
///
/// Non-parameterized capabilities are resolved once at construction and
/// never change afterwards. Cursor-position sequences are resolved on first
/// use of each coordinate and memoized.
pub struct Capabilities {
    term: String,
    source: Box<dyn CapabilitySource + Send>,
    table: HashMap<Capability, Vec<u8>>,
    cursor_cache: HashMap<(u16, u16), Vec<u8>>,
    init: Option<Vec<u8>>,
}

impl Capabilities {
    /// Resolve every capability for `term` using the system database
    pub fn load(term: &str) -> Self {
        Self::with_source(term, Tput)
    }

    /// ANSI fallbacks only, without consulting any database
    pub fn ansi() -> Self {
        Self::with_source("ansi", NoDatabase)
    }

    /// Resolve every capability for `term` using a custom source
    pub fn with_source<S>(term: &str, source: S) -> Self
    where
        S: CapabilitySource + Send + 'static,
    {
        let mut table = HashMap::with_capacity(Capability::ALL.len());
        for cap in Capability::ALL {
            if cap.is_parameterized() {
                continue;
            }
            let bytes = lookup(&source, term, cap, &[]);
            table.insert(cap, bytes);
        }
        let init = source
            .query(term, "is2", &[])
            .filter(|seq| !seq.is_empty());

        Self {
            term: term.to_string(),
            source: Box::new(source),
            table,
            cursor_cache: HashMap::new(),
            init,
        }
    }

    /// The terminal type this table was resolved for
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Resolve `cap` with its arguments; never empty for the listed capabilities
    pub fn resolve(&mut self, cap: Capability, args: &[u16]) -> Vec<u8> {
        if cap == Capability::CursorPosition {
            let row = args.first().copied().unwrap_or(1);
            let col = args.get(1).copied().unwrap_or(1);
            return self.cursor_position(row, col).to_vec();
        }
        self.sequence(cap).to_vec()
    }

    /// Sequence for a non-parameterized capability
    ///
    /// `CursorPosition` answers with the sequence for (1, 1).
    pub fn sequence(&self, cap: Capability) -> &[u8] {
        match self.table.get(&cap) {
            Some(bytes) => bytes,
            None => {
                // Only the parameterized capability is absent from the table
                const HOME: &[u8] = b"\x1b[1;1H";
                HOME
            },
        }
    }

    /// Sequence moving the cursor to a 1-based (row, col)
    pub fn cursor_position(&mut self, row: u16, col: u16) -> &[u8] {
        let Self {
            term,
            source,
            cursor_cache,
            ..
        } = self;
        cursor_cache.entry((row, col)).or_insert_with(|| {
            // terminfo coordinates are 0-based
            let args = [row.saturating_sub(1), col.saturating_sub(1)];
            match source.query(term.as_str(), Capability::CursorPosition.terminfo_name(), &args) {
                Some(seq) if !seq.is_empty() => seq,
                _ => Capability::CursorPosition.fallback(&[row, col]),
            }
        })
    }

    /// Terminal initialization string (`is2`), if the database has one
    pub fn init_sequence(&self) -> Option<&[u8]> {
        self.init.as_deref()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("term", &self.term)
            .field("table", &self.table)
            .field("cached_positions", &self.cursor_cache.len())
            .finish()
    }
}

fn lookup(source: &dyn CapabilitySource, term: &str, cap: Capability, args: &[u16]) -> Vec<u8> {
    match source.query(term, cap.terminfo_name(), args) {
        Some(seq) if !seq.is_empty() => seq,
        _ => {
            tracing::debug!(term, capability = %cap, "using fallback sequence");
            cap.fallback(args)
        },
    }
}
