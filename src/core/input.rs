//! Single-line input buffer
//!
//! Bytes arrive one at a time from the keyboard. The buffer only accepts
//! printable ASCII, honors backspace/delete, and never grows past its
//! maximum length. The on-screen cursor column is always the field's base
//! column plus the buffer length.

/// Backspace
pub const BS: u8 = 0x08;
/// Delete
pub const DEL: u8 = 0x7f;
pub const CR: u8 = b'\r';
pub const LF: u8 = b'\n';

/// Effect of one input byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Line terminator received
    Submit,
    /// Character stored; echo it at `col`
    Appended { ch: char, col: u16 },
    /// Last character removed; blank out `col`
    Erased { col: u16 },
    /// Byte had no effect
    Ignored,
}

/// Whether `byte` ends a line
pub fn is_terminator(byte: u8) -> bool {
    byte == CR || byte == LF
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBuffer {
    chars: Vec<u8>,
    base_col: u16,
    max_len: usize,
}

impl InputBuffer {
    pub fn new(base_col: u16, max_len: usize) -> Self {
        Self {
            chars: Vec::with_capacity(max_len),
            base_col,
            max_len,
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.chars.len() >= self.max_len
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Column where the next character will be echoed
    pub fn cursor_col(&self) -> u16 {
        self.base_col + self.chars.len() as u16
    }

    /// Current contents
    pub fn text(&self) -> String {
        self.chars.iter().map(|&b| b as char).collect()
    }

    pub fn clear(&mut self) {
        self.chars.clear();
    }

    /// Apply one byte read from the keyboard
    pub fn feed(&mut self, byte: u8) -> KeyOutcome {
        match byte {
            CR | LF => KeyOutcome::Submit,
            BS | DEL => {
                if self.chars.pop().is_some() {
                    KeyOutcome::Erased {
                        col: self.cursor_col(),
                    }
                } else {
                    KeyOutcome::Ignored
                }
            },
            0x20..=0x7e if !self.is_full() => {
                let col = self.cursor_col();
                self.chars.push(byte);
                KeyOutcome::Appended {
                    ch: byte as char,
                    col,
                }
            },
            _ => KeyOutcome::Ignored,
        }
    }
}
