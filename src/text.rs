//! Text bodies for the pager and the scroller
//!
//! Files are read as Latin-1 (the Minitel's own byte set), so any file can
//! be shown; a missing or unreadable file becomes a single placeholder line.

use std::fs;
use std::path::Path;

use crate::charset;

/// Default tab width for `expand_tabs`
pub const TAB_WIDTH: usize = 8;

/// Read `path` as Latin-1 lines, or `[placeholder]` if it cannot be read
pub fn load_lines(path: &Path, placeholder: &str) -> Vec<String> {
    match fs::read(path) {
        Ok(bytes) => split_lines(&charset::decode(&bytes)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Text source unavailable");
            vec![placeholder.to_string()]
        },
    }
}

/// Split on CR, LF or CRLF; a trailing terminator does not add a line
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                lines.push(std::mem::take(&mut current));
            },
            '\n' => lines.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Replace tabs with spaces up to the next multiple of `width`
pub fn expand_tabs(line: &str, width: usize) -> String {
    if width == 0 {
        return line.replace('\t', "");
    }
    let mut out = String::with_capacity(line.len());
    let mut col = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = width - col % width;
            out.extend(std::iter::repeat(' ').take(pad));
            col += pad;
        } else {
            out.push(c);
            col += 1;
        }
    }
    out
}

/// Word-wrap every paragraph of `text` to `width` columns
///
/// An empty paragraph yields one empty line. Words longer than the width
/// are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let mut line = String::new();
        let mut line_len = 0;
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if line_len > 0 {
                    out.push(std::mem::take(&mut line));
                    line_len = 0;
                }
                out.push(word.drain(..width).collect());
            }
            if word.is_empty() {
                continue;
            }
            let needed = if line_len == 0 { word.len() } else { line_len + 1 + word.len() };
            if needed > width {
                out.push(std::mem::take(&mut line));
                line_len = 0;
            }
            if line_len > 0 {
                line.push(' ');
                line_len += 1;
            }
            line.extend(word.iter());
            line_len += word.len();
        }
        if line_len > 0 || out.is_empty() || paragraph.trim().is_empty() {
            out.push(line);
        }
    }
    out
}

/// Prepare file lines for display: typographic folding, then tab expansion
pub fn prepare(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|line| expand_tabs(&charset::sanitize(line), TAB_WIDTH))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use proptest::prelude::*;
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_load_latin1_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"caf\xe9\r\nline two\rthree\n").unwrap();
        let lines = load_lines(file.path(), "[missing]");
        assert_eq!(lines, vec!["café", "line two", "three"]);
    }

    #[test]
    fn test_load_missing_file_gives_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let lines = load_lines(&dir.path().join("nope.txt"), "[logo.txt not found]");
        assert_eq!(lines, vec!["[logo.txt not found]"]);
    }

    #[test]
    fn test_split_keeps_blank_lines() {
        assert_eq!(split_lines("a\n\nb"), vec!["a", "", "b"]);
        assert_eq!(split_lines(""), Vec::<String>::new());
        assert_eq!(split_lines("\r\n"), vec![""]);
    }

    #[test]
    fn test_expand_tabs() {
        assert_eq!(expand_tabs("a\tb", 8), "a       b");
        assert_eq!(expand_tabs("\tx", 4), "    x");
        assert_eq!(expand_tabs("12345678\tx", 8), "12345678        x");
        assert_eq!(expand_tabs("no tabs", 8), "no tabs");
    }

    #[test]
    fn test_wrap_words() {
        assert_eq!(
            wrap("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
    }

    #[test]
    fn test_wrap_paragraphs_and_long_words() {
        assert_eq!(wrap("ab\n\ncd", 5), vec!["ab", "", "cd"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("", 10), vec![""]);
    }

    #[test]
    fn test_prepare() {
        let lines = vec!["\u{2018}a\u{2019}\tb".to_string()];
        assert_eq!(prepare(&lines), vec!["'a'     b"]);
    }

    proptest! {
        #[test]
        fn prop_wrap_respects_width(text in "[a-z \n]{0,200}", width in 1usize..40) {
            for line in wrap(&text, width) {
                prop_assert!(line.chars().count() <= width);
            }
        }

        #[test]
        fn prop_wrap_keeps_words(text in "[a-z]{1,8}( [a-z]{1,8}){0,20}", width in 8usize..40) {
            let wrapped = wrap(&text, width).join(" ");
            let words: Vec<&str> = text.split_whitespace().collect();
            prop_assert_eq!(wrapped.split_whitespace().collect::<Vec<_>>(), words);
        }
    }
}
