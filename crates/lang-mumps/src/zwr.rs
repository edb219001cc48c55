//! Line-oriented parser for ZWR (zoned write) global exports.
//!
//! Each record has the shape `^NAME(sub1,...,subN)="value"`. Export banners,
//! blank lines and anything else that does not match the grammar are routine
//! input and yield `None` rather than an error.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use vistagraph_core::error::Result;

static GLOBAL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\^(\w+)\((.*?)\)="(.*)"$"#).unwrap());

/// One decoded export line. Quoting and escaping are fully resolved; no
/// residual `""` sequences remain in subscripts or value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ParsedGlobal {
    pub global_name: String,
    pub subscripts: Vec<String>,
    pub value: String,
    pub raw_line: String,
}

impl ParsedGlobal {
    /// Data-dictionary entries live under `^DD`.
    pub fn is_dd_entry(&self) -> bool {
        self.global_name == "DD"
    }

    /// `^DD(file,0)` carries the file header.
    pub fn is_file_header(&self) -> bool {
        self.is_dd_entry() && self.subscripts.len() == 2 && self.subscripts[1] == "0"
    }

    /// `^DD(file,field,0)` carries a field definition.
    pub fn is_field_definition(&self) -> bool {
        self.is_dd_entry() && self.subscripts.len() >= 3 && self.subscripts[2] == "0"
    }

    /// `^DD(file,field,1,0)="^.1"` announces that a field carries
    /// cross-references.
    pub fn is_xref_header(&self) -> bool {
        self.is_dd_entry()
            && self.subscripts.len() == 4
            && self.subscripts[2] == "1"
            && self.subscripts[3] == "0"
            && self.value == "^.1"
    }

    /// `^DD(file,field,"V",n,0)` names one variable-pointer target.
    pub fn is_v_pointer_target(&self) -> bool {
        self.is_dd_entry()
            && self.subscripts.len() == 5
            && self.subscripts[2] == "V"
            && self.subscripts[4] == "0"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZwrStats {
    pub lines_seen: usize,
    pub records_parsed: usize,
    pub lines_skipped: usize,
}

/// Deterministic line parser; the only state it keeps is counters.
#[derive(Debug, Default)]
pub struct ZwrParser {
    stats: ZwrStats,
}

impl ZwrParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ZwrStats {
        self.stats
    }

    /// Parse a single export line. Returns `None` for blank lines, the
    /// `GT.M`/`ZWR` export banners, and anything outside the grammar.
    pub fn parse_line(&mut self, line: &str) -> Option<ParsedGlobal> {
        self.stats.lines_seen += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with("GT.M") || line.starts_with("ZWR") {
            self.stats.lines_skipped += 1;
            return None;
        }

        let Some(caps) = GLOBAL_LINE.captures(line) else {
            self.stats.lines_skipped += 1;
            return None;
        };

        let record = ParsedGlobal {
            global_name: caps[1].to_string(),
            subscripts: parse_subscripts(&caps[2]),
            value: unescape_value(&caps[3]),
            raw_line: line.to_string(),
        };
        self.stats.records_parsed += 1;
        Some(record)
    }

    /// Parse a whole export buffer, dropping non-record lines.
    pub fn parse_text(&mut self, text: &str) -> Vec<ParsedGlobal> {
        let records: Vec<_> = text.lines().filter_map(|l| self.parse_line(l)).collect();
        debug!(
            parsed = records.len(),
            skipped = self.stats.lines_skipped,
            "parsed zwr buffer"
        );
        records
    }

    pub fn parse_file(&mut self, path: &Path) -> Result<Vec<ParsedGlobal>> {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(self.parse_text(&text))
    }
}

/// Tokenize the comma-separated subscript list, honoring double-quoted
/// subscripts that contain literal commas. A trailing unterminated quoted
/// subscript is flushed as-is rather than rejected.
pub fn parse_subscripts(subscripts_str: &str) -> Vec<String> {
    if subscripts_str.is_empty() {
        return Vec::new();
    }

    let mut subscripts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in subscripts_str.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                subscripts.push(clean_subscript(&current));
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        subscripts.push(clean_subscript(&current));
    }

    subscripts
}

/// Strip surrounding quotes and resolve doubled quotes in one subscript.
fn clean_subscript(subscript: &str) -> String {
    let subscript = subscript.trim();
    let inner = if subscript.len() >= 2 && subscript.starts_with('"') && subscript.ends_with('"') {
        &subscript[1..subscript.len() - 1]
    } else {
        subscript
    };
    unescape_value(inner)
}

/// ZWR escapes a literal quote as `""`.
pub fn unescape_value(value: &str) -> String {
    value.replace("\"\"", "\"")
}

/// Inverse of [`unescape_value`], used when writing fixtures and in the
/// round-trip property tests.
pub fn escape_value(value: &str) -> String {
    value.replace('"', "\"\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_and_blank_lines_are_skipped() {
        let mut parser = ZwrParser::new();
        assert!(parser.parse_line("GT.M 04-FEB-2020 10:20:11 ZWR").is_none());
        assert!(parser.parse_line("ZWR").is_none());
        assert!(parser.parse_line("").is_none());
        assert_eq!(parser.stats().lines_skipped, 3);
    }

    #[test]
    fn quoted_subscript_with_comma_stays_whole() {
        let subs = parse_subscripts(r#"2,"LAST,FIRST",0"#);
        assert_eq!(subs, vec!["2", "LAST,FIRST", "0"]);
    }

    #[test]
    fn trailing_unterminated_quote_is_flushed_as_written() {
        // Quote stripping applies only when both ends are quoted.
        let subs = parse_subscripts(r#"1,"OPEN"#);
        assert_eq!(subs, vec!["1", "\"OPEN"]);
        let closed = parse_subscripts(r#"1,"OPEN""#);
        assert_eq!(closed, vec!["1", "OPEN"]);
    }

    #[test]
    fn escape_round_trip() {
        for value in ["", "plain", "say \"hi\"", "\"\"", "a\"b\"c"] {
            assert_eq!(unescape_value(&escape_value(value)), value);
        }
    }
}
