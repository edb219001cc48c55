//! Structural parser for MUMPS routine sources.
//!
//! Labels are column-anchored: a line whose first character is neither
//! whitespace nor the `;` comment marker opens a new label. Entry-point and
//! function classification are lexical heuristics; misclassification is an
//! accepted approximation, and the knobs live in [`Heuristics`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use vistagraph_core::error::Result;
use vistagraph_core::model::{LabelEntity, RoutineEntity};

static LABEL_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z][A-Z0-9]*)(?:\(([^)]*)\))?(?:[^;]*)?(?:;(.*))?").unwrap()
});
static HEADER_META: Lazy<Regex> =
    Lazy::new(|| Regex::new(r";;([\d.]+);.*?\*\*([^*]+)\*\*").unwrap());
static ROUTINE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Z]+)").unwrap());
static QUIT_WITH_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\sQ(?:UIT)?\s+\$\$").unwrap());
static QUIT_WITH_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\sQ(?:UIT)?\s+\S").unwrap());
static QUIT_BARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\sQ(?:UIT)?\s*$").unwrap());

/// Tunable heuristics for label classification.
#[derive(Debug, Clone)]
pub struct Heuristics {
    /// Name prefixes that conventionally mark externally callable entries.
    pub entry_point_tokens: Vec<String>,
    /// How many lines past a label to scan for a value-returning exit.
    pub function_lookahead: usize,
    /// Names at most this long count as entry points (coarse, by design).
    pub short_name_max: usize,
    /// How many leading lines to scan for header metadata.
    pub header_lines: usize,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            entry_point_tokens: ["EN", "EP", "START", "INIT", "BEGIN"]
                .into_iter()
                .map(String::from)
                .collect(),
            function_lookahead: 20,
            short_name_max: 2,
            header_lines: 5,
        }
    }
}

#[derive(Debug, Default)]
struct HeaderInfo {
    version: Option<String>,
    patches: Vec<String>,
    description: Option<String>,
}

#[derive(Debug, Default)]
pub struct RoutineParser {
    heuristics: Heuristics,
}

impl RoutineParser {
    pub fn new() -> Self {
        Self {
            heuristics: Heuristics::default(),
        }
    }

    pub fn with_heuristics(heuristics: Heuristics) -> Self {
        Self { heuristics }
    }

    pub fn parse_path(&self, path: &Path) -> Result<(RoutineEntity, Vec<LabelEntity>)> {
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_ascii_uppercase())
            .unwrap_or_default();
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(self.parse_source(&name, &path.to_string_lossy(), &text))
    }

    /// Parse one routine source. Labels come back sorted by line number with
    /// duplicate names dropped after the first occurrence.
    pub fn parse_source(
        &self,
        routine_name: &str,
        path: &str,
        text: &str,
    ) -> (RoutineEntity, Vec<LabelEntity>) {
        let lines: Vec<&str> = text.lines().collect();

        let prefix = ROUTINE_PREFIX
            .captures(routine_name)
            .map(|c| c[1].chars().take(4).collect::<String>());

        let header = self.extract_header(&lines);
        let routine = RoutineEntity {
            name: routine_name.to_string(),
            package_name: None,
            prefix,
            path: path.to_string(),
            line_count: lines.len(),
            version: header.version,
            patches: header.patches,
            description: header.description,
        };

        let mut labels = Vec::new();
        let mut seen = HashSet::new();
        for (idx, line) in lines.iter().enumerate() {
            let Some((name, parameters, comment)) = extract_label(line) else {
                continue;
            };
            if !seen.insert(name.clone()) {
                debug!(routine = routine_name, label = %name, "duplicate label skipped");
                continue;
            }
            labels.push(LabelEntity {
                is_entry_point: self.is_entry_point(&name),
                is_function: self.is_function(&lines, idx),
                name,
                routine_name: routine_name.to_string(),
                line_number: idx + 1,
                parameters,
                comment,
            });
        }

        (routine, labels)
    }

    fn extract_header(&self, lines: &[&str]) -> HeaderInfo {
        let mut info = HeaderInfo::default();
        for line in lines.iter().take(self.heuristics.header_lines) {
            if let Some(caps) = HEADER_META.captures(line) {
                info.version = Some(caps[1].to_string());
                info.patches = caps[2]
                    .split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect();
            }
            if info.description.is_none() && line.starts_with(';') {
                let desc = line[1..].trim();
                if !desc.is_empty() && !desc.starts_with(';') && !desc.starts_with("**") {
                    info.description = Some(desc.to_string());
                }
            }
        }
        info
    }

    /// A label is a likely entry point when its name begins with a known
    /// token or is short enough to be a conventional main entry (`A`, `A1`).
    pub fn is_entry_point(&self, label_name: &str) -> bool {
        self.heuristics
            .entry_point_tokens
            .iter()
            .any(|token| label_name.starts_with(token.as_str()))
            || label_name.len() <= self.heuristics.short_name_max
    }

    /// Bounded lookahead from the label line: a value-returning `QUIT` seen
    /// before a bare `QUIT`, the next label, or the window closing flags the
    /// label as a function.
    pub fn is_function(&self, lines: &[&str], label_idx: usize) -> bool {
        let end = (label_idx + 1 + self.heuristics.function_lookahead).min(lines.len());
        for (idx, line) in lines.iter().enumerate().take(end).skip(label_idx) {
            if idx > label_idx && is_label_line(line) {
                break;
            }
            if QUIT_WITH_FUNCTION.is_match(line) {
                return true;
            }
            if QUIT_BARE.is_match(line) {
                return false;
            }
            if QUIT_WITH_VALUE.is_match(line) {
                return true;
            }
        }
        false
    }
}

fn is_label_line(line: &str) -> bool {
    line.chars()
        .next()
        .is_some_and(|c| c != ' ' && c != '\t' && c != ';')
}

/// Pull `(name, parameters, comment)` out of a label line, or `None` when
/// the line is indented, a comment, or otherwise not a label.
fn extract_label(line: &str) -> Option<(String, Vec<String>, Option<String>)> {
    if !is_label_line(line) {
        return None;
    }
    let caps = LABEL_LINE.captures(line)?;
    let name = caps.get(1)?.as_str().to_string();

    let parameters = caps
        .get(2)
        .map(|params| {
            params
                .as_str()
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let comment = caps
        .get(3)
        .map(|c| c.as_str().trim().to_string())
        .filter(|c| !c.is_empty());

    Some((name, parameters, comment))
}
