//! Best-effort static analysis over routine source: call edges, function
//! invocations, global accesses and fall-through edges.
//!
//! Every scan is a left-to-right fold over the lines carrying the current
//! label context; lines before the first label have no context and are
//! skipped. Each candidate edge lands in one of three buckets: resolved,
//! unresolved (unknown target, likely a forward reference), or orphaned
//! (unknown source label, which indicates a gap in a prior phase).

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use vistagraph_core::model::{
    AccessEdge, AccessMode, Buckets, CallEdge, CallKind, EntityId, FallsThroughEdge, InvokeEdge,
};
use vistagraph_core::resolver::IdentityCache;

static LABEL_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^([A-Z][A-Z0-9]*)").unwrap());
static DO_CMD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s+D(?:O)?\s+([A-Z][A-Z0-9]*)(?:\^([A-Z][A-Z0-9]*))?").unwrap()
});
static GOTO_CMD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s+G(?:OTO)?\s+([A-Z][A-Z0-9]*)(?:\^([A-Z][A-Z0-9]*))?").unwrap()
});
static JOB_CMD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s+J(?:OB)?\s+([A-Z][A-Z0-9]*)(?:\^([A-Z][A-Z0-9]*))?").unwrap()
});
static FUNCTION_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\$\$([A-Z][A-Z0-9]*)(?:\^([A-Z][A-Z0-9]*))?").unwrap()
});
static GLOBAL_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\^([A-Z][A-Z0-9]*)(?:\(([^)]*)\))?").unwrap());
static SET_CMD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s+S(?:ET)?\s+").unwrap());
static KILL_CMD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s+K(?:ILL)?\s+").unwrap());
static QUIT_EXIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s+Q(?:UIT)?(?:\s|$)").unwrap());
static ASSIGN_BEFORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)S(?:ET)?\s+([A-Z][A-Z0-9]*)\s*=\s*$").unwrap());
static DOLLAR_DATA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\$D(?:ATA)?\s*\(").unwrap());
static DOLLAR_ORDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\$O(?:RDER)?\s*\(").unwrap());
static DOLLAR_NEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\$N(?:EXT)?\s*\(").unwrap());
static GLOBAL_BEFORE_EQ: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,\s]\s*\^").unwrap());

const FALL_THROUGH_CONFIDENCE: f32 = 0.9;

/// Fold state threaded through a routine scan.
#[derive(Debug, Clone, Default)]
struct LabelContext {
    label: Option<String>,
    label_id: Option<EntityId>,
}

impl LabelContext {
    /// Advance the context when `line` opens a new label.
    fn advance(&mut self, cache: &IdentityCache, routine_name: &str, line: &str) {
        if !is_label_line(line) {
            return;
        }
        if let Some(caps) = LABEL_START.captures(line) {
            let label = caps[1].to_ascii_uppercase();
            self.label_id = cache.resolve_label(routine_name, &label).cloned();
            self.label = Some(label);
        }
    }
}

fn is_label_line(line: &str) -> bool {
    line.chars()
        .next()
        .is_some_and(|c| c != ' ' && c != '\t' && c != ';')
}

pub struct CodeExtractor<'a> {
    cache: &'a IdentityCache,
}

impl<'a> CodeExtractor<'a> {
    pub fn new(cache: &'a IdentityCache) -> Self {
        Self { cache }
    }

    /// Extract `DO`/`GOTO`/`JOB` edges. An omitted `^ROUTINE` qualifier
    /// targets the current routine.
    pub fn extract_calls(&self, routine_name: &str, text: &str) -> Buckets<CallEdge> {
        let routine_name = routine_name.to_ascii_uppercase();
        let mut buckets = Buckets::new();
        let mut context = LabelContext::default();

        for (idx, line) in text.lines().enumerate() {
            context.advance(self.cache, &routine_name, line);
            let Some(source_label) = context.label.clone() else {
                continue;
            };

            for (pattern, kind) in [
                (&DO_CMD, CallKind::Do),
                (&GOTO_CMD, CallKind::Goto),
                (&JOB_CMD, CallKind::Job),
            ] {
                let Some(caps) = pattern.captures(line) else {
                    continue;
                };
                let target_label = caps[1].to_ascii_uppercase();
                let target_routine = caps
                    .get(2)
                    .map(|m| m.as_str().to_ascii_uppercase())
                    .unwrap_or_else(|| routine_name.clone());
                let target_id = self
                    .cache
                    .resolve_label(&target_routine, &target_label)
                    .cloned();

                let edge = CallEdge {
                    source_routine: routine_name.clone(),
                    source_label: source_label.clone(),
                    source_id: context.label_id.clone(),
                    target_routine,
                    target_label,
                    target_id,
                    line_number: idx + 1,
                    kind,
                };
                push_edge(&mut buckets, edge.source_id.is_some(), edge.target_id.is_some(), edge);
            }
        }

        debug!(routine = %routine_name, resolved = buckets.resolved.len(),
               unresolved = buckets.unresolved.len(), orphaned = buckets.orphaned.len(),
               "extracted calls");
        buckets
    }

    /// Extract `$$LABEL^ROUTINE` invocation edges, recovering the assignment
    /// target when a `SET var=` immediately precedes the marker.
    pub fn extract_invocations(&self, routine_name: &str, text: &str) -> Buckets<InvokeEdge> {
        let routine_name = routine_name.to_ascii_uppercase();
        let mut buckets = Buckets::new();
        let mut context = LabelContext::default();

        for (idx, line) in text.lines().enumerate() {
            context.advance(self.cache, &routine_name, line);
            let Some(source_label) = context.label.clone() else {
                continue;
            };

            for caps in FUNCTION_REF.captures_iter(line) {
                let whole = caps.get(0).unwrap();
                let target_label = caps[1].to_ascii_uppercase();
                let target_routine = caps
                    .get(2)
                    .map(|m| m.as_str().to_ascii_uppercase())
                    .unwrap_or_else(|| routine_name.clone());
                let assigns_to = ASSIGN_BEFORE
                    .captures(&line[..whole.start()])
                    .map(|a| a[1].to_ascii_uppercase());
                let target_id = self
                    .cache
                    .resolve_label(&target_routine, &target_label)
                    .cloned();

                let edge = InvokeEdge {
                    source_routine: routine_name.clone(),
                    source_label: source_label.clone(),
                    source_id: context.label_id.clone(),
                    target_routine,
                    target_label,
                    target_id,
                    line_number: idx + 1,
                    assigns_to,
                };
                push_edge(&mut buckets, edge.source_id.is_some(), edge.target_id.is_some(), edge);
            }
        }
        buckets
    }

    /// Extract `^GLOBAL(...)` access edges with an inferred access mode.
    pub fn extract_accesses(&self, routine_name: &str, text: &str) -> Buckets<AccessEdge> {
        let routine_name = routine_name.to_ascii_uppercase();
        let mut buckets = Buckets::new();
        let mut context = LabelContext::default();

        for (idx, line) in text.lines().enumerate() {
            context.advance(self.cache, &routine_name, line);
            let Some(source_label) = context.label.clone() else {
                continue;
            };

            for caps in GLOBAL_REF.captures_iter(line) {
                let whole = caps.get(0).unwrap();
                let global_name = caps[1].to_ascii_uppercase();
                let pattern = match caps.get(2) {
                    Some(subs) => format!("^{}({})", global_name, subs.as_str()),
                    None => format!("^{global_name}"),
                };
                let global_id = self.cache.resolve_global(&global_name).cloned();

                let edge = AccessEdge {
                    source_routine: routine_name.clone(),
                    source_label: source_label.clone(),
                    source_id: context.label_id.clone(),
                    global_name,
                    global_id,
                    pattern,
                    mode: classify_access(line, whole.start()),
                    line_number: idx + 1,
                };
                push_edge(&mut buckets, edge.source_id.is_some(), edge.global_id.is_some(), edge);
            }
        }
        buckets
    }

    /// Infer fall-through edges between lexically adjacent labels that lack
    /// an explicit exit in between.
    pub fn extract_fall_through(&self, routine_name: &str, text: &str) -> Buckets<FallsThroughEdge> {
        let routine_name = routine_name.to_ascii_uppercase();
        let lines: Vec<&str> = text.lines().collect();

        // Labels ordered by line number, resolved where possible.
        let mut labels: Vec<(String, usize, Option<EntityId>)> = Vec::new();
        for (idx, line) in lines.iter().enumerate() {
            if !is_label_line(line) {
                continue;
            }
            if let Some(caps) = LABEL_START.captures(line) {
                let name = caps[1].to_ascii_uppercase();
                let id = self.cache.resolve_label(&routine_name, &name).cloned();
                labels.push((name, idx + 1, id));
            }
        }

        let mut buckets = Buckets::new();
        for pair in labels.windows(2) {
            let (from_label, from_line, from_id) = &pair[0];
            let (to_label, to_line, to_id) = &pair[1];

            let has_exit = lines[*from_line - 1..*to_line - 1]
                .iter()
                .any(|line| QUIT_EXIT.is_match(line) || GOTO_CMD.is_match(line));
            if has_exit {
                continue;
            }

            let edge = FallsThroughEdge {
                routine_name: routine_name.clone(),
                from_label: from_label.clone(),
                from_id: from_id.clone(),
                to_label: to_label.clone(),
                to_id: to_id.clone(),
                confidence: FALL_THROUGH_CONFIDENCE,
            };
            push_edge(&mut buckets, edge.from_id.is_some(), edge.to_id.is_some(), edge);
        }
        buckets
    }

    /// Distinct global names referenced anywhere in the buffer, for seeding
    /// global entities ahead of access extraction.
    pub fn global_names(text: &str) -> BTreeSet<String> {
        GLOBAL_REF
            .captures_iter(text)
            .map(|caps| caps[1].to_ascii_uppercase())
            .collect()
    }
}

fn push_edge<E>(buckets: &mut Buckets<E>, source_known: bool, target_known: bool, edge: E) {
    if !source_known {
        buckets.orphaned.push(edge);
    } else if target_known {
        buckets.resolved.push(edge);
    } else {
        buckets.unresolved.push(edge);
    }
}

/// Classify a global reference by its local lexical context.
fn classify_access(line: &str, global_pos: usize) -> AccessMode {
    if KILL_CMD.is_match(line) {
        return AccessMode::Kill;
    }
    if SET_CMD.is_match(line) {
        let after = &line[global_pos..];
        if let Some(eq) = after.find('=') {
            // The `=` must belong to this reference, not a later one.
            if !GLOBAL_BEFORE_EQ.is_match(&after[..eq]) {
                return AccessMode::Write;
            }
        }
    }
    let before = &line[..global_pos];
    if DOLLAR_DATA.is_match(before) {
        return AccessMode::Exists;
    }
    if DOLLAR_ORDER.is_match(before) || DOLLAR_NEXT.is_match(before) {
        return AccessMode::Read;
    }
    AccessMode::Read
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_classification_by_context() {
        assert_eq!(classify_access(" K ^TMP(1)", 3), AccessMode::Kill);
        assert_eq!(classify_access(" S ^DPT(DFN,0)=X", 3), AccessMode::Write);
        let line = " I $D(^DPT(DFN)) D";
        let pos = line.find('^').unwrap();
        assert_eq!(classify_access(line, pos), AccessMode::Exists);
        let line = " S X=$O(^DPT(0))";
        let pos = line.find('^').unwrap();
        assert_eq!(classify_access(line, pos), AccessMode::Read);
        let line = " W ^DPT(DFN,0)";
        let pos = line.find('^').unwrap();
        assert_eq!(classify_access(line, pos), AccessMode::Read);
    }

    #[test]
    fn global_name_discovery_is_distinct_and_sorted() {
        let text = " S ^DPT(1)=X\n S Y=^VA(200)\n K ^DPT(2)\n";
        let names: Vec<String> = CodeExtractor::global_names(text).into_iter().collect();
        assert_eq!(names, vec!["DPT", "VA"]);
    }
}
