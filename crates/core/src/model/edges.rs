//! Code relationship records. Each edge carries the textual reference it was
//! extracted from alongside any identities the resolution cache could supply,
//! so the consumer can reconcile unresolved targets in a later pass.

use serde::{Deserialize, Serialize};

use super::EntityId;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallKind {
    Do,
    Goto,
    Job,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessMode {
    Read,
    Write,
    Kill,
    Exists,
}

/// Subroutine invocation or transfer (`DO`, `GOTO`, `JOB`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CallEdge {
    pub source_routine: String,
    pub source_label: String,
    pub source_id: Option<EntityId>,
    pub target_routine: String,
    pub target_label: String,
    pub target_id: Option<EntityId>,
    pub line_number: usize,
    pub kind: CallKind,
}

/// Value-returning call (`$$LABEL^ROUTINE`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InvokeEdge {
    pub source_routine: String,
    pub source_label: String,
    pub source_id: Option<EntityId>,
    pub target_routine: String,
    pub target_label: String,
    pub target_id: Option<EntityId>,
    pub line_number: usize,
    /// Variable assigned from the call when a `SET var=` immediately
    /// precedes the marker.
    pub assigns_to: Option<String>,
}

/// Database (global) reference with inferred access mode.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AccessEdge {
    pub source_routine: String,
    pub source_label: String,
    pub source_id: Option<EntityId>,
    pub global_name: String,
    pub global_id: Option<EntityId>,
    /// The reference as written, e.g. `^DPT(DFN,0)`.
    pub pattern: String,
    pub mode: AccessMode,
    pub line_number: usize,
}

/// Inferred control-flow continuation between lexically adjacent labels.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FallsThroughEdge {
    pub routine_name: String,
    pub from_label: String,
    pub from_id: Option<EntityId>,
    pub to_label: String,
    pub to_id: Option<EntityId>,
    pub confidence: f32,
}

/// Unified edge record for batch emission.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "edge", rename_all = "snake_case")]
pub enum CodeEdge {
    Call(CallEdge),
    Invoke(InvokeEdge),
    Access(AccessEdge),
    FallsThrough(FallsThroughEdge),
}

/// Three-way outcome buckets for one extraction pass.
///
/// `resolved` edges have both endpoints known; `unresolved` edges have a
/// known source but an unknown target (forward reference or out-of-corpus
/// routine); `orphaned` edges could not resolve their own source label,
/// which points at a gap in a prior phase and is never dropped silently.
#[derive(Debug, Clone, PartialEq)]
pub struct Buckets<E> {
    pub resolved: Vec<E>,
    pub unresolved: Vec<E>,
    pub orphaned: Vec<E>,
}

impl<E> Default for Buckets<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Buckets<E> {
    pub fn new() -> Self {
        Self {
            resolved: Vec::new(),
            unresolved: Vec::new(),
            orphaned: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty() && self.unresolved.is_empty() && self.orphaned.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resolved.len() + self.unresolved.len() + self.orphaned.len()
    }

    /// Fold another worker's buckets into this one.
    pub fn merge(&mut self, other: Buckets<E>) {
        self.resolved.extend(other.resolved);
        self.unresolved.extend(other.unresolved);
        self.orphaned.extend(other.orphaned);
    }

    pub fn map<F, T>(self, f: F) -> Buckets<T>
    where
        F: Fn(E) -> T,
    {
        Buckets {
            resolved: self.resolved.into_iter().map(&f).collect(),
            unresolved: self.unresolved.into_iter().map(&f).collect(),
            orphaned: self.orphaned.into_iter().map(&f).collect(),
        }
    }
}
