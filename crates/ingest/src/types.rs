use serde::{Deserialize, Serialize};

use vistagraph_core::model::{
    CodeEdge, CrossReferenceEntity, FieldEntity, FileEntity, GlobalEntity, LabelEntity,
    PackageEntity, RoutineEntity, SubfileEntity, VariablePointerTarget,
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Foundation,
    SchemaLinks,
    CodeStructure,
    CodeGraph,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Foundation => "foundation",
            Self::SchemaLinks => "schema-links",
            Self::CodeStructure => "code-structure",
            Self::CodeGraph => "code-graph",
        }
    }
}

/// Typed entity record; every variant carries its natural key so the
/// consumer can upsert idempotently.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityRecord {
    Package(PackageEntity),
    File(FileEntity),
    Subfile(SubfileEntity),
    Field(FieldEntity),
    CrossReference(CrossReferenceEntity),
    VariablePointer(VariablePointerTarget),
    Routine(RoutineEntity),
    Label(LabelEntity),
    Global(GlobalEntity),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Resolved,
    Unresolved,
    Orphaned,
}

/// An edge record tagged with its resolution outcome; the three outcomes
/// are never collapsed into one stream.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub resolution: Resolution,
    #[serde(flatten)]
    pub edge: CodeEdge,
}

/// One ordered unit of work handed to the sink.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecordBatch {
    pub batch_id: String,
    pub phase: Phase,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

impl RecordBatch {
    pub fn len(&self) -> usize {
        self.entities.len() + self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.edges.is_empty()
    }
}

/// Split a vector into size-bounded chunks, preserving order.
pub fn chunks<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let size = size.max(1);
    let mut out = Vec::new();
    let mut current = Vec::with_capacity(size.min(items.len()));
    for item in items {
        current.push(item);
        if current.len() == size {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
