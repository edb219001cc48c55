pub mod edges;
pub mod entities;
pub mod snapshot;

pub use edges::{
    AccessEdge, AccessMode, Buckets, CallEdge, CallKind, CodeEdge, FallsThroughEdge, InvokeEdge,
};
pub use entities::{
    CrossReferenceEntity, DataType, FieldEntity, FileEntity, GlobalEntity, LabelEntity,
    PackageEntity, RoutineEntity, SubfileEntity, VariablePointerTarget, XrefKind,
};
pub use snapshot::{
    FileIdentity, GlobalIdentity, IdentitySnapshot, LabelIdentity, PackageIdentity,
    RoutineIdentity,
};

/// Opaque identifier assigned by the external store; natural keys are carried
/// on the entities themselves.
pub type EntityId = String;
