//! Cold-start snapshot handed over by the external persistence collaborator.
//! Enumerates already-materialized identities with their natural keys so the
//! resolution cache can be rebuilt without touching the store itself.

use serde::{Deserialize, Serialize};

use super::EntityId;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RoutineIdentity {
    pub name: String,
    pub id: EntityId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LabelIdentity {
    pub routine_name: String,
    pub name: String,
    pub line_number: usize,
    pub id: EntityId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileIdentity {
    pub number: String,
    pub global_root: Option<String>,
    pub id: EntityId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PackageIdentity {
    pub name: String,
    pub prefixes: Vec<String>,
    pub id: EntityId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GlobalIdentity {
    pub name: String,
    pub id: EntityId,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct IdentitySnapshot {
    #[serde(default)]
    pub routines: Vec<RoutineIdentity>,
    #[serde(default)]
    pub labels: Vec<LabelIdentity>,
    #[serde(default)]
    pub files: Vec<FileIdentity>,
    #[serde(default)]
    pub packages: Vec<PackageIdentity>,
    /// Usually empty at cold start; globals are created in a later phase and
    /// loaded through `IdentityCache::reload_globals`.
    #[serde(default)]
    pub globals: Vec<GlobalIdentity>,
}
