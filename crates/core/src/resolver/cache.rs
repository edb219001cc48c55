//! Identity resolution cache.
//!
//! Pre-built O(1) indices from natural keys to store identities, seeded from
//! an [`IdentitySnapshot`]. The cache never talks to the store and never owns
//! entity lifetime; it is rebuilt at the start of each phase and mutated only
//! through [`IdentityCache::reload_globals`].

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::error::{Result, VistagraphError};
use crate::model::snapshot::{GlobalIdentity, IdentitySnapshot};
use crate::model::EntityId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub labels: usize,
    pub labels_by_line: usize,
    pub routines: usize,
    pub globals: usize,
    pub files: usize,
    pub packages: usize,
    pub packages_by_prefix: usize,
}

#[derive(Debug, Default)]
pub struct IdentityCache {
    labels: HashMap<(String, String), EntityId>,
    labels_by_line: HashMap<(String, usize), EntityId>,
    routines: HashMap<String, EntityId>,
    globals: HashMap<String, EntityId>,
    files: HashMap<String, (EntityId, Option<String>)>,
    packages: HashMap<String, EntityId>,
    packages_by_prefix: HashMap<String, EntityId>,
}

impl IdentityCache {
    pub fn from_snapshot(snapshot: &IdentitySnapshot) -> Self {
        let mut cache = Self::default();

        for label in &snapshot.labels {
            cache.labels.insert(
                (label.routine_name.clone(), label.name.clone()),
                label.id.clone(),
            );
            cache.labels_by_line.insert(
                (label.routine_name.clone(), label.line_number),
                label.id.clone(),
            );
        }
        for routine in &snapshot.routines {
            cache.routines.insert(routine.name.clone(), routine.id.clone());
        }
        for file in &snapshot.files {
            cache.files.insert(
                file.number.clone(),
                (file.id.clone(), file.global_root.clone()),
            );
        }
        for package in &snapshot.packages {
            cache.packages.insert(package.name.clone(), package.id.clone());
            for prefix in &package.prefixes {
                cache
                    .packages_by_prefix
                    .insert(prefix.clone(), package.id.clone());
            }
        }
        for global in &snapshot.globals {
            cache.globals.insert(global.name.clone(), global.id.clone());
        }

        let stats = cache.stats();
        info!(
            labels = stats.labels,
            routines = stats.routines,
            files = stats.files,
            packages = stats.packages,
            globals = stats.globals,
            "identity cache loaded"
        );
        cache
    }

    /// Globals materialize after the structural phases; refresh only their
    /// index without rebuilding the rest.
    pub fn reload_globals(&mut self, globals: &[GlobalIdentity]) {
        self.globals.clear();
        for global in globals {
            self.globals.insert(global.name.clone(), global.id.clone());
        }
        debug!(count = self.globals.len(), "global index reloaded");
    }

    pub fn resolve_label(&self, routine_name: &str, label_name: &str) -> Option<&EntityId> {
        self.labels
            .get(&(routine_name.to_string(), label_name.to_string()))
    }

    pub fn resolve_label_by_line(&self, routine_name: &str, line: usize) -> Option<&EntityId> {
        self.labels_by_line.get(&(routine_name.to_string(), line))
    }

    pub fn resolve_routine(&self, routine_name: &str) -> Option<&EntityId> {
        self.routines.get(routine_name)
    }

    /// Global name is looked up without its `^` sigil.
    pub fn resolve_global(&self, global_name: &str) -> Option<&EntityId> {
        self.globals.get(global_name)
    }

    pub fn resolve_file(&self, file_number: &str) -> Option<(&EntityId, Option<&str>)> {
        self.files
            .get(file_number)
            .map(|(id, root)| (id, root.as_deref()))
    }

    pub fn resolve_package(&self, package_name: &str) -> Option<&EntityId> {
        self.packages.get(package_name)
    }

    pub fn resolve_package_by_prefix(&self, prefix: &str) -> Option<&EntityId> {
        self.packages_by_prefix.get(prefix)
    }

    /// Find the file whose storage root starts with `^name`. Linear scan;
    /// only used while seeding global entities.
    pub fn resolve_file_by_global(&self, global_name: &str) -> Option<(&str, &EntityId)> {
        let wanted = format!("^{global_name}");
        self.files.iter().find_map(|(number, (id, root))| {
            root.as_deref()
                .filter(|r| r.starts_with(&wanted))
                .map(|_| (number.as_str(), id))
        })
    }

    pub fn labels_in_routine<'a>(
        &'a self,
        routine_name: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a EntityId)> {
        self.labels
            .iter()
            .filter(move |((routine, _), _)| routine == routine_name)
            .map(|((_, label), id)| (label.as_str(), id))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            labels: self.labels.len(),
            labels_by_line: self.labels_by_line.len(),
            routines: self.routines.len(),
            globals: self.globals.len(),
            files: self.files.len(),
            packages: self.packages.len(),
            packages_by_prefix: self.packages_by_prefix.len(),
        }
    }

    /// The code-graph phase must not run against a half-loaded cache; an
    /// empty primary index after a purported successful load is fatal.
    pub fn validate(&self) -> Result<()> {
        let stats = self.stats();
        let mut missing = Vec::new();
        if stats.labels == 0 {
            missing.push("labels");
        }
        if stats.routines == 0 {
            missing.push("routines");
        }
        if stats.files == 0 {
            missing.push("files");
        }
        if stats.packages == 0 {
            missing.push("packages");
        }
        if !missing.is_empty() {
            warn!(?missing, "identity cache failed validation");
            return Err(VistagraphError::Precondition(format!(
                "identity cache has empty indices: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}
