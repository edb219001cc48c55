//! Phase-ordered pipeline driver.
//!
//! The only ordering guarantee the extractors need is phase ordering, so the
//! driver runs four explicit phases mirroring the lifecycle of the corpus:
//! foundation (packages, files, fields), schema links (cross-references,
//! subfiles, variable pointers), code structure (routines, labels) and code
//! graph (call/invoke/access/fall-through edges). Routine files are
//! independent of each other, so the code phases fan out with rayon and
//! merge per-worker buckets afterwards.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};
use walkdir::WalkDir;

use vistagraph_core::model::{Buckets, CodeEdge, GlobalEntity};
use vistagraph_core::resolver::IdentityCache;
use vistagraph_mumps::code::CodeExtractor;
use vistagraph_mumps::dictionary::DictionaryExtractor;
use vistagraph_mumps::registry::PackageRegistry;
use vistagraph_mumps::routine::RoutineParser;
use vistagraph_mumps::zwr::ZwrParser;

use crate::error::IngestError;
use crate::traits::{GraphSink, SnapshotSource};
use crate::types::{chunks, EdgeRecord, EntityRecord, Phase, RecordBatch, Resolution};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Data-dictionary export (`DD.zwr`).
    pub dd_path: PathBuf,
    /// File registry export (`FILE.zwr` / DIC entries) for global roots.
    pub dic_path: Option<PathBuf>,
    /// Package registry (`Packages.csv`).
    pub packages_path: PathBuf,
    /// Root directory scanned recursively for `*.m` routine sources.
    pub routines_dir: PathBuf,
    pub batch_size: usize,
}

impl PipelineConfig {
    pub fn new(
        dd_path: impl Into<PathBuf>,
        packages_path: impl Into<PathBuf>,
        routines_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dd_path: dd_path.into(),
            dic_path: None,
            packages_path: packages_path.into(),
            routines_dir: routines_dir.into(),
            batch_size: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseSummary {
    pub batches: usize,
    pub entities: usize,
    pub edges: usize,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Phase 1: packages, files and fields.
    pub fn run_foundation(&self, sink: &mut dyn GraphSink) -> Result<PhaseSummary, IngestError> {
        require_file(&self.config.dd_path)?;
        require_file(&self.config.packages_path)?;

        let registry = PackageRegistry::parse_file(&self.config.packages_path)?;
        let mut parser = ZwrParser::new();
        let records = parser.parse_file(&self.config.dd_path)?;

        let mut extractor = DictionaryExtractor::new();
        let (mut files, fields) = extractor.extract(&records);

        if let Some(dic_path) = &self.config.dic_path {
            require_file(dic_path)?;
            let dic_records = parser.parse_file(dic_path)?;
            extractor.backfill_global_roots(&dic_records, &mut files);
        }

        let mut emitter = BatchEmitter::new(sink, Phase::Foundation, self.config.batch_size);
        emitter.entities(registry.packages().iter().cloned().map(EntityRecord::Package))?;
        emitter.entities(files.into_values().map(EntityRecord::File))?;
        emitter.entities(fields.into_iter().map(EntityRecord::Field))?;

        let summary = emitter.finish();
        info!(?summary, stats = ?extractor.stats(), "foundation phase complete");
        Ok(summary)
    }

    /// Phase 2: cross-references, subfiles and variable-pointer targets.
    pub fn run_schema_links(&self, sink: &mut dyn GraphSink) -> Result<PhaseSummary, IngestError> {
        require_file(&self.config.dd_path)?;

        let mut parser = ZwrParser::new();
        let records = parser.parse_file(&self.config.dd_path)?;

        let mut extractor = DictionaryExtractor::new();
        let (files, fields) = extractor.extract(&records);
        let xrefs = extractor.extract_cross_references(&records);
        let subfiles = extractor.extract_subfiles(&files, &fields);
        let v_pointers = extractor.extract_variable_pointers(&records);

        let mut emitter = BatchEmitter::new(sink, Phase::SchemaLinks, self.config.batch_size);
        emitter.entities(xrefs.into_iter().map(EntityRecord::CrossReference))?;
        emitter.entities(subfiles.into_iter().map(EntityRecord::Subfile))?;
        emitter.entities(v_pointers.into_iter().map(EntityRecord::VariablePointer))?;

        let summary = emitter.finish();
        info!(?summary, incomplete_xrefs = extractor.stats().incomplete_xrefs,
              "schema-links phase complete");
        Ok(summary)
    }

    /// Phase 3: routines and labels, with package attribution by prefix.
    pub fn run_code_structure(&self, sink: &mut dyn GraphSink) -> Result<PhaseSummary, IngestError> {
        require_dir(&self.config.routines_dir)?;
        require_file(&self.config.packages_path)?;

        let registry = PackageRegistry::parse_file(&self.config.packages_path)?;
        let parser = RoutineParser::new();
        let paths = self.routine_paths();

        let mut parsed: Vec<_> = paths
            .par_iter()
            .filter_map(|path| match parser.parse_path(path) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    warn!(path = %path.display(), %err, "failed to parse routine");
                    None
                }
            })
            .collect();

        for (routine, _) in &mut parsed {
            routine.package_name = attribute_package(&registry, routine.prefix.as_deref());
        }

        let mut emitter = BatchEmitter::new(sink, Phase::CodeStructure, self.config.batch_size);
        let mut all_labels = Vec::new();
        let mut routines = Vec::new();
        for (routine, labels) in parsed {
            routines.push(routine);
            all_labels.extend(labels);
        }
        emitter.entities(routines.into_iter().map(EntityRecord::Routine))?;
        emitter.entities(all_labels.into_iter().map(EntityRecord::Label))?;

        let summary = emitter.finish();
        info!(?summary, "code-structure phase complete");
        Ok(summary)
    }

    /// Phase 4: seed the cache, discover globals, then extract code edges.
    pub fn run_code_graph(
        &self,
        snapshots: &dyn SnapshotSource,
        sink: &mut dyn GraphSink,
    ) -> Result<PhaseSummary, IngestError> {
        require_dir(&self.config.routines_dir)?;

        let snapshot = snapshots.load_identities()?;
        let mut cache = IdentityCache::from_snapshot(&snapshot);
        cache.validate()?;

        let sources = self.read_routine_sources();
        let mut emitter = BatchEmitter::new(sink, Phase::CodeGraph, self.config.batch_size);

        // Globals first: accesses can only resolve against globals that
        // exist, and globals are born here, not in the dictionary phases.
        let mut global_names = std::collections::BTreeSet::new();
        for (_, text) in &sources {
            global_names.extend(CodeExtractor::global_names(text));
        }
        let globals: Vec<GlobalEntity> = global_names
            .into_iter()
            .map(|name| {
                let file_number = cache
                    .resolve_file_by_global(&name)
                    .map(|(number, _)| number.to_string());
                GlobalEntity { name, file_number }
            })
            .collect();
        emitter.entities(globals.into_iter().map(EntityRecord::Global))?;

        // The sink has now seen the globals; re-seed their index from the
        // snapshot source before resolving accesses against them.
        cache.reload_globals(&snapshots.load_globals()?);

        let extractor = CodeExtractor::new(&cache);
        let merged = sources
            .par_iter()
            .map(|(name, text)| RoutineBuckets {
                calls: extractor.extract_calls(name, text).map(CodeEdge::Call),
                invokes: extractor.extract_invocations(name, text).map(CodeEdge::Invoke),
                accesses: extractor.extract_accesses(name, text).map(CodeEdge::Access),
                falls: extractor
                    .extract_fall_through(name, text)
                    .map(CodeEdge::FallsThrough),
            })
            .reduce(RoutineBuckets::default, RoutineBuckets::merged);

        let mut combined = Buckets::new();
        combined.merge(merged.calls);
        combined.merge(merged.invokes);
        combined.merge(merged.accesses);
        combined.merge(merged.falls);

        if !combined.orphaned.is_empty() {
            warn!(
                count = combined.orphaned.len(),
                "orphaned edges: source labels missing from the cache"
            );
        }

        emitter.edges(combined)?;

        let summary = emitter.finish();
        info!(?summary, "code-graph phase complete");
        Ok(summary)
    }

    fn routine_paths(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.config.routines_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("m"))
            })
            .map(|entry| entry.into_path())
            .collect()
    }

    fn read_routine_sources(&self) -> Vec<(String, String)> {
        self.routine_paths()
            .into_iter()
            .filter_map(|path| {
                let name = path.file_stem()?.to_string_lossy().to_ascii_uppercase();
                match std::fs::read(&path) {
                    Ok(bytes) => Some((name, String::from_utf8_lossy(&bytes).into_owned())),
                    Err(err) => {
                        warn!(path = %path.display(), %err, "failed to read routine");
                        None
                    }
                }
            })
            .collect()
    }
}

#[derive(Default)]
struct RoutineBuckets {
    calls: Buckets<CodeEdge>,
    invokes: Buckets<CodeEdge>,
    accesses: Buckets<CodeEdge>,
    falls: Buckets<CodeEdge>,
}

impl RoutineBuckets {
    fn merged(mut self, other: Self) -> Self {
        self.calls.merge(other.calls);
        self.invokes.merge(other.invokes);
        self.accesses.merge(other.accesses);
        self.falls.merge(other.falls);
        self
    }
}

/// Longest matching leading prefix wins; registry prefixes vary in length.
fn attribute_package(registry: &PackageRegistry, prefix: Option<&str>) -> Option<String> {
    let prefix = prefix?;
    (1..=prefix.len())
        .rev()
        .find_map(|len| registry.find_by_prefix(&prefix[..len]))
        .map(String::from)
}

fn require_file(path: &Path) -> Result<(), IngestError> {
    if !path.is_file() {
        return Err(IngestError::Precondition(format!(
            "required input file missing: {}",
            path.display()
        )));
    }
    Ok(())
}

fn require_dir(path: &Path) -> Result<(), IngestError> {
    if !path.is_dir() {
        return Err(IngestError::Precondition(format!(
            "required input directory missing: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Splits entity and edge streams into size-bounded batches and pushes them
/// at the sink, keeping the resolution outcomes distinct.
struct BatchEmitter<'a> {
    sink: &'a mut dyn GraphSink,
    phase: Phase,
    batch_size: usize,
    seq: usize,
    summary: PhaseSummary,
}

impl<'a> BatchEmitter<'a> {
    fn new(sink: &'a mut dyn GraphSink, phase: Phase, batch_size: usize) -> Self {
        Self {
            sink,
            phase,
            batch_size,
            seq: 0,
            summary: PhaseSummary::default(),
        }
    }

    fn entities<I>(&mut self, records: I) -> Result<(), IngestError>
    where
        I: Iterator<Item = EntityRecord>,
    {
        for chunk in chunks(records.collect(), self.batch_size) {
            self.summary.entities += chunk.len();
            self.push(chunk, Vec::new())?;
        }
        Ok(())
    }

    fn edges(&mut self, buckets: Buckets<CodeEdge>) -> Result<(), IngestError> {
        let mut records = Vec::with_capacity(buckets.len());
        for (resolution, edges) in [
            (Resolution::Resolved, buckets.resolved),
            (Resolution::Unresolved, buckets.unresolved),
            (Resolution::Orphaned, buckets.orphaned),
        ] {
            records.extend(edges.into_iter().map(|edge| EdgeRecord { resolution, edge }));
        }
        for chunk in chunks(records, self.batch_size) {
            self.summary.edges += chunk.len();
            self.push(Vec::new(), chunk)?;
        }
        Ok(())
    }

    fn push(&mut self, entities: Vec<EntityRecord>, edges: Vec<EdgeRecord>) -> Result<(), IngestError> {
        let batch = RecordBatch {
            batch_id: format!("{}-{:04}", self.phase.as_str(), self.seq),
            phase: self.phase,
            entities,
            edges,
        };
        self.seq += 1;
        self.summary.batches += 1;
        self.sink.commit(batch)?;
        Ok(())
    }

    fn finish(self) -> PhaseSummary {
        self.summary
    }
}
