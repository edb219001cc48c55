mod sink;
mod snapshot;
mod stats;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use vistagraph_ingest::{Pipeline, PipelineConfig};

use crate::sink::JsonlSink;
use crate::snapshot::JsonSnapshotSource;

#[derive(Parser)]
#[command(
    name = "vistagraph",
    version,
    about = "Extract a code knowledge graph from a VistA distribution",
    long_about = "Vistagraph decodes FileMan data-dictionary exports, the package \
                  registry and MUMPS routine sources into typed entity and \
                  relationship records, emitted as JSON-lines batches for a graph \
                  store to consume."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct ExtractArgs {
    /// Data-dictionary export (DD.zwr)
    #[arg(long, value_name = "FILE")]
    pub dd: PathBuf,
    /// File registry export (FILE.zwr) providing global storage roots
    #[arg(long, value_name = "FILE")]
    pub dic: Option<PathBuf>,
    /// Package registry CSV (Packages.csv)
    #[arg(long, value_name = "FILE")]
    pub packages: PathBuf,
    /// Directory scanned recursively for *.m routine sources
    #[arg(long, value_name = "DIR")]
    pub routines: PathBuf,
    /// Output file; one JSON object per batch, appended
    #[arg(long, value_name = "FILE", default_value = "vistagraph.jsonl")]
    pub out: PathBuf,
    /// Records per emitted batch
    #[arg(long, default_value_t = 1000)]
    pub batch_size: usize,
}

impl ExtractArgs {
    fn pipeline(&self) -> Pipeline {
        let mut config = PipelineConfig::new(&self.dd, &self.packages, &self.routines);
        config.dic_path = self.dic.clone();
        config.batch_size = self.batch_size;
        Pipeline::new(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Emit packages, files and fields
    Foundation(ExtractArgs),
    /// Emit cross-references, subfiles and variable-pointer targets
    SchemaLinks(ExtractArgs),
    /// Emit routines and labels with package attribution
    CodeStructure(ExtractArgs),
    /// Emit call, invocation, access and fall-through edges
    CodeGraph {
        #[command(flatten)]
        extract: ExtractArgs,
        /// Identity snapshot JSON exported by the consumer after the
        /// structural phases
        #[arg(long, value_name = "FILE")]
        snapshot: PathBuf,
        /// Global identities JSON; omit to leave the global index empty
        #[arg(long, value_name = "FILE")]
        globals: Option<PathBuf>,
    },
    /// Summarize the inputs without emitting anything
    Stats(ExtractArgs),
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = vistagraph_core::logging::init_logging("cli", true);

    match cli.command {
        Commands::Foundation(args) => {
            let mut sink = JsonlSink::open(&args.out)?;
            let summary = args.pipeline().run_foundation(&mut sink)?;
            report("foundation", summary);
        }
        Commands::SchemaLinks(args) => {
            let mut sink = JsonlSink::open(&args.out)?;
            let summary = args.pipeline().run_schema_links(&mut sink)?;
            report("schema-links", summary);
        }
        Commands::CodeStructure(args) => {
            let mut sink = JsonlSink::open(&args.out)?;
            let summary = args.pipeline().run_code_structure(&mut sink)?;
            report("code-structure", summary);
        }
        Commands::CodeGraph {
            extract,
            snapshot,
            globals,
        } => {
            let mut sink = JsonlSink::open(&extract.out)?;
            let source = JsonSnapshotSource::new(&snapshot, globals.as_deref());
            let summary = extract
                .pipeline()
                .run_code_graph(&source, &mut sink)
                .context("code-graph phase")?;
            report("code-graph", summary);
        }
        Commands::Stats(args) => stats::run(&args)?,
    }
    Ok(())
}

fn report(phase: &str, summary: vistagraph_ingest::PhaseSummary) {
    tracing::info!(
        phase,
        entities = summary.entities,
        edges = summary.edges,
        batches = summary.batches,
        "phase finished"
    );
    println!(
        "{phase}: {} entities, {} edges in {} batches",
        summary.entities, summary.edges, summary.batches
    );
}
