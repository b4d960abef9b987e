use clap::{Args, Parser, Subcommand};

use crate::configs::{AlignmentSource, ResolveConfig};

#[derive(Parser)]
#[command(name = "barbridge", version, about = "Barcode-guided repeat resolution on assembly repeat graphs")]
pub struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {

    /// Reduce barcoded read alignments (SAM) to a binary record file
    Ingest(IngestArgs),

    /// Resolve repeats of an assembly with barcode support
    Resolve(ResolveArgs),

    /// Export repeat subgraphs as DOT and FASTA files
    Subgraphs(SubgraphsArgs),

    /// Repeat cluster and edge length statistics
    Stats(StatsArgs),
}

#[derive(Args)]
pub struct IngestArgs {

    /// Input SAM file, read names carry the barcode after '#'
    #[arg(short, long)]
    pub sam: String,

    /// Output record file
    #[arg(short, long, default_value = "alignments.bin")]
    pub output: String,
}

impl From<&IngestArgs> for crate::configs::IngestConfig {
    fn from(args: &IngestArgs) -> Self {
        Self {
            sam: args.sam.clone(),
            output_records: args.output.clone(),
        }
    }
}

#[derive(Args)]
pub struct ResolveArgs {

    /// Assembly directory with repeat_graph_dump and repeat_graph_edges.fasta
    #[arg(short, long)]
    pub assembly_dir: String,

    /// Barcoded read alignments in SAM format
    #[arg(short, long, conflicts_with = "records", required_unless_present = "records")]
    pub sam: Option<String>,

    /// Alignment records written by `ingest`
    #[arg(short, long)]
    pub records: Option<String>,

    /// Output directory
    #[arg(short, long)]
    pub out_dir: String,

    /// Maximum summed edge length a candidate path may extend past its start edge
    #[arg(short = 'l', long, default_value_t = 40_000)]
    pub max_extend_length: u64,

    /// Barcodes a candidate path must exceed to be kept
    #[arg(short = 'b', long, default_value_t = 100)]
    pub min_path_barcodes: usize,

    /// Fraction of the path barcodes the chosen repeat copy must exceed
    #[arg(short = 'f', long, default_value_t = 0.8)]
    pub variant_support_fraction: f64,

    /// Remove resolved repeat edges from the output graph
    #[arg(long)]
    pub excise_resolved: bool,

    /// Also write the repeat subgraphs before resolution
    #[arg(long)]
    pub subgraph_dot: bool,
}

impl From<&ResolveArgs> for crate::configs::ResolveRunConfig {
    fn from(args: &ResolveArgs) -> Self {
        // clap guarantees exactly one of the two sources
        let alignments = match &args.records {
            Some(records) => AlignmentSource::Records(records.clone()),
            None => AlignmentSource::Sam(args.sam.clone().unwrap_or_default()),
        };
        Self {
            assembly_dir: args.assembly_dir.clone(),
            alignments,
            out_dir: args.out_dir.clone(),
            subgraph_dot: args.subgraph_dot,
            resolve: ResolveConfig {
                max_extend_length: args.max_extend_length,
                min_path_barcodes: args.min_path_barcodes,
                variant_support_fraction: args.variant_support_fraction,
                excise_resolved: args.excise_resolved,
            },
        }
    }
}

#[derive(Args)]
pub struct SubgraphsArgs {

    /// Assembly directory with repeat_graph_dump and repeat_graph_edges.fasta
    #[arg(short, long)]
    pub assembly_dir: String,

    /// Output directory
    #[arg(short, long, default_value = "subgraphs")]
    pub out_dir: String,
}

impl From<&SubgraphsArgs> for crate::configs::SubgraphExportConfig {
    fn from(args: &SubgraphsArgs) -> Self {
        Self {
            assembly_dir: args.assembly_dir.clone(),
            out_dir: args.out_dir.clone(),
        }
    }
}

#[derive(Args)]
pub struct StatsArgs {

    /// Assembly directory with repeat_graph_dump and repeat_graph_edges.fasta
    #[arg(short, long)]
    pub assembly_dir: String,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub out_dir: String,
}

impl From<&StatsArgs> for crate::configs::StatsConfig {
    fn from(args: &StatsArgs) -> Self {
        Self {
            assembly_dir: args.assembly_dir.clone(),
            out_dir: args.out_dir.clone(),
        }
    }
}
