use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use barbridge::alignment_records::run_ingest;
use barbridge::cli::{Cli, Commands};
use barbridge::configs::{IngestConfig, ResolveRunConfig, StatsConfig, SubgraphExportConfig};
use barbridge::graph_analysis::run_stats;
use barbridge::repeat_graph::RepeatGraph;
use barbridge::solve_repeat::run_resolve;
use barbridge::subgraph::export_subgraphs;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .init();

    match &cli.command {
        Commands::Ingest(args) => {
            let config = IngestConfig::from(args);
            run_ingest(&config).with_context(|| format!("failed to ingest {}", config.sam))?;
        }

        Commands::Resolve(args) => {
            let config = ResolveRunConfig::from(args);
            let summary = run_resolve(&config)
                .with_context(|| format!("failed to resolve repeats of {}", config.assembly_dir))?;
            info!(
                "separated {} paths, {} failed, {} resolved edges removed",
                summary.paths.separated_paths, summary.paths.failed_paths, summary.excised_edges
            );
        }

        Commands::Subgraphs(args) => {
            let config = SubgraphExportConfig::from(args);
            let graph = RepeatGraph::load_assembly(&config.assembly_dir)
                .with_context(|| format!("failed to load assembly {}", config.assembly_dir))?;
            export_subgraphs(&graph, &config.out_dir)
                .with_context(|| format!("failed to write subgraphs to {}", config.out_dir))?;
        }

        Commands::Stats(args) => {
            let config = StatsConfig::from(args);
            run_stats(&config).with_context(|| format!("failed to analyze {}", config.assembly_dir))?;
        }
    }

    Ok(())
}
