/// Repeat resolution
/// For every repeat subgraph:
/// 1. enumerate candidate paths from its unique entry edges
/// 2. score them by shared barcodes, keep the best ones and drop conflicting paths
/// 3. for each kept path pick the repeat copy carrying the path barcodes
/// 4. collapse the path in the parent graph
///
/// Failures are isolated: a failing path is logged and skipped, a failing subgraph does not
/// stop the remaining ones.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::alignment_records::{deserialize_records, read_sam_records};
use crate::barcode_scoring::{ScoredPath, ingest_records, resolve_conflicts, score_paths, select_candidates};
use crate::candidate_paths::enumerate_subgraph_paths;
use crate::configs::{AlignmentSource, ResolveConfig, ResolveRunConfig};
use crate::error::{ResolveError, Result};
use crate::repeat_graph::{Edge, EdgeId, RepeatGraph};
use crate::separate_path::separate_path;
use crate::subgraph::{Subgraph, export_subgraphs, graph_to_subgraphs};
use crate::utils::{Strand, rev_comp, split_strand};

/// Index of the sequence carrying most of the path barcodes, with that count.
/// The first sequence wins ties.
fn best_variant(edge: &Edge, support: &BTreeSet<String>) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    for (index, seq) in edge.sequences.iter().enumerate() {
        let count = support.iter().filter(|b| seq.barcodes.contains_key(*b)).count();
        if best.is_none_or(|(_, max)| count > max) {
            best = Some((index, count));
        }
    }
    best
}

/// Pick one sequence variant for every interior edge of the path.
/// The path must start and end on unique edges with only repeats in between, and each chosen
/// variant must carry more than `min_fraction` of the path barcodes.
pub fn choose_variant(graph: &RepeatGraph, scored: &ScoredPath, min_fraction: f64) -> Result<Vec<String>> {
    let path = &scored.path;
    let interior = path.interior();
    if interior.is_empty() {
        return Err(ResolveError::UnanchoredPath(path.to_string()));
    }
    for (i, &id) in path.edges.iter().enumerate() {
        let interior_edge = i != 0 && i != path.len() - 1;
        if graph.edge(id)?.repetitive != interior_edge {
            return Err(ResolveError::UnanchoredPath(path.to_string()));
        }
    }

    let mut chosen = Vec::with_capacity(interior.len());
    for &id in interior {
        let edge = graph.edge(id)?;
        let (index, count) = best_variant(edge, &scored.support).unwrap_or((0, 0));
        let fraction = if scored.support.is_empty() {
            0.0
        } else {
            count as f64 / scored.support.len() as f64
        };

        if edge.sequences.is_empty() || fraction <= min_fraction {
            return Err(ResolveError::AmbiguousResolution {
                path: path.to_string(),
                edge: id,
                support: fraction,
            });
        }
        debug!("edge {}: variant {} carries {:.3} of the path barcodes", id, index, fraction);
        chosen.push(edge.sequences[index].name.clone());
    }
    Ok(chosen)
}

/// Concatenate the bases of the chosen variants, '-' variants are reverse complemented
pub fn assemble_replacement(graph: &RepeatGraph, variants: &[String]) -> Result<String> {
    let mut out = String::new();
    for name in variants {
        let (strand, key) = split_strand(name);
        let bases = graph
            .sequence(name)
            .ok_or_else(|| ResolveError::MissingSequence(key.to_string()))?;
        match strand {
            Strand::Reverse => out.push_str(&rev_comp(bases)),
            Strand::Forward | Strand::Unmarked => out.push_str(bases),
        }
    }
    Ok(out)
}

/// Resolve one scored path in the graph, returns the new edge id
pub fn resolve_path(graph: &mut RepeatGraph, scored: &ScoredPath, config: &ResolveConfig) -> Result<Option<EdgeId>> {
    let variants = choose_variant(graph, scored, config.variant_support_fraction)?;
    let new_seq = assemble_replacement(graph, &variants)?;

    let (Some(first), Some(last)) = (scored.path.first(), scored.path.last()) else {
        return Err(ResolveError::PathTooShort(scored.path.len()));
    };
    let new_seq_id = format!("barcode_solved_repeat_{}_{}", first, last);
    separate_path(graph, &scored.path.edges, &new_seq_id, new_seq)
}

/// Per-subgraph counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubgraphReport {
    pub candidate_paths: usize,
    pub selected_paths: usize,
    pub accepted_paths: usize,
    pub separated_paths: usize,
    pub failed_paths: usize,
}

/// Counters over the whole run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolutionSummary {
    pub subgraphs: usize,
    pub complement_subgraphs: usize,
    pub failed_subgraphs: usize,
    pub paths: SubgraphReport,
    pub excised_edges: usize,
}

impl ResolutionSummary {
    fn add(&mut self, report: &SubgraphReport) {
        self.paths.candidate_paths += report.candidate_paths;
        self.paths.selected_paths += report.selected_paths;
        self.paths.accepted_paths += report.accepted_paths;
        self.paths.separated_paths += report.separated_paths;
        self.paths.failed_paths += report.failed_paths;
    }
}

/// Resolve the repeats of one subgraph in the parent graph
pub fn solve_subgraph(graph: &mut RepeatGraph, subgraph: &Subgraph, config: &ResolveConfig) -> Result<SubgraphReport> {
    let mut report = SubgraphReport::default();

    let paths = enumerate_subgraph_paths(graph, subgraph, config.max_extend_length)?;
    report.candidate_paths = paths.len();
    if paths.is_empty() {
        info!("no candidate paths");
        return Ok(report);
    }
    info!("found {} candidate paths", paths.len());
    for path in &paths {
        debug!("{}", path);
    }

    let scored = score_paths(graph, paths);
    let topk = subgraph.entry_edges(graph)?.len();
    let selected = select_candidates(graph, &scored, topk, config.min_path_barcodes);
    report.selected_paths = selected.len();
    info!(
        "{} good paths chosen: {:?}",
        selected.len(),
        selected.iter().map(|p| p.path.to_string()).collect::<Vec<_>>()
    );

    let accepted = resolve_conflicts(graph, selected);
    report.accepted_paths = accepted.len();
    info!(
        "{} good paths without conflict: {:?}",
        accepted.len(),
        accepted.iter().map(|p| p.path.to_string()).collect::<Vec<_>>()
    );

    for scored in &accepted {
        // paths that end inside the repeat are not separated
        if scored.path.ends_in_repeat(graph) {
            continue;
        }
        match resolve_path(graph, scored, config) {
            Ok(new_edge) => {
                report.separated_paths += 1;
                debug!("path {} separated, new edge {:?}", scored.path, new_edge);
            }
            Err(err) => {
                report.failed_paths += 1;
                warn!("cannot resolve path {}: {}", scored.path, err);
            }
        }
    }

    Ok(report)
}

/// Split the graph into repeat subgraphs and resolve them one after another.
/// A subgraph holding the reverse complements of an already processed one is skipped,
/// separating a path also separates its complement.
pub fn resolve_repeats(graph: &mut RepeatGraph, config: &ResolveConfig) -> Result<ResolutionSummary> {
    let subgraphs = graph_to_subgraphs(graph)?;
    let mut summary = ResolutionSummary {
        subgraphs: subgraphs.len(),
        ..Default::default()
    };
    let mut processed: Vec<usize> = Vec::new();

    for (i, subgraph) in subgraphs.iter().enumerate() {
        if let Some(&twin) = processed.iter().find(|&&j| subgraphs[j].is_complement_of(graph, subgraph)) {
            debug!("subgraph {} is the complement of subgraph {}", i, twin);
            summary.complement_subgraphs += 1;
            continue;
        }

        info!("processing subgraph {} ({} edges)", i, subgraph.edges.len());
        match solve_subgraph(graph, subgraph, config) {
            Ok(report) => summary.add(&report),
            Err(err) => {
                summary.failed_subgraphs += 1;
                warn!("subgraph {} failed: {}", i, err);
            }
        }
        processed.push(i);
    }

    if config.excise_resolved {
        summary.excised_edges = graph.remove_resolved_edges();
        info!("removed {} resolved edges", summary.excised_edges);
    }

    Ok(summary)
}

/// Full run: load the assembly, fold in the barcodes, resolve and write the results
pub fn run_resolve(config: &ResolveRunConfig) -> Result<ResolutionSummary> {
    info!("=== REPEAT RESOLUTION ===");
    debug!("{:?}", config.resolve);

    let mut graph = RepeatGraph::load_assembly(&config.assembly_dir)?;
    info!("graph nodes: {}, edges: {}", graph.node_count(), graph.edge_count());

    let records = match &config.alignments {
        AlignmentSource::Sam(path) => read_sam_records(path)?.0,
        AlignmentSource::Records(path) => deserialize_records(path)?,
    };
    let ingest = ingest_records(&mut graph, &records);
    info!(
        "barcodes updated from {} alignments ({} unknown targets)",
        ingest.applied, ingest.unknown_targets
    );

    let out_dir = Path::new(&config.out_dir);
    std::fs::create_dir_all(out_dir)?;
    if config.subgraph_dot {
        export_subgraphs(&graph, out_dir.join("subgraphs"))?;
    }

    let summary = resolve_repeats(&mut graph, &config.resolve)?;
    info!(
        "subgraphs: {} ({} complements skipped, {} failed), paths separated: {}, failed: {}",
        summary.subgraphs,
        summary.complement_subgraphs,
        summary.failed_subgraphs,
        summary.paths.separated_paths,
        summary.paths.failed_paths
    );

    graph.output_all(out_dir)?;
    info!("=== REPEAT RESOLUTION FINISHED ===");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate_paths::CandidatePath;
    use crate::repeat_graph::tests::chain_graph;
    use crate::repeat_graph::{EdgeSequence, SequenceStore};

    /// 1 -> 2 -> 3 -> 4, edge 2 repetitive with two copies
    fn bubble() -> RepeatGraph {
        let mut g = chain_graph(4, 4);
        for id in [2, -2] {
            let e = g.edge_mut(id).unwrap();
            e.repetitive = true;
            let marker = if id > 0 { '+' } else { '-' };
            e.sequences.push(EdgeSequence::new(format!("{}edge_2_1", marker), 4));
        }
        let mut store = SequenceStore::new();
        store.insert("edge_2_0".to_string(), "AACC".to_string());
        store.insert("edge_2_1".to_string(), "GGGT".to_string());
        g.edges_fasta = store;
        g
    }

    fn support(n: usize) -> BTreeSet<String> {
        (0..n).map(|i| format!("bc{}", i)).collect()
    }

    fn tag(g: &mut RepeatGraph, id: EdgeId, seq: usize, barcodes: impl Iterator<Item = String>) {
        let s = &mut g.edge_mut(id).unwrap().sequences[seq];
        for b in barcodes {
            s.add_barcode(&b, 1);
        }
    }

    #[test]
    fn variant_with_most_path_barcodes_wins() {
        let mut g = bubble();
        tag(&mut g, 2, 0, (0..9).map(|i| format!("bc{}", i)));
        tag(&mut g, 2, 1, std::iter::once("bc9".to_string()));

        let scored = ScoredPath {
            path: CandidatePath::new(vec![1, 2, 3]),
            support: support(10),
        };
        assert_eq!(choose_variant(&g, &scored, 0.8).unwrap(), vec!["+edge_2_0"]);
        assert!(matches!(
            choose_variant(&g, &scored, 0.9),
            Err(ResolveError::AmbiguousResolution { edge: 2, .. })
        ));
    }

    #[test]
    fn split_support_is_ambiguous() {
        let mut g = bubble();
        tag(&mut g, 2, 0, (0..5).map(|i| format!("bc{}", i)));
        tag(&mut g, 2, 1, (5..10).map(|i| format!("bc{}", i)));
        let scored = ScoredPath {
            path: CandidatePath::new(vec![1, 2, 3]),
            support: support(10),
        };
        assert!(matches!(
            choose_variant(&g, &scored, 0.8),
            Err(ResolveError::AmbiguousResolution { .. })
        ));
    }

    #[test]
    fn paths_must_be_anchored_on_unique_edges() {
        let g = bubble();
        for edges in [vec![1, 2], vec![2, 3, 4], vec![1, 3]] {
            let scored = ScoredPath {
                path: CandidatePath::new(edges),
                support: support(3),
            };
            assert!(matches!(
                choose_variant(&g, &scored, 0.8),
                Err(ResolveError::UnanchoredPath(_))
            ));
        }
    }

    #[test]
    fn replacement_reverse_complements_minus_variants() {
        let g = bubble();
        let seq = assemble_replacement(&g, &["+edge_2_0".to_string(), "-edge_2_1".to_string()]).unwrap();
        assert_eq!(seq, "AACCACCC");
        assert!(matches!(
            assemble_replacement(&g, &["+missing".to_string()]),
            Err(ResolveError::MissingSequence(_))
        ));
    }

    #[test]
    fn failed_path_leaves_graph_unchanged() {
        let mut g = bubble();
        let scored = ScoredPath {
            path: CandidatePath::new(vec![1, 2, 3]),
            support: support(4),
        };
        let edges = g.edge_count();
        assert!(resolve_path(&mut g, &scored, &ResolveConfig::default()).is_err());
        assert_eq!(g.edge_count(), edges);
        assert!(g.edges().all(|e| !e.resolved));
    }
}
