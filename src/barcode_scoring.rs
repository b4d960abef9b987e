/// Barcode scoring
/// 1. fold alignment records into the barcode tables of the edge sequences
/// 2. score candidate paths by the barcodes shared by all of their edges
/// 3. keep the best supported paths that cross a repeat
/// 4. drop paths whose anchors were already claimed by a better path

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, warn};

use crate::alignment_records::AlignmentRecord;
use crate::candidate_paths::CandidatePath;
use crate::error::{ResolveError, Result};
use crate::repeat_graph::{EdgeId, RepeatGraph};

/// Add one record to the sequence it targets, and to the same sequence slot of the
/// complement edge. Fails with `UnknownTarget` if neither strand has that slot.
pub fn ingest_alignment(graph: &mut RepeatGraph, record: &AlignmentRecord) -> Result<()> {
    let (edge_id, seq_index) = record
        .target_slot()
        .ok_or_else(|| ResolveError::UnknownTarget(record.target.clone()))?;

    let mut applied = false;
    let mut targets = vec![edge_id];
    // self complementary edges have no mirrored id
    if graph.contains_edge(-edge_id) {
        targets.push(-edge_id);
    }

    for id in targets {
        let Ok(edge) = graph.edge_mut(id) else {
            continue;
        };
        if let Some(seq) = edge.sequences.get_mut(seq_index) {
            seq.add_barcode(&record.barcode, record.position);
            applied = true;
        }
    }

    if !applied {
        return Err(ResolveError::UnknownTarget(record.target.clone()));
    }
    Ok(())
}

/// Counters returned by `ingest_records`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub applied: usize,
    pub unknown_targets: usize,
}

/// Fold a stream of records into the graph. Records naming missing targets are skipped.
pub fn ingest_records<'a, I>(graph: &mut RepeatGraph, records: I) -> IngestStats
where
    I: IntoIterator<Item = &'a AlignmentRecord>,
{
    let mut stats = IngestStats::default();
    let mut reported: HashSet<String> = HashSet::new();

    for record in records {
        match ingest_alignment(graph, record) {
            Ok(()) => stats.applied += 1,
            Err(err) => {
                stats.unknown_targets += 1;
                // warn once per target, partial reference sets are common
                if reported.insert(record.target.clone()) {
                    warn!("skipping alignment: {}", err);
                }
            }
        }
    }

    debug!(
        "ingested {} alignments, {} with unknown targets",
        stats.applied, stats.unknown_targets
    );
    stats
}

/// Candidate path together with the barcodes shared by all of its edges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredPath {
    pub path: CandidatePath,
    pub support: BTreeSet<String>,
}

impl ScoredPath {
    pub fn new(graph: &RepeatGraph, path: CandidatePath) -> Self {
        let support = path.barcode_support(graph);
        Self { path, support }
    }

    pub fn support_count(&self) -> usize {
        self.support.len()
    }
}

/// Score every path and sort by support, highest first. Ties keep enumeration order.
pub fn score_paths(graph: &RepeatGraph, paths: Vec<CandidatePath>) -> Vec<ScoredPath> {
    let mut scored: Vec<ScoredPath> = paths.into_iter().map(|p| ScoredPath::new(graph, p)).collect();
    scored.sort_by(|a, b| b.support_count().cmp(&a.support_count()));
    scored
}

/// Keep paths crossing at least one repeat with more than `min_barcodes` supporting barcodes,
/// then take the first `topk`. Expects the input sorted by support.
pub fn select_candidates(
    graph: &RepeatGraph,
    paths: &[ScoredPath],
    topk: usize,
    min_barcodes: usize,
) -> Vec<ScoredPath> {
    paths
        .iter()
        .filter(|p| p.path.has_repeat(graph))
        .filter(|p| p.support_count() > min_barcodes)
        .take(topk)
        .cloned()
        .collect()
}

/// Greedy conflict resolution over support-sorted paths. A path is rejected when both of
/// its end edges were claimed by earlier accepted paths and it ends on a unique edge.
pub fn resolve_conflicts(graph: &RepeatGraph, paths: Vec<ScoredPath>) -> Vec<ScoredPath> {
    let mut accepted = Vec::new();
    let mut claimed: HashSet<EdgeId> = HashSet::new();

    for scored in paths {
        let (Some(first), Some(last)) = (scored.path.first(), scored.path.last()) else {
            continue;
        };

        if claimed.contains(&first) && claimed.contains(&last) && !scored.path.ends_in_repeat(graph) {
            debug!("conflicting path {}", scored.path);
            continue;
        }

        claimed.insert(first);
        claimed.insert(last);
        accepted.push(scored);
    }

    accepted
}
