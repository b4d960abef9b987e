/// Candidate path enumeration
///
/// Depth-first search from a unique entry edge of a subgraph, following outgoing edges.
/// An edge can appear only once per path. A path ends when:
/// - the next edge leaves the subgraph (the path runs into the rest of the parent graph)
/// - the next edge does not fit into the remaining extension budget
///
/// The path is reported without that next edge, except for a unique edge over budget: it
/// is kept as the closing anchor, but its out-edges are not followed. The search is iterative,
/// `max_extend_length` is the only bound on its cost.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use rayon::prelude::*;
use tracing::debug;

use crate::error::{ResolveError, Result};
use crate::repeat_graph::{EdgeId, RepeatGraph};
use crate::subgraph::Subgraph;

/// Ordered list of edge ids, consecutive edges share a node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidatePath {
    pub edges: Vec<EdgeId>,
}

impl CandidatePath {
    pub fn new(edges: Vec<EdgeId>) -> Self {
        Self { edges }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn first(&self) -> Option<EdgeId> {
        self.edges.first().copied()
    }

    pub fn last(&self) -> Option<EdgeId> {
        self.edges.last().copied()
    }

    /// Edges strictly between the first and the last edge
    pub fn interior(&self) -> &[EdgeId] {
        if self.edges.len() < 2 {
            return &[];
        }
        &self.edges[1..self.edges.len() - 1]
    }

    pub fn has_repeat(&self, graph: &RepeatGraph) -> bool {
        self.edges
            .iter()
            .any(|&id| graph.edge(id).map(|e| e.repetitive).unwrap_or(false))
    }

    pub fn ends_in_repeat(&self, graph: &RepeatGraph) -> bool {
        self.last()
            .and_then(|id| graph.edge(id).ok())
            .map(|e| e.repetitive)
            .unwrap_or(false)
    }

    /// Barcodes present on every edge of the path
    pub fn barcode_support(&self, graph: &RepeatGraph) -> BTreeSet<String> {
        let mut edges = self.edges.iter().filter_map(|&id| graph.edge(id).ok());
        let Some(first) = edges.next() else {
            return BTreeSet::new();
        };
        let mut support: HashSet<&str> = first.barcode_keys();
        for edge in edges {
            if support.is_empty() {
                break;
            }
            let keys = edge.barcode_keys();
            support.retain(|b| keys.contains(b));
        }
        support.into_iter().map(str::to_string).collect()
    }
}

impl fmt::Display for CandidatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.edges.iter().map(|id| id.to_string()).collect();
        write!(f, "{}", ids.join("->"))
    }
}

/// Pending edge on the search stack: the edge to try, the budget left before it,
/// and the length of the path prefix it extends
struct Frame {
    edge: EdgeId,
    budget: u64,
    depth: usize,
}

/// All candidate paths starting at `start_edge`.
/// `max_extend_length` bounds the summed length of the edges after the start edge.
pub fn enumerate_paths(
    graph: &RepeatGraph,
    subgraph: &Subgraph,
    start_edge: EdgeId,
    max_extend_length: u64,
) -> Result<Vec<CandidatePath>> {
    if !subgraph.contains_edge(start_edge) {
        return Err(ResolveError::EdgeNotInSubgraph(start_edge));
    }

    let mut paths: Vec<CandidatePath> = Vec::new();
    let mut path: Vec<EdgeId> = Vec::new();
    let start_len = graph.edge(start_edge)?.length();
    let mut stack = vec![Frame {
        edge: start_edge,
        budget: max_extend_length.saturating_add(start_len),
        depth: 0,
    }];

    while let Some(frame) = stack.pop() {
        // drop the edges of the previously explored branch
        path.truncate(frame.depth);

        // left the subgraph
        if !subgraph.contains_edge(frame.edge) {
            paths.push(CandidatePath::new(path.clone()));
            continue;
        }

        // extension budget exhausted
        let edge = graph.edge(frame.edge)?;
        let len = edge.length();
        if frame.budget < len {
            // a unique anchor still closes the path, nothing past it is explored
            let mut closed = path.clone();
            if !edge.repetitive {
                closed.push(frame.edge);
            }
            paths.push(CandidatePath::new(closed));
            continue;
        }

        path.push(frame.edge);
        let remaining = frame.budget - len;

        // reverse push keeps the out-edge order when popping
        for &out in graph.node(edge.node_right).out_edges.iter().rev() {
            if !path.contains(&out) {
                stack.push(Frame {
                    edge: out,
                    budget: remaining,
                    depth: path.len(),
                });
            }
        }
    }

    Ok(paths)
}

/// Candidate paths from every unique entry edge of the subgraph.
/// Duplicates are removed, the first occurrence keeps its position.
pub fn enumerate_subgraph_paths(
    graph: &RepeatGraph,
    subgraph: &Subgraph,
    max_extend_length: u64,
) -> Result<Vec<CandidatePath>> {
    let mut starts = Vec::new();
    for id in subgraph.entry_edges(graph)? {
        if !graph.edge(id)?.repetitive {
            starts.push(id);
        }
    }

    // read-only search, one task per start edge
    let per_start: Vec<Vec<CandidatePath>> = starts
        .par_iter()
        .map(|&start| enumerate_paths(graph, subgraph, start, max_extend_length))
        .collect::<Result<_>>()?;

    let mut seen: HashSet<CandidatePath> = HashSet::new();
    let mut paths = Vec::new();
    for path in per_start.into_iter().flatten() {
        if !path.is_empty() && seen.insert(path.clone()) {
            paths.push(path);
        }
    }

    debug!("{} start edges, {} candidate paths", starts.len(), paths.len());
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repeat_graph::tests::chain_graph;
    use crate::repeat_graph::{Edge, EdgeSequence};

    /// 1 -> 2 -> 3 -> 4 with 2 repetitive, subgraph {1, 2, 3}
    fn repeat_chain(len: u64) -> (RepeatGraph, Subgraph) {
        let mut g = chain_graph(4, len);
        g.edge_mut(2).unwrap().repetitive = true;
        let sub = Subgraph::from_cluster(&g, BTreeSet::from([1, 2, 3])).unwrap();
        (g, sub)
    }

    #[test]
    fn path_leaving_the_subgraph_stops_before_exit() {
        let (g, sub) = repeat_chain(100);
        let paths = enumerate_paths(&g, &sub, 1, 40_000).unwrap();
        assert_eq!(paths, vec![CandidatePath::new(vec![1, 2, 3])]);
    }

    #[test]
    fn zero_budget_never_explores_past_start() {
        let (g, sub) = repeat_chain(100);
        let paths = enumerate_paths(&g, &sub, 1, 0).unwrap();
        assert_eq!(paths, vec![CandidatePath::new(vec![1])]);
    }

    #[test]
    fn budget_limits_path_length() {
        let (g, sub) = repeat_chain(100);
        // room for edge 2 but not for edge 3, which still closes the path
        let paths = enumerate_paths(&g, &sub, 1, 150).unwrap();
        assert_eq!(paths, vec![CandidatePath::new(vec![1, 2, 3])]);

        // repetitive edges over budget are dropped
        let paths = enumerate_paths(&g, &sub, 1, 50).unwrap();
        assert_eq!(paths, vec![CandidatePath::new(vec![1])]);
    }

    #[test]
    fn unique_edge_over_budget_closes_without_exploring() {
        let g = chain_graph(4, 100);
        let sub = Subgraph::from_cluster(&g, BTreeSet::from([1, 2, 3])).unwrap();
        let paths = enumerate_paths(&g, &sub, 1, 0).unwrap();
        assert_eq!(paths, vec![CandidatePath::new(vec![1, 2])]);

        let paths = enumerate_paths(&g, &sub, 1, u64::MAX).unwrap();
        assert_eq!(paths, vec![CandidatePath::new(vec![1, 2, 3])]);
    }

    #[test]
    fn long_anchors_around_a_short_repeat() {
        // 50 kb anchors do not fit the default budget but still end the path
        let mut g = chain_graph(3, 1_000);
        for id in [1, 3] {
            g.edge_mut(id).unwrap().sequences[0].length = 50_000;
        }
        g.edge_mut(2).unwrap().repetitive = true;
        let sub = Subgraph::from_cluster(&g, BTreeSet::from([1, 2, 3])).unwrap();
        let paths = enumerate_subgraph_paths(&g, &sub, 40_000).unwrap();
        assert_eq!(paths, vec![CandidatePath::new(vec![1, 2, 3])]);
    }

    #[test]
    fn start_edge_outside_subgraph_is_an_error() {
        let (g, sub) = repeat_chain(100);
        assert!(matches!(
            enumerate_paths(&g, &sub, 4, 100),
            Err(ResolveError::EdgeNotInSubgraph(4))
        ));
    }

    #[test]
    fn branches_are_explored_in_out_edge_order() {
        // 1 -> {2, 5} -> 3 -> 4, both 2 and 5 repetitive
        let (mut g, _) = repeat_chain(100);
        let from = g.edge(2).unwrap().node_left;
        let to = g.edge(2).unwrap().node_right;
        let mut alt = Edge::new(5, from, to);
        alt.repetitive = true;
        alt.sequences.push(EdgeSequence::new("+edge_5_0", 100));
        g.add_edge(alt).unwrap();
        let sub = Subgraph::from_cluster(&g, BTreeSet::from([1, 2, 3, 5])).unwrap();

        let paths = enumerate_subgraph_paths(&g, &sub, 40_000).unwrap();
        assert_eq!(
            paths,
            vec![
                CandidatePath::new(vec![1, 2, 3]),
                CandidatePath::new(vec![1, 5, 3]),
            ]
        );
        assert_eq!(paths[1].to_string(), "1->5->3");
        assert_eq!(paths[1].interior(), &[5]);
    }

    #[test]
    fn cycles_do_not_repeat_edges() {
        // 1 -> 2 -> 1 loop inside the subgraph, 3 leaves it
        let mut g = RepeatGraph::default();
        let a = g.add_node();
        let b = g.add_node();
        let c = g.add_node();
        let d = g.add_node();
        g.add_edge(Edge::new(1, d, a)).unwrap();
        g.add_edge(Edge::new(2, a, b)).unwrap();
        g.add_edge(Edge::new(3, b, a)).unwrap();
        g.add_edge(Edge::new(4, b, c)).unwrap();
        let sub = Subgraph::from_cluster(&g, BTreeSet::from([1, 2, 3])).unwrap();

        let paths = enumerate_paths(&g, &sub, 1, 1_000).unwrap();
        assert!(paths.contains(&CandidatePath::new(vec![1, 2])));
        assert!(paths.iter().all(|p| {
            let unique: HashSet<_> = p.edges.iter().collect();
            unique.len() == p.len()
        }));
    }

    #[test]
    fn support_is_intersection_of_edge_barcodes() {
        let (mut g, _) = repeat_chain(100);
        for (id, barcodes) in [(1, vec!["a", "b", "c"]), (2, vec!["b", "c"]), (3, vec!["x"])] {
            let seq = &mut g.edge_mut(id).unwrap().sequences[0];
            for b in barcodes {
                seq.add_barcode(b, 10);
            }
        }

        let single = CandidatePath::new(vec![1]);
        let expected: BTreeSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(single.barcode_support(&g), expected);

        let pair = CandidatePath::new(vec![1, 2]);
        assert_eq!(pair.barcode_support(&g).len(), 2);

        let disjoint = CandidatePath::new(vec![2, 3]);
        assert!(disjoint.barcode_support(&g).is_empty());
    }
}
