/// Path separation
/// A resolved path (A -> X -> ... -> Y -> B) is cut out of the graph: A and B are detached
/// from their old junctions and joined through a new edge N carrying the resolved sequence,
/// giving A -> N -> B. The same is done to the reverse complement path with -N.
/// Interior edges stay in the graph, they are marked resolved and lose the coverage that
/// now belongs to N. `RepeatGraph::remove_resolved_edges` drops them when the caller wants.

use tracing::debug;

use crate::error::{ResolveError, Result};
use crate::repeat_graph::{Edge, EdgeId, EdgeSequence, RepeatGraph};

/// Collapse `path` and its reverse complement into single edges.
/// Every edge (and its complement) is checked before anything is changed.
/// Returns the id of the new forward edge, or None for a two-edge path where the
/// end edges are joined directly.
pub fn separate_path(
    graph: &mut RepeatGraph,
    path: &[EdgeId],
    new_seq_id: &str,
    new_seq: String,
) -> Result<Option<EdgeId>> {
    if path.len() < 2 {
        return Err(ResolveError::PathTooShort(path.len()));
    }

    let mut rev_path = Vec::with_capacity(path.len());
    for &id in path {
        graph.edge(id)?;
        rev_path.push(graph.complement_edge(id)?);
    }
    rev_path.reverse();

    let seq_len = new_seq.len() as u64;
    let new_edge_id = graph.next_edge_id();
    graph.edges_fasta.insert(new_seq_id.to_string(), new_seq);

    separate_one(
        graph,
        path,
        new_edge_id,
        EdgeSequence::new(format!("+{}", new_seq_id), seq_len),
    )?;
    // a path equal to its own reverse complement is only cut once
    if rev_path != path {
        separate_one(
            graph,
            &rev_path,
            -new_edge_id,
            EdgeSequence::new(format!("-{}", new_seq_id), seq_len),
        )?;
    }

    debug!("separated path of {} edges with new edge {}", path.len(), new_edge_id);
    Ok((path.len() > 2).then_some(new_edge_id))
}

/// Cut one strand of the path. Expects a validated path of at least two edges.
fn separate_one(graph: &mut RepeatGraph, edges: &[EdgeId], new_edge_id: EdgeId, new_seq: EdgeSequence) -> Result<()> {
    let first = edges[0];
    let last = edges[edges.len() - 1];

    // detach the first edge from its right junction
    let left_node = graph.add_node();
    let old_right = graph.edge(first)?.node_right;
    graph.node_mut(old_right).in_edges.retain(|&e| e != first);
    graph.edge_mut(first)?.node_right = left_node;
    graph.node_mut(left_node).in_edges.push(first);

    let path_coverage = (graph.edge(first)?.mean_coverage + graph.edge(last)?.mean_coverage).div_euclid(2);
    for &mid in &edges[1..edges.len() - 1] {
        let edge = graph.edge_mut(mid)?;
        edge.resolved = true;
        edge.mean_coverage -= path_coverage;
    }

    // two-edge paths join at a single new node
    let mut right_node = left_node;
    if edges.len() > 2 {
        right_node = graph.add_node();
        let mut new_edge = Edge::new(new_edge_id, left_node, right_node);
        new_edge.mean_coverage = path_coverage;
        new_edge.sequences.push(new_seq);
        graph.add_edge(new_edge)?;
    }

    // attach the last edge to the new right junction
    let old_left = graph.edge(last)?.node_left;
    graph.node_mut(old_left).out_edges.retain(|&e| e != last);
    graph.edge_mut(last)?.node_left = right_node;
    graph.node_mut(right_node).out_edges.push(last);

    Ok(())
}
