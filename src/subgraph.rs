/// Subgraph partitioning
/// 1. collect clusters of repetitive edges connected through repetitive edges
/// 2. pad every cluster with the edges adjacent to its repeats, these are the unique anchors
/// 3. materialize each cluster as a subgraph: a set of edge and node ids into the parent graph
///
/// A subgraph never copies nodes or edges. Surgery on the parent graph is visible through it.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ResolveError, Result};
use crate::graph_io::write_fasta;
use crate::repeat_graph::{EdgeId, NodeId, RepeatGraph};

/// Set of edge ids forming one repeat cluster
pub type RepeatCluster = BTreeSet<EdgeId>;

/// Find clusters of repetitive edges. Two repetitive edges share a cluster if they are
/// connected by a path of repetitive edges, edge direction is ignored.
pub fn get_repeat_clusters(graph: &RepeatGraph) -> Vec<RepeatCluster> {
    let mut visited = vec![false; graph.node_count()];
    let mut clusters: Vec<RepeatCluster> = Vec::new();

    for (start, _) in graph.nodes() {

        // check if already visited
        if visited[start.0] {
            continue;
        }

        // new cluster
        let mut cluster = RepeatCluster::new();
        let mut stack: Vec<NodeId> = vec![start];

        while let Some(current) = stack.pop() {
            if visited[current.0] {
                continue;
            }
            visited[current.0] = true;

            let node = graph.node(current);
            // follow repetitive edges in both directions
            for (&edge_id, forward) in node
                .out_edges
                .iter()
                .map(|e| (e, true))
                .chain(node.in_edges.iter().map(|e| (e, false)))
            {
                let Ok(edge) = graph.edge(edge_id) else {
                    continue;
                };
                if !edge.repetitive {
                    continue;
                }
                cluster.insert(edge_id);
                let neighbor = if forward { edge.node_right } else { edge.node_left };
                if !visited[neighbor.0] {
                    stack.push(neighbor);
                }
            }
        }

        // nodes without repetitive edges give empty clusters
        if !cluster.is_empty() {
            clusters.push(cluster);
        }
    }

    clusters
}

/// Add all edges adjacent to a repetitive edge of the cluster (one step, not recursive)
pub fn pad_with_anchors(graph: &RepeatGraph, cluster: &RepeatCluster) -> Result<RepeatCluster> {
    let mut padded = cluster.clone();
    for &edge_id in cluster {
        if graph.edge(edge_id)?.repetitive {
            padded.extend(graph.adjacent_edges(edge_id)?);
        }
    }
    Ok(padded)
}

/// View of a part of the parent graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subgraph {
    pub edges: BTreeSet<EdgeId>,
    pub nodes: BTreeSet<NodeId>,
    /// store keys of the sequences referenced by the subgraph edges
    pub sequence_names: BTreeSet<String>,
}

impl Subgraph {

    /// Materialize a cluster: nodes are the endpoints of the cluster edges
    pub fn from_cluster(graph: &RepeatGraph, cluster: RepeatCluster) -> Result<Self> {
        let mut nodes = BTreeSet::new();
        let mut sequence_names = BTreeSet::new();
        for &edge_id in &cluster {
            let edge = graph.edge(edge_id)?;
            nodes.insert(edge.node_left);
            nodes.insert(edge.node_right);
            for seq in &edge.sequences {
                let (_, key) = crate::utils::split_strand(&seq.name);
                sequence_names.insert(key.to_string());
            }
        }
        Ok(Self {
            edges: cluster,
            nodes,
            sequence_names,
        })
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edges.contains(&id)
    }

    /// Incoming edges of `id` that are part of the subgraph
    pub fn in_edges(&self, graph: &RepeatGraph, id: EdgeId) -> Result<Vec<EdgeId>> {
        if !self.contains_edge(id) {
            return Err(ResolveError::EdgeNotInSubgraph(id));
        }
        let left = graph.edge(id)?.node_left;
        Ok(graph
            .node(left)
            .in_edges
            .iter()
            .copied()
            .filter(|e| self.contains_edge(*e))
            .collect())
    }

    /// Edges without an incoming edge inside the subgraph
    pub fn entry_edges(&self, graph: &RepeatGraph) -> Result<Vec<EdgeId>> {
        let mut entries = Vec::new();
        for &id in &self.edges {
            if self.in_edges(graph, id)?.is_empty() {
                entries.push(id);
            }
        }
        Ok(entries)
    }

    /// True if `other` holds exactly the reverse complements of this subgraph's edges
    pub fn is_complement_of(&self, graph: &RepeatGraph, other: &Subgraph) -> bool {
        if self.edges.len() != other.edges.len() {
            return false;
        }
        self.edges.iter().all(|&id| {
            graph
                .complement_edge(id)
                .map(|compl| other.contains_edge(compl))
                .unwrap_or(false)
        })
    }

    /// Reduced sequence store: only the sequences referenced by the subgraph edges
    pub fn sequences<'a>(&'a self, graph: &'a RepeatGraph) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.sequence_names
            .iter()
            .filter_map(|name| graph.edges_fasta.get(name).map(|seq| (name.as_str(), seq.as_str())))
    }

    pub fn write_dot<P: AsRef<Path>>(&self, graph: &RepeatGraph, path: P) -> Result<()> {
        let mut w = std::io::BufWriter::new(std::fs::File::create(path)?);
        graph.write_dot_to(&mut w, self.edges.iter().copied())?;
        w.flush()?;
        Ok(())
    }
}

/// Split a graph into padded repeat subgraphs
pub fn graph_to_subgraphs(graph: &RepeatGraph) -> Result<Vec<Subgraph>> {
    let clusters = get_repeat_clusters(graph);
    debug!("found {} repeat clusters", clusters.len());

    clusters
        .iter()
        .map(|cluster| {
            let padded = pad_with_anchors(graph, cluster)?;
            Subgraph::from_cluster(graph, padded)
        })
        .collect()
}

/// Write every subgraph as `subg<i>.gv` and `subg<i>.fasta` into `out_dir`
pub fn export_subgraphs<P: AsRef<Path>>(graph: &RepeatGraph, out_dir: P) -> Result<usize> {
    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)?;

    let subgraphs = graph_to_subgraphs(graph)?;
    for (i, subgraph) in subgraphs.iter().enumerate() {
        subgraph.write_dot(graph, out_dir.join(format!("subg{}.gv", i)))?;
        write_fasta(out_dir.join(format!("subg{}.fasta", i)), subgraph.sequences(graph))?;
    }
    info!("wrote {} subgraphs to {}", subgraphs.len(), out_dir.display());
    Ok(subgraphs.len())
}
