/// Repeat graph model
/// Edges are genomic segments keyed by a signed id, the negated id is the reverse complement
/// of the same segment (unless the edge is its own complement). Nodes are junctions that only
/// store the ids of their incoming and outgoing edges, all objects live in the graph arena.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::error::{ResolveError, Result};

/// Signed edge id, `-id` is the reverse complement of `id`
pub type EdgeId = i64;

/// Sequence name -> bases
pub type SequenceStore = BTreeMap<String, String>;

/// Index of a node in the graph arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A junction with ordered lists of incoming and outgoing edge ids
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub in_edges: Vec<EdgeId>,
    pub out_edges: Vec<EdgeId>,
}

impl Node {
    pub fn is_bifurcation(&self) -> bool {
        self.in_edges.len() != 1 || self.out_edges.len() != 1
    }

    pub fn is_empty(&self) -> bool {
        self.in_edges.is_empty() && self.out_edges.is_empty()
    }
}

/// One contiguous sub-sequence contributing to an edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeSequence {
    /// store key with a leading '+' or '-' strand marker
    pub name: String,
    pub length: u64,
    pub orig_seq_id: String,
    pub orig_seq_len: u64,
    pub orig_seq_start: u64,
    pub orig_seq_end: u64,
    /// barcode -> alignment positions in the order they were observed
    pub barcodes: HashMap<String, Vec<u64>>,
}

impl EdgeSequence {
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            length,
            orig_seq_id: "*".to_string(),
            orig_seq_len: 0,
            orig_seq_start: 0,
            orig_seq_end: 0,
            barcodes: HashMap::new(),
        }
    }

    /// Record one more observation of `barcode`, repeated barcodes keep every position
    pub fn add_barcode(&mut self, barcode: &str, position: u64) {
        self.barcodes.entry(barcode.to_string()).or_default().push(position);
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub node_left: NodeId,
    pub node_right: NodeId,
    pub repetitive: bool,
    pub self_complement: bool,
    pub resolved: bool,
    pub mean_coverage: i64,
    pub alt_group: i64,
    pub sequences: Vec<EdgeSequence>,
}

impl Edge {
    pub fn new(id: EdgeId, node_left: NodeId, node_right: NodeId) -> Self {
        Self {
            id,
            node_left,
            node_right,
            repetitive: false,
            self_complement: false,
            resolved: false,
            mean_coverage: 0,
            alt_group: -1,
            sequences: Vec::new(),
        }
    }

    /// Mean length of the edge sequences, 0 when the edge carries none
    pub fn length(&self) -> u64 {
        if self.sequences.is_empty() {
            return 0;
        }
        self.sequences.iter().map(|s| s.length).sum::<u64>() / self.sequences.len() as u64
    }

    /// Merge the barcode tables of all sequences, position lists are concatenated per barcode
    pub fn barcodes(&self) -> HashMap<&str, Vec<u64>> {
        let mut merged: HashMap<&str, Vec<u64>> = HashMap::new();
        for seq in &self.sequences {
            for (barcode, positions) in &seq.barcodes {
                merged.entry(barcode.as_str()).or_default().extend_from_slice(positions);
            }
        }
        merged
    }

    /// Set of barcodes seen on any sequence of the edge
    pub fn barcode_keys(&self) -> HashSet<&str> {
        self.sequences
            .iter()
            .flat_map(|s| s.barcodes.keys().map(|k| k.as_str()))
            .collect()
    }
}

/// The repeat graph owns every node and edge, subgraphs only hold ids into it
#[derive(Debug, Clone, Default)]
pub struct RepeatGraph {
    nodes: Vec<Node>,
    edges: BTreeMap<EdgeId, Edge>,
    pub edges_fasta: SequenceStore,
}

impl RepeatGraph {

    /// Create an empty graph around a sequence store
    pub fn new(edges_fasta: SequenceStore) -> Self {
        Self {
            nodes: Vec::new(),
            edges: BTreeMap::new(),
            edges_fasta,
        }
    }

    pub fn add_node(&mut self) -> NodeId {
        self.nodes.push(Node::default());
        NodeId(self.nodes.len() - 1)
    }

    /// Register an edge and append it to the adjacency lists of both endpoints
    pub fn add_edge(&mut self, edge: Edge) -> Result<()> {
        // endpoints must already be in the arena
        for node in [edge.node_left, edge.node_right] {
            if node.0 >= self.nodes.len() {
                return Err(ResolveError::MissingNode(node.0));
            }
        }
        if self.edges.contains_key(&edge.id) {
            return Err(ResolveError::DuplicateEdge(edge.id));
        }
        self.nodes[edge.node_left.0].out_edges.push(edge.id);
        self.nodes[edge.node_right.0].in_edges.push(edge.id);
        self.edges.insert(edge.id, edge);
        Ok(())
    }

    /// Detach an edge from its endpoints and drop it from the graph
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Edge> {
        let edge = self.edges.remove(&id).ok_or(ResolveError::MissingEdge(id))?;
        self.nodes[edge.node_left.0].out_edges.retain(|&e| e != id);
        self.nodes[edge.node_right.0].in_edges.retain(|&e| e != id);
        Ok(edge)
    }

    pub fn edge(&self, id: EdgeId) -> Result<&Edge> {
        self.edges.get(&id).ok_or(ResolveError::MissingEdge(id))
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Result<&mut Edge> {
        self.edges.get_mut(&id).ok_or(ResolveError::MissingEdge(id))
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }

    /// Node lookup, node ids are only handed out by this graph and nodes are never removed
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Edges in ascending id order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.values()
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Id for the next inserted edge: one past the largest id magnitude
    pub fn next_edge_id(&self) -> EdgeId {
        self.edges.keys().map(|id| id.abs()).max().unwrap_or(0) + 1
    }

    /// Reverse-complement edge of `id` (the edge itself when it is self-complementary)
    pub fn complement_edge(&self, id: EdgeId) -> Result<EdgeId> {
        let edge = self.edge(id)?;
        if edge.self_complement {
            return Ok(id);
        }
        if !self.edges.contains_key(&-id) {
            return Err(ResolveError::MissingEdge(-id));
        }
        Ok(-id)
    }

    /// Reverse-complement node, derived from any adjacent edge. None for a node without edges.
    pub fn complement_node(&self, id: NodeId) -> Result<Option<NodeId>> {
        let node = self.node(id);
        if let Some(&out) = node.out_edges.first() {
            let compl = self.complement_edge(out)?;
            return Ok(Some(self.edge(compl)?.node_right));
        }
        if let Some(&inc) = node.in_edges.first() {
            let compl = self.complement_edge(inc)?;
            return Ok(Some(self.edge(compl)?.node_left));
        }
        Ok(None)
    }

    /// All edges touching either endpoint of `id`, excluding the edge itself
    pub fn adjacent_edges(&self, id: EdgeId) -> Result<BTreeSet<EdgeId>> {
        let edge = self.edge(id)?;
        let left = self.node(edge.node_left);
        let right = self.node(edge.node_right);
        let mut adjacent: BTreeSet<EdgeId> = left
            .in_edges
            .iter()
            .chain(&left.out_edges)
            .chain(&right.in_edges)
            .chain(&right.out_edges)
            .copied()
            .collect();
        adjacent.remove(&id);
        Ok(adjacent)
    }

    /// Sequence bases for an edge sequence name (strand marker is ignored)
    pub fn sequence(&self, name: &str) -> Option<&str> {
        let (_, key) = crate::utils::split_strand(name);
        self.edges_fasta.get(key).map(|s| s.as_str())
    }

    /// Partition all edges into maximal chains through non-bifurcating nodes.
    /// Self-complementary edges always form a chain of their own.
    pub fn get_unbranching_paths(&self) -> Vec<Vec<EdgeId>> {
        let mut unbranching_paths: Vec<Vec<EdgeId>> = Vec::new();
        let mut visited: HashSet<EdgeId> = HashSet::new();

        // single predecessor / successor through a simple node, if it may join the chain
        let extendable = |edge_id: Option<&EdgeId>, visited: &HashSet<EdgeId>| -> Option<EdgeId> {
            let &next = edge_id?;
            if visited.contains(&next) || self.edges[&next].self_complement {
                return None;
            }
            Some(next)
        };

        for edge in self.edges.values() {
            if visited.contains(&edge.id) {
                continue;
            }
            visited.insert(edge.id);

            let mut traversed = vec![edge.id];
            if !edge.self_complement {
                // walk backwards
                let mut cur = self.node(edge.node_left);
                while !cur.is_bifurcation() {
                    let Some(prev) = extendable(cur.in_edges.first(), &visited) else {
                        break;
                    };
                    traversed.push(prev);
                    visited.insert(prev);
                    cur = self.node(self.edges[&prev].node_left);
                }
                traversed.reverse();

                // walk forwards
                let mut cur = self.node(edge.node_right);
                while !cur.is_bifurcation() {
                    let Some(next) = extendable(cur.out_edges.first(), &visited) else {
                        break;
                    };
                    traversed.push(next);
                    visited.insert(next);
                    cur = self.node(self.edges[&next].node_right);
                }
            }

            unbranching_paths.push(traversed);
        }

        unbranching_paths
    }

    /// Remove every resolved edge together with its complement.
    /// Returns the number of removed edges.
    pub fn remove_resolved_edges(&mut self) -> usize {
        let resolved: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|e| e.resolved)
            .map(|e| e.id)
            .collect();

        let mut removed = 0;
        for id in resolved {
            // the complement may have been removed already
            if let Ok(compl) = self.complement_edge(id) {
                if compl != id && self.remove_edge(compl).is_ok() {
                    removed += 1;
                }
            }
            if self.remove_edge(id).is_ok() {
                removed += 1;
            }
        }
        removed
    }
}
