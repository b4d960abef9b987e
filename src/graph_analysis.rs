use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::configs::StatsConfig;
use crate::error::Result;
use crate::repeat_graph::{NodeId, RepeatGraph};
use crate::subgraph::get_repeat_clusters;

/// Find weakly connected components of the graph. Nodes without edges are left out.
pub fn weakly_connected_components(graph: &RepeatGraph) -> Vec<Vec<NodeId>> {

    // undirected adjacency, so a component is reached from any of its nodes
    let mut adjacency_list: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for edge in graph.edges() {
        adjacency_list.entry(edge.node_left).or_default().push(edge.node_right);
        adjacency_list.entry(edge.node_right).or_default().push(edge.node_left);
    }

    let mut visited = vec![false; graph.node_count()];
    let mut components: Vec<Vec<NodeId>> = Vec::new();

    for (start, _) in graph.nodes() {

        // check if already visited or isolated
        if visited[start.0] || !adjacency_list.contains_key(&start) {
            continue;
        }

        let mut component: Vec<NodeId> = Vec::new();
        let mut stack = vec![start];
        visited[start.0] = true;

        while let Some(current) = stack.pop() {
            component.push(current);
            for &neighbor in adjacency_list.get(&current).into_iter().flatten() {
                if !visited[neighbor.0] {
                    visited[neighbor.0] = true;
                    stack.push(neighbor);
                }
            }
        }

        components.push(component);
    }

    components
}

/// Component sizes sorted descending
pub fn component_sizes_sorted(graph: &RepeatGraph) -> Vec<usize> {
    let mut sizes: Vec<usize> = weakly_connected_components(graph)
        .into_iter()
        .map(|c| c.len())
        .collect();
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    sizes
}

/// Number of edges in every repeat cluster, in cluster order
pub fn repeat_cluster_sizes(graph: &RepeatGraph) -> Vec<usize> {
    get_repeat_clusters(graph).iter().map(|c| c.len()).collect()
}

/// Lengths of the repetitive edges, in edge id order
pub fn repeat_edge_lengths(graph: &RepeatGraph) -> Vec<u64> {
    graph
        .edges()
        .filter(|e| e.repetitive)
        .map(|e| e.length())
        .collect()
}

/// In- and out-degree distributions (degree -> number of nodes) over nodes with edges
pub fn analyze_degrees(graph: &RepeatGraph) -> (BTreeMap<usize, usize>, BTreeMap<usize, usize>) {
    let mut indegree_dist = BTreeMap::new();
    let mut outdegree_dist = BTreeMap::new();

    for (_, node) in graph.nodes() {
        if node.is_empty() {
            continue;
        }
        *indegree_dist.entry(node.in_edges.len()).or_insert(0) += 1;
        *outdegree_dist.entry(node.out_edges.len()).or_insert(0) += 1;
    }

    (indegree_dist, outdegree_dist)
}

fn write_list<P: AsRef<Path>, T: std::fmt::Debug>(path: P, values: &[T]) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write!(w, "{:?}", values)?;
    w.flush()?;
    Ok(())
}

/// Repeat statistics of an assembly: cluster sizes go to sd_info.txt,
/// repetitive edge lengths to length_info.txt
pub fn run_stats(config: &StatsConfig) -> Result<()> {
    info!("=== GRAPH STATISTICS ===");
    let graph = RepeatGraph::load_assembly(&config.assembly_dir)?;
    info!("graph nodes: {}, edges: {}", graph.node_count(), graph.edge_count());

    let components = component_sizes_sorted(&graph);
    info!("number of weakly connected components: {}", components.len());
    for (i, size) in components.iter().enumerate() {
        info!("component {}: size {}", i + 1, size);
    }

    info!("unbranching paths: {}", graph.get_unbranching_paths().len());

    let (indegree_dist, outdegree_dist) = analyze_degrees(&graph);
    info!("in-degree distribution (degree -> count): {:?}", indegree_dist);
    info!("out-degree distribution (degree -> count): {:?}", outdegree_dist);

    let cluster_sizes = repeat_cluster_sizes(&graph);
    let lengths = repeat_edge_lengths(&graph);
    info!(
        "{} repeat clusters, {} repetitive edges",
        cluster_sizes.len(),
        lengths.len()
    );

    let out_dir = Path::new(&config.out_dir);
    std::fs::create_dir_all(out_dir)?;
    write_list(out_dir.join("sd_info.txt"), &cluster_sizes)?;
    write_list(out_dir.join("length_info.txt"), &lengths)?;
    Ok(())
}
