pub mod alignment_records;
pub mod barcode_scoring;
pub mod candidate_paths;
pub mod cli;
pub mod configs;
pub mod error;
pub mod graph_analysis;
pub mod graph_io;
pub mod repeat_graph;
pub mod separate_path;
pub mod solve_repeat;
pub mod subgraph;
pub mod utils;
