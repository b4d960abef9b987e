/// Error types shared by the graph model and the resolution steps

use thiserror::Error;

use crate::repeat_graph::EdgeId;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// A dump line that could not be parsed
    #[error("malformed graph dump at line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("edge {0} does not exist in the graph")]
    MissingEdge(EdgeId),

    #[error("edge {0} is already present in the graph")]
    DuplicateEdge(EdgeId),

    #[error("edge id {0} has no dump representation")]
    InvalidEdgeId(EdgeId),

    #[error("node {0} does not exist in the graph")]
    MissingNode(usize),

    #[error("edge {0} is not part of the subgraph")]
    EdgeNotInSubgraph(EdgeId),

    #[error("path has {0} edges, at least 2 are required")]
    PathTooShort(usize),

    /// Alignment target naming an edge or sequence slot that is not in the graph
    #[error("alignment target '{0}' does not name a sequence in the graph")]
    UnknownTarget(String),

    #[error("no sequence variant of edge {edge} explains path {path} (best support {support:.3})")]
    AmbiguousResolution {
        path: String,
        edge: EdgeId,
        support: f64,
    },

    #[error("path {0} is not bounded by unique edges around a repeat")]
    UnanchoredPath(String),

    #[error("sequence '{0}' is missing from the sequence store")]
    MissingSequence(String),

    #[error("invalid FASTA input: {0}")]
    InvalidFasta(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, ResolveError>;
