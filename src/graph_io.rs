/// Graph and sequence store input/output
/// - repeat graph dump (line based "Edge" / "Sequence" records, unsigned edge ids)
/// - FASTA sequence store
/// - DOT projection for visualization, rendering is left to external tools

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{ResolveError, Result};
use crate::repeat_graph::{Edge, EdgeId, EdgeSequence, NodeId, RepeatGraph, SequenceStore};

pub const GRAPH_DUMP_FILE: &str = "repeat_graph_dump";
pub const EDGES_FASTA_FILE: &str = "repeat_graph_edges.fasta";
pub const GRAPH_DOT_FILE: &str = "repeat_graph.gv";

/// Signed edge id -> unsigned dump id: 1 -> 0, -1 -> 1, 2 -> 2, -2 -> 3, ...
/// None for id 0 and for ids whose dump id does not fit a u64.
pub fn to_unsigned_id(signed_id: EdgeId) -> Option<u64> {
    if signed_id == 0 {
        return None;
    }
    let unsigned_id = signed_id.unsigned_abs().checked_mul(2)? - 2;
    Some(unsigned_id + u64::from(signed_id < 0))
}

/// Unsigned dump id -> signed edge id, inverse of `to_unsigned_id`.
/// None when the id magnitude does not fit an `EdgeId`.
pub fn to_signed_id(unsigned_id: u64) -> Option<EdgeId> {
    let magnitude = EdgeId::try_from(unsigned_id / 2).ok()?.checked_add(1)?;
    if unsigned_id % 2 == 1 {
        Some(-magnitude)
    } else {
        Some(magnitude)
    }
}

fn parse_field<T: std::str::FromStr>(token: &str, field: &str, line: usize) -> Result<T> {
    token.parse::<T>().map_err(|_| ResolveError::MalformedLine {
        line,
        reason: format!("invalid {} '{}'", field, token),
    })
}

fn parse_flag(token: &str, field: &str, line: usize) -> Result<bool> {
    match token {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(ResolveError::MalformedLine {
            line,
            reason: format!("invalid {} flag '{}'", field, token),
        }),
    }
}

impl RepeatGraph {

    /// Load the graph dump and edge sequences of an assembly directory
    pub fn load_assembly<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let dump = dir.join(GRAPH_DUMP_FILE);
        let fasta = dir.join(EDGES_FASTA_FILE);
        // check that the assembly directory has everything
        for file in [&dump, &fasta] {
            if !file.is_file() {
                return Err(ResolveError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("missing assembly file {}", file.display()),
                )));
            }
        }

        let edges_fasta = load_fasta(&fasta)?;
        debug!("loaded {} edge sequences", edges_fasta.len());
        Self::load_from_file(&dump, edges_fasta)
    }

    /// Write dump, sequence store and DOT projection into `out_dir`
    pub fn output_all<P: AsRef<Path>>(&self, out_dir: P) -> Result<()> {
        let out_dir = out_dir.as_ref();
        self.dump_to_file(out_dir.join(GRAPH_DUMP_FILE))?;
        write_fasta(
            out_dir.join(EDGES_FASTA_FILE),
            self.edges_fasta.iter().map(|(name, seq)| (name.as_str(), seq.as_str())),
        )?;
        self.write_dot(out_dir.join(GRAPH_DOT_FILE))?;
        debug!("graph written to {}", out_dir.display());
        Ok(())
    }

    /// Load a graph dump from a file, sequences are looked up in `edges_fasta`
    pub fn load_from_file<P: AsRef<Path>>(path: P, edges_fasta: SequenceStore) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Self::load_from_reader(reader, edges_fasta)
    }

    /// Parse a graph dump. Any unparsable line fails the whole load.
    pub fn load_from_reader<R: BufRead>(reader: R, edges_fasta: SequenceStore) -> Result<Self> {
        let mut graph = RepeatGraph::new(edges_fasta);
        let mut id_to_node: HashMap<u64, NodeId> = HashMap::new();
        let mut cur_edge: Option<EdgeId> = None;

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = i + 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();

            // skip blank lines
            let Some(&kind) = tokens.first() else {
                continue;
            };

            match kind {
                "Edge" => {
                    if tokens.len() != 9 {
                        return Err(ResolveError::MalformedLine {
                            line: line_no,
                            reason: format!("expected 8 Edge fields, found {}", tokens.len() - 1),
                        });
                    }
                    let unsigned_id: u64 = parse_field(tokens[1], "edge id", line_no)?;
                    let left: u64 = parse_field(tokens[2], "left node", line_no)?;
                    let right: u64 = parse_field(tokens[3], "right node", line_no)?;

                    // nodes are created on first appearance
                    let left_node = *id_to_node.entry(left).or_insert_with(|| graph.add_node());
                    let right_node = *id_to_node.entry(right).or_insert_with(|| graph.add_node());

                    let signed_id = to_signed_id(unsigned_id).ok_or_else(|| ResolveError::MalformedLine {
                        line: line_no,
                        reason: format!("edge id {} is out of range", unsigned_id),
                    })?;
                    let mut edge = Edge::new(signed_id, left_node, right_node);
                    edge.repetitive = parse_flag(tokens[4], "repetitive", line_no)?;
                    edge.self_complement = parse_flag(tokens[5], "self complement", line_no)?;
                    edge.resolved = parse_flag(tokens[6], "resolved", line_no)?;
                    edge.mean_coverage = parse_field(tokens[7], "mean coverage", line_no)?;
                    edge.alt_group = parse_field(tokens[8], "alt group", line_no)?;

                    let id = edge.id;
                    graph.add_edge(edge).map_err(|e| ResolveError::MalformedLine {
                        line: line_no,
                        reason: e.to_string(),
                    })?;
                    cur_edge = Some(id);
                }
                "Sequence" => {
                    if tokens.len() != 7 {
                        return Err(ResolveError::MalformedLine {
                            line: line_no,
                            reason: format!("expected 6 Sequence fields, found {}", tokens.len() - 1),
                        });
                    }
                    let Some(edge_id) = cur_edge else {
                        return Err(ResolveError::MalformedLine {
                            line: line_no,
                            reason: "Sequence record before any Edge record".to_string(),
                        });
                    };
                    let mut seq = EdgeSequence::new(tokens[1], parse_field(tokens[2], "sequence length", line_no)?);
                    seq.orig_seq_id = tokens[3].to_string();
                    seq.orig_seq_len = parse_field(tokens[4], "origin length", line_no)?;
                    seq.orig_seq_start = parse_field(tokens[5], "origin start", line_no)?;
                    seq.orig_seq_end = parse_field(tokens[6], "origin end", line_no)?;
                    graph.edge_mut(edge_id)?.sequences.push(seq);
                }
                other => {
                    return Err(ResolveError::MalformedLine {
                        line: line_no,
                        reason: format!("unknown record type '{}'", other),
                    });
                }
            }
        }

        debug!("loaded graph with {} nodes and {} edges", graph.node_count(), graph.edge_count());
        Ok(graph)
    }

    pub fn dump_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.dump_to_writer(&mut w)?;
        w.flush()?;
        Ok(())
    }

    /// Write the graph dump. Node indices are assigned in order of first appearance,
    /// so nodes that lost all their edges are not written.
    pub fn dump_to_writer<W: Write>(&self, w: &mut W) -> Result<()> {
        let mut node_ids: HashMap<NodeId, usize> = HashMap::new();

        for edge in self.edges() {
            let unsigned_id = to_unsigned_id(edge.id).ok_or(ResolveError::InvalidEdgeId(edge.id))?;
            let next = node_ids.len();
            let left = *node_ids.entry(edge.node_left).or_insert(next);
            let next = node_ids.len();
            let right = *node_ids.entry(edge.node_right).or_insert(next);

            writeln!(
                w,
                "Edge\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                unsigned_id,
                left,
                right,
                u8::from(edge.repetitive),
                u8::from(edge.self_complement),
                u8::from(edge.resolved),
                edge.mean_coverage,
                edge.alt_group
            )?;

            for seq in &edge.sequences {
                writeln!(
                    w,
                    "\tSequence\t{} {} {} {} {} {}",
                    seq.name, seq.length, seq.orig_seq_id, seq.orig_seq_len, seq.orig_seq_start, seq.orig_seq_end
                )?;
            }
        }
        Ok(())
    }

    /// Write the graph to a DOT file, repetitive edges are drawn red
    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_dot_to(&mut w, self.edge_ids())?;
        w.flush()?;
        Ok(())
    }

    /// Write the DOT projection of a selection of edges
    pub fn write_dot_to<W: Write>(&self, w: &mut W, edge_ids: impl IntoIterator<Item = EdgeId>) -> Result<()> {
        writeln!(w, "digraph {{")?;
        writeln!(w, "nodesep = 0.5;")?;
        writeln!(w, "node [shape = circle, label = \"\", height = 0.3];")?;

        for id in edge_ids {
            let edge = self.edge(id)?;
            let color = if edge.repetitive { "red" } else { "black" };
            writeln!(
                w,
                "{} -> {} [label = \"id {}\\l{} {}x\", color = \"{}\"]",
                edge.node_left.0,
                edge.node_right.0,
                edge.id,
                edge.length(),
                edge.mean_coverage,
                color
            )?;
        }

        writeln!(w, "}}")?;
        Ok(())
    }
}

/// Load a FASTA file into a sequence store. Header names are cut at the first whitespace.
pub fn load_fasta<P: AsRef<Path>>(path: P) -> Result<SequenceStore> {
    let reader = BufReader::new(File::open(path)?);
    read_fasta(reader)
}

pub fn read_fasta<R: BufRead>(reader: R) -> Result<SequenceStore> {
    let mut store = SequenceStore::new();
    let mut name: Option<String> = None;
    let mut seq = String::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('>') {
            // flush the previous record
            if let Some(prev) = name.take() {
                store.insert(prev, std::mem::take(&mut seq));
            }
            let id = header.split_whitespace().next().ok_or_else(|| {
                ResolveError::InvalidFasta("header line without a name".to_string())
            })?;
            name = Some(id.to_string());
        } else {
            if name.is_none() {
                return Err(ResolveError::InvalidFasta(format!(
                    "expected header line starting with '>', got '{}'",
                    line
                )));
            }
            seq.push_str(line.trim());
        }
    }

    if let Some(prev) = name {
        store.insert(prev, seq);
    }
    Ok(store)
}

/// Write sequences as FASTA, one line per sequence
pub fn write_fasta<'a, P, I>(path: P, sequences: I) -> Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut w = BufWriter::new(File::create(path)?);
    for (name, seq) in sequences {
        writeln!(w, ">{}", name)?;
        writeln!(w, "{}", seq)?;
    }
    w.flush()?;
    Ok(())
}
