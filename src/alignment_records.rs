/// Alignment records
/// The aligner output is reduced to (barcode, target, position) tuples before it reaches the graph.
/// Reads carry their barcode as a '#' suffix of the read name, targets are edge sequences named
/// "<prefix>_<edge id>_<sequence index>".

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::configs::IngestConfig;
use crate::error::Result;
use crate::repeat_graph::EdgeId;

/// One aligned read, reduced to what barcode scoring needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentRecord {
    pub barcode: String,
    pub target: String,
    /// 1-based leftmost position on the target
    pub position: u64,
}

impl AlignmentRecord {

    /// Parse a SAM alignment line. Returns None for header lines, unmapped reads,
    /// reads without a barcode suffix and lines with too few fields.
    pub fn from_sam_line(line: &str) -> Option<Self> {
        if line.starts_with('@') {
            return None;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 4 {
            return None;
        }

        let query_name = fields[0];
        let target = fields[2];
        if target == "*" {
            return None;
        }
        let (_, barcode) = query_name.split_once('#')?;
        // mate suffixes like "/1" are not part of the barcode
        let barcode = barcode.split('/').next().unwrap_or(barcode);
        if barcode.is_empty() {
            return None;
        }

        Some(Self {
            barcode: barcode.to_string(),
            target: target.to_string(),
            position: fields[3].parse().ok()?,
        })
    }

    /// Edge id and sequence index encoded in the target name
    pub fn target_slot(&self) -> Option<(EdgeId, usize)> {
        let mut parts = self.target.rsplitn(3, '_');
        let seq_index = parts.next()?.parse().ok()?;
        let edge_id = parts.next()?.parse().ok()?;
        // the prefix must be present
        parts.next()?;
        Some((edge_id, seq_index))
    }
}

/// Counters collected while reading alignments
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReadStats {
    pub lines: usize,
    pub headers: usize,
    pub records: usize,
    pub skipped: usize,
}

/// Read all usable records from a SAM file
pub fn read_sam_records<P: AsRef<Path>>(path: P) -> Result<(Vec<AlignmentRecord>, ReadStats)> {
    let reader = BufReader::new(File::open(path)?);
    parse_sam(reader)
}

pub fn parse_sam<R: BufRead>(reader: R) -> Result<(Vec<AlignmentRecord>, ReadStats)> {
    let mut stats = ReadStats::default();
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        stats.lines += 1;

        if line.starts_with('@') {
            stats.headers += 1;
            continue;
        }
        match AlignmentRecord::from_sam_line(&line) {
            Some(record) => {
                stats.records += 1;
                records.push(record);
            }
            None => stats.skipped += 1,
        }
    }

    info!(
        "read {} alignment records ({} header lines, {} skipped)",
        stats.records, stats.headers, stats.skipped
    );
    Ok((records, stats))
}

/// Serialize records to a binary file
pub fn serialize_records<P: AsRef<Path>>(path: P, records: &[AlignmentRecord]) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, records)?;
    Ok(())
}

pub fn deserialize_records<P: AsRef<Path>>(path: P) -> Result<Vec<AlignmentRecord>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

/// Reduce a SAM file to a record file for later `resolve` runs
pub fn run_ingest(config: &IngestConfig) -> Result<ReadStats> {
    info!("=== ALIGNMENT INGESTION ===");
    let (records, stats) = read_sam_records(&config.sam)?;
    serialize_records(&config.output_records, &records)?;
    info!("{} records written to {}", records.len(), config.output_records);
    Ok(stats)
}
