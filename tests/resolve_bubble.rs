use std::fs;
use std::path::Path;

use barbridge::alignment_records::{AlignmentRecord, deserialize_records, run_ingest};
use barbridge::barcode_scoring::ingest_records;
use barbridge::configs::{AlignmentSource, IngestConfig, ResolveConfig, ResolveRunConfig, StatsConfig};
use barbridge::graph_analysis::run_stats;
use barbridge::graph_io::{EDGES_FASTA_FILE, GRAPH_DUMP_FILE, GRAPH_DOT_FILE};
use barbridge::repeat_graph::{RepeatGraph, SequenceStore};
use barbridge::solve_repeat::{resolve_repeats, run_resolve};
use barbridge::subgraph::export_subgraphs;
use tempfile::TempDir;

/// A -> R -> B -> C with R repetitive (two copies), plus the reverse strand.
/// Forward nodes are 0..4, reverse nodes 5..9.
const DUMP: &str = "\
Edge\t0\t0\t1\t0\t0\t0\t20\t-1
\tSequence\t+edge_1_0 8 * 0 0 0
Edge\t1\t6\t5\t0\t0\t0\t20\t-1
\tSequence\t-edge_1_0 8 * 0 0 0
Edge\t2\t1\t2\t1\t0\t0\t40\t-1
\tSequence\t+edge_2_0 6 * 0 0 0
\tSequence\t+edge_2_1 6 * 0 0 0
Edge\t3\t7\t6\t1\t0\t0\t40\t-1
\tSequence\t-edge_2_0 6 * 0 0 0
\tSequence\t-edge_2_1 6 * 0 0 0
Edge\t4\t2\t3\t0\t0\t0\t20\t-1
\tSequence\t+edge_3_0 8 * 0 0 0
Edge\t5\t8\t7\t0\t0\t0\t20\t-1
\tSequence\t-edge_3_0 8 * 0 0 0
Edge\t6\t3\t4\t0\t0\t0\t20\t-1
\tSequence\t+edge_4_0 8 * 0 0 0
Edge\t7\t9\t8\t0\t0\t0\t20\t-1
\tSequence\t-edge_4_0 8 * 0 0 0
";

const FASTA: &str = "\
>edge_1_0
AAAAAAAA
>edge_2_0
CCCGGG
>edge_2_1
CCCTTT
>edge_3_0
GGGGGGGG
>edge_4_0
TTTTTTTT
";

fn write_assembly(dir: &Path) {
    fs::write(dir.join(GRAPH_DUMP_FILE), DUMP).unwrap();
    fs::write(dir.join(EDGES_FASTA_FILE), FASTA).unwrap();
}

fn sam_line(read: usize, barcode: &str, target: &str) -> String {
    format!("r{}#{}\t0\t{}\t1\t60\t6M\t*\t0\t0\tACGTAC\tIIIIII\n", read, barcode, target)
}

/// Ten barcodes on both anchors, `on_first_copy` of them also on the first repeat copy
/// and the rest on the second one
fn write_sam(path: &Path, on_first_copy: usize) {
    let mut sam = String::from("@HD\tVN:1.6\n");
    let mut read = 0;
    for b in 0..10 {
        let barcode = format!("b{}", b);
        let copy = if b < on_first_copy { "edge_2_0" } else { "edge_2_1" };
        for target in ["edge_1_0", copy, "edge_3_0"] {
            sam.push_str(&sam_line(read, &barcode, target));
            read += 1;
        }
    }
    fs::write(path, sam).unwrap();
}

fn run_config(asm: &Path, alignments: AlignmentSource, out: &Path, excise: bool) -> ResolveRunConfig {
    ResolveRunConfig {
        assembly_dir: asm.display().to_string(),
        alignments,
        out_dir: out.display().to_string(),
        subgraph_dot: false,
        resolve: ResolveConfig {
            min_path_barcodes: 5,
            excise_resolved: excise,
            ..Default::default()
        },
    }
}

#[test]
fn bubble_is_resolved_with_the_supported_copy() {
    let tmp = TempDir::new().unwrap();
    write_assembly(tmp.path());
    let sam = tmp.path().join("reads.sam");
    write_sam(&sam, 9);
    let out = tmp.path().join("out");

    let config = run_config(tmp.path(), AlignmentSource::Sam(sam.display().to_string()), &out, false);
    let summary = run_resolve(&config).unwrap();
    assert_eq!(summary.subgraphs, 2);
    assert_eq!(summary.complement_subgraphs, 1);
    assert_eq!(summary.paths.separated_paths, 1);
    assert_eq!(summary.paths.failed_paths, 0);
    assert!(out.join(GRAPH_DOT_FILE).is_file());

    let g = RepeatGraph::load_assembly(&out).unwrap();
    let new_edge = g.edge(5).unwrap();
    assert_eq!(new_edge.sequences[0].name, "+barcode_solved_repeat_1_3");
    assert_eq!(new_edge.mean_coverage, 20);
    assert_eq!(g.edges_fasta["barcode_solved_repeat_1_3"], "CCCGGG");

    assert_eq!(g.edge(1).unwrap().node_right, new_edge.node_left);
    assert_eq!(g.edge(3).unwrap().node_left, new_edge.node_right);

    let rev = g.edge(-5).unwrap();
    assert_eq!(rev.sequences[0].name, "-barcode_solved_repeat_1_3");
    assert_eq!(g.edge(-3).unwrap().node_right, rev.node_left);
    assert_eq!(g.edge(-1).unwrap().node_left, rev.node_right);

    for id in [2, -2] {
        let repeat = g.edge(id).unwrap();
        assert!(repeat.resolved);
        assert_eq!(repeat.mean_coverage, 20);
    }
}

#[test]
fn ingested_records_give_the_same_result_and_excision_drops_repeats() {
    let tmp = TempDir::new().unwrap();
    write_assembly(tmp.path());
    let sam = tmp.path().join("reads.sam");
    write_sam(&sam, 9);

    let records = tmp.path().join("reads.bin");
    let stats = run_ingest(&IngestConfig {
        sam: sam.display().to_string(),
        output_records: records.display().to_string(),
    })
    .unwrap();
    assert_eq!(stats.records, 30);
    assert_eq!(deserialize_records(&records).unwrap().len(), 30);

    let out = tmp.path().join("out");
    let config = run_config(
        tmp.path(),
        AlignmentSource::Records(records.display().to_string()),
        &out,
        true,
    );
    let summary = run_resolve(&config).unwrap();
    assert_eq!(summary.paths.separated_paths, 1);
    assert_eq!(summary.excised_edges, 2);

    let g = RepeatGraph::load_assembly(&out).unwrap();
    assert!(!g.contains_edge(2));
    assert!(!g.contains_edge(-2));
    assert_eq!(g.edge_count(), 8);
    assert!(g.contains_edge(5));
}

#[test]
fn split_support_leaves_the_graph_as_it_was() {
    let tmp = TempDir::new().unwrap();
    write_assembly(tmp.path());
    let sam = tmp.path().join("reads.sam");
    write_sam(&sam, 5);
    let out = tmp.path().join("out");

    let config = run_config(tmp.path(), AlignmentSource::Sam(sam.display().to_string()), &out, false);
    let summary = run_resolve(&config).unwrap();
    assert_eq!(summary.paths.accepted_paths, 1);
    assert_eq!(summary.paths.separated_paths, 0);
    assert_eq!(summary.paths.failed_paths, 1);

    let input = RepeatGraph::load_assembly(tmp.path()).unwrap();
    let mut expected = Vec::new();
    input.dump_to_writer(&mut expected).unwrap();
    let written = fs::read(out.join(GRAPH_DUMP_FILE)).unwrap();
    assert_eq!(written, expected);
}

#[test]
fn subgraphs_and_stats_are_written() {
    let tmp = TempDir::new().unwrap();
    write_assembly(tmp.path());
    let g = RepeatGraph::load_assembly(tmp.path()).unwrap();

    let subg_dir = tmp.path().join("subgraphs");
    assert_eq!(export_subgraphs(&g, &subg_dir).unwrap(), 2);
    for i in 0..2 {
        assert!(subg_dir.join(format!("subg{}.gv", i)).is_file());
        let fasta = fs::read_to_string(subg_dir.join(format!("subg{}.fasta", i))).unwrap();
        assert!(fasta.contains(">edge_2_1"));
        assert!(!fasta.contains(">edge_4_0"));
    }

    let stats_dir = tmp.path().join("stats");
    run_stats(&StatsConfig {
        assembly_dir: tmp.path().display().to_string(),
        out_dir: stats_dir.display().to_string(),
    })
    .unwrap();
    assert_eq!(fs::read_to_string(stats_dir.join("sd_info.txt")).unwrap(), "[1, 1]");
    assert_eq!(fs::read_to_string(stats_dir.join("length_info.txt")).unwrap(), "[6, 6]");
}

#[test]
fn missing_assembly_files_are_reported() {
    let tmp = TempDir::new().unwrap();
    assert!(RepeatGraph::load_assembly(tmp.path()).is_err());
}

#[test]
fn long_anchors_resolve_under_default_settings() {
    // 50 kb anchors around a 1 kb repeat, forward nodes 0..3, reverse nodes 4..7
    let mut dump = String::new();
    for (uid, left, right, repetitive, names) in [
        (0, 0, 1, 0, vec!["+edge_1_0"]),
        (1, 5, 4, 0, vec!["-edge_1_0"]),
        (2, 1, 2, 1, vec!["+edge_2_0", "+edge_2_1"]),
        (3, 6, 5, 1, vec!["-edge_2_0", "-edge_2_1"]),
        (4, 2, 3, 0, vec!["+edge_3_0"]),
        (5, 7, 6, 0, vec!["-edge_3_0"]),
    ] {
        dump.push_str(&format!("Edge\t{}\t{}\t{}\t{}\t0\t0\t30\t-1\n", uid, left, right, repetitive));
        let length = if repetitive == 1 { 1_000 } else { 50_000 };
        for name in names {
            dump.push_str(&format!("\tSequence\t{} {} * 0 0 0\n", name, length));
        }
    }
    let mut store = SequenceStore::new();
    store.insert("edge_2_0".to_string(), "ACGTACGT".to_string());
    store.insert("edge_2_1".to_string(), "TTTTGGGG".to_string());
    let mut g = RepeatGraph::load_from_reader(dump.as_bytes(), store).unwrap();

    let mut records = Vec::new();
    for b in 0..200 {
        let copy = if b < 190 { "edge_2_0" } else { "edge_2_1" };
        for target in ["edge_1_0", copy, "edge_3_0"] {
            records.push(AlignmentRecord {
                barcode: format!("bc{}", b),
                target: target.to_string(),
                position: 1,
            });
        }
    }
    assert_eq!(ingest_records(&mut g, &records).applied, 600);

    let summary = resolve_repeats(&mut g, &ResolveConfig::default()).unwrap();
    assert_eq!(summary.paths.separated_paths, 1);
    assert!(g.edge(2).unwrap().resolved);
    assert!(g.edge(-2).unwrap().resolved);

    let new_edge = g.edge(4).unwrap();
    assert_eq!(new_edge.sequences[0].name, "+barcode_solved_repeat_1_3");
    assert_eq!(g.edges_fasta["barcode_solved_repeat_1_3"], "ACGTACGT");
    assert_eq!(g.edge(1).unwrap().node_right, new_edge.node_left);
    assert_eq!(g.edge(3).unwrap().node_left, new_edge.node_right);
}
