/// Parameters of the repeat resolution itself
#[derive(Debug, Clone)]
pub struct ResolveConfig {
    /// summed length of the edges a candidate path may add after its start edge
    pub max_extend_length: u64,
    /// a candidate path needs strictly more supporting barcodes than this
    pub min_path_barcodes: usize,
    /// fraction of the path barcodes the chosen repeat copy must carry (strictly more)
    pub variant_support_fraction: f64,
    /// remove resolved edges after all subgraphs are processed
    pub excise_resolved: bool,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            max_extend_length: 40_000,
            min_path_barcodes: 100,
            variant_support_fraction: 0.8,
            excise_resolved: false,
        }
    }
}

/// Where the barcode alignments come from
#[derive(Debug, Clone)]
pub enum AlignmentSource {
    Sam(String),
    Records(String),
}

pub struct IngestConfig {
    pub sam: String,
    pub output_records: String,
}

pub struct ResolveRunConfig {
    pub assembly_dir: String,
    pub alignments: AlignmentSource,
    pub out_dir: String,
    pub subgraph_dot: bool,
    pub resolve: ResolveConfig,
}

pub struct SubgraphExportConfig {
    pub assembly_dir: String,
    pub out_dir: String,
}

pub struct StatsConfig {
    pub assembly_dir: String,
    pub out_dir: String,
}
