/// General functions used across the project

/// Strand marker carried as the first character of an edge sequence name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    Forward,
    Reverse,
    Unmarked,
}

/// Split an edge sequence name ("+seq" / "-seq") into its strand and store key.
pub fn split_strand(name: &str) -> (Strand, &str) {
    if let Some(key) = name.strip_prefix('+') {
        (Strand::Forward, key)
    } else if let Some(key) = name.strip_prefix('-') {
        (Strand::Reverse, key)
    } else {
        (Strand::Unmarked, name)
    }
}

/// Reverse-complement a nucleotide string, keeping the case of each base.
/// Anything that is not ACGT becomes N.
pub fn rev_comp(seq: &str) -> String {
    seq.chars()
        .rev()
        .map(|c| match c {
            'A' => 'T',
            'T' => 'A',
            'C' => 'G',
            'G' => 'C',
            'a' => 't',
            't' => 'a',
            'c' => 'g',
            'g' => 'c',
            'n' => 'n',
            _ => 'N',
        })
        .collect()
}
