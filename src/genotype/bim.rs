use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::genotype::VariantRecord;

#[derive(Debug, Clone, Default)]
pub struct VariantMetadata {
    pub records: Vec<VariantRecord>,
    pub skipped_lines: usize,
}

/// Reads a headerless six-column `.bim` table. Lines that do not parse,
/// including lines that are not valid UTF-8, are counted and skipped.
pub fn read_variant_metadata(path: &Path) -> Result<VariantMetadata> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut md = VariantMetadata::default();
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    while reader.read_until(b'\n', &mut buf)? > 0 {
        line_no += 1;
        let Ok(line) = std::str::from_utf8(&buf) else {
            debug!(bim = %path.display(), line = line_no, "skipping non-UTF-8 bim line");
            md.skipped_lines += 1;
            buf.clear();
            continue;
        };
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            buf.clear();
            continue;
        }
        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        let pos = parts.get(3).and_then(|p| p.parse::<u64>().ok());
        match (parts.len(), pos) {
            (6, Some(pos)) => md.records.push(VariantRecord {
                chrom: parts[0].to_string(),
                id: parts[1].to_string(),
                cm: parts[2].to_string(),
                pos,
                allele1: parts[4].to_string(),
                allele2: parts[5].to_string(),
            }),
            _ => {
                debug!(bim = %path.display(), line = line_no, "skipping malformed bim line");
                md.skipped_lines += 1;
            }
        }
        buf.clear();
    }
    Ok(md)
}
