use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::genotype::IDENTITY_COLUMNS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRow {
    pub iid: String,
    /// Counted-allele copies per variant column; `None` is a missing call.
    pub counts: Vec<Option<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableIssues {
    pub invalid_values: usize,
    pub short_rows: usize,
    pub long_rows: usize,
}

#[derive(Debug, Clone)]
pub struct AlleleCountTable {
    pub variant_columns: Vec<String>,
    pub samples: Vec<SampleRow>,
    pub issues: TableIssues,
}

enum Cell {
    Missing,
    Count(u8),
    Invalid,
}

fn parse_cell(token: &str) -> Cell {
    match token {
        "NA" => Cell::Missing,
        "0" => Cell::Count(0),
        "1" => Cell::Count(1),
        "2" => Cell::Count(2),
        _ => Cell::Invalid,
    }
}

pub fn read_allele_counts(path: &Path) -> Result<AlleleCountTable> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let source = path.display().to_string();

    let mut line = String::new();
    let mut header: Option<Vec<String>> = None;
    let mut samples = Vec::new();
    let mut issues = TableIssues::default();
    let mut line_no = 0usize;

    while reader.read_line(&mut line)? > 0 {
        line_no += 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            line.clear();
            continue;
        }

        match &header {
            None => {
                if fields.len() < IDENTITY_COLUMNS.len()
                    || fields[..IDENTITY_COLUMNS.len()] != IDENTITY_COLUMNS
                {
                    return Err(PipelineError::malformed(
                        "allele-count table",
                        format!(
                            "{}:{} header must start with {}",
                            source,
                            line_no,
                            IDENTITY_COLUMNS.join(" ")
                        ),
                    ));
                }
                header = Some(fields.iter().map(|s| s.to_string()).collect());
            }
            Some(cols) => {
                let n_variants = cols.len() - IDENTITY_COLUMNS.len();
                if fields.len() < 2 {
                    return Err(PipelineError::malformed(
                        "allele-count table",
                        format!("{}:{} row has no IID", source, line_no),
                    ));
                }
                let values = fields.get(IDENTITY_COLUMNS.len()..).unwrap_or(&[]);
                if values.len() < n_variants {
                    issues.short_rows += 1;
                } else if values.len() > n_variants {
                    issues.long_rows += 1;
                }

                let mut counts = Vec::with_capacity(n_variants);
                for i in 0..n_variants {
                    let count = match values.get(i).map(|t| parse_cell(t)) {
                        Some(Cell::Count(n)) => Some(n),
                        Some(Cell::Missing) | None => None,
                        Some(Cell::Invalid) => {
                            issues.invalid_values += 1;
                            None
                        }
                    };
                    counts.push(count);
                }
                samples.push(SampleRow {
                    iid: fields[1].to_string(),
                    counts,
                });
            }
        }
        line.clear();
    }

    let Some(header) = header else {
        return Err(PipelineError::malformed(
            "allele-count table",
            format!("{} has no header", source),
        ));
    };

    Ok(AlleleCountTable {
        variant_columns: header[IDENTITY_COLUMNS.len()..].to_vec(),
        samples,
        issues,
    })
}
