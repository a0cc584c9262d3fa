//! Allele-count table (`plink --recode A` output) to the per-sample genotype
//! table consumed by the ancestry estimator.
//!
//! Output layout: a header `IID<TAB>variant...` followed by one row per sample,
//! in input order. Missing calls become `NA`, called genotypes their allele
//! count. The optional variant metadata (`.bim`) only decides which columns
//! are considered matched; column names are always written verbatim.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{PipelineError, Result};

pub mod bim;
pub mod raw;
pub mod writer;

pub use bim::{VariantMetadata, read_variant_metadata};
pub use raw::{AlleleCountTable, SampleRow, TableIssues, read_allele_counts};
pub use writer::{render_genotype_table, write_genotype_table, write_summary};

pub const IDENTITY_COLUMNS: [&str; 6] = ["FID", "IID", "PAT", "MAT", "SEX", "PHENOTYPE"];
pub const MISSING: &str = "NA";

/// What to do with allele-count columns that have no metadata record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnmatchedPolicy {
    #[default]
    PassThrough,
    Drop,
}

impl UnmatchedPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnmatchedPolicy::PassThrough => "pass-through",
            UnmatchedPolicy::Drop => "drop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRecord {
    pub chrom: String,
    pub id: String,
    pub cm: String,
    pub pos: u64,
    pub allele1: String,
    pub allele2: String,
}

impl VariantRecord {
    /// Name plink gives this variant's column in a `--recode A` table.
    pub fn column_key(&self) -> String {
        format!("{}_{}", self.id, self.allele1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinReport {
    pub matched: usize,
    pub unmatched: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GenotypeTable {
    pub columns: Vec<String>,
    pub rows: Vec<SampleRow>,
}

/// Correlates table columns with metadata records and applies `policy` to
/// the columns that found no record.
pub fn join_metadata(
    table: AlleleCountTable,
    metadata: Option<&[VariantRecord]>,
    policy: UnmatchedPolicy,
) -> (GenotypeTable, Option<JoinReport>) {
    let Some(records) = metadata else {
        return (
            GenotypeTable {
                columns: table.variant_columns,
                rows: table.samples,
            },
            None,
        );
    };

    let keys: HashSet<String> = records.iter().map(VariantRecord::column_key).collect();
    let keep: Vec<bool> = table
        .variant_columns
        .iter()
        .map(|c| keys.contains(c))
        .collect();

    let mut report = JoinReport::default();
    for (col, matched) in table.variant_columns.iter().zip(&keep) {
        if *matched {
            report.matched += 1;
        } else {
            report.unmatched.push(col.clone());
        }
    }

    if policy == UnmatchedPolicy::PassThrough || report.unmatched.is_empty() {
        return (
            GenotypeTable {
                columns: table.variant_columns,
                rows: table.samples,
            },
            Some(report),
        );
    }

    let columns = select(&table.variant_columns, &keep);
    let rows = table
        .samples
        .into_iter()
        .map(|row| SampleRow {
            counts: select(&row.counts, &keep),
            iid: row.iid,
        })
        .collect();
    (GenotypeTable { columns, rows }, Some(report))
}

fn select<T: Clone>(values: &[T], keep: &[bool]) -> Vec<T> {
    values
        .iter()
        .zip(keep)
        .filter(|(_, k)| **k)
        .map(|(v, _)| v.clone())
        .collect()
}

#[derive(Debug, Clone)]
pub struct ConvertRequest<'a> {
    pub raw: &'a Path,
    pub metadata: Option<&'a Path>,
    pub output: &'a Path,
    pub summary: &'a Path,
    pub policy: UnmatchedPolicy,
}

#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub raw_path: PathBuf,
    pub metadata_path: Option<PathBuf>,
    pub metadata_loaded: bool,
    pub metadata_skipped_lines: usize,
    pub output_path: PathBuf,
    pub policy: UnmatchedPolicy,
    pub input_variants: usize,
    pub output_variants: usize,
    pub sample_ids: Vec<String>,
    pub join: Option<JoinReport>,
    pub issues: TableIssues,
    pub warnings: Vec<String>,
}

impl ConversionSummary {
    pub fn samples(&self) -> usize {
        self.sample_ids.len()
    }
}

/// Reads, joins and writes. Only a missing allele-count table (or one without
/// the identity prefix) is an error; everything else is recorded as a warning.
pub fn convert(req: &ConvertRequest<'_>) -> Result<ConversionSummary> {
    if !req.raw.exists() {
        return Err(PipelineError::input_not_found(req.raw));
    }
    let table = read_allele_counts(req.raw)?;
    let input_variants = table.variant_columns.len();
    let issues = table.issues.clone();
    info!(
        raw = %req.raw.display(),
        samples = table.samples.len(),
        variants = input_variants,
        "allele-count table loaded"
    );

    let mut warnings = Vec::new();
    let metadata = match req.metadata {
        Some(path) if path.exists() => match read_variant_metadata(path) {
            Ok(md) => {
                info!(bim = %path.display(), records = md.records.len(), "variant metadata loaded");
                Some(md)
            }
            Err(err) => {
                warnings.push(format!(
                    "variant metadata unreadable at {}: {}; using raw column names",
                    path.display(),
                    err
                ));
                None
            }
        },
        Some(path) => {
            warnings.push(format!(
                "variant metadata not found at {}; using raw column names",
                path.display()
            ));
            None
        }
        None => {
            warnings.push("no variant metadata given; using raw column names".to_string());
            None
        }
    };
    let metadata_skipped_lines = metadata.as_ref().map_or(0, |m| m.skipped_lines);
    if metadata_skipped_lines > 0 {
        warnings.push(format!(
            "{} malformed variant metadata line(s) ignored",
            metadata_skipped_lines
        ));
    }

    let (genotypes, join) = join_metadata(
        table,
        metadata.as_ref().map(|m| m.records.as_slice()),
        req.policy,
    );
    if let Some(join) = &join {
        if !join.unmatched.is_empty() {
            warnings.push(format!(
                "{} of {} variant column(s) have no metadata record ({})",
                join.unmatched.len(),
                input_variants,
                req.policy.as_str()
            ));
        }
    }
    if issues.invalid_values > 0 {
        warnings.push(format!(
            "{} genotype value(s) outside {{NA,0,1,2}} written as NA",
            issues.invalid_values
        ));
    }
    if issues.short_rows > 0 || issues.long_rows > 0 {
        warnings.push(format!(
            "{} short row(s) padded with NA, {} long row(s) truncated",
            issues.short_rows, issues.long_rows
        ));
    }
    for w in &warnings {
        warn!(raw = %req.raw.display(), "{}", w);
    }

    write_genotype_table(req.output, &genotypes)?;

    let summary = ConversionSummary {
        raw_path: req.raw.to_path_buf(),
        metadata_path: req.metadata.map(Path::to_path_buf),
        metadata_loaded: metadata.is_some(),
        metadata_skipped_lines,
        output_path: req.output.to_path_buf(),
        policy: req.policy,
        input_variants,
        output_variants: genotypes.columns.len(),
        sample_ids: genotypes.rows.iter().map(|r| r.iid.clone()).collect(),
        join,
        issues,
        warnings,
    };
    write_summary(req.summary, &summary)?;
    info!(
        output = %req.output.display(),
        samples = summary.samples(),
        variants = summary.output_variants,
        "genotype table written"
    );
    Ok(summary)
}
