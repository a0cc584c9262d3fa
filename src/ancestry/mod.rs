//! Ancestry estimation hand-off.
//!
//! The estimator is external and its runtime may be absent, so it sits
//! behind [`AncestryEstimator`]: a run either completes, reports itself
//! unavailable, or fails with an error. Only the last one is a failure.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{PipelineError, Result};

pub mod docker;

pub use docker::DockerAncestry;

pub const HANDOFF_FILE_NAME: &str = "individual_genotypes2.input";
pub const STRIPPED_FILE_NAME: &str = "individual_genotypes2_nochr.input";
pub const REFERENCE_FILE_NAME: &str = "pop_all_ref_final2.input";
pub const OUTPUT_FILE_NAME: &str = "sample2.ancestry";
pub const ESTIMATOR_DIR: &str = "iAdmix";
pub const ESTIMATOR_SCRIPT: &str = "runancestry.py";

const CHROM_PREFIX: &str = "chr";

#[derive(Debug, Clone)]
pub struct AncestryInput {
    /// Working directory shared with the estimator.
    pub workdir: PathBuf,
    pub genotypes: PathBuf,
    pub reference: PathBuf,
    pub output: PathBuf,
    pub log_dir: Option<PathBuf>,
}

impl AncestryInput {
    pub fn in_dir(workdir: &Path) -> Self {
        Self {
            workdir: workdir.to_path_buf(),
            genotypes: workdir.join(STRIPPED_FILE_NAME),
            reference: workdir.join(REFERENCE_FILE_NAME),
            output: workdir.join(OUTPUT_FILE_NAME),
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AncestryOutcome {
    Completed { output: PathBuf },
    Unavailable { reason: String },
}

pub trait AncestryEstimator: Send + Sync {
    fn run(&self, input: &AncestryInput) -> Result<AncestryOutcome>;
}

/// Copies the genotype table into the shared hand-off location and writes
/// the chromosome-stripped copy the estimator reads.
pub fn hand_off(genotypes: &Path, handoff: &Path, stripped: &Path) -> Result<usize> {
    if !genotypes.exists() {
        return Err(PipelineError::input_not_found(genotypes));
    }
    if let Some(parent) = handoff.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(genotypes, handoff)?;
    info!(from = %genotypes.display(), to = %handoff.display(), "genotype table handed off");
    strip_chr_prefix(handoff, stripped)
}

/// Removes a leading `chr` from every line except the header. Returns the
/// number of rows changed.
pub fn strip_chr_prefix(src: &Path, dst: &Path) -> Result<usize> {
    let reader = BufReader::new(File::open(src)?);
    let mut w = BufWriter::new(File::create(dst)?);
    let mut stripped = 0usize;
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        match line.strip_prefix(CHROM_PREFIX) {
            Some(rest) if idx > 0 => {
                stripped += 1;
                writeln!(w, "{}", rest)?;
            }
            _ => writeln!(w, "{}", line)?,
        }
    }
    w.flush()?;
    Ok(stripped)
}
