//! Multi-sample runs.
//!
//! Samples run in parallel, each in its own artifact directory. The shared
//! ancestry hand-off is protected by one lock held across the exclusive
//! stages of whichever run is using it.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use tracing::info;

use crate::ctx::{Ctx, Sample, validate_sample_id};
use crate::error::{PipelineError, Result};
use crate::pipeline::{Pipeline, RunState, execute};

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub sample_id: String,
    pub state: RunState,
}

/// Reads `sample_id<TAB>vcf_path` lines. Blank lines and `#` comments are
/// ignored; relative VCF paths resolve against the manifest's directory.
pub fn read_manifest(path: &Path) -> Result<Vec<Sample>> {
    if !path.exists() {
        return Err(PipelineError::input_not_found(path));
    }
    let content = std::fs::read_to_string(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let source = path.display().to_string();

    let mut samples = Vec::new();
    let mut seen = HashSet::new();
    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = trimmed.split('\t').map(str::trim).collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(PipelineError::malformed(
                "manifest",
                format!("{}:{} expected 'sample_id<TAB>vcf_path'", source, line_no),
            ));
        }
        if let Err(err) = validate_sample_id(parts[0]) {
            return Err(PipelineError::malformed(
                "manifest",
                format!("{}:{} {}", source, line_no, err),
            ));
        }
        if !seen.insert(parts[0].to_string()) {
            return Err(PipelineError::malformed(
                "manifest",
                format!("{}:{} duplicate sample id '{}'", source, line_no, parts[0]),
            ));
        }
        let vcf = Path::new(parts[1]);
        samples.push(Sample {
            id: parts[0].to_string(),
            vcf: if vcf.is_absolute() {
                vcf.to_path_buf()
            } else {
                base.join(vcf)
            },
        });
    }
    if samples.is_empty() {
        return Err(PipelineError::malformed(
            "manifest",
            format!("{} lists no samples", source),
        ));
    }
    Ok(samples)
}

/// Runs the standard pipeline for every sample on `threads` workers
/// (0 = rayon's default). Results come back in manifest order.
pub fn run_batch<F>(samples: Vec<Sample>, threads: usize, make_ctx: F) -> Result<Vec<BatchResult>>
where
    F: Fn(Sample) -> Ctx + Sync,
{
    let lock = Arc::new(Mutex::new(()));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| PipelineError::Config(format!("failed to build thread pool: {}", e)))?;

    info!(samples = samples.len(), threads = pool.current_num_threads(), "batch started");
    let results = pool.install(|| {
        samples
            .into_par_iter()
            .map(|sample| {
                let mut ctx = make_ctx(sample);
                let pipeline = Pipeline::standard().with_exclusive_lock(lock.clone());
                let state = execute(&pipeline, &mut ctx);
                BatchResult {
                    sample_id: ctx.sample.id.clone(),
                    state,
                }
            })
            .collect::<Vec<_>>()
    });
    Ok(results)
}
