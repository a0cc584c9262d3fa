use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::ctx::{Ctx, Sample, SampleMeta, StageRecord};
use crate::error::{PipelineError, Result};
use crate::pipeline::RunState;

#[derive(Debug, Clone, Serialize)]
struct ToolMeta {
    name: String,
    version: String,
}

#[derive(Debug, Clone, Serialize)]
struct ConversionMeta {
    samples: usize,
    input_variants: usize,
    output_variants: usize,
    metadata_loaded: bool,
    matched_variants: Option<usize>,
    unmatched_variants: Option<usize>,
    unmatched_policy: String,
    invalid_values: usize,
}

#[derive(Debug, Clone, Serialize)]
struct RunReport<'a> {
    tool: ToolMeta,
    sample: &'a Sample,
    meta: &'a SampleMeta,
    #[serde(flatten)]
    state: &'a RunState,
    stages: &'a [StageRecord],
    score_models: Vec<String>,
    score_outputs: Vec<String>,
    conversion: Option<ConversionMeta>,
    ancestry_result: Option<String>,
    warnings: &'a [String],
}

pub fn write_run_report(ctx: &Ctx, state: &RunState, path: &Path) -> Result<()> {
    let report = RunReport {
        tool: ToolMeta {
            name: "kira-prs".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        sample: &ctx.sample,
        meta: &ctx.meta,
        state,
        stages: &ctx.stages,
        score_models: ctx
            .score_plan
            .as_ref()
            .map(|p| p.models().iter().map(|m| m.output_name.clone()).collect())
            .unwrap_or_default(),
        score_outputs: ctx
            .score_outputs
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
        conversion: ctx.conversion.as_ref().map(|c| ConversionMeta {
            samples: c.samples(),
            input_variants: c.input_variants,
            output_variants: c.output_variants,
            metadata_loaded: c.metadata_loaded,
            matched_variants: c.join.as_ref().map(|j| j.matched),
            unmatched_variants: c.join.as_ref().map(|j| j.unmatched.len()),
            unmatched_policy: c.policy.as_str().to_string(),
            invalid_values: c.issues.invalid_values,
        }),
        ancestry_result: ctx.ancestry_result.as_ref().map(|p| p.display().to_string()),
        warnings: &ctx.warnings,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &report)
        .map_err(|e| PipelineError::Io(std::io::Error::other(e)))?;
    Ok(())
}
