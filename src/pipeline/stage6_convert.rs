use std::path::PathBuf;

use tracing::info;

use crate::ancestry;
use crate::ctx::Ctx;
use crate::error::Result;
use crate::genotype::{self, ConvertRequest};
use crate::pipeline::Stage;

/// Builds the per-sample genotype table and hands it off to the shared
/// ancestry directory.
pub struct Stage6Convert;

impl Stage6Convert {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage6Convert {
    fn name(&self) -> &'static str {
        "convert"
    }

    fn exclusive(&self) -> bool {
        true
    }

    fn inputs(&self, ctx: &Ctx) -> Vec<PathBuf> {
        vec![ctx.layout.recode_raw()]
    }

    fn outputs(&self, ctx: &Ctx) -> Vec<PathBuf> {
        vec![
            ctx.layout.genotype_table(),
            ctx.layout.conversion_summary(),
            ctx.layout.handoff_input(),
            ctx.layout.handoff_stripped(),
        ]
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let raw = ctx.layout.recode_raw();
        let bim = ctx.layout.normalized_bim();
        let output = ctx.layout.genotype_table();
        let summary_path = ctx.layout.conversion_summary();
        let summary = genotype::convert(&ConvertRequest {
            raw: &raw,
            metadata: Some(&bim),
            output: &output,
            summary: &summary_path,
            policy: ctx.settings.unmatched,
        })?;

        let metadata_loaded = summary.metadata_loaded;
        ctx.warnings.extend(summary.warnings.iter().cloned());
        ctx.conversion = Some(summary);
        if !metadata_loaded {
            ctx.degrade(format!(
                "variant metadata {} unavailable; converted with raw column names",
                bim.display()
            ));
        }

        let stripped = ancestry::hand_off(
            &output,
            &ctx.layout.handoff_input(),
            &ctx.layout.handoff_stripped(),
        )?;
        info!(
            handoff = %ctx.layout.handoff_input().display(),
            stripped_rows = stripped,
            "ancestry input ready"
        );
        Ok(())
    }
}
