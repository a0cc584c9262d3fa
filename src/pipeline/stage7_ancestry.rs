use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::ancestry::{AncestryInput, AncestryOutcome};
use crate::ctx::Ctx;
use crate::error::Result;
use crate::pipeline::Stage;

pub struct Stage7Ancestry;

impl Stage7Ancestry {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage7Ancestry {
    fn name(&self) -> &'static str {
        "ancestry"
    }

    fn required(&self) -> bool {
        false
    }

    fn exclusive(&self) -> bool {
        true
    }

    fn inputs(&self, ctx: &Ctx) -> Vec<PathBuf> {
        vec![ctx.layout.handoff_stripped()]
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let input = AncestryInput {
            workdir: ctx.layout.ancestry_dir.clone(),
            genotypes: ctx.layout.handoff_stripped(),
            reference: ctx.layout.ancestry_reference(),
            output: ctx.layout.ancestry_output(),
            log_dir: Some(ctx.layout.logs_dir.clone()),
        };
        // A previous sample's result must never be mistaken for this one's.
        if input.output.exists() {
            fs::remove_file(&input.output)?;
        }

        match ctx.ancestry.run(&input)? {
            AncestryOutcome::Completed { output } => {
                let dest = ctx.layout.sample_ancestry();
                fs::copy(&output, &dest)?;
                info!(result = %dest.display(), "ancestry estimate stored");
                ctx.ancestry_result = Some(dest);
            }
            AncestryOutcome::Unavailable { reason } => {
                ctx.degrade(format!("ancestry estimator unavailable: {}", reason));
            }
        }
        Ok(())
    }
}
