use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::ctx::{Ctx, plink_fileset};
use crate::error::Result;
use crate::pipeline::Stage;
use crate::score::{self, SCORE_OUTPUT_EXTENSION, ScorePlan};
use crate::tool::ToolCommand;

/// Synthesizes the score driver for the configured model directory and runs
/// it against the normalized fileset.
pub struct Stage4Score;

impl Stage4Score {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage4Score {
    fn name(&self) -> &'static str {
        "score"
    }

    fn inputs(&self, ctx: &Ctx) -> Vec<PathBuf> {
        plink_fileset(&ctx.layout.normalized_prefix())
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let plan = ScorePlan::discover(ctx.settings.plink2.clone(), &ctx.settings.prs_score_dir)?;
        let script = score::write_script(&plan, &ctx.layout.score_script())?;
        fs::create_dir_all(&ctx.layout.prs_dir)?;

        let cmd = ToolCommand::new(self.name(), ctx.settings.bash.clone())
            .arg(&script)
            .arg(ctx.layout.normalized_prefix())
            .arg(&ctx.layout.prs_dir)
            .log_to(&ctx.layout.logs_dir);
        ctx.runner.run(&cmd)?;

        let expected: Vec<PathBuf> = plan
            .models()
            .iter()
            .map(|m| {
                ctx.layout
                    .prs_dir
                    .join(format!("{}.{}", m.output_name, SCORE_OUTPUT_EXTENSION))
            })
            .collect();
        let (present, missing): (Vec<PathBuf>, Vec<PathBuf>) =
            expected.into_iter().partition(|p| p.exists());
        info!(
            models = plan.models().len(),
            outputs = present.len(),
            prs_dir = %ctx.layout.prs_dir.display(),
            "score driver finished"
        );

        if !missing.is_empty() {
            let names: Vec<String> = missing
                .iter()
                .filter_map(|p| p.file_name().map(|s| s.to_string_lossy().to_string()))
                .collect();
            ctx.degrade(format!(
                "{} of {} score model(s) produced no output: {}",
                missing.len(),
                plan.models().len(),
                names.join(", ")
            ));
        }
        ctx.score_outputs = present;
        ctx.score_plan = Some(plan);
        Ok(())
    }
}
