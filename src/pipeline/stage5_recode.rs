use std::path::PathBuf;

use crate::ctx::{Ctx, plink_fileset};
use crate::error::Result;
use crate::pipeline::Stage;
use crate::tool::ToolCommand;

/// Exports the normalized fileset as an additive allele-count table.
pub struct Stage5Recode;

impl Stage5Recode {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage5Recode {
    fn name(&self) -> &'static str {
        "recode"
    }

    fn inputs(&self, ctx: &Ctx) -> Vec<PathBuf> {
        plink_fileset(&ctx.layout.normalized_prefix())
    }

    fn outputs(&self, ctx: &Ctx) -> Vec<PathBuf> {
        vec![ctx.layout.recode_raw()]
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let cmd = ToolCommand::new(self.name(), ctx.settings.plink.clone())
            .arg("--bfile")
            .arg(ctx.layout.normalized_prefix())
            .args(["--recode", "A", "--out"])
            .arg(ctx.layout.recode_prefix())
            .arg("--allow-extra-chr")
            .log_to(&ctx.layout.logs_dir);
        ctx.runner.run(&cmd)?;
        Ok(())
    }
}
