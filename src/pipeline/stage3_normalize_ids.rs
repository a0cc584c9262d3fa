use std::path::PathBuf;

use crate::ctx::{Ctx, plink_fileset};
use crate::error::Result;
use crate::pipeline::Stage;
use crate::tool::ToolCommand;

/// Rewrites every variant ID to `chr<chrom>:<pos>:<ref>:<alt>` and drops
/// duplicate IDs, keeping the first occurrence in file order.
pub struct Stage3NormalizeIds;

impl Stage3NormalizeIds {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage3NormalizeIds {
    fn name(&self) -> &'static str {
        "normalize-ids"
    }

    fn inputs(&self, ctx: &Ctx) -> Vec<PathBuf> {
        plink_fileset(&ctx.layout.import_prefix())
    }

    fn outputs(&self, ctx: &Ctx) -> Vec<PathBuf> {
        plink_fileset(&ctx.layout.normalized_prefix())
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let cmd = ToolCommand::new(self.name(), ctx.settings.plink2.clone())
            .arg("--bfile")
            .arg(ctx.layout.import_prefix())
            .args(["--set-all-var-ids", "chr@:#:$r:$a", "--make-bed", "--out"])
            .arg(ctx.layout.normalized_prefix())
            .args(["--rm-dup", "force-first", "list"])
            .args(["--new-id-max-allele-len", "10000"])
            .log_to(&ctx.layout.logs_dir);
        ctx.runner.run(&cmd)?;
        Ok(())
    }
}
