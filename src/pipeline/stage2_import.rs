use std::path::PathBuf;

use crate::ctx::{Ctx, plink_fileset};
use crate::error::Result;
use crate::pipeline::Stage;
use crate::tool::ToolCommand;

/// VCF to plink binary fileset. Variants without an ID get
/// `chrom:pos:allele1:allele2`.
pub struct Stage2Import;

impl Stage2Import {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage2Import {
    fn name(&self) -> &'static str {
        "import"
    }

    fn inputs(&self, ctx: &Ctx) -> Vec<PathBuf> {
        vec![ctx.sample.vcf.clone()]
    }

    fn outputs(&self, ctx: &Ctx) -> Vec<PathBuf> {
        plink_fileset(&ctx.layout.import_prefix())
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let cmd = ToolCommand::new(self.name(), ctx.settings.plink.clone())
            .arg("--vcf")
            .arg(&ctx.sample.vcf)
            .args(["--make-bed", "--set-missing-var-ids", "@:#:$1:$2", "--out"])
            .arg(ctx.layout.import_prefix())
            .arg("--allow-extra-chr")
            .log_to(&ctx.layout.logs_dir);
        ctx.runner.run(&cmd)?;
        Ok(())
    }
}
