use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::ctx::{Ctx, validate_sample_id};
use crate::error::Result;
use crate::pipeline::Stage;

pub struct Stage1Validate;

impl Stage1Validate {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage1Validate {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn inputs(&self, ctx: &Ctx) -> Vec<PathBuf> {
        vec![ctx.sample.vcf.clone()]
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        validate_sample_id(&ctx.sample.id)?;

        for dir in ctx.layout.dirs() {
            fs::create_dir_all(dir)?;
        }
        info!(
            sample = %ctx.sample.id,
            vcf = %ctx.sample.vcf.display(),
            sample_dir = %ctx.layout.sample_dir.display(),
            plink = %ctx.settings.plink,
            plink2 = %ctx.settings.plink2,
            docker = %ctx.settings.docker,
            "artifact directories ready"
        );
        Ok(())
    }
}
