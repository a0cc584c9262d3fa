use std::path::PathBuf;

use crate::ctx::{Ctx, PARSE_SCRIPT};
use crate::error::Result;
use crate::pipeline::{Stage, script_env};
use crate::tool::ToolCommand;

pub struct Stage8ParseAncestry;

impl Stage8ParseAncestry {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage8ParseAncestry {
    fn name(&self) -> &'static str {
        "parse-ancestry"
    }

    fn required(&self) -> bool {
        false
    }

    fn inputs(&self, ctx: &Ctx) -> Vec<PathBuf> {
        vec![ctx.layout.parse_script()]
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let cmd = ToolCommand::new(self.name(), ctx.settings.python.clone())
            .arg(PARSE_SCRIPT)
            .current_dir(&ctx.layout.scripts_dir)
            .log_to(&ctx.layout.logs_dir);
        ctx.runner.run(&script_env(cmd, ctx))?;
        Ok(())
    }
}
