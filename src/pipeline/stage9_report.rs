use std::path::PathBuf;

use crate::ctx::{Ctx, REPORT_SCRIPT};
use crate::error::Result;
use crate::pipeline::{Stage, script_env};
use crate::tool::ToolCommand;

pub struct Stage9Report;

impl Stage9Report {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage9Report {
    fn name(&self) -> &'static str {
        "report"
    }

    fn required(&self) -> bool {
        false
    }

    fn inputs(&self, ctx: &Ctx) -> Vec<PathBuf> {
        vec![ctx.layout.report_script()]
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let script = ctx.layout.report_script();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))?;
        }
        let cmd = ToolCommand::new(self.name(), ctx.settings.bash.clone())
            .arg(REPORT_SCRIPT)
            .current_dir(&ctx.layout.scripts_dir)
            .log_to(&ctx.layout.logs_dir);
        ctx.runner.run(&script_env(cmd, ctx))?;
        Ok(())
    }
}
