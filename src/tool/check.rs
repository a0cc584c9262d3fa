use crate::config::{ToolConfig, non_empty_or};
use crate::tool::{CommandRunner, ToolCommand};

/// Result of running one configured executable with `--version`.
#[derive(Debug, Clone)]
pub struct ToolCheck {
    pub name: &'static str,
    pub program: String,
    /// Required tools abort the pipeline when absent; the others only
    /// disable the ancestry and reporting steps.
    pub required: bool,
    pub outcome: Result<String, String>,
}

impl ToolCheck {
    pub fn ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

pub fn check_tools(cfg: &ToolConfig, runner: &dyn CommandRunner) -> Vec<ToolCheck> {
    let tools: [(&'static str, String, bool); 5] = [
        ("plink", non_empty_or(&cfg.plink, "plink"), true),
        ("plink2", non_empty_or(&cfg.plink2, "plink2"), true),
        ("bash", non_empty_or(&cfg.bash, "bash"), true),
        ("docker", non_empty_or(&cfg.docker, "docker"), false),
        ("python", non_empty_or(&cfg.python, "python"), false),
    ];
    tools
        .into_iter()
        .map(|(name, program, required)| {
            let cmd = ToolCommand::new(format!("{}-version", name), program.as_str())
                .arg("--version");
            let outcome = runner
                .run(&cmd)
                .map(|out| {
                    first_line(&out.stdout)
                        .or_else(|| first_line(&out.stderr))
                        .unwrap_or_default()
                })
                .map_err(|e| e.to_string());
            ToolCheck {
                name,
                program,
                required,
                outcome,
            }
        })
        .collect()
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}
