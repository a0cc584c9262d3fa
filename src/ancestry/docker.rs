use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::ancestry::{
    AncestryEstimator, AncestryInput, AncestryOutcome, ESTIMATOR_DIR, ESTIMATOR_SCRIPT,
};
use crate::error::{PipelineError, Result};
use crate::tool::{CommandRunner, ToolCommand};

const CONTAINER_WORKDIR: &str = "/app";

/// Runs `iAdmix/runancestry.py` inside a container with the working
/// directory mounted at `/app`.
pub struct DockerAncestry {
    docker: String,
    image: String,
    runner: Arc<dyn CommandRunner>,
}

impl DockerAncestry {
    pub fn new(
        docker: impl Into<String>,
        image: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            docker: docker.into(),
            image: image.into(),
            runner,
        }
    }

    pub fn command(&self, input: &AncestryInput) -> ToolCommand {
        let script = format!(
            "cd {} && ./{} --freq ../{} --geno ../{} --out ../{} -c 4 --strand 1 --pr 0",
            ESTIMATOR_DIR,
            ESTIMATOR_SCRIPT,
            file_name(&input.reference),
            file_name(&input.genotypes),
            file_name(&input.output),
        );
        let mut cmd = ToolCommand::new("ancestry", self.docker.clone())
            .args(["run", "--ulimit", "core=-1", "--rm"]);
        if let Some(user) = owner_of(&input.workdir) {
            cmd = cmd.arg("--user").arg(user);
        }
        cmd = cmd
            .arg("-v")
            .arg(format!("{}:{}", input.workdir.display(), CONTAINER_WORKDIR))
            .args(["-w", CONTAINER_WORKDIR])
            .arg(self.image.clone())
            .args(["bash", "-lc"])
            .arg(script);
        if let Some(dir) = &input.log_dir {
            cmd = cmd.log_to(dir);
        }
        cmd
    }
}

impl AncestryEstimator for DockerAncestry {
    fn run(&self, input: &AncestryInput) -> Result<AncestryOutcome> {
        let estimator = input.workdir.join(ESTIMATOR_DIR).join(ESTIMATOR_SCRIPT);
        if !estimator.exists() {
            return Ok(AncestryOutcome::Unavailable {
                reason: format!("estimator not installed at {}", estimator.display()),
            });
        }
        if !input.reference.exists() {
            return Ok(AncestryOutcome::Unavailable {
                reason: format!("reference frequencies missing at {}", input.reference.display()),
            });
        }
        if !input.genotypes.exists() {
            return Err(PipelineError::input_not_found(&input.genotypes));
        }

        match self.runner.run(&self.command(input)) {
            Ok(_) => {}
            Err(PipelineError::Launch { tool, source }) => {
                warn!(tool = %tool, error = %source, "container runtime not available");
                return Ok(AncestryOutcome::Unavailable {
                    reason: format!("{} could not be launched: {}", tool, source),
                });
            }
            Err(err) => return Err(err),
        }

        if !input.output.exists() {
            return Err(PipelineError::ArtifactNotProduced {
                stage: "ancestry".to_string(),
                path: input.output.clone(),
            });
        }
        Ok(AncestryOutcome::Completed {
            output: input.output.clone(),
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(unix)]
fn owner_of(dir: &Path) -> Option<String> {
    use std::os::unix::fs::MetadataExt;
    let md = std::fs::metadata(dir).ok()?;
    Some(format!("{}:{}", md.uid(), md.gid()))
}

#[cfg(not(unix))]
fn owner_of(_dir: &Path) -> Option<String> {
    None
}
