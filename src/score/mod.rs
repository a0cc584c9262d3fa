//! Scoring-model discovery and the per-model `plink2 --score` plan.
//!
//! [`ScorePlan`] is pure data: it turns discovered model files into
//! [`ScoreInvocation`] records. Writing the driver script is the job of
//! [`script`].

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{PipelineError, Result};

pub mod script;

pub use script::{SCRIPT_FILE_NAME, render_script, write_script};

pub const MODEL_EXTENSION: &str = "par";
pub const SCORE_OUTPUT_EXTENSION: &str = "sscore";

/// Positional columns of a model file: variant ID, allele, weight.
const SCORE_COLUMNS: [&str; 3] = ["1", "2", "4"];
const SCORE_MODIFIERS: [&str; 3] = ["header", "cols=+scoresums", "no-mean-imputation"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreModel {
    pub path: PathBuf,
    /// Model file name with the extension stripped; names the output files.
    pub output_name: String,
}

/// Lists `*.par` files in `dir`, sorted by file name. A directory that does
/// not exist holds no models.
pub fn discover_models(dir: &Path) -> Result<Vec<ScoreModel>> {
    if !dir.is_dir() {
        return Err(no_models(dir));
    }
    let mut models = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|s| s.to_str()) != Some(MODEL_EXTENSION) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        models.push(ScoreModel {
            output_name: stem.to_string(),
            path,
        });
    }
    models.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

    if models.is_empty() {
        return Err(no_models(dir));
    }
    info!(dir = %dir.display(), models = models.len(), "score models discovered");
    Ok(models)
}

fn no_models(dir: &Path) -> PipelineError {
    PipelineError::NoModelFilesFound {
        dir: dir.to_path_buf(),
        extension: MODEL_EXTENSION.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreInvocation {
    pub model: String,
    pub executable: String,
    pub args: Vec<String>,
    /// `--out` prefix; plink2 appends `.sscore`.
    pub output: String,
}

#[derive(Debug, Clone)]
pub struct ScorePlan {
    executable: String,
    models: Vec<ScoreModel>,
}

impl ScorePlan {
    pub fn new(executable: impl Into<String>, models: Vec<ScoreModel>, dir: &Path) -> Result<Self> {
        if models.is_empty() {
            return Err(no_models(dir));
        }
        Ok(Self {
            executable: executable.into(),
            models,
        })
    }

    pub fn discover(executable: impl Into<String>, dir: &Path) -> Result<Self> {
        let models = discover_models(dir)?;
        Self::new(executable, models, dir)
    }

    pub fn models(&self) -> &[ScoreModel] {
        &self.models
    }

    pub fn invocations(&self, input_prefix: &str, output_dir: &str) -> Vec<ScoreInvocation> {
        self.models
            .iter()
            .map(|model| {
                let output = format!("{}/{}", output_dir, model.output_name);
                let mut args = vec![
                    "--bfile".to_string(),
                    input_prefix.to_string(),
                    "--out".to_string(),
                    output.clone(),
                    "--score".to_string(),
                    model.path.to_string_lossy().to_string(),
                ];
                args.extend(SCORE_COLUMNS.iter().map(|s| s.to_string()));
                args.extend(SCORE_MODIFIERS.iter().map(|s| s.to_string()));
                ScoreInvocation {
                    model: model.output_name.clone(),
                    executable: self.executable.clone(),
                    args,
                    output,
                }
            })
            .collect()
    }
}
