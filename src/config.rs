use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::genotype::UnmatchedPolicy;

pub const CONFIG_FILE_NAME: &str = ".prs_pipeline_config.json";

/// Persisted tool locations. Unknown keys are ignored and missing keys fall
/// back to their defaults, so older config files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub plink: String,
    pub plink2: String,
    pub docker: String,
    pub prs_score_dir: String,
    pub python: String,
    pub bash: String,
    pub ancestry_image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            plink: "plink".to_string(),
            plink2: "plink2".to_string(),
            docker: "docker".to_string(),
            prs_score_dir: String::new(),
            python: "python".to_string(),
            bash: "bash".to_string(),
            ancestry_image: "ancestry-py27".to_string(),
            base_dir: None,
            timeout_secs: None,
        }
    }
}

impl ToolConfig {
    /// Loads the config at `path`. A missing file is created with defaults; an
    /// unreadable one is ignored in favour of defaults.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            let cfg = Self::default();
            cfg.save(path)?;
            info!(path = %path.display(), "default config written");
            return Ok(cfg);
        }
        let content = fs::read_to_string(path)?;
        match serde_json::from_str::<Self>(&content) {
            Ok(cfg) => Ok(cfg),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "config unreadable; using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }
}

pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

pub fn default_config_path() -> Result<PathBuf> {
    home_dir()
        .map(|h| h.join(CONFIG_FILE_NAME))
        .ok_or_else(|| PipelineError::Config("HOME is not set; pass --config".to_string()))
}

pub fn default_base_dir() -> Result<PathBuf> {
    home_dir()
        .map(|h| h.join("Desktop").join("PRS_New"))
        .ok_or_else(|| PipelineError::Config("HOME is not set; pass --base-dir".to_string()))
}

/// Command-line values that take precedence over the persisted config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub prs_score_dir: Option<PathBuf>,
    pub base_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub drop_unmatched: bool,
}

/// Fully resolved settings handed to every run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub plink: String,
    pub plink2: String,
    pub docker: String,
    pub python: String,
    pub bash: String,
    pub ancestry_image: String,
    pub base_dir: PathBuf,
    pub prs_score_dir: PathBuf,
    pub timeout: Option<Duration>,
    pub unmatched: UnmatchedPolicy,
}

impl Settings {
    pub fn resolve(cfg: &ToolConfig, overrides: &Overrides) -> Result<Self> {
        let prs_score_dir = match &overrides.prs_score_dir {
            Some(dir) => dir.clone(),
            None if !cfg.prs_score_dir.trim().is_empty() => PathBuf::from(cfg.prs_score_dir.trim()),
            None => {
                return Err(PipelineError::Config(
                    "PRS score directory not specified (--prs-dir or prs_score_dir in config)"
                        .to_string(),
                ));
            }
        };
        let base_dir = match overrides.base_dir.clone().or_else(|| cfg.base_dir.clone()) {
            Some(dir) => dir,
            None => default_base_dir()?,
        };
        let timeout = overrides
            .timeout_secs
            .or(cfg.timeout_secs)
            .filter(|s| *s > 0)
            .map(Duration::from_secs);

        Ok(Self {
            plink: non_empty_or(&cfg.plink, "plink"),
            plink2: non_empty_or(&cfg.plink2, "plink2"),
            docker: non_empty_or(&cfg.docker, "docker"),
            python: non_empty_or(&cfg.python, "python"),
            bash: non_empty_or(&cfg.bash, "bash"),
            ancestry_image: non_empty_or(&cfg.ancestry_image, "ancestry-py27"),
            base_dir,
            prs_score_dir,
            timeout,
            unmatched: if overrides.drop_unmatched {
                UnmatchedPolicy::Drop
            } else {
                UnmatchedPolicy::PassThrough
            },
        })
    }
}

pub(crate) fn non_empty_or(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}
