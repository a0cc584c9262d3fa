#![allow(dead_code)]

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use kira_prs::ancestry::{AncestryEstimator, AncestryInput, AncestryOutcome};
use kira_prs::config::Settings;
use kira_prs::ctx::{Ctx, Sample, SampleMeta};
use kira_prs::error::{PipelineError, Result};
use kira_prs::genotype::UnmatchedPolicy;
use kira_prs::tool::{CommandRunner, ToolCommand, ToolOutput};

pub const MODELS: [&str; 2] = ["bmi", "height"];

/// Stands in for plink, plink2, bash and python: records every command and
/// creates the artifacts the real tool would.
#[derive(Default)]
pub struct FakeRunner {
    pub calls: Mutex<Vec<ToolCommand>>,
    fail: HashSet<String>,
    score_outputs: Vec<String>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            score_outputs: MODELS.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing(mut self, label: &str) -> Self {
        self.fail.insert(label.to_string());
        self
    }

    pub fn with_score_outputs(mut self, names: &[&str]) -> Self {
        self.score_outputs = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn labels(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.label.clone())
            .collect()
    }

    pub fn call(&self, label: &str) -> Option<ToolCommand> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.label == label)
            .cloned()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput> {
        self.calls.lock().unwrap().push(cmd.clone());
        if self.fail.contains(&cmd.label) {
            return Err(PipelineError::ExternalToolFailure {
                tool: cmd.tool_name(),
                status: "exit code 1".to_string(),
                stderr: format!("{} failed", cmd.label),
            });
        }

        let args = cmd.arg_strings();
        match cmd.label.as_str() {
            "import" | "normalize-ids" => {
                let out = PathBuf::from(value_after(&args, "--out"));
                for ext in ["bed", "fam"] {
                    fs::write(suffixed(&out, ext), "").unwrap();
                }
                fs::write(suffixed(&out, "bim"), "1\tchr1:100:A:G\t0\t100\tA\tG\n").unwrap();
            }
            "recode" => {
                let out = PathBuf::from(value_after(&args, "--out"));
                let iid = out
                    .parent()
                    .and_then(|p| p.file_name())
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap();
                fs::write(
                    suffixed(&out, "raw"),
                    format!(
                        "FID IID PAT MAT SEX PHENOTYPE chr1:100:A:G_A\n0 {} 0 0 1 -9 1\n",
                        iid
                    ),
                )
                .unwrap();
            }
            "score" => {
                let out_dir = PathBuf::from(&args[2]);
                for name in &self.score_outputs {
                    fs::write(out_dir.join(format!("{}.sscore", name)), "#IID\tSCORE1_SUM\n")
                        .unwrap();
                }
            }
            _ => {}
        }
        Ok(ToolOutput::default())
    }
}

fn value_after(args: &[String], flag: &str) -> String {
    let idx = args.iter().position(|a| a == flag).unwrap();
    args[idx + 1].clone()
}

fn suffixed(prefix: &Path, ext: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", prefix.display(), ext))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AncestryBehavior {
    Complete,
    Unavailable,
    Fail,
}

/// Estimator double. On completion it writes the first sample ID it finds
/// in the hand-off file, so tests can tell whose input it saw.
pub struct FakeAncestry {
    behavior: AncestryBehavior,
    delay: Duration,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub runs: AtomicUsize,
}

impl FakeAncestry {
    pub fn new(behavior: AncestryBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            runs: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl AncestryEstimator for FakeAncestry {
    fn run(&self, input: &AncestryInput) -> Result<AncestryOutcome> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.runs.fetch_add(1, Ordering::SeqCst);
        let seen = fs::read_to_string(&input.genotypes)?;
        thread::sleep(self.delay);
        let outcome = match self.behavior {
            AncestryBehavior::Complete => {
                let iid = seen
                    .lines()
                    .nth(1)
                    .and_then(|l| l.split('\t').next())
                    .unwrap_or_default()
                    .to_string();
                fs::write(&input.output, format!("{}\tEUR\t0.91\n", iid))?;
                Ok(AncestryOutcome::Completed {
                    output: input.output.clone(),
                })
            }
            AncestryBehavior::Unavailable => Ok(AncestryOutcome::Unavailable {
                reason: "container runtime missing".to_string(),
            }),
            AncestryBehavior::Fail => Err(PipelineError::ExternalToolFailure {
                tool: "docker".to_string(),
                status: "exit code 125".to_string(),
                stderr: "image not found".to_string(),
            }),
        };
        self.active.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

/// Scoring models under `<root>/models` and an empty VCF per sample.
pub fn settings(root: &Path) -> Settings {
    let models = root.join("models");
    fs::create_dir_all(&models).unwrap();
    for name in MODELS {
        fs::write(models.join(format!("{}.par", name)), "ID\tA1\tBETA\tW\n").unwrap();
    }
    Settings {
        plink: "plink".to_string(),
        plink2: "plink2".to_string(),
        docker: "docker".to_string(),
        python: "python".to_string(),
        bash: "bash".to_string(),
        ancestry_image: "ancestry-py27".to_string(),
        base_dir: root.join("base"),
        prs_score_dir: models,
        timeout: None,
        unmatched: UnmatchedPolicy::PassThrough,
    }
}

pub fn sample(root: &Path, id: &str) -> Sample {
    let vcf = root.join(format!("{}.vcf", id));
    fs::write(&vcf, "##fileformat=VCFv4.2\n").unwrap();
    Sample {
        id: id.to_string(),
        vcf,
    }
}

pub fn ctx(
    settings: Settings,
    sample: Sample,
    runner: Arc<FakeRunner>,
    ancestry: Arc<FakeAncestry>,
) -> Ctx {
    Ctx::new(sample, SampleMeta::default(), settings, runner, ancestry)
}
