use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::ancestry::{
    AncestryEstimator, DockerAncestry, HANDOFF_FILE_NAME, OUTPUT_FILE_NAME, REFERENCE_FILE_NAME,
    STRIPPED_FILE_NAME,
};
use crate::config::Settings;
use crate::error::{PipelineError, Result};
use crate::genotype::ConversionSummary;
use crate::score::{SCRIPT_FILE_NAME, ScorePlan};
use crate::tool::{CommandRunner, ProcessRunner};

pub const VCF_DIR: &str = "VCF_Files";
pub const PRS_DIR: &str = "PRS_Files";
pub const ANCESTRY_DIR: &str = "Ancestry";
pub const SCRIPTS_DIR: &str = "PRS";

pub const RECODE_STEM: &str = "individual_1";
pub const GENOTYPE_TABLE: &str = "individual_genotypes2.input";
pub const CONVERSION_SUMMARY: &str = "conversion_summary.txt";
pub const PARSE_SCRIPT: &str = "ancestry_data_parse.py";
pub const REPORT_SCRIPT: &str = "report_all_aut.sh";
pub const RUN_REPORT: &str = "run_report.json";

#[derive(Debug, Clone, Serialize)]
pub struct Sample {
    pub id: String,
    pub vcf: PathBuf,
}

/// A sample ID names the run's directories, so it must be a single plain
/// path component.
pub fn validate_sample_id(id: &str) -> Result<()> {
    let plain = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\'])
        && !Path::new(id).is_absolute();
    if plain {
        Ok(())
    } else {
        Err(PipelineError::malformed(
            "sample id",
            format!("'{}' cannot be used as a directory name", id),
        ))
    }
}

/// Descriptive fields collected with the sample; carried into the report only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SampleMeta {
    pub phenotype: Option<String>,
    pub sex: Option<String>,
    pub age: Option<String>,
}

/// Every path a run reads or writes, derived from the base directory and the
/// sample ID.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    pub sample_id: String,
    pub base_dir: PathBuf,
    pub sample_dir: PathBuf,
    pub prs_dir: PathBuf,
    pub prs_root: PathBuf,
    pub ancestry_dir: PathBuf,
    pub scripts_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl ArtifactLayout {
    pub fn new(base_dir: &Path, sample_id: &str) -> Self {
        let sample_dir = base_dir.join(VCF_DIR).join(sample_id);
        let prs_root = base_dir.join(PRS_DIR);
        Self {
            sample_id: sample_id.to_string(),
            base_dir: base_dir.to_path_buf(),
            logs_dir: sample_dir.join("logs"),
            sample_dir,
            prs_dir: prs_root.join(sample_id),
            prs_root,
            ancestry_dir: base_dir.join(ANCESTRY_DIR),
            scripts_dir: base_dir.join(SCRIPTS_DIR),
        }
    }

    pub fn dirs(&self) -> [&Path; 6] {
        [
            &self.sample_dir,
            &self.logs_dir,
            &self.prs_root,
            &self.prs_dir,
            &self.ancestry_dir,
            &self.scripts_dir,
        ]
    }

    pub fn import_prefix(&self) -> PathBuf {
        self.sample_dir.join(&self.sample_id)
    }

    pub fn normalized_prefix(&self) -> PathBuf {
        self.sample_dir.join(format!("{}_id", self.sample_id))
    }

    pub fn normalized_bim(&self) -> PathBuf {
        with_suffix(&self.normalized_prefix(), "bim")
    }

    pub fn recode_prefix(&self) -> PathBuf {
        self.sample_dir.join(RECODE_STEM)
    }

    pub fn recode_raw(&self) -> PathBuf {
        with_suffix(&self.recode_prefix(), "raw")
    }

    pub fn genotype_table(&self) -> PathBuf {
        self.sample_dir.join(GENOTYPE_TABLE)
    }

    pub fn conversion_summary(&self) -> PathBuf {
        self.sample_dir.join(CONVERSION_SUMMARY)
    }

    pub fn score_script(&self) -> PathBuf {
        self.prs_root.join(SCRIPT_FILE_NAME)
    }

    pub fn handoff_input(&self) -> PathBuf {
        self.ancestry_dir.join(HANDOFF_FILE_NAME)
    }

    pub fn handoff_stripped(&self) -> PathBuf {
        self.ancestry_dir.join(STRIPPED_FILE_NAME)
    }

    pub fn ancestry_reference(&self) -> PathBuf {
        self.ancestry_dir.join(REFERENCE_FILE_NAME)
    }

    pub fn ancestry_output(&self) -> PathBuf {
        self.ancestry_dir.join(OUTPUT_FILE_NAME)
    }

    pub fn sample_ancestry(&self) -> PathBuf {
        self.sample_dir.join(format!("{}.ancestry", self.sample_id))
    }

    pub fn parse_script(&self) -> PathBuf {
        self.scripts_dir.join(PARSE_SCRIPT)
    }

    pub fn report_script(&self) -> PathBuf {
        self.scripts_dir.join(REPORT_SCRIPT)
    }

    pub fn run_report(&self) -> PathBuf {
        self.sample_dir.join(RUN_REPORT)
    }
}

/// `.bed`, `.bim` and `.fam` for a plink prefix.
pub fn plink_fileset(prefix: &Path) -> Vec<PathBuf> {
    ["bed", "bim", "fam"]
        .iter()
        .map(|ext| with_suffix(prefix, ext))
        .collect()
}

/// Appends `.ext` without touching dots already in the file name.
fn with_suffix(prefix: &Path, ext: &str) -> PathBuf {
    let mut s = prefix.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    Succeeded,
    Degraded { reason: String },
    Skipped { reason: String },
    Failed { cause: String },
    NotRun,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub name: String,
    pub required: bool,
    #[serde(flatten)]
    pub status: StageStatus,
    pub elapsed_ms: u64,
}

pub struct Ctx {
    pub sample: Sample,
    pub meta: SampleMeta,
    pub settings: Settings,
    pub layout: ArtifactLayout,
    pub runner: Arc<dyn CommandRunner>,
    pub ancestry: Arc<dyn AncestryEstimator>,
    pub score_plan: Option<ScorePlan>,
    pub score_outputs: Vec<PathBuf>,
    pub conversion: Option<ConversionSummary>,
    pub ancestry_result: Option<PathBuf>,
    pub stages: Vec<StageRecord>,
    pub warnings: Vec<String>,
    degradation: Option<String>,
}

impl Ctx {
    pub fn new(
        sample: Sample,
        meta: SampleMeta,
        settings: Settings,
        runner: Arc<dyn CommandRunner>,
        ancestry: Arc<dyn AncestryEstimator>,
    ) -> Self {
        let layout = ArtifactLayout::new(&settings.base_dir, &sample.id);
        Self {
            sample,
            meta,
            settings,
            layout,
            runner,
            ancestry,
            score_plan: None,
            score_outputs: Vec::new(),
            conversion: None,
            ancestry_result: None,
            stages: Vec::new(),
            warnings: Vec::new(),
            degradation: None,
        }
    }

    /// Context wired to real processes and the container-based estimator.
    pub fn with_process_tools(sample: Sample, meta: SampleMeta, settings: Settings) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new(settings.timeout));
        let ancestry = Arc::new(DockerAncestry::new(
            settings.docker.clone(),
            settings.ancestry_image.clone(),
            runner.clone(),
        ));
        Self::new(sample, meta, settings, runner, ancestry)
    }

    /// Marks the running stage as completed with reduced output.
    pub fn degrade(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.warnings.push(reason.clone());
        self.degradation = Some(reason);
    }

    pub(crate) fn take_degradation(&mut self) -> Option<String> {
        self.degradation.take()
    }
}
