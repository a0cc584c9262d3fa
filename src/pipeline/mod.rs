use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::{info, warn};

use crate::ctx::{Ctx, StageRecord, StageStatus, validate_sample_id};
use crate::error::{PipelineError, Result, StageFailure};
use crate::tool::ToolCommand;

pub mod stage1_validate;
pub mod stage2_import;
pub mod stage3_normalize_ids;
pub mod stage4_score;
pub mod stage5_recode;
pub mod stage6_convert;
pub mod stage7_ancestry;
pub mod stage8_parse_ancestry;
pub mod stage9_report;

pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// A required stage's failure aborts the run; an optional one is logged.
    fn required(&self) -> bool {
        true
    }

    /// Exclusive stages touch the shared ancestry directory and hold the
    /// pipeline's lock while they run.
    fn exclusive(&self) -> bool {
        false
    }

    /// Artifacts that must exist before the stage may start.
    fn inputs(&self, _ctx: &Ctx) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Artifacts the stage must have produced when it returns `Ok`.
    fn outputs(&self, _ctx: &Ctx) -> Vec<PathBuf> {
        Vec::new()
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()>;
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    exclusive_lock: Option<Arc<Mutex<()>>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            stages,
            exclusive_lock: None,
        }
    }

    /// The nine stages from input validation to report generation.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(stage1_validate::Stage1Validate::new()),
            Box::new(stage2_import::Stage2Import::new()),
            Box::new(stage3_normalize_ids::Stage3NormalizeIds::new()),
            Box::new(stage4_score::Stage4Score::new()),
            Box::new(stage5_recode::Stage5Recode::new()),
            Box::new(stage6_convert::Stage6Convert::new()),
            Box::new(stage7_ancestry::Stage7Ancestry::new()),
            Box::new(stage8_parse_ancestry::Stage8ParseAncestry::new()),
            Box::new(stage9_report::Stage9Report::new()),
        ])
    }

    pub fn with_exclusive_lock(mut self, lock: Arc<Mutex<()>>) -> Self {
        self.exclusive_lock = Some(lock);
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, ctx: &mut Ctx) -> std::result::Result<(), StageFailure> {
        let mut guard: Option<MutexGuard<'_, ()>> = None;

        for (idx, stage) in self.stages.iter().enumerate() {
            if !stage.exclusive() {
                guard = None;
            } else if guard.is_none() {
                if let Some(lock) = &self.exclusive_lock {
                    guard = Some(lock.lock().unwrap_or_else(|p| p.into_inner()));
                }
            }

            let start = Instant::now();
            let missing = stage.inputs(ctx).into_iter().find(|p| !p.exists());
            if let Some(path) = missing {
                if !stage.required() {
                    let reason = format!("input {} not found", path.display());
                    warn!(stage = stage.name(), reason = %reason, "stage skipped");
                    ctx.warnings
                        .push(format!("{} skipped: {}", stage.name(), reason));
                    record(ctx, &**stage, StageStatus::Skipped { reason }, &start);
                    continue;
                }
                let err = PipelineError::input_not_found(path);
                return Err(self.abort(ctx, idx, err, &start));
            }

            info!(stage = stage.name(), "stage started");
            let result = stage
                .run(ctx)
                .and_then(|()| check_outputs(&**stage, ctx));
            let degradation = ctx.take_degradation();

            match result {
                Ok(()) => {
                    let status = match degradation {
                        Some(reason) => StageStatus::Degraded { reason },
                        None => StageStatus::Succeeded,
                    };
                    info!(
                        stage = stage.name(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "stage finished"
                    );
                    record(ctx, &**stage, status, &start);
                }
                Err(err) if !stage.required() => {
                    warn!(
                        stage = stage.name(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        error = %err,
                        "optional stage failed; continuing"
                    );
                    ctx.warnings.push(format!("{} failed: {}", stage.name(), err));
                    let cause = err.to_string();
                    record(ctx, &**stage, StageStatus::Failed { cause }, &start);
                }
                Err(err) => return Err(self.abort(ctx, idx, err, &start)),
            }
        }
        Ok(())
    }

    fn abort(&self, ctx: &mut Ctx, idx: usize, err: PipelineError, start: &Instant) -> StageFailure {
        let stage = &*self.stages[idx];
        warn!(
            stage = stage.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            error = %err,
            "stage failed"
        );
        let cause = err.to_string();
        record(ctx, stage, StageStatus::Failed { cause }, start);
        for rest in &self.stages[idx + 1..] {
            ctx.stages.push(StageRecord {
                name: rest.name().to_string(),
                required: rest.required(),
                status: StageStatus::NotRun,
                elapsed_ms: 0,
            });
        }
        StageFailure {
            stage: stage.name(),
            source: err,
        }
    }
}

fn check_outputs(stage: &dyn Stage, ctx: &Ctx) -> Result<()> {
    match stage.outputs(ctx).into_iter().find(|p| !p.exists()) {
        Some(path) => Err(PipelineError::ArtifactNotProduced {
            stage: stage.name().to_string(),
            path,
        }),
        None => Ok(()),
    }
}

/// Environment handed to the site-provided parse and report scripts.
pub(crate) fn script_env(cmd: ToolCommand, ctx: &Ctx) -> ToolCommand {
    let mut cmd = cmd
        .env("PRS_SAMPLE_ID", ctx.sample.id.clone())
        .env("PRS_OUTPUT_DIR", ctx.layout.prs_dir.clone());
    if let Some(result) = &ctx.ancestry_result {
        cmd = cmd.env("PRS_ANCESTRY_RESULT", result.clone());
    }
    cmd
}

fn record(ctx: &mut Ctx, stage: &dyn Stage, status: StageStatus, start: &Instant) {
    ctx.stages.push(StageRecord {
        name: stage.name().to_string(),
        required: stage.required(),
        status,
        elapsed_ms: start.elapsed().as_millis() as u64,
    });
}

/// Runs `pipeline` for one sample and writes its run report, whatever the
/// outcome.
pub fn execute(pipeline: &Pipeline, ctx: &mut Ctx) -> RunState {
    let result = pipeline.run(ctx);
    let state = RunState::from_result(&result);
    let report_path = ctx.layout.run_report();
    if validate_sample_id(&ctx.sample.id).is_err() {
        warn!(sample = %ctx.sample.id, "run report not written; sample id is not a directory name");
    } else if let Err(err) = crate::io::run_report::write_run_report(ctx, &state, &report_path) {
        warn!(path = %report_path.display(), error = %err, "failed to write run report");
    }
    match &state {
        RunState::Completed => info!(sample = %ctx.sample.id, "run completed"),
        RunState::Failed { stage, cause } => {
            warn!(sample = %ctx.sample.id, stage = %stage, cause = %cause, "run failed")
        }
    }
    state
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Completed,
    Failed { stage: String, cause: String },
}

impl RunState {
    pub fn from_result(result: &std::result::Result<(), StageFailure>) -> Self {
        match result {
            Ok(()) => RunState::Completed,
            Err(failure) => RunState::Failed {
                stage: failure.stage.to_string(),
                cause: failure.source.to_string(),
            },
        }
    }
}
