use crate::ctx::{Ctx, StageStatus};
use crate::pipeline::RunState;

const LISTED_SCORE_FILES: usize = 5;

pub fn format_summary(ctx: &Ctx, state: &RunState) -> String {
    let version = env!("CARGO_PKG_VERSION");
    let mut out = String::new();
    out.push_str(&format!("kira-prs v{}\n", version));
    out.push_str(&format!(
        "Sample: {} ({})\n",
        ctx.sample.id,
        ctx.sample.vcf.display()
    ));

    match state {
        RunState::Completed => out.push_str("State: completed\n"),
        RunState::Failed { stage, cause } => {
            out.push_str(&format!("State: failed at {}\n", stage));
            out.push_str(&format!("Cause: {}\n", cause));
        }
    }

    for record in &ctx.stages {
        let status = match &record.status {
            StageStatus::Succeeded => "ok".to_string(),
            StageStatus::Degraded { reason } => format!("degraded ({})", reason),
            StageStatus::Skipped { reason } => format!("skipped ({})", reason),
            StageStatus::Failed { cause } => format!("failed ({})", cause),
            StageStatus::NotRun => "not run".to_string(),
        };
        out.push_str(&format!("  {:<15} {}\n", record.name, status));
    }

    if let Some(conv) = &ctx.conversion {
        out.push_str(&format!(
            "Genotypes: {} samples, {} variants\n",
            conv.samples(),
            conv.output_variants
        ));
    }

    out.push_str(&format!("PRS output dir: {}\n", ctx.layout.prs_dir.display()));
    if !ctx.score_outputs.is_empty() {
        out.push_str(&format!(
            "Generated {} score files:\n",
            ctx.score_outputs.len()
        ));
        for path in ctx.score_outputs.iter().take(LISTED_SCORE_FILES) {
            let name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            out.push_str(&format!("  - {}\n", name));
        }
        if ctx.score_outputs.len() > LISTED_SCORE_FILES {
            out.push_str(&format!(
                "  ... and {} more\n",
                ctx.score_outputs.len() - LISTED_SCORE_FILES
            ));
        }
    }
    if let Some(result) = &ctx.ancestry_result {
        out.push_str(&format!("Ancestry: {}\n", result.display()));
    }
    out
}
