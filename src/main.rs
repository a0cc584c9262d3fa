use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use kira_prs::batch;
use kira_prs::cli::{
    BatchArgs, CheckToolsArgs, Cli, Commands, ConfigArgs, ConfigCommand, ConfigSetArgs,
    ConvertArgs, PipelineOpts, RunArgs, ScoreScriptArgs,
};
use kira_prs::config::{self, Overrides, Settings, ToolConfig};
use kira_prs::ctx::{CONVERSION_SUMMARY, Ctx, Sample, SampleMeta};
use kira_prs::genotype::{self, ConvertRequest, UnmatchedPolicy};
use kira_prs::io;
use kira_prs::pipeline::{Pipeline, RunState, execute};
use kira_prs::score::{self, ScorePlan};
use kira_prs::tool::{self, CommandRunner, ProcessRunner};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => handle_run(args),
        Commands::Batch(args) => handle_batch(args),
        Commands::Convert(args) => handle_convert(args),
        Commands::ScoreScript(args) => handle_score_script(args),
        Commands::CheckTools(args) => handle_check_tools(args),
        Commands::Config(args) => handle_config(args),
    }
}

fn load_config(path: Option<&Path>) -> Result<ToolConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config::default_config_path()?,
    };
    Ok(ToolConfig::load_or_init(&path)?)
}

fn resolve_settings(opts: &PipelineOpts) -> Result<Settings> {
    let cfg = load_config(opts.config.as_deref())?;
    let overrides = Overrides {
        prs_score_dir: opts.prs_dir.clone(),
        base_dir: opts.base_dir.clone(),
        timeout_secs: opts.timeout_secs,
        drop_unmatched: opts.drop_unmatched,
    };
    Ok(Settings::resolve(&cfg, &overrides)?)
}

fn handle_run(args: RunArgs) -> Result<()> {
    let settings = resolve_settings(&args.pipeline)?;
    let sample = Sample {
        id: args.id,
        vcf: args.vcf,
    };
    let meta = SampleMeta {
        phenotype: args.phenotype,
        sex: args.sex,
        age: args.age,
    };
    let mut ctx = Ctx::with_process_tools(sample, meta, settings);
    let state = execute(&Pipeline::standard(), &mut ctx);
    print_summary(&ctx, &state);
    if let RunState::Failed { stage, cause } = state {
        bail!("stage '{}' failed: {}", stage, cause);
    }
    Ok(())
}

fn handle_batch(args: BatchArgs) -> Result<()> {
    let settings = resolve_settings(&args.pipeline)?;
    let samples = batch::read_manifest(&args.manifest)
        .with_context(|| format!("failed to read manifest {}", args.manifest.display()))?;
    let results = batch::run_batch(samples, args.threads, |sample| {
        Ctx::with_process_tools(sample, SampleMeta::default(), settings.clone())
    })?;

    let mut failed = 0usize;
    for result in &results {
        match &result.state {
            RunState::Completed => println!("{}\tcompleted", result.sample_id),
            RunState::Failed { stage, cause } => {
                failed += 1;
                println!("{}\tfailed at {}: {}", result.sample_id, stage, cause);
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} sample(s) failed", failed, results.len());
    }
    Ok(())
}

fn handle_convert(args: ConvertArgs) -> Result<()> {
    let summary_path = args.summary.unwrap_or_else(|| {
        args.out
            .parent()
            .map(|p| p.join(CONVERSION_SUMMARY))
            .unwrap_or_else(|| PathBuf::from(CONVERSION_SUMMARY))
    });
    let req = ConvertRequest {
        raw: &args.raw,
        metadata: args.bim.as_deref(),
        output: &args.out,
        summary: &summary_path,
        policy: if args.drop_unmatched {
            UnmatchedPolicy::Drop
        } else {
            UnmatchedPolicy::PassThrough
        },
    };
    let summary = genotype::convert(&req)
        .with_context(|| format!("failed to convert {}", args.raw.display()))?;
    println!("samples: {}", summary.samples());
    println!("variants: {}", summary.output_variants);
    println!("output: {}", summary.output_path.display());
    println!("summary: {}", summary_path.display());
    print_warnings(&summary.warnings);
    Ok(())
}

fn handle_score_script(args: ScoreScriptArgs) -> Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let overrides = Overrides {
        prs_score_dir: args.prs_dir,
        ..Overrides::default()
    };
    let settings = Settings::resolve(&cfg, &overrides)?;
    let plan = ScorePlan::discover(&settings.plink2, &settings.prs_score_dir)?;
    let path = score::write_script(&plan, &args.out)?;
    println!("models: {}", plan.models().len());
    println!("script: {}", path.display());
    Ok(())
}

fn handle_check_tools(args: CheckToolsArgs) -> Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new(None));
    let checks = tool::check_tools(&cfg, runner.as_ref());

    for check in &checks {
        match &check.outcome {
            Ok(version) => println!("[OK] {} ({}): {}", check.name, check.program, version),
            Err(err) => {
                let tag = if check.required { "required" } else { "optional" };
                println!("[X] {} ({}, {}): {}", check.name, check.program, tag, err);
            }
        }
    }
    let missing_required = checks.iter().filter(|c| c.required && !c.ok()).count();
    if missing_required > 0 {
        bail!("{} required tool(s) unavailable", missing_required);
    }
    Ok(())
}

fn handle_config(args: ConfigArgs) -> Result<()> {
    let path = match args.config {
        Some(p) => p,
        None => config::default_config_path()?,
    };
    let mut cfg = ToolConfig::load_or_init(&path)?;
    match args.command {
        ConfigCommand::Show => {}
        ConfigCommand::Set(set) => {
            apply_config_set(&mut cfg, set);
            cfg.save(&path)?;
            tracing::info!(path = %path.display(), "config updated");
        }
    }
    let json = serde_json::to_string_pretty(&cfg).context("failed to render config")?;
    println!("{}", json);
    Ok(())
}

fn apply_config_set(cfg: &mut ToolConfig, set: ConfigSetArgs) {
    if let Some(v) = set.plink {
        cfg.plink = v;
    }
    if let Some(v) = set.plink2 {
        cfg.plink2 = v;
    }
    if let Some(v) = set.docker {
        cfg.docker = v;
    }
    if let Some(v) = set.python {
        cfg.python = v;
    }
    if let Some(v) = set.bash {
        cfg.bash = v;
    }
    if let Some(v) = set.ancestry_image {
        cfg.ancestry_image = v;
    }
    if let Some(v) = set.prs_dir {
        cfg.prs_score_dir = v.display().to_string();
    }
    if let Some(v) = set.base_dir {
        cfg.base_dir = Some(v);
    }
    if let Some(v) = set.timeout_secs {
        cfg.timeout_secs = Some(v);
    }
}

fn print_summary(ctx: &Ctx, state: &RunState) {
    print!("{}", io::summary::format_summary(ctx, state));
    print_warnings(&ctx.warnings);
}

fn print_warnings(warnings: &[String]) {
    if !warnings.is_empty() {
        println!("warnings:");
        for warning in warnings {
            println!("- {}", warning);
        }
    }
}
