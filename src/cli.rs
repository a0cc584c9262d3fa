use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "kira-prs",
    version,
    about = "VCF to polygenic risk scores and ancestry, one sample at a time"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full pipeline for one sample.
    Run(RunArgs),
    /// Run the pipeline for every sample in a manifest.
    Batch(BatchArgs),
    /// Convert a plink allele-count table into the ancestry genotype table.
    Convert(ConvertArgs),
    /// Write the score driver script for a directory of scoring models.
    ScoreScript(ScoreScriptArgs),
    /// Probe the configured external tools.
    CheckTools(CheckToolsArgs),
    /// Show or update the persisted tool configuration.
    Config(ConfigArgs),
}

/// Options shared by every command that runs the pipeline.
#[derive(Debug, Args)]
pub struct PipelineOpts {
    #[arg(long, help = "Directory of scoring models (*.par); overrides the config")]
    pub prs_dir: Option<PathBuf>,

    #[arg(long, help = "Artifact root (default: $HOME/Desktop/PRS_New)")]
    pub base_dir: Option<PathBuf>,

    #[arg(long, help = "Config file (default: $HOME/.prs_pipeline_config.json)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Kill external tools running longer than this (0 = never)")]
    pub timeout_secs: Option<u64>,

    #[arg(
        long,
        default_value_t = false,
        help = "Drop genotype columns without a variant metadata record"
    )]
    pub drop_unmatched: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[arg(long, help = "Input VCF file")]
    pub vcf: PathBuf,

    #[arg(long, help = "Sample ID (names the artifact directories)")]
    pub id: String,

    #[arg(long)]
    pub phenotype: Option<String>,

    #[arg(long)]
    pub sex: Option<String>,

    #[arg(long)]
    pub age: Option<String>,

    #[command(flatten)]
    pub pipeline: PipelineOpts,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    #[arg(long, help = "TSV manifest: sample_id<TAB>vcf_path per line")]
    pub manifest: PathBuf,

    #[arg(long, default_value_t = 0, help = "Number of threads (0 = auto)")]
    pub threads: usize,

    #[command(flatten)]
    pub pipeline: PipelineOpts,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    #[arg(long, help = "plink --recode A table (.raw)")]
    pub raw: PathBuf,

    #[arg(long, help = "Variant metadata (.bim)")]
    pub bim: Option<PathBuf>,

    #[arg(long)]
    pub out: PathBuf,

    #[arg(long, help = "Summary path (default: conversion_summary.txt next to --out)")]
    pub summary: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub drop_unmatched: bool,
}

#[derive(Debug, Args)]
pub struct ScoreScriptArgs {
    #[arg(long, help = "Directory of scoring models (*.par); overrides the config")]
    pub prs_dir: Option<PathBuf>,

    #[arg(long)]
    pub out: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CheckToolsArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    Show,
    Set(ConfigSetArgs),
}

#[derive(Debug, Args)]
pub struct ConfigSetArgs {
    #[arg(long)]
    pub plink: Option<String>,

    #[arg(long)]
    pub plink2: Option<String>,

    #[arg(long)]
    pub docker: Option<String>,

    #[arg(long)]
    pub python: Option<String>,

    #[arg(long)]
    pub bash: Option<String>,

    #[arg(long)]
    pub ancestry_image: Option<String>,

    #[arg(long)]
    pub prs_dir: Option<PathBuf>,

    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    #[arg(long)]
    pub timeout_secs: Option<u64>,
}
