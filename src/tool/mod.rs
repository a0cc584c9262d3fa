//! External tool invocation.
//!
//! Stages never spawn processes directly; they build a [`ToolCommand`] and
//! hand it to a [`CommandRunner`]. The production runner is
//! [`process::ProcessRunner`]; tests substitute their own.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub mod check;
pub mod process;

pub use check::{ToolCheck, check_tools};
pub use process::ProcessRunner;

#[derive(Debug, Clone)]
pub struct ToolCommand {
    /// Short identifier, used for log file names.
    pub label: String,
    pub program: String,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    pub envs: Vec<(String, OsString)>,
    /// Directory receiving `<label>.stdout.log` / `<label>.stderr.log`.
    pub log_dir: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(label: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
            log_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn log_to(mut self, dir: &Path) -> Self {
        self.log_dir = Some(dir.to_path_buf());
        self
    }

    /// The executable's file name, e.g. `plink2` for `/opt/bin/plink2`.
    pub fn tool_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.clone())
    }

    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs one external command to completion. A non-zero exit is an error.
pub trait CommandRunner: Send + Sync {
    fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput>;
}
