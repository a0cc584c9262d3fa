use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::tool::{CommandRunner, ToolCommand, ToolOutput};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const ERROR_TAIL_LINES: usize = 20;

/// Spawns real processes, optionally under a wall-clock deadline.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput> {
        info!(tool = %cmd.tool_name(), label = %cmd.label, command = %cmd, "running external command");

        let (mut stdout_file, mut stderr_file) = open_capture(cmd)?;
        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file.try_clone()?))
            .stderr(Stdio::from(stderr_file.try_clone()?));
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &cmd.envs {
            command.env(key, value);
        }
        // Deadline-bound commands lead their own process group.
        #[cfg(unix)]
        if self.timeout.is_some() {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let start = Instant::now();
        let mut child = command.spawn().map_err(|source| PipelineError::Launch {
            tool: cmd.tool_name(),
            source,
        })?;
        let status = wait_with_deadline(&mut child, self.timeout)?;
        let stdout = read_back(&mut stdout_file)?;
        let stderr = read_back(&mut stderr_file)?;

        let Some(status) = status else {
            let limit = self.timeout.unwrap_or_default();
            warn!(tool = %cmd.tool_name(), limit = ?limit, "external command timed out");
            return Err(PipelineError::Timeout {
                tool: cmd.tool_name(),
                limit,
            });
        };

        debug!(
            tool = %cmd.tool_name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            status = %status,
            "external command finished"
        );

        if !status.success() {
            let text = if stderr.trim().is_empty() { &stdout } else { &stderr };
            return Err(PipelineError::ExternalToolFailure {
                tool: cmd.tool_name(),
                status: describe_status(&status),
                stderr: tail_lines(text, ERROR_TAIL_LINES),
            });
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

fn open_capture(cmd: &ToolCommand) -> Result<(File, File)> {
    match &cmd.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let stdout = open_log(&dir.join(format!("{}.stdout.log", cmd.label)))?;
            let stderr = open_log(&dir.join(format!("{}.stderr.log", cmd.label)))?;
            Ok((stdout, stderr))
        }
        None => Ok((tempfile::tempfile()?, tempfile::tempfile()?)),
    }
}

fn open_log(path: &Path) -> Result<File> {
    let file = fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    Ok(file)
}

fn read_back(file: &mut File) -> Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// `Ok(None)` means the deadline passed and the child was killed.
fn wait_with_deadline(child: &mut Child, timeout: Option<Duration>) -> Result<Option<ExitStatus>> {
    let Some(limit) = timeout else {
        return Ok(Some(child.wait()?));
    };
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            kill_group(child);
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// The child leads its own process group when a deadline is set; signal
/// every member of it.
#[cfg(unix)]
fn kill_group(child: &Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group was created for this
    // child by `process_group(0)` and has not been reaped yet.
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

fn describe_status(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    }
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
