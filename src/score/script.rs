use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{PipelineError, Result};
use crate::score::ScorePlan;

pub const SCRIPT_FILE_NAME: &str = "score_models.sh";

const INPUT_VAR: &str = "${INPUT_PREFIX}";
const OUTPUT_VAR: &str = "${OUTPUT_DIR}";

/// Renders the bash driver for `plan`. Takes `<input_prefix> <output_dir>`;
/// each model runs independently and a failed model does not stop the rest.
pub fn render_script(plan: &ScorePlan) -> String {
    let mut s = String::new();
    s.push_str("#!/bin/bash\n");
    s.push_str("# PRS score driver generated by kira-prs; overwritten on every run.\n");
    s.push_str("# Usage: score_models.sh <input_prefix> <output_dir>\n\n");
    s.push_str("INPUT_PREFIX=\"$1\"\n");
    s.push_str("OUTPUT_DIR=\"$2\"\n\n");
    s.push_str("if [ -z \"$INPUT_PREFIX\" ] || [ -z \"$OUTPUT_DIR\" ]; then\n");
    s.push_str("    echo \"Usage: $0 <input_prefix> <output_dir>\" >&2\n");
    s.push_str("    exit 1\n");
    s.push_str("fi\n\n");
    s.push_str("mkdir -p \"$OUTPUT_DIR\" || exit 1\n\n");
    s.push_str("FAILED=0\n");
    s.push_str("echo \"Processing PRS scores for $INPUT_PREFIX...\"\n");

    for inv in plan.invocations(INPUT_VAR, OUTPUT_VAR) {
        let mut line = quote_word(&inv.executable);
        for arg in &inv.args {
            line.push(' ');
            line.push_str(&quote_word(arg));
        }
        let _ = write!(
            s,
            "\necho {}\nif {}; then\n    echo {}\nelse\n    echo {}\n    FAILED=$((FAILED + 1))\nfi\n",
            quote_word(&format!("Processing {}...", inv.model)),
            line,
            quote_word(&format!("OK {}", inv.model)),
            quote_word(&format!("FAILED {}", inv.model)),
        );
    }

    s.push_str("\necho \"All PRS scores processed ($FAILED failed)\"\n");
    s.push_str("echo \"Results saved in: $OUTPUT_DIR\"\n");
    s.push_str("exit 0\n");
    s
}

/// Double-quotes `word` for bash. The driver's own `${INPUT_PREFIX}` and
/// `${OUTPUT_DIR}` stay expandable; every other `$` is escaped.
fn quote_word(word: &str) -> String {
    let mut out = String::with_capacity(word.len() + 2);
    out.push('"');
    let mut rest = word;
    while let Some(ch) = rest.chars().next() {
        if let Some(var) = [INPUT_VAR, OUTPUT_VAR].iter().find(|v| rest.starts_with(**v)) {
            out.push_str(var);
            rest = &rest[var.len()..];
            continue;
        }
        if matches!(ch, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out.push('"');
    out
}

/// Writes the driver to `path` with mode 0755. The file is replaced
/// atomically so a concurrently running driver is never truncated.
pub fn write_script(plan: &ScorePlan, path: &Path) -> Result<PathBuf> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let content = render_script(plan);
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o755))?;
    }
    tmp.persist(path).map_err(|e| PipelineError::Io(e.error))?;

    info!(
        script = %path.display(),
        models = plan.models().len(),
        "score driver written"
    );
    Ok(path.to_path_buf())
}
