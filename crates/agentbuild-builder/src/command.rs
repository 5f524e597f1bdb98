//! External build command execution.

use std::path::Path;
use std::process::Command;

use agentbuild_core::{Error, Result};
use tracing::{debug, info, warn};

/// Run `command` (program followed by arguments) in `cwd` and wait for it.
///
/// Output is forwarded to the log. A non-zero exit status is a
/// [`Error::BuildFailed`] carrying the tail of stderr.
pub fn run_build_command(command: &[String], cwd: &Path, env: &[(&str, String)]) -> Result<()> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| Error::BuildFailed("empty build command".to_string()))?;

    info!(program = %program, ?args, cwd = %cwd.display(), "Running build command");

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .envs(env.iter().map(|(k, v)| (*k, v.as_str())))
        .output()
        .map_err(|e| Error::BuildFailed(format!("failed to start {program}: {e}")))?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        debug!(stream = "stdout", "{line}");
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stderr.lines() {
        debug!(stream = "stderr", "{line}");
    }

    if !output.status.success() {
        warn!(program = %program, status = %output.status, "Build command failed");
        let tail: Vec<&str> = stderr.lines().rev().take(10).collect();
        let tail: Vec<&str> = tail.into_iter().rev().collect();
        return Err(Error::BuildFailed(format!(
            "{program} exited with {}: {}",
            output.status,
            tail.join("\n")
        )));
    }

    Ok(())
}
