//! Helpers for invoking system utilities.

use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::process::Command;

/// Run a command and return its stdout as a string.
///
/// Fails if the command cannot be spawned or exits non-zero; stderr is
/// included in the error message for diagnostics.
pub async fn run(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("spawning {}", program))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "{} {} failed ({}): {}",
            program,
            args.join(" "),
            output.status,
            stderr.trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a command and return combined stdout+stderr along with a success flag.
///
/// Used where the console reports command failure as data rather than as an
/// HTTP error (e.g. ad-hoc shell execution).
pub async fn run_combined(program: &str, args: &[&str]) -> Result<(String, bool)> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("spawning {}", program))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok((combined, output.status.success()))
}

/// Run a shell command line through `bash -c`.
pub async fn run_shell(command_line: &str) -> Result<(String, bool)> {
    run_combined("bash", &["-c", command_line]).await
}

/// Run a privileged command through sudo.
pub async fn run_sudo(args: &[&str]) -> Result<String> {
    run("sudo", args).await
}

/// Run a privileged command with a string piped to its stdin.
pub async fn run_sudo_with_stdin(args: &[&str], stdin_data: &str) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut child = Command::new("sudo")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .context("spawning sudo")?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(stdin_data.as_bytes())
            .await
            .context("writing to sudo stdin")?;
    }

    let output = child.wait_with_output().await.context("waiting for sudo")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("sudo {} failed: {}", args.join(" "), stderr.trim());
    }

    Ok(())
}
