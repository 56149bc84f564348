//! Host identification and ad-hoc command execution.

use anyhow::Result;
use serde::Serialize;

use super::command;

/// Basic host identification.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub hostname: String,
    pub kernel: String,
    pub os: String,
    /// Convenience blob combining the three lines above.
    pub info: String,
}

/// Extended host information for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedSystemInfo {
    pub hostname: String,
    pub kernel: String,
    pub os: String,
    /// Seconds since boot.
    pub uptime: f64,
}

/// Result of an ad-hoc shell command.
///
/// Command failure is reported as data (`error: true`) rather than as an
/// HTTP-level error so the console can render the output either way.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub output: String,
    pub error: bool,
}

/// Gather hostname, kernel release and distribution description.
///
/// Each lookup falls back to a placeholder when the underlying tool is
/// missing so the endpoint never fails outright.
pub async fn system_info() -> SystemInfo {
    let hostname = command::run("hostname", &[])
        .await
        .unwrap_or_else(|_| "Unknown".to_string());
    let kernel = command::run("uname", &["-r"])
        .await
        .unwrap_or_else(|_| "Unknown".to_string());
    let os = command::run("lsb_release", &["-d"])
        .await
        .unwrap_or_else(|_| "Ubuntu".to_string());

    let info = format!("{}\n{}\n{}", hostname, kernel, os);
    SystemInfo {
        hostname,
        kernel,
        os,
        info,
    }
}

/// Gather detailed host information from procfs and os-release.
pub async fn detailed_system_info() -> DetailedSystemInfo {
    let hostname = command::run("hostname", &[])
        .await
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let kernel = command::run("uname", &["-r"])
        .await
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let os = tokio::fs::read_to_string("/etc/os-release")
        .await
        .unwrap_or_default();
    let uptime = tokio::fs::read_to_string("/proc/uptime")
        .await
        .ok()
        .and_then(|content| parse_uptime(&content))
        .unwrap_or(0.0);

    DetailedSystemInfo {
        hostname,
        kernel,
        os,
        uptime,
    }
}

/// Run an arbitrary command line through `bash -c`.
pub async fn execute_command(command_line: &str) -> Result<CommandResult> {
    let (output, success) = command::run_shell(command_line).await?;
    Ok(CommandResult {
        output,
        error: !success,
    })
}

/// First field of /proc/uptime is seconds since boot.
pub fn parse_uptime(content: &str) -> Option<f64> {
    content.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uptime() {
        assert_eq!(parse_uptime("12345.67 98765.43\n"), Some(12345.67));
        assert_eq!(parse_uptime(""), None);
        assert_eq!(parse_uptime("garbage"), None);
    }

    #[tokio::test]
    async fn test_execute_command_success() {
        let result = execute_command("echo hello").await.unwrap();
        assert_eq!(result.output.trim(), "hello");
        assert!(!result.error);
    }

    #[tokio::test]
    async fn test_execute_command_failure_still_returns_output() {
        let result = execute_command("echo partial; false").await.unwrap();
        assert!(result.output.contains("partial"));
        assert!(result.error);
    }
}
