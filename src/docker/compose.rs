//! Docker Compose project discovery and lifecycle.
//!
//! Projects are compose files found under the home directory, `/opt` and
//! `/var/lib/docker/compose`; lifecycle operations shell out to
//! `docker compose -f <file>`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::system::command;

/// Directory depth limit for the compose file scan.
const SCAN_DEPTH: usize = 4;

const COMPOSE_FILE_NAMES: [&str; 2] = ["docker-compose.yml", "docker-compose.yaml"];

#[derive(Debug, Clone, Serialize)]
pub struct ComposeProject {
    pub name: String,
    pub path: PathBuf,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComposeProjectDetail {
    pub project: ComposeProject,
    pub content: String,
    pub containers: serde_json::Value,
}

fn project_name(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn search_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Some(home) = dirs::home_dir() {
        roots.push(home);
    }
    roots.push(PathBuf::from("/opt"));
    roots.push(PathBuf::from("/var/lib/docker/compose"));
    roots
}

/// Find compose files under the conventional roots and report each
/// project's status.
pub async fn list_projects() -> Vec<ComposeProject> {
    let mut projects = Vec::new();
    for root in search_roots() {
        let mut files = Vec::new();
        scan_compose_files(&root, SCAN_DEPTH, &mut files).await;
        for path in files {
            let status = project_status(&path).await;
            projects.push(ComposeProject {
                name: project_name(&path),
                path,
                status,
            });
        }
    }
    projects
}

/// Walk a directory tree to a bounded depth collecting compose files.
/// Unreadable directories are skipped.
async fn scan_compose_files(root: &Path, depth: usize, found: &mut Vec<PathBuf>) {
    let mut pending = vec![(root.to_path_buf(), depth)];

    while let Some((dir, depth)) = pending.pop() {
        let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
            continue;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if file_type.is_dir() {
                if depth > 0 {
                    pending.push((path, depth - 1));
                }
            } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if COMPOSE_FILE_NAMES.contains(&name) {
                    found.push(path);
                }
            }
        }
    }
}

async fn project_status(compose_file: &Path) -> String {
    let running = command::run(
        "docker",
        &[
            "compose",
            "-f",
            &compose_file.to_string_lossy(),
            "ps",
            "--format",
            "json",
        ],
    )
    .await
    .map(|output| output.lines().any(|l| !l.trim().is_empty()))
    .unwrap_or(false);

    if running { "running" } else { "stopped" }.to_string()
}

/// Compose file content plus live container state for one project.
pub async fn project_detail(compose_file: &Path) -> Result<ComposeProjectDetail> {
    let content = tokio::fs::read_to_string(compose_file)
        .await
        .with_context(|| format!("project file not found: {}", compose_file.display()))?;

    let containers = match command::run(
        "docker",
        &[
            "compose",
            "-f",
            &compose_file.to_string_lossy(),
            "ps",
            "--format",
            "json",
        ],
    )
    .await
    {
        // `docker compose ps --format json` emits one JSON object per line.
        Ok(output) => serde_json::Value::Array(
            output
                .lines()
                .filter_map(|line| serde_json::from_str(line).ok())
                .collect(),
        ),
        Err(_) => serde_json::Value::Array(Vec::new()),
    };

    let status = project_status(compose_file).await;
    Ok(ComposeProjectDetail {
        project: ComposeProject {
            name: project_name(compose_file),
            path: compose_file.to_path_buf(),
            status,
        },
        content,
        containers,
    })
}

/// Write compose file content. The parent directory must already exist.
pub async fn save_project(compose_file: &Path, content: &str) -> Result<()> {
    anyhow::ensure!(
        compose_file.is_absolute(),
        "invalid project path: {}",
        compose_file.display()
    );
    tokio::fs::write(compose_file, content)
        .await
        .with_context(|| format!("saving {}", compose_file.display()))?;
    Ok(())
}

pub async fn up(compose_file: &Path) -> Result<String> {
    compose_command(compose_file, &["up", "-d"]).await
}

pub async fn down(compose_file: &Path) -> Result<String> {
    compose_command(compose_file, &["down"]).await
}

pub async fn restart(compose_file: &Path) -> Result<String> {
    compose_command(compose_file, &["restart"]).await
}

async fn compose_command(compose_file: &Path, action: &[&str]) -> Result<String> {
    let file = compose_file.to_string_lossy();
    let mut args = vec!["compose", "-f", file.as_ref()];
    args.extend_from_slice(action);

    let (output, success) = command::run_combined("docker", &args).await?;
    anyhow::ensure!(success, "docker compose {} failed: {}", action[0], output.trim());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_name() {
        assert_eq!(
            project_name(Path::new("/opt/stack/docker-compose.yml")),
            "stack"
        );
        assert_eq!(project_name(Path::new("docker-compose.yml")), "");
    }

    #[tokio::test]
    async fn test_scan_finds_compose_files() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("web");
        std::fs::create_dir(&project).unwrap();
        std::fs::write(project.join("docker-compose.yml"), "services: {}").unwrap();
        std::fs::write(root.path().join("unrelated.yml"), "").unwrap();

        let nested = root.path().join("a").join("b").join("stack");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("docker-compose.yaml"), "services: {}").unwrap();

        let mut found = Vec::new();
        scan_compose_files(root.path(), SCAN_DEPTH, &mut found).await;
        found.sort();

        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|p| p.ends_with("web/docker-compose.yml")));
        assert!(
            found
                .iter()
                .any(|p| p.ends_with("a/b/stack/docker-compose.yaml"))
        );
    }

    #[tokio::test]
    async fn test_scan_respects_depth_limit() {
        let root = tempfile::tempdir().unwrap();
        let deep = root.path().join("1/2/3/4/5/6");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::write(deep.join("docker-compose.yml"), "").unwrap();

        let mut found = Vec::new();
        scan_compose_files(root.path(), SCAN_DEPTH, &mut found).await;
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_save_rejects_relative_paths() {
        assert!(save_project(Path::new("relative/docker-compose.yml"), "x")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_project_detail_reads_content() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("docker-compose.yml");
        std::fs::write(&file, "services:\n  web: {}\n").unwrap();

        let detail = project_detail(&file).await.unwrap();
        assert!(detail.content.contains("web"));
        assert!(detail.containers.is_array());
    }
}
