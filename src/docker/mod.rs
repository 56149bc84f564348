//! Docker management through the `docker` CLI.
//!
//! Listings use tab-separated `--format` templates so container names and
//! labels containing spaces survive the round trip.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};

use crate::system::command;

pub mod compose;

const PS_FORMAT: &str = "{{.ID}}\t{{.Names}}\t{{.Image}}\t{{.Status}}\t{{.State}}\t\
{{.CreatedAt}}\t{{.Ports}}\t{{.Mounts}}\t{{.Labels}}\t{{.Networks}}\t{{.Size}}";
const IMAGE_FORMAT: &str = "{{.ID}}\t{{.Repository}}\t{{.Tag}}\t{{.Size}}\t{{.CreatedAt}}";
const NETWORK_FORMAT: &str = "{{.ID}}\t{{.Name}}\t{{.Driver}}\t{{.Scope}}";
const VOLUME_FORMAT: &str = "{{.Name}}\t{{.Driver}}\t{{.Mountpoint}}\t{{.Labels}}";
const STATS_FORMAT: &str = "{{.Container}}\t{{.Name}}\t{{.CPUPerc}}\t{{.MemUsage}}\t\
{{.MemPerc}}\t{{.NetIO}}\t{{.BlockIO}}\t{{.PIDs}}";

#[derive(Debug, Clone, Serialize)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    pub state: String,
    pub created: String,
    pub ports: Vec<String>,
    pub mounts: Vec<String>,
    pub labels: HashMap<String, String>,
    pub network_mode: String,
    pub size: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub id: String,
    pub repository: String,
    pub tag: String,
    pub size: String,
    pub created: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkInfo {
    pub id: String,
    pub name: String,
    pub driver: String,
    pub scope: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolumeInfo {
    pub name: String,
    pub driver: String,
    pub mountpoint: String,
    pub labels: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerStats {
    pub id: String,
    pub name: String,
    pub cpu_perc: String,
    pub mem_usage: String,
    pub mem_perc: String,
    pub net_io: String,
    pub block_io: String,
    pub pids: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateContainerRequest {
    #[serde(default)]
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub environment: Vec<String>,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub auto_restart: bool,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

/// List all containers, including stopped ones.
pub async fn list_containers() -> Result<Vec<ContainerInfo>> {
    let output = command::run("docker", &["ps", "-a", "--format", PS_FORMAT]).await?;
    Ok(parse_container_list(&output))
}

/// `docker inspect` output for one container, passed through as JSON.
pub async fn inspect_container(id: &str) -> Result<serde_json::Value> {
    let output = command::run("docker", &["inspect", id]).await?;
    let mut entries: Vec<serde_json::Value> =
        serde_json::from_str(&output).context("parsing docker inspect output")?;
    entries.pop().context("container not found")
}

pub async fn start_container(id: &str) -> Result<()> {
    command::run("docker", &["start", id]).await.map(|_| ())
}

pub async fn stop_container(id: &str) -> Result<()> {
    command::run("docker", &["stop", id]).await.map(|_| ())
}

pub async fn restart_container(id: &str) -> Result<()> {
    command::run("docker", &["restart", id]).await.map(|_| ())
}

pub async fn remove_container(id: &str) -> Result<()> {
    command::run("docker", &["rm", "-f", id]).await.map(|_| ())
}

/// Create and start a detached container, returning its id.
pub async fn create_container(req: &CreateContainerRequest) -> Result<String> {
    let mut args: Vec<String> = vec!["run".into(), "-d".into()];

    if !req.name.is_empty() {
        args.push("--name".into());
        args.push(req.name.clone());
    }
    for port in &req.ports {
        args.push("-p".into());
        args.push(port.clone());
    }
    for volume in &req.volumes {
        args.push("-v".into());
        args.push(volume.clone());
    }
    for env in &req.environment {
        args.push("-e".into());
        args.push(env.clone());
    }
    if !req.network.is_empty() {
        args.push("--network".into());
        args.push(req.network.clone());
    }
    if req.auto_restart {
        args.push("--restart".into());
        args.push("always".into());
    }
    for (key, value) in &req.labels {
        args.push("--label".into());
        args.push(format!("{}={}", key, value));
    }
    args.push(req.image.clone());
    if !req.command.is_empty() {
        args.extend(req.command.split_whitespace().map(str::to_string));
    }

    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = command::run("docker", &arg_refs).await?;
    Ok(output.trim().to_string())
}

/// Fetch a bounded slice of container logs.
pub async fn container_logs(id: &str, tail: &str) -> Result<String> {
    let (output, _) = command::run_combined("docker", &["logs", "--tail", tail, id]).await?;
    Ok(output)
}

/// Spawn `docker logs -f` for streaming.
///
/// The caller owns the child; `kill_on_drop` guarantees the follower dies
/// with the stream even when the socket vanishes mid-read.
pub fn spawn_log_follower(id: &str) -> Result<(Child, Lines<BufReader<ChildStdout>>)> {
    let mut child = Command::new("docker")
        .args(["logs", "-f", "--tail", "100", id])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .context("spawning docker logs")?;

    let stdout = child.stdout.take().context("docker logs has no stdout")?;
    Ok((child, BufReader::new(stdout).lines()))
}

pub async fn list_images() -> Result<Vec<ImageInfo>> {
    let output = command::run("docker", &["images", "--format", IMAGE_FORMAT]).await?;
    Ok(parse_image_list(&output))
}

pub async fn pull_image(image: &str) -> Result<String> {
    command::run("docker", &["pull", image]).await
}

pub async fn remove_image(id: &str) -> Result<()> {
    command::run("docker", &["rmi", "-f", id]).await.map(|_| ())
}

pub async fn list_networks() -> Result<Vec<NetworkInfo>> {
    let output = command::run("docker", &["network", "ls", "--format", NETWORK_FORMAT]).await?;
    Ok(parse_network_list(&output))
}

pub async fn create_network(name: &str, driver: &str) -> Result<String> {
    let mut args = vec!["network", "create"];
    if !driver.is_empty() {
        args.push("--driver");
        args.push(driver);
    }
    args.push(name);
    let output = command::run("docker", &args).await?;
    Ok(output.trim().to_string())
}

pub async fn remove_network(id: &str) -> Result<()> {
    command::run("docker", &["network", "rm", id])
        .await
        .map(|_| ())
}

pub async fn list_volumes() -> Result<Vec<VolumeInfo>> {
    let output = command::run("docker", &["volume", "ls", "--format", VOLUME_FORMAT]).await?;
    Ok(parse_volume_list(&output))
}

pub async fn create_volume(name: &str, driver: &str) -> Result<String> {
    let mut args = vec!["volume", "create"];
    if !driver.is_empty() {
        args.push("--driver");
        args.push(driver);
    }
    args.push(name);
    let output = command::run("docker", &args).await?;
    Ok(output.trim().to_string())
}

pub async fn remove_volume(name: &str) -> Result<()> {
    command::run("docker", &["volume", "rm", name])
        .await
        .map(|_| ())
}

/// One-shot `docker stats` snapshot.
pub async fn container_stats() -> Result<Vec<ContainerStats>> {
    let output = command::run(
        "docker",
        &["stats", "--no-stream", "--format", STATS_FORMAT],
    )
    .await?;
    Ok(parse_stats_list(&output))
}

/// Prune stopped containers, dangling images, unused networks and volumes.
/// Per-resource failures are reported in the result map rather than
/// aborting the sweep.
pub async fn cleanup() -> HashMap<String, String> {
    let mut results = HashMap::new();
    for resource in ["container", "image", "network", "volume"] {
        let entry = match command::run_combined("docker", &[resource, "prune", "-f"]).await {
            Ok((output, true)) => output,
            Ok((output, false)) => format!("Error: {}", output),
            Err(err) => format!("Error: {}", err),
        };
        results.insert(format!("{}s", resource), entry);
    }
    results
}

pub async fn docker_info() -> Result<serde_json::Value> {
    let output = command::run("docker", &["info", "--format", "{{json .}}"]).await?;
    serde_json::from_str(&output).context("parsing docker info output")
}

pub async fn docker_version() -> Result<serde_json::Value> {
    let output = command::run("docker", &["version", "--format", "{{json .}}"]).await?;
    serde_json::from_str(&output).context("parsing docker version output")
}

pub fn parse_container_list(output: &str) -> Vec<ContainerInfo> {
    output
        .lines()
        .filter(|l| !l.is_empty())
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 11 {
                return None;
            }

            let labels = parts[8]
                .split(',')
                .filter_map(|pair| {
                    let (k, v) = pair.split_once('=')?;
                    Some((k.to_string(), v.to_string()))
                })
                .collect();

            Some(ContainerInfo {
                id: parts[0].to_string(),
                name: parts[1].to_string(),
                image: parts[2].to_string(),
                status: parts[3].to_string(),
                state: parts[4].to_string(),
                created: parts[5].to_string(),
                ports: split_list(parts[6]),
                mounts: split_list(parts[7]),
                labels,
                network_mode: parts[9].to_string(),
                size: parts[10].to_string(),
            })
        })
        .collect()
}

fn split_list(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_image_list(output: &str) -> Vec<ImageInfo> {
    output
        .lines()
        .filter(|l| !l.is_empty())
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 5 {
                return None;
            }
            Some(ImageInfo {
                id: parts[0].to_string(),
                repository: parts[1].to_string(),
                tag: parts[2].to_string(),
                size: parts[3].to_string(),
                created: parts[4].to_string(),
            })
        })
        .collect()
}

pub fn parse_network_list(output: &str) -> Vec<NetworkInfo> {
    output
        .lines()
        .filter(|l| !l.is_empty())
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 4 {
                return None;
            }
            Some(NetworkInfo {
                id: parts[0].to_string(),
                name: parts[1].to_string(),
                driver: parts[2].to_string(),
                scope: parts[3].to_string(),
            })
        })
        .collect()
}

pub fn parse_volume_list(output: &str) -> Vec<VolumeInfo> {
    output
        .lines()
        .filter(|l| !l.is_empty())
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 4 {
                return None;
            }
            Some(VolumeInfo {
                name: parts[0].to_string(),
                driver: parts[1].to_string(),
                mountpoint: parts[2].to_string(),
                labels: parts[3].to_string(),
            })
        })
        .collect()
}

pub fn parse_stats_list(output: &str) -> Vec<ContainerStats> {
    output
        .lines()
        .filter(|l| !l.is_empty())
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 8 {
                return None;
            }
            Some(ContainerStats {
                id: parts[0].to_string(),
                name: parts[1].to_string(),
                cpu_perc: parts[2].to_string(),
                mem_usage: parts[3].to_string(),
                mem_perc: parts[4].to_string(),
                net_io: parts[5].to_string(),
                block_io: parts[6].to_string(),
                pids: parts[7].to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_list() {
        let output = "abc123\tweb\tnginx:latest\tUp 2 hours\trunning\t\
2026-08-20 10:00:00\t0.0.0.0:80->80/tcp\t/data\tapp=web,tier=frontend\tbridge\t12MB\n";
        let containers = parse_container_list(output);
        assert_eq!(containers.len(), 1);
        let c = &containers[0];
        assert_eq!(c.id, "abc123");
        assert_eq!(c.name, "web");
        assert_eq!(c.image, "nginx:latest");
        assert_eq!(c.state, "running");
        assert_eq!(c.ports, vec!["0.0.0.0:80->80/tcp"]);
        assert_eq!(c.labels.get("app").map(String::as_str), Some("web"));
        assert_eq!(c.labels.get("tier").map(String::as_str), Some("frontend"));
        assert_eq!(c.network_mode, "bridge");
    }

    #[test]
    fn test_parse_container_list_empty_fields() {
        let output = "abc\tplain\tbusybox\tExited\texited\t2026-01-01\t\t\t\tbridge\t0B\n";
        let containers = parse_container_list(output);
        assert_eq!(containers.len(), 1);
        assert!(containers[0].ports.is_empty());
        assert!(containers[0].labels.is_empty());
    }

    #[test]
    fn test_parse_container_list_skips_short_lines() {
        assert!(parse_container_list("only\tthree\tfields\n").is_empty());
    }

    #[test]
    fn test_parse_image_list() {
        let output = "sha1\tnginx\tlatest\t187MB\t2026-08-01\nsha2\tredis\t7\t117MB\t2026-07-15\n";
        let images = parse_image_list(output);
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].repository, "nginx");
        assert_eq!(images[1].tag, "7");
    }

    #[test]
    fn test_parse_network_list() {
        let output = "n1\tbridge\tbridge\tlocal\nn2\thost\thost\tlocal\n";
        let networks = parse_network_list(output);
        assert_eq!(networks.len(), 2);
        assert_eq!(networks[0].name, "bridge");
        assert_eq!(networks[1].driver, "host");
    }

    #[test]
    fn test_parse_volume_list() {
        let output = "data\tlocal\t/var/lib/docker/volumes/data/_data\t\n";
        let volumes = parse_volume_list(output);
        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes[0].name, "data");
        assert_eq!(volumes[0].mountpoint, "/var/lib/docker/volumes/data/_data");
    }

    #[test]
    fn test_parse_stats_list() {
        let output = "abc\tweb\t0.15%\t10MiB / 1GiB\t1.00%\t1kB / 2kB\t0B / 0B\t4\n";
        let stats = parse_stats_list(output);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].cpu_perc, "0.15%");
        assert_eq!(stats[0].pids, "4");
    }
}
