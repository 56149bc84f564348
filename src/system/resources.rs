//! Resource usage snapshots from procfs, `ps` and `df`.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::command;

#[derive(Debug, Clone, Serialize)]
pub struct SystemResources {
    pub cpu: CpuStats,
    pub memory: MemoryStats,
    pub disk: Vec<DiskStats>,
    pub network: Vec<NetworkStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CpuStats {
    /// Busy share of all jiffies since boot, in percent.
    pub usage: f64,
    pub cores: usize,
    pub load_average: [f64; 3],
    pub processes: Vec<ProcessInfo>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryStats {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub cached: u64,
    pub buffers: u64,
    pub swap: SwapStats,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SwapStats {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskStats {
    pub device: String,
    pub mountpoint: String,
    pub filesystem: String,
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub usage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkStats {
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessInfo {
    pub pid: i32,
    pub name: String,
    pub user: String,
    pub cpu: f64,
    pub memory: f64,
    pub vsz: u64,
    pub rss: u64,
    pub tty: String,
    pub stat: String,
    pub start: String,
    pub time: String,
    pub command: String,
}

#[derive(Debug, Deserialize)]
pub struct KillRequest {
    pub pid: i32,
    #[serde(default)]
    pub signal: String,
}

#[derive(Debug, Deserialize)]
pub struct PriorityRequest {
    pub pid: i32,
    pub priority: i32,
}

/// Collect a full resource snapshot.
pub async fn system_resources() -> SystemResources {
    SystemResources {
        cpu: cpu_stats().await,
        memory: memory_stats().await,
        disk: disk_stats().await,
        network: network_stats().await,
    }
}

async fn cpu_stats() -> CpuStats {
    let stat = tokio::fs::read_to_string("/proc/stat")
        .await
        .unwrap_or_default();
    let cpuinfo = tokio::fs::read_to_string("/proc/cpuinfo")
        .await
        .unwrap_or_default();
    let loadavg = tokio::fs::read_to_string("/proc/loadavg")
        .await
        .unwrap_or_default();
    let ps_output = command::run("ps", &["aux"]).await.unwrap_or_default();

    CpuStats {
        usage: parse_cpu_usage(&stat),
        cores: parse_cpu_cores(&cpuinfo),
        load_average: parse_load_average(&loadavg),
        processes: parse_processes(&ps_output),
    }
}

async fn memory_stats() -> MemoryStats {
    let meminfo = tokio::fs::read_to_string("/proc/meminfo")
        .await
        .unwrap_or_default();
    parse_meminfo(&meminfo)
}

async fn disk_stats() -> Vec<DiskStats> {
    let df_output = command::run("df", &["-h"]).await.unwrap_or_default();
    parse_df(&df_output)
}

async fn network_stats() -> Vec<NetworkStats> {
    let net_dev = tokio::fs::read_to_string("/proc/net/dev")
        .await
        .unwrap_or_default();
    parse_net_dev(&net_dev)
}

/// Send a signal to a process. Defaults to TERM.
pub async fn kill_process(pid: i32, signal: &str) -> Result<String> {
    let signal = if signal.is_empty() { "TERM" } else { signal };
    command::run("kill", &[&format!("-{}", signal), &pid.to_string()]).await?;
    Ok(format!("Process {} killed with signal {}", pid, signal))
}

/// Renice a process.
pub async fn set_process_priority(pid: i32, priority: i32) -> Result<String> {
    command::run("renice", &[&priority.to_string(), &pid.to_string()]).await?;
    Ok(format!("Process {} priority set to {}", pid, priority))
}

/// Busy share of the aggregate cpu line since boot.
///
/// A single snapshot rather than a delta between two reads, so the value
/// reflects the average since boot, not the instantaneous load.
pub fn parse_cpu_usage(stat: &str) -> f64 {
    let Some(first_line) = stat.lines().next() else {
        return 0.0;
    };

    let fields: Vec<u64> = first_line
        .split_whitespace()
        .skip(1)
        .filter_map(|f| f.parse().ok())
        .collect();
    if fields.len() < 7 {
        return 0.0;
    }

    let (user, nice, system, idle, iowait, irq, softirq) = (
        fields[0], fields[1], fields[2], fields[3], fields[4], fields[5], fields[6],
    );

    let total_idle = idle + iowait;
    let total_non_idle = user + nice + system + irq + softirq;
    let total = total_idle + total_non_idle;

    if total == 0 {
        return 0.0;
    }
    total_non_idle as f64 / total as f64 * 100.0
}

pub fn parse_cpu_cores(cpuinfo: &str) -> usize {
    let count = cpuinfo
        .lines()
        .filter(|l| l.starts_with("processor"))
        .count();
    count.max(1)
}

pub fn parse_load_average(loadavg: &str) -> [f64; 3] {
    let mut fields = loadavg.split_whitespace();
    let mut next = || fields.next().and_then(|f| f.parse().ok()).unwrap_or(0.0);
    [next(), next(), next()]
}

/// Parse `ps aux` output, skipping the header row.
pub fn parse_processes(ps_output: &str) -> Vec<ProcessInfo> {
    ps_output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 11 {
                return None;
            }

            Some(ProcessInfo {
                pid: fields[1].parse().ok()?,
                name: fields[10].to_string(),
                user: fields[0].to_string(),
                cpu: fields[2].parse().unwrap_or(0.0),
                memory: fields[3].parse().unwrap_or(0.0),
                vsz: fields[4].parse().unwrap_or(0),
                rss: fields[5].parse().unwrap_or(0),
                tty: fields[6].to_string(),
                stat: fields[7].to_string(),
                start: fields[8].to_string(),
                time: fields[9].to_string(),
                command: fields[10..].join(" "),
            })
        })
        .collect()
}

/// Parse /proc/meminfo. Values are reported in kB; converted to bytes here.
pub fn parse_meminfo(meminfo: &str) -> MemoryStats {
    let lookup = |key: &str| -> u64 {
        meminfo
            .lines()
            .find_map(|line| {
                let (k, v) = line.split_once(':')?;
                if k.trim() != key {
                    return None;
                }
                let v = v.trim().trim_end_matches(" kB").trim();
                v.parse::<u64>().ok()
            })
            .unwrap_or(0)
            * 1024
    };

    let total = lookup("MemTotal");
    let available = lookup("MemAvailable");
    let swap_total = lookup("SwapTotal");
    let swap_free = lookup("SwapFree");

    MemoryStats {
        total,
        available,
        used: total.saturating_sub(available),
        cached: lookup("Cached"),
        buffers: lookup("Buffers"),
        swap: SwapStats {
            total: swap_total,
            used: swap_total.saturating_sub(swap_free),
            free: swap_free,
        },
    }
}

/// Parse `df -h` output into per-filesystem stats.
pub fn parse_df(df_output: &str) -> Vec<DiskStats> {
    df_output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 {
                return None;
            }

            Some(DiskStats {
                device: fields[0].to_string(),
                mountpoint: fields[5].to_string(),
                filesystem: fields[0].to_string(),
                total: parse_size(fields[1]),
                used: parse_size(fields[2]),
                available: parse_size(fields[3]),
                usage: fields[4].trim_end_matches('%').parse().unwrap_or(0.0),
            })
        })
        .collect()
}

/// Parse a human-readable size like `12G`, `512M` or `3.5T` into bytes.
pub fn parse_size(size: &str) -> u64 {
    if size == "-" {
        return 0;
    }

    let (value, multiplier) = match size.chars().last() {
        Some('K') => (&size[..size.len() - 1], 1024u64),
        Some('M') => (&size[..size.len() - 1], 1024 * 1024),
        Some('G') => (&size[..size.len() - 1], 1024 * 1024 * 1024),
        Some('T') => (&size[..size.len() - 1], 1024u64.pow(4)),
        _ => (size, 1),
    };

    value
        .parse::<f64>()
        .map(|v| (v * multiplier as f64) as u64)
        .unwrap_or(0)
}

/// Parse /proc/net/dev, skipping the two header lines.
pub fn parse_net_dev(net_dev: &str) -> Vec<NetworkStats> {
    net_dev
        .lines()
        .skip(2)
        .filter_map(|line| {
            let (name, counters) = line.split_once(':')?;
            let fields: Vec<&str> = counters.split_whitespace().collect();
            if fields.len() < 16 {
                return None;
            }

            let rx_bytes: u64 = fields[0].parse().unwrap_or(0);
            let rx_packets: u64 = fields[1].parse().unwrap_or(0);
            let tx_bytes: u64 = fields[8].parse().unwrap_or(0);
            let tx_packets: u64 = fields[9].parse().unwrap_or(0);

            let status = if rx_bytes > 0 || tx_bytes > 0 {
                "up"
            } else {
                "down"
            };

            Some(NetworkStats {
                interface: name.trim().to_string(),
                rx_bytes,
                tx_bytes,
                rx_packets,
                tx_packets,
                status: status.to_string(),
            })
        })
        .collect()
}
