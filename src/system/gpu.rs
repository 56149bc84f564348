//! NVIDIA GPU telemetry via `nvidia-smi`.

use serde::Serialize;

use super::command;

const GPU_QUERY: &str = "--query-gpu=index,name,driver_version,memory.total,memory.used,\
memory.free,utilization.gpu,utilization.memory,temperature.gpu,power.draw,power.limit,fan.speed";
const CSV_FORMAT: &str = "--format=csv,noheader,nounits";

/// Telemetry for one GPU. Memory figures are in MiB, power in watts.
#[derive(Debug, Clone, Serialize)]
pub struct GpuInfo {
    pub index: u32,
    pub name: String,
    pub driver_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuda_version: Option<String>,
    pub memory_total: i64,
    pub memory_used: i64,
    pub memory_free: i64,
    pub gpu_utilization: i64,
    pub memory_utilization: i64,
    pub temperature: i64,
    pub power_draw: i64,
    pub power_limit: i64,
    pub fan_speed: i64,
}

/// Response shape shared by the one-shot endpoint and the stream.
#[derive(Debug, Clone, Serialize)]
pub struct GpuReport {
    pub gpus: Vec<GpuInfo>,
    pub error: String,
}

/// Query all GPUs. A missing nvidia-smi is a normal condition on hosts
/// without NVIDIA hardware and is reported in the payload, not as an error.
pub async fn gpu_info() -> GpuReport {
    let output = match command::run("nvidia-smi", &[GPU_QUERY, CSV_FORMAT]).await {
        Ok(output) => output,
        Err(_) => {
            return GpuReport {
                gpus: Vec::new(),
                error: "NVIDIA GPU not found or nvidia-smi not available".to_string(),
            };
        }
    };

    let mut gpus = parse_gpu_csv(&output);

    if !gpus.is_empty() {
        if let Ok(cuda) =
            command::run("nvidia-smi", &["--query-gpu=cuda_version", CSV_FORMAT]).await
        {
            let cuda = cuda.trim().to_string();
            if !cuda.is_empty() {
                for gpu in &mut gpus {
                    gpu.cuda_version = Some(cuda.clone());
                }
            }
        }
    }

    GpuReport {
        gpus,
        error: String::new(),
    }
}

/// Parse the csv,noheader,nounits query output.
pub fn parse_gpu_csv(output: &str) -> Vec<GpuInfo> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() < 12 {
                return None;
            }

            // Fields like power.draw come back as "[N/A]" on some cards.
            let int = |s: &str| s.parse::<i64>().unwrap_or(0);

            Some(GpuInfo {
                index: fields[0].parse().unwrap_or(0),
                name: fields[1].to_string(),
                driver_version: fields[2].to_string(),
                cuda_version: None,
                memory_total: int(fields[3]),
                memory_used: int(fields[4]),
                memory_free: int(fields[5]),
                gpu_utilization: int(fields[6]),
                memory_utilization: int(fields[7]),
                temperature: int(fields[8]),
                power_draw: int(fields[9]),
                power_limit: int(fields[10]),
                fan_speed: int(fields[11]),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gpu_csv() {
        let output = "\
0, NVIDIA GeForce RTX 4090, 550.54.14, 24564, 1024, 23540, 15, 5, 42, 68, 450, 30
1, NVIDIA GeForce RTX 4090, 550.54.14, 24564, 20000, 4564, 98, 80, 78, 430, 450, 85
";
        let gpus = parse_gpu_csv(output);
        assert_eq!(gpus.len(), 2);
        assert_eq!(gpus[0].index, 0);
        assert_eq!(gpus[0].name, "NVIDIA GeForce RTX 4090");
        assert_eq!(gpus[0].driver_version, "550.54.14");
        assert_eq!(gpus[0].memory_total, 24564);
        assert_eq!(gpus[1].gpu_utilization, 98);
        assert_eq!(gpus[1].fan_speed, 85);
    }

    #[test]
    fn test_parse_gpu_csv_tolerates_na() {
        let output = "0, Tesla K80, 470.1, 11441, 0, 11441, 0, 0, 35, [N/A], 149, [N/A]\n";
        let gpus = parse_gpu_csv(output);
        assert_eq!(gpus.len(), 1);
        assert_eq!(gpus[0].power_draw, 0);
        assert_eq!(gpus[0].fan_speed, 0);
    }

    #[test]
    fn test_parse_gpu_csv_skips_short_lines() {
        assert!(parse_gpu_csv("0, name, driver\n\n").is_empty());
    }
}
