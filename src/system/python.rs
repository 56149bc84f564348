//! Python interpreter and virtual environment management.
//!
//! Wraps `pyenv`, `python -m venv`, `virtualenv`, `conda` and per-env `pip`
//! binaries. Environments are discovered from pyenv/conda listings plus the
//! conventional home-directory locations (`~/.virtualenvs`, `~/venv`,
//! `~/.venv`).

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::command;

/// An installed Python interpreter.
#[derive(Debug, Clone, Serialize)]
pub struct PythonVersion {
    pub version: String,
    pub path: String,
    pub current: bool,
}

/// A discovered virtual environment.
#[derive(Debug, Clone, Serialize)]
pub struct VirtualEnv {
    pub name: String,
    pub path: PathBuf,
    pub python: String,
    pub active: bool,
}

/// One package in an environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PythonPackage {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvKind {
    #[default]
    Venv,
    Virtualenv,
    Conda,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnvRequest {
    pub name: String,
    #[serde(default)]
    pub python_path: String,
    #[serde(default)]
    pub kind: EnvKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEnvRequest {
    pub name: String,
    #[serde(default)]
    pub kind: EnvKind,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Locates an environment for package operations: conda envs by name,
/// venv/virtualenv by path.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvSelector {
    #[serde(default)]
    pub env_path: Option<PathBuf>,
    #[serde(default)]
    pub env_name: String,
    #[serde(default)]
    pub env_kind: EnvKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRequest {
    #[serde(flatten)]
    pub env: EnvSelector,
    pub package_name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementsRequest {
    #[serde(flatten)]
    pub env: EnvSelector,
    pub requirements: String,
}

#[derive(Debug, Error)]
pub enum PythonError {
    #[error("invalid environment name: {0}")]
    InvalidEnvName(String),
    #[error("invalid package name: {0}")]
    InvalidPackageName(String),
    #[error("environment path is required")]
    MissingEnvPath,
    #[error("not a virtual environment: {0}")]
    NotAVirtualEnv(PathBuf),
    #[error(transparent)]
    Command(#[from] anyhow::Error),
}

fn validate_env_name(name: &str) -> Result<(), PythonError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(PythonError::InvalidEnvName(name.to_string()))
    }
}

/// PEP 508 project name charset; version pins go through a separate field.
fn validate_package_name(name: &str) -> Result<(), PythonError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '[' | ']'));
    if valid {
        Ok(())
    } else {
        Err(PythonError::InvalidPackageName(name.to_string()))
    }
}

/// The pip binary inside a venv, erroring when the path is not one.
fn env_pip(env_path: Option<&Path>) -> Result<PathBuf, PythonError> {
    let env_path = env_path.ok_or(PythonError::MissingEnvPath)?;
    let pip = env_path.join("bin").join("pip");
    if pip.exists() {
        Ok(pip)
    } else {
        Err(PythonError::NotAVirtualEnv(env_path.to_path_buf()))
    }
}

/// List interpreters known to pyenv plus the system python3.
pub async fn python_versions() -> Vec<PythonVersion> {
    let mut versions = Vec::new();

    if let Ok(output) = command::run("pyenv", &["versions"]).await {
        versions.extend(parse_pyenv_versions(&output));
    }

    if let Ok(output) = command::run("python3", &["--version"]).await {
        let version = output.trim().trim_start_matches("Python ").to_string();
        let path = command::run("which", &["python3"])
            .await
            .map(|p| p.trim().to_string())
            .unwrap_or_default();
        let current = versions.is_empty();
        versions.push(PythonVersion {
            version,
            path,
            current,
        });
    }

    versions
}

/// Discover virtual environments from conda and the home-directory
/// convention paths.
pub async fn list_environments() -> Vec<VirtualEnv> {
    let mut environments = Vec::new();

    if let Ok(output) = command::run("conda", &["env", "list"]).await {
        for mut env in parse_conda_env_list(&output) {
            env.python = interpreter_version(&env.path).await;
            environments.push(env);
        }
    }

    environments.extend(scan_venv_dirs(&venv_base_dirs()).await);
    environments
}

fn venv_base_dirs() -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };
    vec![
        home.join(".virtualenvs"),
        home.join("venv"),
        home.join(".venv"),
    ]
}

/// Scan base directories for subdirectories carrying a `bin/python`.
async fn scan_venv_dirs(bases: &[PathBuf]) -> Vec<VirtualEnv> {
    let mut found = Vec::new();
    for base in bases {
        let Ok(mut entries) = tokio::fs::read_dir(base).await else {
            continue;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let dir = entry.path();
            if !dir.is_dir() || !dir.join("bin").join("python").exists() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let python = interpreter_version(&dir).await;
            found.push(VirtualEnv {
                name,
                path: dir,
                python,
                active: false,
            });
        }
    }
    found
}

async fn interpreter_version(env_path: &Path) -> String {
    let python = env_path.join("bin").join("python");
    command::run(&python.to_string_lossy(), &["--version"])
        .await
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Create a new environment, returning its path.
pub async fn create_environment(req: &CreateEnvRequest) -> Result<PathBuf, PythonError> {
    validate_env_name(&req.name)?;
    let home = dirs::home_dir().context("no home directory")?;

    let python = if req.python_path.is_empty() {
        "python3"
    } else {
        &req.python_path
    };

    match req.kind {
        EnvKind::Conda => {
            command::run("conda", &["create", "-n", &req.name, "python", "-y"]).await?;
            Ok(home.join("anaconda3").join("envs").join(&req.name))
        }
        EnvKind::Virtualenv => {
            let env_path = home.join(".virtualenvs").join(&req.name);
            command::run(
                "virtualenv",
                &["-p", python, &env_path.to_string_lossy()],
            )
            .await?;
            Ok(env_path)
        }
        EnvKind::Venv => {
            let env_path = home.join("venv").join(&req.name);
            command::run(python, &["-m", "venv", &env_path.to_string_lossy()]).await?;
            Ok(env_path)
        }
    }
}

/// Delete an environment. For venv/virtualenv the directory is removed;
/// the path must actually be a virtual environment.
pub async fn delete_environment(req: &DeleteEnvRequest) -> Result<(), PythonError> {
    validate_env_name(&req.name)?;

    match req.kind {
        EnvKind::Conda => {
            command::run("conda", &["env", "remove", "-n", &req.name, "-y"]).await?;
        }
        EnvKind::Venv | EnvKind::Virtualenv => {
            let path = req.path.as_deref().ok_or(PythonError::MissingEnvPath)?;
            // Refuse to remove anything that does not look like a venv.
            env_pip(Some(path))?;
            tokio::fs::remove_dir_all(path)
                .await
                .context("removing environment directory")?;
        }
    }
    Ok(())
}

/// List packages installed in an environment.
pub async fn list_packages(env: &EnvSelector) -> Result<Vec<PythonPackage>, PythonError> {
    let output = match env.env_kind {
        EnvKind::Conda => {
            validate_env_name(&env.env_name)?;
            command::run("conda", &["list", "-n", &env.env_name, "--json"]).await?
        }
        _ => {
            let pip = env_pip(env.env_path.as_deref())?;
            command::run(&pip.to_string_lossy(), &["list", "--format=json"]).await?
        }
    };

    let packages: Vec<PythonPackage> =
        serde_json::from_str(&output).context("parsing package list")?;
    Ok(packages)
}

/// Install a package, optionally pinned to a version.
pub async fn install_package(req: &PackageRequest) -> Result<(), PythonError> {
    validate_package_name(&req.package_name)?;

    let spec = if req.version.is_empty() {
        req.package_name.clone()
    } else {
        format!("{}=={}", req.package_name, req.version)
    };

    match req.env.env_kind {
        EnvKind::Conda => {
            validate_env_name(&req.env.env_name)?;
            command::run("conda", &["install", "-n", &req.env.env_name, &spec, "-y"]).await?;
        }
        _ => {
            let pip = env_pip(req.env.env_path.as_deref())?;
            command::run(&pip.to_string_lossy(), &["install", &spec]).await?;
        }
    }
    Ok(())
}

/// Uninstall a package from an environment.
pub async fn uninstall_package(req: &PackageRequest) -> Result<(), PythonError> {
    validate_package_name(&req.package_name)?;

    match req.env.env_kind {
        EnvKind::Conda => {
            validate_env_name(&req.env.env_name)?;
            command::run(
                "conda",
                &["uninstall", "-n", &req.env.env_name, &req.package_name, "-y"],
            )
            .await?;
        }
        _ => {
            let pip = env_pip(req.env.env_path.as_deref())?;
            command::run(&pip.to_string_lossy(), &["uninstall", &req.package_name, "-y"]).await?;
        }
    }
    Ok(())
}

/// Export an environment as requirements text (`pip freeze` or
/// `conda env export`).
pub async fn generate_requirements(env: &EnvSelector) -> Result<String, PythonError> {
    match env.env_kind {
        EnvKind::Conda => {
            validate_env_name(&env.env_name)?;
            Ok(command::run("conda", &["env", "export", "-n", &env.env_name]).await?)
        }
        _ => {
            let pip = env_pip(env.env_path.as_deref())?;
            Ok(command::run(&pip.to_string_lossy(), &["freeze"]).await?)
        }
    }
}

/// Install packages from submitted requirements text.
///
/// The text is staged in a temp file that lives for the duration of the
/// install and is cleaned up on drop.
pub async fn install_requirements(req: &RequirementsRequest) -> Result<(), PythonError> {
    let mut file = tempfile::Builder::new()
        .prefix("requirements-")
        .suffix(".txt")
        .tempfile()
        .context("creating requirements file")?;
    file.write_all(req.requirements.as_bytes())
        .context("writing requirements file")?;
    let file_path = file.path().to_string_lossy().into_owned();

    match req.env.env_kind {
        EnvKind::Conda => {
            validate_env_name(&req.env.env_name)?;
            command::run(
                "conda",
                &["env", "update", "-n", &req.env.env_name, "--file", &file_path],
            )
            .await?;
        }
        _ => {
            let pip = env_pip(req.env.env_path.as_deref())?;
            command::run(&pip.to_string_lossy(), &["install", "-r", &file_path]).await?;
        }
    }
    Ok(())
}

/// Search PyPI via `pip search`. The subcommand is disabled on modern pip
/// releases, so a failure degrades to an empty result rather than an error.
pub async fn search_packages(query: &str) -> Result<Vec<PythonPackage>> {
    anyhow::ensure!(!query.trim().is_empty(), "search query is required");

    match command::run("pip", &["search", "--", query]).await {
        Ok(output) => Ok(parse_pip_search(&output)),
        Err(_) => Ok(Vec::new()),
    }
}

/// Parse `pyenv versions` output. The `system` row is skipped; a leading
/// `*` marks the active version.
pub fn parse_pyenv_versions(output: &str) -> Vec<PythonVersion> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains("system"))
        .map(|line| {
            let current = line.starts_with('*');
            let version = line
                .trim_start_matches('*')
                .trim()
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string();
            let path = format!("~/.pyenv/versions/{}/bin/python", version);
            PythonVersion {
                version,
                path,
                current,
            }
        })
        .collect()
}

/// Parse `conda env list` output: `name  [*]  /path`, comments skipped.
pub fn parse_conda_env_list(output: &str) -> Vec<VirtualEnv> {
    output
        .lines()
        .filter(|line| !line.starts_with('#') && line.contains('/'))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 2 {
                return None;
            }
            Some(VirtualEnv {
                name: fields[0].to_string(),
                path: PathBuf::from(fields[fields.len() - 1]),
                python: String::new(),
                active: line.contains('*'),
            })
        })
        .collect()
}

/// Parse legacy `pip search` lines of the form `name (version) - summary`.
pub fn parse_pip_search(output: &str) -> Vec<PythonPackage> {
    output
        .lines()
        .filter_map(|line| {
            let open = line.find('(')?;
            let close = line[open..].find(')')? + open;
            let name = line[..open].trim();
            let version = line[open + 1..close].trim();
            if name.is_empty() || version.is_empty() {
                return None;
            }
            Some(PythonPackage {
                name: name.to_string(),
                version: version.to_string(),
            })
        })
        .collect()
}
