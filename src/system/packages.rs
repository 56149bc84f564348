//! Debian package queries and installs via `dpkg` and `apt`.

use anyhow::Result;
use serde::Serialize;
use tracing::{error, info};

use super::command;

/// One installed package from `dpkg --get-selections`.
#[derive(Debug, Clone, Serialize)]
pub struct InstalledPackage {
    pub name: String,
    pub selection: String,
}

/// One hit from `apt-cache search`.
#[derive(Debug, Clone, Serialize)]
pub struct PackageSearchResult {
    pub name: String,
    pub description: String,
}

/// Package names feed a command line; allow only the Debian package charset.
fn valid_package_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '+'))
}

/// List installed packages, excluding deinstalled ones.
pub async fn list_installed() -> Result<Vec<InstalledPackage>> {
    let output = command::run("dpkg", &["--get-selections"]).await?;
    Ok(parse_selections(&output))
}

/// Search the apt cache for packages matching a query.
pub async fn search(query: &str) -> Result<Vec<PackageSearchResult>> {
    anyhow::ensure!(!query.trim().is_empty(), "search query is required");
    let output = command::run("apt-cache", &["search", "--", query]).await?;
    Ok(parse_search_results(&output))
}

/// Kick off a package install in the background.
///
/// apt can take minutes; the request returns immediately and the install
/// finishes (or fails) on its own, mirroring how the console uses it.
pub fn install_detached(package: &str) -> Result<()> {
    anyhow::ensure!(valid_package_name(package), "invalid package name: {package}");

    let package = package.to_string();
    tokio::spawn(async move {
        match command::run_sudo(&["apt-get", "install", "-y", &package]).await {
            Ok(_) => info!(package = %package, "package install finished"),
            Err(err) => error!(package = %package, error = %err, "package install failed"),
        }
    });

    Ok(())
}

pub fn parse_selections(output: &str) -> Vec<InstalledPackage> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let name = fields.next()?.to_string();
            let selection = fields.next()?.to_string();
            if selection == "deinstall" {
                return None;
            }
            Some(InstalledPackage { name, selection })
        })
        .collect()
}

pub fn parse_search_results(output: &str) -> Vec<PackageSearchResult> {
    output
        .lines()
        .filter_map(|line| {
            let (name, description) = line.split_once(" - ")?;
            Some(PackageSearchResult {
                name: name.trim().to_string(),
                description: description.trim().to_string(),
            })
        })
        .collect()
}
