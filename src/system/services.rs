//! systemd service management via `systemctl`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::command;

/// One parsed row of `systemctl list-units --type=service`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceUnit {
    pub unit: String,
    pub load: String,
    pub active: String,
    pub sub: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceList {
    /// Raw command output, rendered as-is in the console.
    pub services: String,
    pub units: Vec<ServiceUnit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid service name: {0}")]
    InvalidName(String),
    #[error(transparent)]
    Command(#[from] anyhow::Error),
}

/// Unit names go straight onto a command line, so constrain the charset.
fn validate_unit_name(name: &str) -> Result<(), ServiceError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | ':'));
    if valid {
        Ok(())
    } else {
        Err(ServiceError::InvalidName(name.to_string()))
    }
}

/// List all service units.
pub async fn list_services() -> Result<ServiceList> {
    let output = command::run(
        "systemctl",
        &["list-units", "--type=service", "--no-pager"],
    )
    .await?;

    let units = parse_unit_list(&output);
    Ok(ServiceList {
        services: output,
        units,
    })
}

/// Get `systemctl status` output for one unit.
///
/// `systemctl status` exits non-zero for inactive units; the output is still
/// meaningful, so failure is folded into the returned text.
pub async fn service_status(service: &str) -> Result<String, ServiceError> {
    validate_unit_name(service)?;
    let (output, _) =
        command::run_combined("systemctl", &["status", service, "--no-pager"]).await?;
    Ok(output)
}

/// Start, stop or restart a unit.
pub async fn control_service(service: &str, action: ServiceAction) -> Result<String, ServiceError> {
    validate_unit_name(service)?;
    let output = command::run_sudo(&["systemctl", action.as_str(), service]).await?;
    Ok(output)
}

/// Parse the tabular section of `systemctl list-units` output.
///
/// Rows end at the first blank line; a leading `●` failure marker is
/// stripped before splitting columns.
pub fn parse_unit_list(output: &str) -> Vec<ServiceUnit> {
    output
        .lines()
        .skip_while(|l| !l.contains("UNIT"))
        .skip(1)
        .take_while(|l| !l.trim().is_empty())
        .filter_map(|line| {
            let line = line.trim_start_matches(['●', '*', ' ']);
            let mut fields = line.split_whitespace();
            let unit = fields.next()?.to_string();
            if !unit.ends_with(".service") {
                return None;
            }
            Some(ServiceUnit {
                unit,
                load: fields.next().unwrap_or_default().to_string(),
                active: fields.next().unwrap_or_default().to_string(),
                sub: fields.next().unwrap_or_default().to_string(),
                description: fields.collect::<Vec<_>>().join(" "),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unit_list() {
        let output = "\
  UNIT                     LOAD   ACTIVE SUB     DESCRIPTION
  cron.service             loaded active running Regular background program processing daemon
● ssh.service              loaded failed failed  OpenBSD Secure Shell server
  systemd-logind.service   loaded active running User Login Management

LOAD   = Reflects whether the unit definition was properly loaded.
3 loaded units listed.
";
        let units = parse_unit_list(output);
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].unit, "cron.service");
        assert_eq!(units[0].active, "active");
        assert_eq!(units[1].unit, "ssh.service");
        assert_eq!(units[1].active, "failed");
        assert_eq!(
            units[2].description,
            "User Login Management"
        );
    }

    #[test]
    fn test_parse_unit_list_empty() {
        assert!(parse_unit_list("").is_empty());
    }

    #[test]
    fn test_validate_unit_name() {
        assert!(validate_unit_name("nginx.service").is_ok());
        assert!(validate_unit_name("getty@tty1.service").is_ok());
        assert!(validate_unit_name("bad; rm -rf /").is_err());
        assert!(validate_unit_name("").is_err());
    }

    #[test]
    fn test_action_deserialization() {
        let action: ServiceAction = serde_json::from_str("\"restart\"").unwrap();
        assert_eq!(action, ServiceAction::Restart);
        assert!(serde_json::from_str::<ServiceAction>("\"reload\"").is_err());
    }
}
