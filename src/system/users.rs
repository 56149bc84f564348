//! Linux account management via passwd parsing and the shadow-utils tools.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::command;

/// A Linux account as shown in the console.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinuxUser {
    pub username: String,
    pub uid: u32,
    pub gid: u32,
    pub full_name: String,
    pub home_dir: String,
    pub shell: String,
    pub is_system: bool,
    pub groups: Vec<String>,
    pub has_sudo: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserList {
    pub users: Vec<LinuxUser>,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub shell: String,
    #[serde(default)]
    pub create_home: bool,
    #[serde(default)]
    pub initial_groups: Vec<String>,
    #[serde(default)]
    pub grant_sudo: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub shell: String,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub has_sudo: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub username: String,
    pub new_password: String,
    #[serde(default)]
    pub force_change: bool,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("invalid username: {0}")]
    InvalidUsername(String),
    #[error("invalid group name: {0}")]
    InvalidGroup(String),
    #[error(transparent)]
    Command(#[from] anyhow::Error),
}

/// POSIX portable username charset plus the trailing `$` samba allows.
fn validate_username(name: &str) -> Result<(), UserError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => chars.all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '$')
        }),
        _ => false,
    };
    if valid && name.len() <= 32 {
        Ok(())
    } else {
        Err(UserError::InvalidUsername(name.to_string()))
    }
}

fn validate_group(name: &str) -> Result<(), UserError> {
    if !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
    {
        Ok(())
    } else {
        Err(UserError::InvalidGroup(name.to_string()))
    }
}

/// List all accounts from /etc/passwd, enriched with group membership.
pub async fn list_users() -> Result<UserList> {
    let passwd = tokio::fs::read_to_string("/etc/passwd").await?;
    let mut users = parse_passwd(&passwd);

    for user in &mut users {
        user.groups = user_groups(&user.username).await;
        user.has_sudo = has_sudo(&user.groups);
    }

    let total = users.len();
    Ok(UserList { users, total })
}

/// Create an account via `useradd`, set its password, then apply groups.
pub async fn create_user(req: &CreateUserRequest) -> Result<(), UserError> {
    validate_username(&req.username)?;
    for group in &req.initial_groups {
        validate_group(group)?;
    }

    let mut args = vec!["useradd"];
    if req.create_home {
        args.push("-m");
    }
    if !req.full_name.is_empty() {
        args.push("-c");
        args.push(&req.full_name);
    }
    args.push("-s");
    let shell = if req.shell.is_empty() {
        "/bin/bash"
    } else {
        &req.shell
    };
    args.push(shell);
    args.push(&req.username);

    command::run_sudo(&args).await?;
    set_password(&req.username, &req.password).await?;

    for group in &req.initial_groups {
        if let Err(err) = add_to_group(&req.username, group).await {
            // Partial group failures do not abort user creation.
            warn!(username = %req.username, group = %group, error = %err, "failed to add group");
        }
    }

    if req.grant_sudo {
        add_to_group(&req.username, "sudo").await?;
    }

    Ok(())
}

/// Update full name, shell, lock state, groups and sudo membership.
pub async fn update_user(username: &str, req: &UpdateUserRequest) -> Result<(), UserError> {
    validate_username(username)?;
    for group in &req.groups {
        validate_group(group)?;
    }

    let mut args = vec!["usermod"];
    if !req.full_name.is_empty() {
        args.push("-c");
        args.push(&req.full_name);
    }
    if !req.shell.is_empty() {
        args.push("-s");
        args.push(&req.shell);
    }
    args.push(if req.is_locked { "-L" } else { "-U" });
    args.push(username);

    command::run_sudo(&args).await?;

    let current_groups = user_groups(username).await;
    for group in &req.groups {
        if !current_groups.contains(group) {
            if let Err(err) = add_to_group(username, group).await {
                warn!(username = %username, group = %group, error = %err, "failed to add group");
            }
        }
    }

    let currently_sudo = has_sudo(&current_groups);
    if req.has_sudo != currently_sudo {
        if req.has_sudo {
            add_to_group(username, "sudo").await?;
        } else {
            remove_from_group(username, "sudo").await?;
        }
    }

    Ok(())
}

/// Delete an account, optionally removing its home directory.
pub async fn delete_user(username: &str, remove_home: bool) -> Result<(), UserError> {
    validate_username(username)?;

    let mut args = vec!["userdel"];
    if remove_home {
        args.push("-r");
    }
    args.push(username);

    command::run_sudo(&args).await?;
    Ok(())
}

/// Change an account password; optionally expire it to force a change at
/// next login.
pub async fn change_password(req: &ChangePasswordRequest) -> Result<(), UserError> {
    validate_username(&req.username)?;
    set_password(&req.username, &req.new_password).await?;

    if req.force_change {
        command::run_sudo(&["chage", "-d", "0", &req.username]).await?;
    }

    Ok(())
}

async fn set_password(username: &str, password: &str) -> Result<()> {
    command::run_sudo_with_stdin(&["chpasswd"], &format!("{}:{}", username, password)).await
}

async fn add_to_group(username: &str, group: &str) -> Result<()> {
    command::run_sudo(&["usermod", "-a", "-G", group, username]).await?;
    Ok(())
}

async fn remove_from_group(username: &str, group: &str) -> Result<()> {
    command::run_sudo(&["gpasswd", "-d", username, group]).await?;
    Ok(())
}

/// Secondary groups from the `groups` tool, empty on any failure.
async fn user_groups(username: &str) -> Vec<String> {
    let Ok(output) = command::run("groups", &[username]).await else {
        return Vec::new();
    };
    parse_groups_output(&output)
}

/// Members of sudo, admin or wheel count as sudoers.
pub fn has_sudo(groups: &[String]) -> bool {
    groups
        .iter()
        .any(|g| matches!(g.as_str(), "sudo" | "admin" | "wheel"))
}

/// Parse /etc/passwd lines into users. Accounts with uid < 1000 are
/// flagged as system accounts.
pub fn parse_passwd(passwd: &str) -> Vec<LinuxUser> {
    passwd
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(':').collect();
            if fields.len() < 7 {
                return None;
            }

            let uid: u32 = fields[2].parse().ok()?;
            let gid: u32 = fields[3].parse().ok()?;

            Some(LinuxUser {
                username: fields[0].to_string(),
                uid,
                gid,
                full_name: fields[4].split(',').next().unwrap_or("").to_string(),
                home_dir: fields[5].to_string(),
                shell: fields[6].to_string(),
                is_system: uid < 1000,
                groups: Vec::new(),
                has_sudo: false,
            })
        })
        .collect()
}

/// Parse `groups user` output of the form `user : group1 group2`.
pub fn parse_groups_output(output: &str) -> Vec<String> {
    let Some((_, groups)) = output.trim().split_once(':') else {
        return Vec::new();
    };
    groups.split_whitespace().map(str::to_string).collect()
}
