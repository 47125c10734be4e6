use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::context::ConfigContext;
use crate::error::{Error, Result};
use crate::utils::shell;

pub struct SshClient {
    pub host: String,
    pub user: Option<String>,
    pub port: u16,
    pub identity_file: Option<String>,
    /// When true, all commands run locally instead of over SSH.
    /// Set automatically when the host is localhost/127.0.0.1/::1.
    pub is_local: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl SshClient {
    /// Build a client for `host` using `SSH_USER`, `SSH_PORT` and
    /// `SSH_IDENTITY_FILE` from the context.
    pub fn for_host(ctx: &ConfigContext, host: &str) -> Result<Self> {
        let identity_file = match ctx.value("ssh_identity_file") {
            Some(path) if !path.trim().is_empty() => {
                let expanded = ctx.expand_path(path.trim());
                if !expanded.exists() {
                    return Err(Error::ssh_identity_file_not_found(
                        host.to_string(),
                        expanded.display().to_string(),
                    ));
                }
                Some(expanded.display().to_string())
            }
            _ => None,
        };

        let port = match ctx.value("ssh_port").map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                Error::config_invalid_value("ssh_port", Some(raw.to_string()), "expected a port number")
            })?,
            None => 22,
        };

        let user = ctx
            .value("ssh_user")
            .map(str::trim)
            .filter(|u| !u.is_empty() && !host.contains('@'))
            .map(str::to_string);

        let is_local = is_local_host(host);
        if is_local {
            log_status!("ssh", "Host '{}' is localhost, using local execution", host);
        }

        Ok(Self {
            host: host.to_string(),
            user,
            port,
            identity_file,
            is_local,
        })
    }

    fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }

    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(identity_file) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        // Fail fast instead of hanging on prompts or stalled connections.
        args.extend([
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
            "-o".to_string(),
            "ServerAliveInterval=15".to_string(),
            "-o".to_string(),
            "ServerAliveCountMax=3".to_string(),
        ]);

        args.push(self.destination());
        args.push(command.to_string());

        args
    }

    /// Run `command` once on the host. `ssh` does not forward the local
    /// environment, so the directory change and exports are folded into the
    /// remote command line.
    pub fn execute(
        &self,
        command: &str,
        working_directory: Option<&str>,
        env: &BTreeMap<String, String>,
        capture: bool,
    ) -> Result<CommandOutput> {
        if self.is_local {
            return execute_local_command_in_dir(command, working_directory.map(Path::new), env, capture);
        }

        let remote = remote_command(command, working_directory, env);
        let mut cmd = Command::new("ssh");
        cmd.args(self.build_ssh_args(&remote));
        run(cmd, &format!("ssh {}", self.destination()), capture)
    }
}

/// `cd <dir> && export K=V && <command>`, omitting empty parts.
pub fn remote_command(
    command: &str,
    working_directory: Option<&str>,
    env: &BTreeMap<String, String>,
) -> String {
    let mut parts = Vec::new();
    if let Some(dir) = working_directory {
        parts.push(format!("cd {}", shell::quote_remote_path(dir)));
    }
    if let Some(exports) = shell::export_clause(env) {
        parts.push(exports);
    }
    parts.push(command.to_string());
    parts.join(" && ")
}

pub fn execute_local_command_in_dir(
    command: &str,
    current_dir: Option<&Path>,
    env: &BTreeMap<String, String>,
    capture: bool,
) -> Result<CommandOutput> {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }

    cmd.envs(env);

    run(cmd, command, capture)
}

fn run(mut cmd: Command, display: &str, capture: bool) -> Result<CommandOutput> {
    if capture {
        let out = cmd
            .output()
            .map_err(|e| Error::command_spawn_failed(display, e.to_string()))?;
        return Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
            success: out.status.success(),
            exit_code: out.status.code().unwrap_or(-1),
        });
    }

    let status = cmd
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| Error::command_spawn_failed(display, e.to_string()))?;

    Ok(CommandOutput {
        stdout: String::new(),
        stderr: String::new(),
        success: status.success(),
        exit_code: status.code().unwrap_or(-1),
    })
}

/// Check if a host address refers to the local machine.
pub fn is_local_host(host: &str) -> bool {
    let host = host.rsplit('@').next().unwrap_or(host);
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Defaults;
    use tempfile::TempDir;

    fn ctx(env: &[(&str, &str)]) -> ConfigContext {
        ConfigContext::initialize(Defaults {
            working_directory: std::env::temp_dir(),
            environment: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }

    #[test]
    fn remote_command_folds_directory_and_exports() {
        let mut env = BTreeMap::new();
        env.insert("VERSION".to_string(), "1.2.0".to_string());
        assert_eq!(
            remote_command("docker-compose up -d", Some("/srv/apps/toolset"), &env),
            "cd '/srv/apps/toolset' && export VERSION=1.2.0 && docker-compose up -d"
        );
        assert_eq!(remote_command("uptime", None, &BTreeMap::new()), "uptime");
        assert_eq!(
            remote_command("ls", Some("~/my app"), &BTreeMap::new()),
            "cd ~/'my app' && ls"
        );
    }

    #[test]
    fn ssh_args_use_batch_mode_and_custom_port() {
        let client = SshClient::for_host(
            &ctx(&[("SSH_PORT", "2222"), ("SSH_USER", "deploy")]),
            "apps.example.org",
        )
        .unwrap();
        let args = client.build_ssh_args("uptime");
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert!(args.windows(2).any(|w| w == ["-p", "2222"]));
        assert_eq!(args[args.len() - 2], "deploy@apps.example.org");
        assert_eq!(args.last().unwrap(), "uptime");
    }

    #[test]
    fn user_in_host_string_wins() {
        let client =
            SshClient::for_host(&ctx(&[("SSH_USER", "deploy")]), "root@apps.example.org").unwrap();
        assert_eq!(client.destination(), "root@apps.example.org");
    }

    #[test]
    fn invalid_port_is_config_error() {
        let err = SshClient::for_host(&ctx(&[("SSH_PORT", "ssh")]), "h").err().unwrap();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    }

    #[test]
    fn missing_identity_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("id_missing");
        let err = SshClient::for_host(
            &ctx(&[("SSH_IDENTITY_FILE", missing.to_str().unwrap())]),
            "apps.example.org",
        )
        .err()
        .unwrap();
        assert_eq!(err.code.as_str(), "ssh.identity_file_not_found");
    }

    #[test]
    fn localhost_detection() {
        assert!(is_local_host("localhost"));
        assert!(is_local_host("deploy@127.0.0.1"));
        assert!(!is_local_host("apps.example.org"));
    }

    #[cfg(unix)]
    #[test]
    fn local_command_runs_in_directory_with_env() {
        let dir = TempDir::new().unwrap();
        let mut env = BTreeMap::new();
        env.insert("GREETING".to_string(), "hi".to_string());
        let out = execute_local_command_in_dir("echo $GREETING; pwd", Some(dir.path()), &env, true)
            .unwrap();
        assert!(out.success);
        assert!(out.stdout.starts_with("hi\n"));
        let canonical = dir.path().canonicalize().unwrap();
        assert!(out.stdout.contains(canonical.file_name().unwrap().to_str().unwrap()));
    }
}
