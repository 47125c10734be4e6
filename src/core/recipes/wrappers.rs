//! Thin tool wrappers. Each one formats a command line from context values
//! and hands it to the executor on the session's target.

use clap::ValueEnum;
use serde::Serialize;
use std::collections::BTreeMap;

use super::Session;
use crate::error::{Error, Result};
use crate::executor::{CommandExecutionRequest, Target};
use crate::utils::shell::{self, CommandLine};

/// Request for `docker <args>`. Fails with `config.missing_key` naming
/// `image_name` when no image can be derived.
pub fn docker(session: &Session, args: &str, target: Target) -> Result<CommandExecutionRequest> {
    session.ctx.image_name()?;
    Ok(CommandExecutionRequest::new(CommandLine::new("docker").raw(args).render()).target(target))
}

/// Request for `docker-compose <args>` in the project directory, with
/// `IMAGE=<image>:<tag>` exported.
pub fn compose(session: &Session, args: &str, target: Target) -> Result<CommandExecutionRequest> {
    let image = format!("{}:{}", session.ctx.image_name()?, session.ctx.clean_tag()?);
    let path = session.project_path(&target);
    Ok(
        CommandExecutionRequest::new(CommandLine::new("docker-compose").raw(args).render())
            .path(path)
            .env("IMAGE", image)
            .target(target),
    )
}

pub fn git(args: &str, target: Target) -> CommandExecutionRequest {
    CommandExecutionRequest::new(CommandLine::new("git").raw(args).render()).target(target)
}

/// `python <args>`, prefixed with the virtualenv activation when `venv` is
/// set and a prefix is configured.
pub fn python(session: &Session, args: &str, venv: bool, target: Target) -> CommandExecutionRequest {
    let python = CommandLine::new("python").raw(args).render();
    let prefix = session.ctx.activation_prefix();
    let command = if venv && !prefix.is_empty() {
        format!("{} && {}", prefix, python)
    } else {
        python
    };
    CommandExecutionRequest::new(command).target(target)
}

pub fn pip(session: &Session, args: &str, target: Target) -> CommandExecutionRequest {
    python(session, &format!("-m pip {}", args), true, target)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum S3Command {
    Cp,
    Sync,
}

impl S3Command {
    fn as_str(self) -> &'static str {
        match self {
            S3Command::Cp => "cp",
            S3Command::Sync => "sync",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// `aws s3 cp|sync` between a local path and the project bucket.
#[derive(Debug, Clone)]
pub struct S3Transfer {
    pub command: S3Command,
    pub direction: Direction,
    pub local_path: String,
    /// Key below the bucket root.
    pub s3_path: String,
    pub exact_timestamps: bool,
}

impl S3Transfer {
    /// Same relative path locally and below `<project>/` in the bucket.
    pub fn simple(session: &Session, relative: &str, direction: Direction) -> Self {
        Self {
            command: S3Command::Cp,
            direction,
            local_path: relative.to_string(),
            s3_path: format!("{}/{}", session.ctx.package_name(), relative),
            exact_timestamps: false,
        }
    }
}

pub fn s3(session: &Session, transfer: &S3Transfer, target: Target) -> Result<CommandExecutionRequest> {
    let bucket = session.ctx.require("bucket_name")?;
    let uri = format!("s3://{}/{}", bucket, transfer.s3_path.trim_start_matches('/'));

    let mut cmd = CommandLine::new("aws").arg("s3").arg(transfer.command.as_str());
    if transfer.exact_timestamps {
        cmd = cmd.arg("--exact-timestamps");
    }
    cmd = cmd.arg("--quiet");
    cmd = match transfer.direction {
        Direction::Up => cmd.arg(&transfer.local_path).arg(&uri),
        Direction::Down => cmd.arg(&uri).arg(&transfer.local_path),
    };

    let path = session.project_path(&target);
    Ok(CommandExecutionRequest::new(cmd.render()).path(path).target(target))
}

/// Arbitrary command with `KEY=VAL,KEY2=VAL2` environment.
pub fn bash(
    command: &str,
    path: Option<&str>,
    env: Option<&str>,
    target: Target,
) -> Result<CommandExecutionRequest> {
    let vars: BTreeMap<String, String> = match env {
        Some(spec) => shell::parse_env_pairs(spec).ok_or_else(|| {
            Error::validation_invalid_argument("env", "expected KEY=VALUE pairs separated by commas")
        })?,
        None => BTreeMap::new(),
    };

    let mut request = CommandExecutionRequest::new(command).envs(vars).target(target);
    if let Some(path) = path {
        request = request.path(path);
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::testing::harness;
    use tempfile::TempDir;

    #[test]
    fn docker_requires_an_image() {
        let dir = TempDir::new().unwrap();
        let mut h = harness(dir.path(), &[], None, vec![]);
        h.session.ctx.set("project_name", "");
        let err = docker(&h.session, "ps", Target::Local).unwrap_err();
        assert_eq!(err.details["key"], "image_name");
    }

    #[test]
    fn compose_exports_image_and_runs_in_project_dir() {
        let dir = TempDir::new().unwrap();
        let mut h = harness(
            dir.path(),
            &[("PROJECT_NAME", "toolset"), ("ORGANISATION", "obitec")],
            Some("v1.2.0-0-gabc1234"),
            vec![],
        );
        let request = compose(&h.session, "up -d webapp", Target::Local).unwrap();
        assert_eq!(request.command, "docker-compose up -d webapp");
        assert_eq!(request.environment_overrides["IMAGE"], "obitec/toolset:1.2.0");
        assert_eq!(
            request.working_directory.as_deref(),
            Some(dir.path().display().to_string().as_str())
        );

        let remote = compose(&h.session, "ps", Target::Remote("apps".to_string())).unwrap();
        assert_eq!(remote.working_directory.as_deref(), Some("/srv/apps/toolset"));

        h.session.execute(&request).unwrap();
        assert_eq!(h.channel.commands(), vec!["docker-compose up -d webapp"]);
    }

    #[test]
    fn compose_refuses_a_dirty_tag() {
        let dir = TempDir::new().unwrap();
        let h = harness(
            dir.path(),
            &[("PROJECT_NAME", "toolset"), ("ORGANISATION", "obitec")],
            Some("v1.2.0-2-gabc1234-dirty"),
            vec![],
        );
        let err = compose(&h.session, "up -d webapp", Target::Local).unwrap_err();
        assert_eq!(err.code.as_str(), "version.dirty");
    }

    #[test]
    fn python_uses_activation_prefix() {
        let dir = TempDir::new().unwrap();
        let mut h = harness(dir.path(), &[], None, vec![]);
        h.session.ctx.set("activation_prefix", "source activate toolset");
        assert_eq!(
            python(&h.session, "setup.py bdist_wheel", true, Target::Local).command,
            "source activate toolset && python setup.py bdist_wheel"
        );
        assert_eq!(
            python(&h.session, "--version", false, Target::Local).command,
            "python --version"
        );
        assert_eq!(
            pip(&h.session, "list", Target::Local).command,
            "source activate toolset && python -m pip list"
        );
    }

    #[test]
    fn s3_needs_bucket_and_orders_paths_by_direction() {
        let dir = TempDir::new().unwrap();
        let h = harness(dir.path(), &[("PROJECT_NAME", "tool-set")], None, vec![]);
        let transfer = S3Transfer::simple(&h.session, "dist/app.whl", Direction::Down);
        let err = s3(&h.session, &transfer, Target::Local).unwrap_err();
        assert_eq!(err.details["key"], "bucket_name");

        let h = harness(
            dir.path(),
            &[("PROJECT_NAME", "tool-set"), ("BUCKET_NAME", "dstack-storage")],
            None,
            vec![],
        );
        let transfer = S3Transfer::simple(&h.session, "dist/app.whl", Direction::Down);
        assert_eq!(
            s3(&h.session, &transfer, Target::Local).unwrap().command,
            "aws s3 cp --quiet s3://dstack-storage/tool_set/dist/app.whl dist/app.whl"
        );
    }

    #[test]
    fn bash_parses_env_pairs() {
        let request = bash("env", Some("/tmp"), Some("A=1,B=x=y"), Target::Local).unwrap();
        assert_eq!(request.environment_overrides["B"], "x=y");
        assert!(bash("env", None, Some("oops"), Target::Local).is_err());
    }
}
