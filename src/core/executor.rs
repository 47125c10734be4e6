//! Single execution primitive for every recipe step.
//!
//! A [`CommandExecutionRequest`] is either previewed (dry-run) or handed to
//! a [`Channel`] that runs it locally through `sh -c` or remotely over SSH.
//! Both paths validate a local working directory first.

use serde::Serialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::io::{self, IsTerminal, Write};
use std::rc::Rc;

use crate::context::ConfigContext;
use crate::error::{CommandFailedDetails, Error, Result};
use crate::ssh::{self, SshClient};
use crate::utils::shell;

const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "host")]
pub enum Target {
    Local,
    Remote(String),
}

impl Target {
    pub fn is_local(&self) -> bool {
        matches!(self, Target::Local)
    }

    pub fn host(&self) -> Option<&str> {
        match self {
            Target::Local => None,
            Target::Remote(host) => Some(host),
        }
    }

    /// `[local]` or `[remote:<host>]`, colored for terminals.
    pub fn marker(&self, color: bool) -> String {
        let (label, code) = match self {
            Target::Local => ("[local]".to_string(), YELLOW),
            Target::Remote(host) => (format!("[remote:{}]", host), RED),
        };
        if color {
            format!("{}{}{}", code, label, RESET)
        } else {
            label
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Local => write!(f, "local"),
            Target::Remote(host) => write!(f, "remote:{}", host),
        }
    }
}

/// One command plus the options it runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandExecutionRequest {
    /// Already formatted; passed to the shell verbatim.
    pub command: String,
    pub working_directory: Option<String>,
    /// Merged over the inherited environment for this call only.
    pub environment_overrides: BTreeMap<String, String>,
    pub target: Target,
    /// Don't echo captured output.
    pub suppress_output: bool,
    /// Collect stdout/stderr into the result instead of streaming them.
    pub capture: bool,
    pub must_succeed: bool,
    /// Overrides the context's dry-run flag for this call.
    pub dry_run: Option<bool>,
}

impl CommandExecutionRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_directory: None,
            environment_overrides: BTreeMap::new(),
            target: Target::Local,
            suppress_output: false,
            capture: true,
            must_succeed: true,
            dry_run: None,
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.working_directory = Some(path.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment_overrides.insert(key.into(), value.into());
        self
    }

    pub fn envs(mut self, vars: BTreeMap<String, String>) -> Self {
        self.environment_overrides.extend(vars);
        self
    }

    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn must_succeed(mut self, must_succeed: bool) -> Self {
        self.must_succeed = must_succeed;
        self
    }

    /// Stream output straight to the terminal.
    pub fn stream(mut self) -> Self {
        self.capture = false;
        self
    }

    pub fn quiet(mut self) -> Self {
        self.suppress_output = true;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = Some(dry_run);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

impl From<ssh::CommandOutput> for CommandResult {
    fn from(output: ssh::CommandOutput) -> Self {
        Self {
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// A validated request as seen by a [`Channel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub working_directory: Option<String>,
    pub environment: BTreeMap<String, String>,
    pub capture: bool,
}

/// Something that can run a command on a target and report the outcome.
/// Only spawn/transport problems are errors; a non-zero exit is a result.
pub trait Channel {
    fn run(&self, ctx: &ConfigContext, target: &Target, invocation: &Invocation)
        -> Result<CommandResult>;
}

/// `sh -c` locally, `ssh` for remote hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemChannel;

impl Channel for SystemChannel {
    fn run(
        &self,
        ctx: &ConfigContext,
        target: &Target,
        invocation: &Invocation,
    ) -> Result<CommandResult> {
        let output = match target {
            Target::Local => ssh::execute_local_command_in_dir(
                &invocation.command,
                invocation.working_directory.as_deref().map(std::path::Path::new),
                &invocation.environment,
                invocation.capture,
            )?,
            Target::Remote(host) => SshClient::for_host(ctx, host)?.execute(
                &invocation.command,
                invocation.working_directory.as_deref(),
                &invocation.environment,
                invocation.capture,
            )?,
        };
        Ok(output.into())
    }
}

/// Records every invocation and answers from a script; runs nothing.
/// Unscripted calls succeed with empty output.
#[derive(Debug, Default, Clone)]
pub struct RecordingChannel {
    calls: Rc<RefCell<Vec<(Target, Invocation)>>>,
    responses: Rc<RefCell<VecDeque<CommandResult>>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result for the next call.
    pub fn respond(&self, result: CommandResult) {
        self.responses.borrow_mut().push_back(result);
    }

    pub fn respond_exit(&self, exit_code: i32, stderr: &str) {
        self.respond(CommandResult {
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        });
    }

    pub fn calls(&self) -> Vec<(Target, Invocation)> {
        self.calls.borrow().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|(_, inv)| inv.command.clone())
            .collect()
    }
}

impl Channel for RecordingChannel {
    fn run(
        &self,
        _ctx: &ConfigContext,
        target: &Target,
        invocation: &Invocation,
    ) -> Result<CommandResult> {
        self.calls
            .borrow_mut()
            .push((target.clone(), invocation.clone()));
        Ok(self.responses.borrow_mut().pop_front().unwrap_or_default())
    }
}

/// Shared in-memory sink, handy for asserting on previews.
#[derive(Debug, Default, Clone)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).to_string()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct CommandExecutor {
    channel: Box<dyn Channel>,
    out: Box<dyn Write>,
    color: bool,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(Box::new(SystemChannel))
    }
}

impl CommandExecutor {
    /// Preview lines and echoed output go to stdout, colored on a terminal.
    pub fn new(channel: Box<dyn Channel>) -> Self {
        Self {
            channel,
            out: Box::new(io::stdout()),
            color: io::stdout().is_terminal(),
        }
    }

    /// Send preview lines and echoed output to `out`, uncolored.
    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.out = out;
        self.color = false;
        self
    }

    pub fn execute(
        &mut self,
        request: &CommandExecutionRequest,
        ctx: &ConfigContext,
    ) -> Result<CommandResult> {
        let dry_run = request.dry_run.unwrap_or_else(|| ctx.is_dry_run());
        let working_directory = resolve_working_directory(request, ctx)?;

        if dry_run {
            let line = render_preview(
                &request.environment_overrides,
                working_directory.as_deref(),
                &request.command,
            );
            self.preview(&request.target, &line)?;
            return Ok(CommandResult::default());
        }

        // The server keeps its own `.env`; only request overrides travel.
        let mut environment = if request.target.is_local() {
            ctx.overlay_exports()
        } else {
            BTreeMap::new()
        };
        environment.extend(request.environment_overrides.clone());

        log_status!("run", "{} {}", request.target, request.command);

        let invocation = Invocation {
            command: request.command.clone(),
            working_directory,
            environment,
            capture: request.capture,
        };
        let result = self.channel.run(ctx, &request.target, &invocation)?;

        if request.capture && !request.suppress_output {
            self.echo(&result)?;
        }

        if !result.success() && request.must_succeed {
            return Err(Error::command_failed(CommandFailedDetails {
                command: request.command.clone(),
                exit_code: result.exit_code,
                stdout: result.stdout,
                stderr: result.stderr,
                target: request.target.to_string(),
            }));
        }

        Ok(result)
    }

    /// Print one marker-prefixed preview line.
    pub fn preview(&mut self, target: &Target, line: &str) -> Result<()> {
        let marker = target.marker(self.color);
        writeln!(self.out, "{} {}", marker, line)
            .map_err(|e| Error::internal_io(e.to_string(), Some("write preview".to_string())))
    }

    fn echo(&mut self, result: &CommandResult) -> Result<()> {
        if !result.stdout.is_empty() {
            self.out
                .write_all(result.stdout.as_bytes())
                .map_err(|e| Error::internal_io(e.to_string(), Some("echo stdout".to_string())))?;
        }
        if !result.stderr.is_empty() {
            eprint!("{}", result.stderr);
        }
        Ok(())
    }
}

/// Local paths are expanded, made absolute and must exist; remote paths are
/// passed through untouched.
fn resolve_working_directory(
    request: &CommandExecutionRequest,
    ctx: &ConfigContext,
) -> Result<Option<String>> {
    let Some(raw) = request.working_directory.as_deref() else {
        return Ok(None);
    };

    if !request.target.is_local() {
        return Ok(Some(raw.to_string()));
    }

    let path = ctx.expand_path(raw);
    if !path.is_dir() {
        return Err(Error::directory_not_found(
            path.display().to_string(),
            Some(raw.to_string()),
        ));
    }
    Ok(Some(path.display().to_string()))
}

/// `export K=V ... && cd <path> && <command>`, parts omitted when empty.
pub fn render_preview(
    env: &BTreeMap<String, String>,
    working_directory: Option<&str>,
    command: &str,
) -> String {
    let mut parts = Vec::new();
    if let Some(exports) = shell::export_clause(env) {
        parts.push(exports);
    }
    if let Some(dir) = working_directory {
        parts.push(format!("cd {}", dir));
    }
    parts.push(command.to_string());
    parts.join(" && ")
}
