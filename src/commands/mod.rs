use clap::Args;
use serde::Serialize;

use shipwright::confirm::{AssumeYes, Confirm, TerminalConfirm};
use shipwright::context::{ConfigContext, ConfigureOptions, Defaults, OverlayLoad};
use shipwright::executor::{CommandExecutionRequest, CommandExecutor};
use shipwright::recipes::Session;

pub type CmdResult<T> = shipwright::Result<(T, i32)>;

/// Flags shared by every command. They map onto context overrides.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct GlobalArgs {
    /// Print commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Version tag, overriding version control
    #[arg(long, global = true, value_name = "TAG")]
    pub tag: Option<String>,

    /// Project name
    #[arg(long, global = true, value_name = "NAME")]
    pub project: Option<String>,

    /// Overlay collection: loads `.local/<NAME>.env` after `.env`
    #[arg(long, global = true, value_name = "NAME")]
    pub collection: Option<String>,

    /// Run against the remote host instead of locally
    #[arg(long, global = true)]
    pub live: bool,

    /// Remote host(s), comma separated; the first one is targeted
    #[arg(long, global = true, value_name = "HOST")]
    pub host: Option<String>,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,
}

impl GlobalArgs {
    pub fn configure_options(&self) -> ConfigureOptions {
        ConfigureOptions {
            collection: self.collection.clone(),
            tag: self.tag.clone(),
            project: self.project.clone(),
            host: self.host.clone(),
            live: self.live,
            dry_run: self.dry_run,
        }
    }

    /// Configure a context for the current directory and process
    /// environment.
    pub fn context(&self) -> shipwright::Result<(ConfigContext, Vec<OverlayLoad>)> {
        let mut ctx = ConfigContext::initialize(Defaults::from_process()?);
        let overlays = ctx.configure(&self.configure_options())?;
        Ok((ctx, overlays))
    }

    pub fn session(&self) -> shipwright::Result<Session> {
        let (ctx, _) = self.context()?;
        let confirm: Box<dyn Confirm> = if self.yes {
            Box::new(AssumeYes)
        } else {
            Box::new(TerminalConfirm::new())
        };
        Ok(Session::new(ctx, CommandExecutor::default(), confirm))
    }
}

/// Result of a single passthrough command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutput {
    pub command: String,
    pub target: String,
    pub dry_run: bool,
    pub exit_code: i32,
}

/// Execute one request on a fresh session and report it.
pub(crate) fn run_request(
    session: &mut Session,
    request: CommandExecutionRequest,
) -> CmdResult<RunOutput> {
    let dry_run = request.dry_run.unwrap_or_else(|| session.ctx.is_dry_run());
    let result = session.execute(&request)?;
    let exit_code = result.exit_code;
    Ok((
        RunOutput {
            command: request.command,
            target: request.target.to_string(),
            dry_run,
            exit_code,
        },
        exit_code,
    ))
}

pub mod bash;
pub mod deploy;
pub mod docker;
pub mod dotenv;
pub mod echo;
pub mod git;
pub mod notify;
pub mod postgres;
pub mod python;
pub mod release;
pub mod s3;
pub mod snapshot;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident :: $func:ident) => {
        crate::output::map_cmd_result_to_json($module::$func($args, $global))
    };
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (shipwright::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Echo(args) => dispatch!(args, global, echo),
        crate::Commands::Bash(args) => dispatch!(args, global, bash),
        crate::Commands::Docker(args) => dispatch!(args, global, docker),
        crate::Commands::Compose(args) => dispatch!(args, global, docker::run_compose),
        crate::Commands::Git(args) => dispatch!(args, global, git),
        crate::Commands::Python(args) => dispatch!(args, global, python),
        crate::Commands::Pip(args) => dispatch!(args, global, python::run_pip),
        crate::Commands::S3(args) => dispatch!(args, global, s3),
        crate::Commands::Release(args) => dispatch!(args, global, release),
        crate::Commands::Deploy(args) => dispatch!(args, global, deploy),
        crate::Commands::Snapshot(args) => dispatch!(args, global, snapshot),
        crate::Commands::Rollback(args) => dispatch!(args, global, snapshot::run_rollback),
        crate::Commands::Postgres(args) => dispatch!(args, global, postgres),
        crate::Commands::Dotenv(args) => dispatch!(args, global, dotenv),
        crate::Commands::Notify(args) => dispatch!(args, global, notify),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_map_to_configure_options() {
        let global = GlobalArgs {
            dry_run: true,
            tag: Some("1.2.0".to_string()),
            collection: Some("staging".to_string()),
            live: true,
            ..GlobalArgs::default()
        };
        let options = global.configure_options();
        assert!(options.dry_run);
        assert!(options.live);
        assert_eq!(options.tag.as_deref(), Some("1.2.0"));
        assert_eq!(options.collection.as_deref(), Some("staging"));
        assert!(options.project.is_none());
    }
}
