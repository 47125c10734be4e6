use clap::Args;

use shipwright::recipes::wrappers;
use shipwright::shell;

use super::{run_request, CmdResult, RunOutput};

#[derive(Args)]
pub struct DockerArgs {
    /// Arguments for `docker`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct ComposeArgs {
    /// Arguments for `docker-compose`, run in the project directory
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub args: Vec<String>,
}

pub fn run(args: DockerArgs, global: &crate::commands::GlobalArgs) -> CmdResult<RunOutput> {
    let mut session = global.session()?;
    let target = session.target()?;
    let request = wrappers::docker(&session, &shell::quote_args(&args.args), target)?;
    run_request(&mut session, request)
}

pub fn run_compose(
    args: ComposeArgs,
    global: &crate::commands::GlobalArgs,
) -> CmdResult<RunOutput> {
    let mut session = global.session()?;
    let target = session.target()?;
    let request = wrappers::compose(&session, &shell::quote_args(&args.args), target)?;
    run_request(&mut session, request)
}
