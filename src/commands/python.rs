use clap::Args;

use shipwright::recipes::wrappers;
use shipwright::shell;

use super::{run_request, CmdResult, RunOutput};

#[derive(Args)]
pub struct PythonArgs {
    /// Run without the virtualenv activation prefix
    #[arg(long)]
    pub no_venv: bool,

    /// Arguments for `python`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct PipArgs {
    /// Arguments for `python -m pip`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub args: Vec<String>,
}

pub fn run(args: PythonArgs, global: &crate::commands::GlobalArgs) -> CmdResult<RunOutput> {
    let mut session = global.session()?;
    let target = session.target()?;
    let path = session.project_path(&target);
    let request =
        wrappers::python(&session, &shell::quote_args(&args.args), !args.no_venv, target).path(path);
    run_request(&mut session, request)
}

pub fn run_pip(args: PipArgs, global: &crate::commands::GlobalArgs) -> CmdResult<RunOutput> {
    let mut session = global.session()?;
    let target = session.target()?;
    let path = session.project_path(&target);
    let request = wrappers::pip(&session, &shell::quote_args(&args.args), target).path(path);
    run_request(&mut session, request)
}
