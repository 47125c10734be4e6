use clap::Args;

use shipwright::executor::Target;
use shipwright::recipes::wrappers;
use shipwright::shell;

use super::{run_request, CmdResult, RunOutput};

#[derive(Args)]
pub struct GitArgs {
    /// Arguments for `git`, run in the working directory
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub args: Vec<String>,
}

pub fn run(args: GitArgs, global: &crate::commands::GlobalArgs) -> CmdResult<RunOutput> {
    let mut session = global.session()?;
    let path = session.project_path(&Target::Local);
    let request = wrappers::git(&shell::quote_args(&args.args), Target::Local).path(path);
    run_request(&mut session, request)
}
