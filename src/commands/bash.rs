use clap::Args;

use shipwright::recipes::wrappers;

use super::{run_request, CmdResult, RunOutput};

#[derive(Args)]
pub struct BashArgs {
    /// Command line, passed to the shell as is
    pub command: String,

    /// Working directory (checked locally, passed through remotely)
    #[arg(long)]
    pub path: Option<String>,

    /// Extra environment as KEY=VAL,KEY2=VAL2
    #[arg(long)]
    pub env: Option<String>,

    /// Do not fail on a non-zero exit
    #[arg(long)]
    pub allow_failure: bool,
}

pub fn run(args: BashArgs, global: &crate::commands::GlobalArgs) -> CmdResult<RunOutput> {
    let mut session = global.session()?;
    let target = session.target()?;
    let request = wrappers::bash(&args.command, args.path.as_deref(), args.env.as_deref(), target)?
        .must_succeed(!args.allow_failure);
    run_request(&mut session, request)
}
