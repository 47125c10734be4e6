use clap::Args;

use shipwright::notify::{self, Backend, NotifyReport};

use super::CmdResult;

#[derive(Args)]
pub struct NotifyArgs {
    /// Chat backend
    #[arg(value_enum)]
    pub backend: Backend,

    /// Message text
    pub message: String,
}

pub fn run(args: NotifyArgs, global: &crate::commands::GlobalArgs) -> CmdResult<NotifyReport> {
    let mut session = global.session()?;
    let report = notify::send(
        &mut session.executor,
        &session.ctx,
        args.backend,
        &args.message,
    )?;
    Ok((report, 0))
}
