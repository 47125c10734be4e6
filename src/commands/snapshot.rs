use clap::Args;

use shipwright::recipes::postgres::timestamp_tag;
use shipwright::recipes::snapshot;
use shipwright::recipes::RecipeOutcome;

use super::CmdResult;

#[derive(Args)]
pub struct SnapshotArgs {
    /// Snapshot name (default: current timestamp)
    pub name: Option<String>,
}

#[derive(Args)]
pub struct RollbackArgs {
    /// Snapshot to roll back to
    pub name: String,
}

pub fn run(args: SnapshotArgs, global: &crate::commands::GlobalArgs) -> CmdResult<RecipeOutcome> {
    let mut session = global.session()?;
    let name = args.name.unwrap_or_else(timestamp_tag);
    Ok((snapshot::snapshot(&mut session, &name)?, 0))
}

pub fn run_rollback(
    args: RollbackArgs,
    global: &crate::commands::GlobalArgs,
) -> CmdResult<RecipeOutcome> {
    let mut session = global.session()?;
    Ok((snapshot::rollback(&mut session, &args.name)?, 0))
}
