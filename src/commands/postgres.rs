use clap::Args;

use shipwright::recipes::postgres::{self, PostgresAction};
use shipwright::recipes::RecipeOutcome;

use super::CmdResult;

#[derive(Args)]
pub struct PostgresArgs {
    /// backup or restore
    #[arg(value_enum)]
    pub action: PostgresAction,

    /// Backup name (default: current timestamp; required for restore)
    pub name: Option<String>,
}

pub fn run(args: PostgresArgs, global: &crate::commands::GlobalArgs) -> CmdResult<RecipeOutcome> {
    let name = match (args.action, args.name) {
        (_, Some(name)) => name,
        (PostgresAction::Backup, None) => postgres::timestamp_tag(),
        (PostgresAction::Restore, None) => {
            return Err(shipwright::Error::validation_missing_argument(vec![
                "name".to_string(),
            ]))
        }
    };

    let mut session = global.session()?;
    Ok((postgres::run(&mut session, args.action, &name)?, 0))
}
