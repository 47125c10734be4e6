use clap::{Args, Subcommand};

use shipwright::recipes::deploy::{self, DeployOptions};
use shipwright::recipes::RecipeOutcome;

use super::CmdResult;

#[derive(Args)]
pub struct DeployArgs {
    #[command(subcommand)]
    command: DeployCommand,
}

#[derive(Subcommand)]
enum DeployCommand {
    /// Install the released wheel and rebuild the service
    Code {
        /// Compose service to build and start
        #[arg(long, default_value = "webapp")]
        service: String,

        /// Build only, do not start the service
        #[arg(long)]
        no_run: bool,

        /// Run database migrations afterwards
        #[arg(long)]
        migrate: bool,
    },
}

pub fn run(args: DeployArgs, global: &crate::commands::GlobalArgs) -> CmdResult<RecipeOutcome> {
    let mut session = global.session()?;

    let outcome = match args.command {
        DeployCommand::Code {
            service,
            no_run,
            migrate,
        } => deploy::code(
            &mut session,
            &DeployOptions {
                service,
                run: !no_run,
                migrate,
            },
        )?,
    };

    Ok((outcome, 0))
}
