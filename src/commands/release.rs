use clap::{Args, Subcommand};

use shipwright::recipes::release::{self, CodeOptions, RuntimeOptions, TagOptions};
use shipwright::recipes::RecipeOutcome;
use shipwright::version::BumpKind;

use super::CmdResult;

#[derive(Args)]
pub struct ReleaseArgs {
    #[command(subcommand)]
    command: ReleaseCommand,
}

#[derive(Subcommand)]
enum ReleaseCommand {
    /// Tag the repository with v<major.minor.patch> of the resolved version
    Tag {
        /// Bump the version before tagging
        #[arg(long, value_enum)]
        bump: Option<BumpKind>,

        /// Push the tag to origin
        #[arg(long)]
        push: bool,
    },
    /// Build the Python wheel
    Code {
        /// Upload the wheel to the project bucket
        #[arg(long)]
        upload: bool,
    },
    /// Build dependency wheels and the runtime image on the build host
    Runtime {
        /// Skip the wheel factory
        #[arg(long)]
        no_wheels: bool,

        /// Skip building and pushing the image
        #[arg(long)]
        no_image: bool,

        /// Python version for the wheel factory
        #[arg(long, default_value = "3.6")]
        py_version: String,

        /// Build without C extensions
        #[arg(long)]
        no_cext: bool,
    },
}

pub fn run(args: ReleaseArgs, global: &crate::commands::GlobalArgs) -> CmdResult<RecipeOutcome> {
    let mut session = global.session()?;

    let outcome = match args.command {
        ReleaseCommand::Tag { bump, push } => {
            release::tag(&mut session, &TagOptions { bump, push })?
        }
        ReleaseCommand::Code { upload } => release::code(&mut session, &CodeOptions { upload })?,
        ReleaseCommand::Runtime {
            no_wheels,
            no_image,
            py_version,
            no_cext,
        } => release::runtime(
            &mut session,
            &RuntimeOptions {
                build_wheels: !no_wheels,
                build_image: !no_image,
                py_version,
                c_ext: !no_cext,
            },
        )?,
    };

    Ok((outcome, 0))
}
