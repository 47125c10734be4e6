use clap::Args;

use shipwright::recipes::wrappers::{self, Direction, S3Command, S3Transfer};

use super::{run_request, CmdResult, RunOutput};

#[derive(Args)]
pub struct S3Args {
    /// Transfer direction: up (local to bucket) or down
    #[arg(value_enum)]
    pub direction: Direction,

    /// Local path, relative to the project directory
    pub local_path: String,

    /// Key below the bucket root (default: <package>/<local path>)
    #[arg(long)]
    pub key: Option<String>,

    /// `aws s3` subcommand
    #[arg(long, value_enum, default_value = "cp")]
    pub command: S3Command,

    /// Pass --exact-timestamps (sync)
    #[arg(long)]
    pub exact_timestamps: bool,
}

pub fn run(args: S3Args, global: &crate::commands::GlobalArgs) -> CmdResult<RunOutput> {
    let mut session = global.session()?;
    let target = session.target()?;

    let mut transfer = S3Transfer::simple(&session, &args.local_path, args.direction);
    transfer.command = args.command;
    transfer.exact_timestamps = args.exact_timestamps;
    if let Some(key) = args.key {
        transfer.s3_path = key;
    }

    let request = wrappers::s3(&session, &transfer, target)?;
    run_request(&mut session, request)
}
