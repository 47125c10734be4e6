use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;

use commands::{bash, deploy, docker, dotenv, echo, git, notify, postgres, python, release, s3, snapshot};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "shipwright")]
#[command(version = VERSION)]
#[command(about = "Deployment task runner with dry-run aware local and remote execution")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved configuration context
    Echo(echo::EchoArgs),
    /// Run an arbitrary shell command on the target
    Bash(bash::BashArgs),
    /// Run docker on the target
    Docker(docker::DockerArgs),
    /// Run docker-compose in the project directory on the target
    Compose(docker::ComposeArgs),
    /// Run git in the local working directory
    Git(git::GitArgs),
    /// Run python inside the project virtualenv
    Python(python::PythonArgs),
    /// Run pip inside the project virtualenv
    Pip(python::PipArgs),
    /// Copy files between the project and its S3 bucket
    S3(s3::S3Args),
    /// Release workflows: tag, wheel, runtime image
    Release(release::ReleaseArgs),
    /// Deploy a released version
    Deploy(deploy::DeployArgs),
    /// Tag code, database and images under one name
    Snapshot(snapshot::SnapshotArgs),
    /// Return code, database and image to a snapshot
    Rollback(snapshot::RollbackArgs),
    /// Back up or restore the Postgres volume
    Postgres(postgres::PostgresArgs),
    /// Read and edit the project .env file
    Dotenv(dotenv::DotenvArgs),
    /// Post a message to a chat webhook
    Notify(notify::NotifyArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let (json_result, exit_code) = commands::run_json(cli.command, &cli.global);
    if output::print_json_result(json_result).is_err() {
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
