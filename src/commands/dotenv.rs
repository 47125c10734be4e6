use clap::{Args, Subcommand};
use serde::Serialize;

use shipwright::recipes::envfile;

use super::CmdResult;

#[derive(Args)]
pub struct DotenvArgs {
    #[command(subcommand)]
    command: DotenvCommand,
}

#[derive(Subcommand)]
enum DotenvCommand {
    /// Print one value
    Get { key: String },
    /// Set a value, keeping other lines and comments
    Set { key: String, value: String },
    /// Remove a key
    Unset { key: String },
    /// All entries in file order
    List,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DotenvOutput {
    pub path: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<(String, String)>>,
}

/// Operates on the local `.env`, or the server copy with `--live`.
pub fn run(args: DotenvArgs, global: &crate::commands::GlobalArgs) -> CmdResult<DotenvOutput> {
    let mut session = global.session()?;
    let target = session.target()?;
    let mut output = DotenvOutput {
        path: envfile::path_on(&session, &target),
        target: target.to_string(),
        key: None,
        value: None,
        changed: None,
        entries: None,
    };

    let exit_code = match args.command {
        DotenvCommand::Get { key } => {
            let value = envfile::get(&mut session, &target, &key)?;
            let exit_code = if value.is_some() { 0 } else { 1 };
            output.key = Some(key);
            output.value = value;
            exit_code
        }
        DotenvCommand::Set { key, value } => {
            envfile::set(&mut session, &target, &key, &value)?;
            output.key = Some(key);
            output.value = Some(value);
            output.changed = Some(true);
            0
        }
        DotenvCommand::Unset { key } => {
            output.changed = Some(envfile::unset(&mut session, &target, &key)?);
            output.key = Some(key);
            0
        }
        DotenvCommand::List => {
            let entries = envfile::list(&mut session, &target)?;
            output.entries = Some(entries.into_iter().map(|e| (e.key, e.value)).collect());
            0
        }
    };

    Ok((output, exit_code))
}
