//! The project `.env` on a target: the working copy locally, the server copy
//! under `/srv/apps/<project>` remotely.
//!
//! Remote edits read the file with `cat`, apply the same line editing as
//! local edits and write the whole file back.

use super::Session;
use crate::dotenv::{self, Entry};
use crate::error::Result;
use crate::executor::{CommandExecutionRequest, Target};
use crate::utils::io;
use crate::utils::shell;

pub fn path_on(session: &Session, target: &Target) -> String {
    match target {
        Target::Local => session.ctx.local_dotenv_path().display().to_string(),
        Target::Remote(_) => session.ctx.remote_layout().server_dotenv_path,
    }
}

fn read_raw(session: &mut Session, target: &Target) -> Result<String> {
    let path = path_on(session, target);
    match target {
        Target::Local => Ok(io::read_file_optional(std::path::Path::new(&path), "read .env")?
            .unwrap_or_default()),
        Target::Remote(_) => {
            let request = CommandExecutionRequest::new(format!(
                "cat {} 2>/dev/null || true",
                shell::quote_path(&path)
            ))
            .target(target.clone())
            .quiet();
            Ok(session.execute(&request)?.stdout)
        }
    }
}

fn write_raw(session: &mut Session, target: &Target, content: &str, summary: &str) -> Result<()> {
    let path = path_on(session, target);
    match target {
        Target::Local if session.ctx.is_dry_run() => session
            .executor
            .preview(target, &format!("{} in {}", summary, path)),
        Target::Local => io::write_file_atomic(std::path::Path::new(&path), content, "write .env"),
        Target::Remote(_) => {
            let command = format!(
                "printf '%s' {} > {}",
                shell::quote_path(content),
                shell::quote_path(&path)
            );
            session.execute(&CommandExecutionRequest::new(command).target(target.clone()).quiet())?;
            Ok(())
        }
    }
}

pub fn list(session: &mut Session, target: &Target) -> Result<Vec<Entry>> {
    dotenv::parse(&read_raw(session, target)?)
}

pub fn get(session: &mut Session, target: &Target, key: &str) -> Result<Option<String>> {
    Ok(list(session, target)?
        .into_iter()
        .rev()
        .find(|entry| entry.key == key)
        .map(|entry| entry.value))
}

pub fn set(session: &mut Session, target: &Target, key: &str, value: &str) -> Result<()> {
    log_status!("dotenv", "{}={} on {}", key, value, target);
    let content = read_raw(session, target)?;
    let updated = dotenv::set_key(&content, key, value);
    write_raw(session, target, &updated, &format!("set {}={}", key, value))
}

/// Returns whether the key was present.
pub fn unset(session: &mut Session, target: &Target, key: &str) -> Result<bool> {
    let content = read_raw(session, target)?;
    let (updated, removed) = dotenv::unset_key(&content, key);
    if removed {
        write_raw(session, target, &updated, &format!("unset {}", key))?;
    }
    Ok(removed)
}
