//! Postgres volume backup and restore.
//!
//! The database container is stopped, a throwaway container tars or untars
//! the data volume into `var/backups/db_backup.<tag>.tar.gz`, and the
//! database is started again.

use clap::ValueEnum;
use serde::Serialize;

use super::wrappers;
use super::{RecipeOutcome, RecipeReport, Session};
use crate::error::Result;
use crate::executor::Target;
use crate::utils::shell::CommandLine;

const DEFAULT_IMAGE: &str = "postgres:9.5";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PostgresAction {
    Backup,
    Restore,
}

pub fn backup_name(tag: &str) -> String {
    format!("db_backup.{}.tar.gz", tag)
}

/// Default backup tag: a local timestamp.
pub fn timestamp_tag() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// Docker volume holding the data: project name without `.` and `_`.
pub fn data_volume(project_name: &str) -> String {
    format!("{}_dbdata", project_name.replace(['.', '_'], ""))
}

fn backup_dir(session: &Session, target: &Target) -> String {
    format!("{}/var/backups", session.project_path(target))
}

/// Run a backup, or a restore after confirmation.
pub fn run(session: &mut Session, action: PostgresAction, tag: &str) -> Result<RecipeOutcome> {
    let mut report = RecipeReport::new("postgres", session);

    if action == PostgresAction::Restore {
        let question = format!(
            "Restore the database from {}? Current data will be replaced",
            backup_name(tag)
        );
        if !session.confirm(&question, false) {
            return Ok(RecipeOutcome::Declined {
                guidance: format!(
                    "Nothing restored. Take a backup first with: shipwright postgres backup {}",
                    timestamp_tag()
                ),
                report,
            });
        }
    }

    let target = session.target()?;
    run_steps(session, &mut report, action, tag, &target)?;
    Ok(RecipeOutcome::Completed(report))
}

/// Stop, run the archive container, start. No confirmation.
pub(crate) fn run_steps(
    session: &mut Session,
    report: &mut RecipeReport,
    action: PostgresAction,
    tag: &str,
    target: &Target,
) -> Result<()> {
    let archive = format!("/backup/{}", backup_name(tag));
    let inner = match action {
        PostgresAction::Backup => format!("tar -zcpf {} /data", archive),
        PostgresAction::Restore => format!("bash -c \"tar xpf {} && chmod -R 700 /data\"", archive),
    };
    let image = session.ctx.get("postgres_image", DEFAULT_IMAGE);
    let volume = data_volume(&session.ctx.project_name());

    let archive_cmd = CommandLine::new("run")
        .arg("--rm")
        .arg("-v")
        .arg(format!("{}:/data", volume))
        .arg("-v")
        .arg(format!("{}:/backup", backup_dir(session, target)))
        .arg(image)
        .raw(inner)
        .render();

    log_status!("postgres", "{:?} {} on {}", action, backup_name(tag), target);

    let stop = wrappers::compose(session, "stop postgres", target.clone())?;
    report.run(session, stop)?;
    let archive_request = wrappers::docker(session, &archive_cmd, target.clone())?;
    report.run(session, archive_request)?;
    let start = wrappers::compose(session, "start postgres", target.clone())?;
    report.run(session, start)?;
    Ok(())
}
