//! Point-in-time snapshots of code, data and images under one tag, and the
//! matching rollback.

use super::postgres::{self, PostgresAction};
use super::wrappers;
use super::{RecipeOutcome, RecipeReport, Session};
use crate::error::Result;
use crate::executor::Target;
use crate::utils::shell::CommandLine;

/// Tag the repository, back up the database and keep copies of the
/// `latest` and `production` images under `tag`.
pub fn snapshot(session: &mut Session, tag: &str) -> Result<RecipeOutcome> {
    let mut report = RecipeReport::new("snapshot", session);

    if !session.confirm("Did you remember to first commit all changes?", false) {
        return Ok(RecipeOutcome::Declined {
            guidance: "Commit changes using: git commit -a -m 'message...'".to_string(),
            report,
        });
    }

    let target = session.target()?;

    let git_tag = wrappers::git(&CommandLine::new("tag").arg(tag).render(), Target::Local)
        .path(session.project_path(&Target::Local));
    report.run_tolerating(session, git_tag, "", "Git tag already exists")?;

    postgres::run_steps(session, &mut report, PostgresAction::Backup, tag, &target)?;

    let image = session.ctx.image_name()?;
    for (from, to) in [
        (format!("{}:latest", image), format!("{}:{}", image, tag)),
        (
            format!("{}:production", image),
            format!("{}:{}-production", image, tag),
        ),
    ] {
        let args = CommandLine::new("tag").arg(&from).arg(&to).render();
        let request = wrappers::docker(session, &args, target.clone())?;
        report.run_tolerating(
            session,
            request,
            "",
            &format!("Docker image {} not found", from),
        )?;
    }

    Ok(RecipeOutcome::Completed(report))
}

/// Reset code, database and the `latest` image to a snapshot. The previous
/// head is kept on a `development` branch.
pub fn rollback(session: &mut Session, tag: &str) -> Result<RecipeOutcome> {
    let mut report = RecipeReport::new("rollback", session);

    if !session.confirm("Did you remember to first release?", false) {
        return Ok(RecipeOutcome::Declined {
            guidance: format!(
                "Snapshot the current state first with: shipwright snapshot {}",
                postgres::timestamp_tag()
            ),
            report,
        });
    }

    let target = session.target()?;
    let repo = session.project_path(&Target::Local);

    let branch = wrappers::git("branch development", Target::Local).path(repo.clone());
    report.run_tolerating(session, branch, "", "Branch development already exists")?;
    let reset = wrappers::git(
        &CommandLine::new("reset").arg("--hard").arg(tag).render(),
        Target::Local,
    )
    .path(repo);
    report.run(session, reset)?;

    postgres::run_steps(session, &mut report, PostgresAction::Restore, tag, &target)?;

    let image = session.ctx.image_name()?;
    let args = CommandLine::new("tag")
        .arg(format!("{}:{}", image, tag))
        .arg(format!("{}:latest", image))
        .render();
    let retag = wrappers::docker(session, &args, target)?;
    report.run(session, retag)?;

    Ok(RecipeOutcome::Completed(report))
}
