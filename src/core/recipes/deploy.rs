//! Code deployment onto the target: fetch the released wheel, record the
//! version in `.env`, rebuild the service image and optionally migrate.

use super::release::wheel_name;
use super::wrappers::{self, Direction, S3Transfer};
use super::{envfile, RecipeOutcome, RecipeReport, Session};
use crate::error::Result;
use crate::utils::shell::CommandLine;

const DEFAULT_MIGRATE: &str = "python manage.py migrate";

#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub service: String,
    /// Start the service after building it.
    pub run: bool,
    pub migrate: bool,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            service: "webapp".to_string(),
            run: true,
            migrate: false,
        }
    }
}

pub fn code(session: &mut Session, options: &DeployOptions) -> Result<RecipeOutcome> {
    let mut report = RecipeReport::new("deploy code", session);
    let target = session.target()?;
    let tag = session.ctx.clean_tag()?;
    let wheel = format!("dist/{}", wheel_name(&session.ctx.package_name(), &tag));

    let transfer = S3Transfer::simple(session, &wheel, Direction::Down);
    let fetch = wrappers::s3(session, &transfer, target.clone())?;
    report.run(session, fetch)?;

    envfile::set(session, &target, "VERSION", &tag)?;

    let service = CommandLine::new("build").arg(&options.service).render();
    let build = wrappers::compose(session, &service, target.clone())?;
    report.run(session, build)?;

    if options.run {
        let up = CommandLine::new("up").arg("-d").arg(&options.service).render();
        let up = wrappers::compose(session, &up, target.clone())?;
        report.run(session, up)?;
    }

    if options.migrate {
        if !session.confirm("Did you take a database backup before migrating?", false) {
            return Ok(RecipeOutcome::Declined {
                guidance: "Take a backup first with: shipwright postgres backup".to_string(),
                report,
            });
        }
        let migrate = session.ctx.get("migrate_command", DEFAULT_MIGRATE);
        let args = CommandLine::new("run")
            .arg("--rm")
            .arg(&options.service)
            .raw(migrate)
            .render();
        let request = wrappers::compose(session, &args, target)?;
        report.run(session, request)?;
    }

    Ok(RecipeOutcome::Completed(report))
}
