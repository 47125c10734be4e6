//! Recipes: named operations composed from executor calls.
//!
//! Every recipe takes a [`Session`] and returns a [`RecipeOutcome`]. A "no"
//! from the operator is a [`RecipeOutcome::Declined`], not an error.

use serde::Serialize;

use crate::confirm::Confirm;
use crate::context::ConfigContext;
use crate::error::{CommandFailedDetails, Error, Result};
use crate::executor::{CommandExecutionRequest, CommandExecutor, CommandResult, Target};

pub mod deploy;
pub mod envfile;
pub mod postgres;
pub mod release;
pub mod snapshot;
pub mod wrappers;

/// Everything a recipe needs for one invocation.
pub struct Session {
    pub ctx: ConfigContext,
    pub executor: CommandExecutor,
    pub confirm: Box<dyn Confirm>,
}

impl Session {
    pub fn new(ctx: ConfigContext, executor: CommandExecutor, confirm: Box<dyn Confirm>) -> Self {
        Self {
            ctx,
            executor,
            confirm,
        }
    }

    pub fn execute(&mut self, request: &CommandExecutionRequest) -> Result<CommandResult> {
        self.executor.execute(request, &self.ctx)
    }

    /// Target implied by `--live` / `--host`.
    pub fn target(&self) -> Result<Target> {
        self.ctx.target()
    }

    /// Project root on the given target: the working directory locally,
    /// `/srv/apps/<project>` remotely.
    pub fn project_path(&self, target: &Target) -> String {
        match target {
            Target::Local => self.ctx.working_directory().display().to_string(),
            Target::Remote(_) => self.ctx.remote_layout().project_dir,
        }
    }

    pub fn confirm(&self, question: &str, default: bool) -> bool {
        self.confirm.confirm(question, default)
    }
}

/// One executed (or previewed) step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub command: String,
    pub target: String,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeReport {
    pub recipe: String,
    pub dry_run: bool,
    pub steps: Vec<StepRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RecipeReport {
    pub fn new(recipe: &str, session: &Session) -> Self {
        Self {
            recipe: recipe.to_string(),
            dry_run: session.ctx.is_dry_run(),
            steps: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Execute through the session and record the step.
    pub fn run(
        &mut self,
        session: &mut Session,
        request: CommandExecutionRequest,
    ) -> Result<CommandResult> {
        let result = session.execute(&request)?;
        self.steps.push(StepRecord {
            command: request.command,
            target: request.target.to_string(),
            exit_code: result.exit_code,
        });
        Ok(result)
    }

    /// Like [`Self::run`] but a non-zero exit becomes a warning when
    /// `expected` matches its stderr (or always, when `expected` is empty).
    pub fn run_tolerating(
        &mut self,
        session: &mut Session,
        request: CommandExecutionRequest,
        expected: &str,
        warning: &str,
    ) -> Result<CommandResult> {
        let must_succeed = request.must_succeed;
        let command = request.command.clone();
        let target = request.target.to_string();
        let result = self.run(session, request.must_succeed(false))?;

        if result.success() {
            return Ok(result);
        }
        if expected.is_empty() || result.stderr.contains(expected) {
            log_status!("recipe", "{}", warning);
            self.warnings.push(warning.to_string());
            return Ok(result);
        }
        if must_succeed {
            return Err(Error::command_failed(CommandFailedDetails {
                command,
                exit_code: result.exit_code,
                stdout: result.stdout,
                stderr: result.stderr,
                target,
            }));
        }
        Ok(result)
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum RecipeOutcome {
    Completed(RecipeReport),
    /// The operator answered no. Steps run before the question are kept.
    Declined {
        guidance: String,
        report: RecipeReport,
    },
}

impl RecipeOutcome {
    pub fn report(&self) -> &RecipeReport {
        match self {
            RecipeOutcome::Completed(report) => report,
            RecipeOutcome::Declined { report, .. } => report,
        }
    }

    pub fn is_declined(&self) -> bool {
        matches!(self, RecipeOutcome::Declined { .. })
    }
}
