use super::wrappers::{self, Direction, S3Transfer};
use super::{RecipeOutcome, RecipeReport, Session};
use crate::error::Result;
use crate::executor::{CommandExecutionRequest, Target};
use crate::utils::shell::CommandLine;
use crate::version::{self, BumpKind};

const TAG_EXISTS: &str = "already exists";

#[derive(Debug, Clone, Default)]
pub struct TagOptions {
    pub bump: Option<BumpKind>,
    pub push: bool,
}

/// Version to release: `major.minor.patch` of the resolved tag, optionally
/// bumped. Refuses a tag derived from an uncommitted or untagged tree.
pub fn release_version(session: &Session, bump: Option<BumpKind>) -> Result<String> {
    let resolved = session.ctx.clean_tag()?;
    log_status!("release", "Resolved version {}", resolved);

    let version = version::release_version(&resolved)?;
    match bump {
        Some(kind) => version::bump(&version, kind),
        None => Ok(version),
    }
}

/// Create `v<version>` locally; an existing tag is a warning.
pub fn tag(session: &mut Session, options: &TagOptions) -> Result<RecipeOutcome> {
    let mut report = RecipeReport::new("release tag", session);
    let version = release_version(session, options.bump)?;
    let tag_name = format!("v{}", version);

    let create = wrappers::git(&CommandLine::new("tag").arg(&tag_name).render(), Target::Local)
        .path(session.project_path(&Target::Local));
    report.run_tolerating(
        session,
        create,
        TAG_EXISTS,
        &format!("Tag {} already exists", tag_name),
    )?;

    if options.push {
        let push = wrappers::git(
            &CommandLine::new("push").arg("origin").arg(&tag_name).render(),
            Target::Local,
        );
        report.run(session, push)?;
    }

    Ok(RecipeOutcome::Completed(report))
}

#[derive(Debug, Clone, Default)]
pub struct CodeOptions {
    pub upload: bool,
}

/// `<package>-<version>-py3-none-any.whl`
pub fn wheel_name(package: &str, version: &str) -> String {
    format!("{}-{}-py3-none-any.whl", package, version)
}

/// Clean and build a wheel, optionally upload it to the bucket.
pub fn code(session: &mut Session, options: &CodeOptions) -> Result<RecipeOutcome> {
    let mut report = RecipeReport::new("release code", session);
    let version = release_version(session, None)?;
    let root = session.project_path(&Target::Local);

    report.run(
        session,
        CommandExecutionRequest::new("rm -rf dist/ build/ *.egg-info/").path(root.clone()),
    )?;
    let build = wrappers::python(session, "setup.py bdist_wheel", true, Target::Local).path(root);
    report.run(session, build)?;

    if options.upload {
        let wheel = format!("dist/{}", wheel_name(&session.ctx.package_name(), &version));
        let transfer = S3Transfer::simple(session, &wheel, Direction::Up);
        let upload = wrappers::s3(session, &transfer, Target::Local)?;
        report.run(session, upload)?;
    }

    Ok(RecipeOutcome::Completed(report))
}

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub build_wheels: bool,
    pub build_image: bool,
    pub py_version: String,
    pub c_ext: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            build_wheels: true,
            build_image: true,
            py_version: "3.6".to_string(),
            c_ext: true,
        }
    }
}

/// Build dependency wheels with the wheel factory on the build host, then
/// build, tag and push the runtime image.
pub fn runtime(session: &mut Session, options: &RuntimeOptions) -> Result<RecipeOutcome> {
    let mut report = RecipeReport::new("release runtime", session);
    let target = session.target()?;
    let tag = session.ctx.clean_tag()?;
    let package = session.ctx.package_name();
    let build_dir = session.ctx.remote_layout().build_dir;
    let recipe = format!("{}-{}", package, tag);

    if options.build_wheels {
        report.run(
            session,
            CommandExecutionRequest::new("rm -rf *.whl")
                .path(format!("{}/wheelhouse", build_dir))
                .target(target.clone()),
        )?;

        let transfer = S3Transfer {
            local_path: format!("{}/wheelhouse/", build_dir),
            s3_path: format!("{}/dist/{}", package, wheel_name(&package, &tag)),
            ..S3Transfer::simple(session, "", Direction::Down)
        };
        let mut fetch = wrappers::s3(session, &transfer, target.clone())?;
        fetch.working_directory = Some(build_dir.clone());
        report.run(session, fetch)?;

        let recipe_path = format!("{}/recipes/{}.txt", build_dir, recipe);
        let copy = match &target {
            Target::Remote(host) => CommandLine::new("scp")
                .arg("build-reqs.txt")
                .arg(format!("{}:{}", host, recipe_path)),
            Target::Local => CommandLine::new("cp").arg("build-reqs.txt").arg(&recipe_path),
        };
        let copy = CommandExecutionRequest::new(copy.render())
            .path(session.project_path(&Target::Local));
        report.run(session, copy)?;

        let mut factory = wrappers::compose(session, "run --rm factory", target.clone())?;
        factory.working_directory = Some(build_dir.clone());
        let factory = factory
            .env("RECIPE", recipe.clone())
            .env("PY_VERSION", options.py_version.clone())
            .env("CEXT", if options.c_ext { "True" } else { "False" });
        report.run(session, factory)?;
    }

    if options.build_image {
        let image = session.ctx.image_name()?;
        let versioned = format!("{}:{}", image, tag);
        let latest = format!("{}:latest", image);

        let build = CommandLine::new("build")
            .arg("-f")
            .arg("Dockerfile-wheel")
            .arg("-t")
            .arg(&versioned)
            .arg(".")
            .render();
        let build = wrappers::docker(session, &build, target.clone())?.path(build_dir.clone());
        report.run(session, build)?;

        for args in [
            format!("tag {} {}", versioned, latest),
            format!("push {}", versioned),
            format!("push {}", latest),
        ] {
            let request = wrappers::docker(session, &args, target.clone())?;
            report.run(session, request)?;
        }
    }

    Ok(RecipeOutcome::Completed(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::testing::harness;
    use tempfile::TempDir;

    #[test]
    fn tag_creates_semver_tag_from_clean_describe() {
        let dir = TempDir::new().unwrap();
        let mut h = harness(dir.path(), &[], Some("v1.4.2-0-gabc1234"), vec![]);
        let outcome = tag(&mut h.session, &TagOptions::default()).unwrap();
        assert_eq!(h.channel.commands(), vec!["git tag v1.4.2"]);
        assert!(outcome.report().warnings.is_empty());
    }

    #[test]
    fn tag_refuses_dirty_tree() {
        let dir = TempDir::new().unwrap();
        let mut h = harness(dir.path(), &[], Some("v1.4.2-3-gabc1234-dirty"), vec![]);
        let err = tag(&mut h.session, &TagOptions::default()).unwrap_err();
        assert_eq!(err.code.as_str(), "version.dirty");
        assert!(h.channel.commands().is_empty());
    }

    #[test]
    fn existing_tag_is_a_warning() {
        let dir = TempDir::new().unwrap();
        let mut h = harness(dir.path(), &[], Some("v1.4.2-0-gabc1234"), vec![]);
        h.channel
            .respond_exit(128, "fatal: tag 'v1.4.2' already exists");
        let outcome = tag(
            &mut h.session,
            &TagOptions {
                bump: None,
                push: true,
            },
        )
        .unwrap();
        assert_eq!(outcome.report().warnings, vec!["Tag v1.4.2 already exists"]);
        assert_eq!(
            h.channel.commands(),
            vec!["git tag v1.4.2", "git push origin v1.4.2"]
        );
    }

    #[test]
    fn other_tag_failures_propagate() {
        let dir = TempDir::new().unwrap();
        let mut h = harness(dir.path(), &[], Some("v1.4.2-0-gabc1234"), vec![]);
        h.channel.respond_exit(128, "fatal: not a git repository");
        let err = tag(&mut h.session, &TagOptions::default()).unwrap_err();
        assert_eq!(err.command_exit_code(), Some(128));
    }

    #[test]
    fn bump_applies_to_override_tag() {
        let dir = TempDir::new().unwrap();
        let mut h = harness(dir.path(), &[], None, vec![]);
        h.session.ctx.set("tag", "2.3.4");
        let version = release_version(&h.session, Some(BumpKind::Minor)).unwrap();
        assert_eq!(version, "2.4.0");
    }

    #[test]
    fn code_builds_and_uploads_wheel() {
        let dir = TempDir::new().unwrap();
        let mut h = harness(
            dir.path(),
            &[("PROJECT_NAME", "tool-set"), ("BUCKET_NAME", "dstack-storage")],
            Some("v0.18.4-0-gabc1234"),
            vec![],
        );
        code(&mut h.session, &CodeOptions { upload: true }).unwrap();
        let commands = h.channel.commands();
        assert_eq!(commands[0], "rm -rf dist/ build/ *.egg-info/");
        assert_eq!(commands[1], "python setup.py bdist_wheel");
        assert_eq!(
            commands[2],
            "aws s3 cp --quiet dist/tool_set-0.18.4-py3-none-any.whl s3://dstack-storage/tool_set/dist/tool_set-0.18.4-py3-none-any.whl"
        );
    }

    #[test]
    fn runtime_runs_factory_and_pushes_image_on_host() {
        let dir = TempDir::new().unwrap();
        let mut h = harness(
            dir.path(),
            &[
                ("PROJECT_NAME", "toolset"),
                ("ORGANISATION", "obitec"),
                ("HOST_NAME", "factory.example.org"),
                ("BUCKET_NAME", "dstack-storage"),
            ],
            None,
            vec![],
        );
        h.session.ctx.set_remote(true);
        h.session.ctx.set("tag", "0.18.4");
        runtime(&mut h.session, &RuntimeOptions::default()).unwrap();

        let calls = h.channel.calls();
        let commands = h.channel.commands();
        assert_eq!(commands[0], "rm -rf *.whl");
        assert_eq!(
            calls[0].1.working_directory.as_deref(),
            Some("/srv/build/wheelhouse")
        );
        assert_eq!(
            commands[1],
            "aws s3 cp --quiet s3://dstack-storage/toolset/dist/toolset-0.18.4-py3-none-any.whl /srv/build/wheelhouse/"
        );
        assert_eq!(
            commands[2],
            "scp build-reqs.txt factory.example.org:/srv/build/recipes/toolset-0.18.4.txt"
        );
        assert_eq!(calls[2].0, Target::Local);

        let factory = &calls[3].1;
        assert_eq!(factory.command, "docker-compose run --rm factory");
        assert_eq!(factory.environment["RECIPE"], "toolset-0.18.4");
        assert_eq!(factory.environment["CEXT"], "True");
        assert_eq!(factory.working_directory.as_deref(), Some("/srv/build"));

        assert_eq!(
            &commands[4..],
            &[
                "docker build -f Dockerfile-wheel -t obitec/toolset:0.18.4 .",
                "docker tag obitec/toolset:0.18.4 obitec/toolset:latest",
                "docker push obitec/toolset:0.18.4",
                "docker push obitec/toolset:latest",
            ]
        );
    }

    #[test]
    fn runtime_refuses_a_dirty_tag() {
        let dir = TempDir::new().unwrap();
        let mut h = harness(
            dir.path(),
            &[
                ("PROJECT_NAME", "toolset"),
                ("ORGANISATION", "obitec"),
                ("HOST_NAME", "factory.example.org"),
                ("BUCKET_NAME", "dstack-storage"),
            ],
            Some("v1.0.0-2-gabc1234-dirty"),
            vec![],
        );
        h.session.ctx.set_remote(true);
        let err = runtime(&mut h.session, &RuntimeOptions::default()).unwrap_err();
        assert_eq!(err.code.as_str(), "version.dirty");
        assert!(h.channel.commands().is_empty());
    }
}
