use shipwright::context::{ConfigContext, Defaults};
use shipwright::executor::{CommandExecutionRequest, CommandExecutor, SharedBuffer};
use shipwright::ErrorCode;
use tempfile::TempDir;

fn context(dir: &std::path::Path) -> ConfigContext {
    ConfigContext::initialize(Defaults {
        working_directory: dir.to_path_buf(),
        environment: Vec::new(),
    })
}

fn buffered_executor() -> (CommandExecutor, SharedBuffer) {
    let out = SharedBuffer::new();
    let executor = CommandExecutor::default().with_output(Box::new(out.clone()));
    (executor, out)
}

#[test]
fn dry_run_prints_and_spawns_nothing() {
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("proj");
    std::fs::create_dir_all(project.join("build")).unwrap();

    let mut ctx = context(dir.path());
    ctx.enable_dry_run();
    let (mut executor, out) = buffered_executor();

    let request = CommandExecutionRequest::new("rm -rf build/")
        .path(project.display().to_string())
        .env("STAGE", "test");
    let result = executor.execute(&request, &ctx).unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(
        out.contents(),
        format!(
            "[local] export STAGE=test && cd {} && rm -rf build/\n",
            project.display()
        )
    );
    assert!(project.join("build").is_dir());
}

#[test]
fn missing_directory_fails_before_running_in_both_modes() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("ran");
    let request = CommandExecutionRequest::new(format!("touch {}", marker.display()))
        .path("does/not/exist");

    let ctx = context(dir.path());
    let (mut executor, _) = buffered_executor();
    let err = executor.execute(&request, &ctx).unwrap_err();
    assert_eq!(err.code, ErrorCode::DirectoryNotFound);

    let mut ctx = context(dir.path());
    ctx.enable_dry_run();
    let (mut executor, out) = buffered_executor();
    let err = executor.execute(&request, &ctx).unwrap_err();
    assert_eq!(err.code, ErrorCode::DirectoryNotFound);
    assert!(out.contents().is_empty());
    assert!(!marker.exists());
}

#[cfg(unix)]
#[test]
fn failing_command_raises_with_its_exit_code() {
    let dir = TempDir::new().unwrap();
    let ctx = context(dir.path());
    let (mut executor, _) = buffered_executor();

    let err = executor
        .execute(&CommandExecutionRequest::new("false"), &ctx)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::CommandFailed);
    assert_eq!(err.command_exit_code(), Some(1));
}

#[cfg(unix)]
#[test]
fn tolerated_failure_returns_the_result() {
    let dir = TempDir::new().unwrap();
    let ctx = context(dir.path());
    let (mut executor, _) = buffered_executor();

    let result = executor
        .execute(
            &CommandExecutionRequest::new("echo oops >&2; exit 1").must_succeed(false),
            &ctx,
        )
        .unwrap();
    assert_eq!(result.exit_code, 1);
    assert_eq!(result.stderr.trim(), "oops");
}

#[cfg(unix)]
#[test]
fn request_environment_is_scoped_to_the_call() {
    let dir = TempDir::new().unwrap();
    let ctx = context(dir.path());
    let (mut executor, out) = buffered_executor();

    let result = executor
        .execute(
            &CommandExecutionRequest::new("echo hi $FOO").env("FOO", "bar"),
            &ctx,
        )
        .unwrap();
    assert!(result.stdout.contains("hi bar"));
    assert!(out.contents().contains("hi bar"));
    assert!(std::env::var_os("FOO").is_none());

    let again = executor
        .execute(&CommandExecutionRequest::new("echo \"[${FOO:-}]\""), &ctx)
        .unwrap();
    assert_eq!(again.stdout.trim(), "[]");
}

#[cfg(unix)]
#[test]
fn commands_run_in_the_requested_directory_without_moving_the_runner() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    let ctx = context(dir.path());
    let (mut executor, _) = buffered_executor();
    let before = std::env::current_dir().unwrap();

    let result = executor
        .execute(&CommandExecutionRequest::new("pwd").path("sub").quiet(), &ctx)
        .unwrap();
    let reported = std::fs::canonicalize(result.stdout.trim()).unwrap();
    assert_eq!(reported, std::fs::canonicalize(dir.path().join("sub")).unwrap());
    assert_eq!(std::env::current_dir().unwrap(), before);
}

#[cfg(unix)]
#[test]
fn overlay_values_are_exported_to_live_commands() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".env"), "GREETING=hello\n").unwrap();
    let mut ctx = context(dir.path());
    ctx.load_overlay(std::path::Path::new(".env")).unwrap();
    let (mut executor, _) = buffered_executor();

    let result = executor
        .execute(&CommandExecutionRequest::new("echo $GREETING").quiet(), &ctx)
        .unwrap();
    assert_eq!(result.stdout.trim(), "hello");
}
