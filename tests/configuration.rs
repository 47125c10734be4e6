use shipwright::context::{ConfigContext, ConfigureOptions, Defaults, Source};
use tempfile::TempDir;

fn context(dir: &std::path::Path, env: &[(&str, &str)]) -> ConfigContext {
    ConfigContext::initialize(Defaults {
        working_directory: dir.to_path_buf(),
        environment: env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    })
}

#[test]
fn process_environment_feeds_lookups_without_overlays() {
    let dir = TempDir::new().unwrap();
    let ctx = context(dir.path(), &[("PROJECT_NAME", "demo")]);
    assert_eq!(ctx.get("project_name", ""), "demo");
    assert_eq!(ctx.get("PROJECT_NAME", ""), "demo");
}

#[test]
fn overlay_supplies_keys_missing_from_environment() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.env"), "TAG=1.0.0\n").unwrap();
    let mut ctx = context(dir.path(), &[]);

    let load = ctx.load_overlay(std::path::Path::new("a.env")).unwrap();
    assert!(load.found);
    assert_eq!(ctx.get("tag", ""), "1.0.0");
}

#[test]
fn environment_beats_overlays_and_later_overlays_beat_earlier() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join(".local")).unwrap();
    std::fs::write(
        dir.path().join(".env"),
        "IMAGE_NAME=from-dotenv\nBUCKET_NAME=base-bucket\nVERSION=0.1.0\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join(".local/staging.env"),
        "BUCKET_NAME=staging-bucket\nIMAGE_NAME=from-staging\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("project.yml"),
        "project:\n  name: toolset\n  organisation: obitec\n",
    )
    .unwrap();

    let mut ctx = context(dir.path(), &[("IMAGE_NAME", "from-env")]);
    let overlays = ctx
        .configure(&ConfigureOptions {
            collection: Some("staging".to_string()),
            ..ConfigureOptions::default()
        })
        .unwrap();

    assert_eq!(overlays.len(), 2);
    assert_eq!(ctx.get("image_name", ""), "from-env");
    assert_eq!(ctx.source_of("image_name"), Some(Source::Environment));
    assert_eq!(ctx.get("bucket_name", ""), "staging-bucket");
    assert_eq!(ctx.project_name(), "toolset");
    assert_eq!(ctx.organisation(), "obitec");
}

#[cfg(unix)]
#[test]
fn cli_overrides_outrank_environment() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(
        dir.path(),
        &[("PROJECT_NAME", "from-env"), ("HOST_NAME", "a.example.org,b.example.org")],
    );
    ctx.configure(&ConfigureOptions {
        project: Some("from-cli".to_string()),
        tag: Some("2.0.0".to_string()),
        live: true,
        ..ConfigureOptions::default()
    })
    .unwrap();

    assert_eq!(ctx.project_name(), "from-cli");
    assert_eq!(ctx.tag(), "2.0.0");
    assert_eq!(
        ctx.target().unwrap(),
        shipwright::executor::Target::Remote("a.example.org".to_string())
    );
    assert_eq!(ctx.activation_prefix(), "source activate from-cli");
}

#[test]
fn resolve_tag_is_idempotent() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/version.txt"), "3.1.4\n").unwrap();
    let ctx = context(dir.path(), &[]).with_version_control(Box::new(NoVcs));

    let first = ctx.resolve_tag();
    assert_eq!(first.value, "3.1.4");
    assert_eq!(ctx.resolve_tag(), first);
}

struct NoVcs;

impl shipwright::version::VersionControl for NoVcs {
    fn describe(&self, _dir: &std::path::Path) -> Option<String> {
        None
    }
}
