//! Layered configuration for a single invocation.
//!
//! Every value carries the [`Source`] it came from. A write only lands when
//! its source ranks at least as high as the one already holding the key:
//!
//! built-in default < `project.yml` < overlay files (later wins)
//! < process environment < explicit `set` / CLI flags
//!
//! Keys are case-insensitive: `PROJECT_NAME` and `project_name` address the
//! same entry.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::dotenv;
use crate::error::{Error, Result};
use crate::executor::Target;
use crate::project_file::{ProjectFile, PROJECT_FILE};
use crate::version::{self, GitDescribe, ResolvedTag, TagSource, TagSources, VersionControl};

const APPS_ROOT: &str = "/srv/apps";
const BUILD_ROOT: &str = "/srv/build";
const POSTGRES_DATA: &str = "/var/lib/postgresql/data";

/// Where a configuration value came from, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "index")]
pub enum Source {
    Default,
    ProjectFile,
    /// Overlay files in load order.
    Overlay(u32),
    Environment,
    Override,
}

#[derive(Debug, Clone)]
struct Setting {
    /// Key as first written, used when exporting to subprocesses.
    name: String,
    value: String,
    source: Source,
}

/// Outcome of loading one overlay file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayLoad {
    pub path: String,
    pub found: bool,
    pub applied: usize,
    /// Entries ignored because a higher-precedence source holds the key.
    pub shadowed: usize,
}

/// Process-level inputs to [`ConfigContext::initialize`].
#[derive(Debug, Clone, Default)]
pub struct Defaults {
    pub working_directory: PathBuf,
    pub environment: Vec<(String, String)>,
}

impl Defaults {
    /// Current directory plus a snapshot of the process environment.
    pub fn from_process() -> Result<Self> {
        let working_directory = std::env::current_dir().map_err(|e| {
            Error::internal_io(e.to_string(), Some("read current directory".to_string()))
        })?;
        Ok(Self {
            working_directory,
            environment: std::env::vars().collect(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VenvType {
    Conda,
    Pip,
}

impl VenvType {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "conda" => Ok(Self::Conda),
            "pip" | "venv" => Ok(Self::Pip),
            _ => Err(Error::config_invalid_value(
                "venv_type",
                Some(value.to_string()),
                "expected 'conda' or 'pip'",
            )),
        }
    }

    /// Shell fragment that activates `venv` on this platform.
    pub fn activation(self, venv: &str) -> String {
        match (self, cfg!(windows)) {
            (Self::Conda, false) => format!("source activate {}", venv),
            (Self::Conda, true) => format!("activate {}", venv),
            (Self::Pip, false) => format!("source {}/bin/activate", venv),
            (Self::Pip, true) => format!("{}\\Scripts\\activate.bat", venv),
        }
    }
}

/// Server-side paths derived from the project name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteLayout {
    pub project_dir: String,
    pub server_dotenv_path: String,
    pub build_dir: String,
    pub postgres_data: String,
    pub virtual_host: String,
}

/// Options for [`ConfigContext::configure`], usually straight from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct ConfigureOptions {
    pub collection: Option<String>,
    pub tag: Option<String>,
    pub project: Option<String>,
    pub host: Option<String>,
    pub live: bool,
    pub dry_run: bool,
}

pub struct ConfigContext {
    settings: BTreeMap<String, Setting>,
    working_directory: PathBuf,
    dry_run: bool,
    remote: bool,
    overlays_loaded: u32,
    vcs: Box<dyn VersionControl>,
}

impl std::fmt::Debug for ConfigContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigContext")
            .field("working_directory", &self.working_directory)
            .field("dry_run", &self.dry_run)
            .field("remote", &self.remote)
            .field("keys", &self.settings.len())
            .finish()
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

impl ConfigContext {
    /// Seed built-in defaults and the process environment snapshot.
    pub fn initialize(defaults: Defaults) -> Self {
        let working_directory = defaults.working_directory;
        let mut ctx = Self {
            settings: BTreeMap::new(),
            working_directory: working_directory.clone(),
            dry_run: false,
            remote: false,
            overlays_loaded: 0,
            vcs: Box::new(GitDescribe),
        };

        let directory_name = working_directory
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        ctx.merge("project_name", &directory_name, Source::Default);
        ctx.merge(
            "source_dir",
            &working_directory.join("src").to_string_lossy(),
            Source::Default,
        );
        ctx.merge("venv_type", "conda", Source::Default);
        ctx.merge("activation_prefix", "", Source::Default);

        for (key, value) in defaults.environment {
            ctx.merge(&key, &value, Source::Environment);
        }

        ctx
    }

    /// Swap the version-control backend used by [`Self::resolve_tag`].
    pub fn with_version_control(mut self, vcs: Box<dyn VersionControl>) -> Self {
        self.vcs = vcs;
        self
    }

    /// Write `value` under `key` unless a higher-precedence source holds it.
    /// Returns whether the write landed.
    pub fn merge(&mut self, key: &str, value: &str, source: Source) -> bool {
        let normalized = normalize(key);
        if normalized.is_empty() {
            return false;
        }
        if let Some(existing) = self.settings.get(&normalized) {
            if existing.source > source {
                return false;
            }
        }
        self.settings.insert(
            normalized,
            Setting {
                name: key.trim().to_string(),
                value: value.to_string(),
                source,
            },
        );
        true
    }

    /// Ad-hoc override; outranks every other source.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.merge(key, &value.into(), Source::Override);
    }

    pub fn get(&self, key: &str, default: &str) -> String {
        self.value(key).unwrap_or(default).to_string()
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.settings.get(&normalize(key)).map(|s| s.value.as_str())
    }

    pub fn source_of(&self, key: &str) -> Option<Source> {
        self.settings.get(&normalize(key)).map(|s| s.source)
    }

    /// Non-empty value or `config.missing_key`.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.value(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::config_missing_key(normalize(key), None))
    }

    pub fn load_project_file(&mut self, path: &Path) -> Result<bool> {
        let path = self.absolute(path);
        let Some(file) = ProjectFile::load(&path)? else {
            return Ok(false);
        };
        for (key, value) in file.settings() {
            self.merge(key, &value, Source::ProjectFile);
        }
        Ok(true)
    }

    /// Merge a `KEY=VALUE` overlay. A missing file is reported and skipped.
    pub fn load_overlay(&mut self, path: &Path) -> Result<OverlayLoad> {
        let path = self.absolute(path);
        let display = path.display().to_string();

        let Some(entries) = dotenv::read(&path)? else {
            log_status!("config", "Overlay {} not found, skipping", display);
            return Ok(OverlayLoad {
                path: display,
                found: false,
                applied: 0,
                shadowed: 0,
            });
        };

        let source = Source::Overlay(self.overlays_loaded);
        self.overlays_loaded += 1;

        let mut applied = 0;
        let mut shadowed = 0;
        for entry in entries {
            if self.merge(&entry.key, &entry.value, source) {
                applied += 1;
            } else {
                shadowed += 1;
            }
        }

        Ok(OverlayLoad {
            path: display,
            found: true,
            applied,
            shadowed,
        })
    }

    /// Full configure step: project file, `.env`, the collection overlay,
    /// then CLI overrides, then derived values.
    pub fn configure(&mut self, options: &ConfigureOptions) -> Result<Vec<OverlayLoad>> {
        self.load_project_file(Path::new(PROJECT_FILE))?;

        let mut overlays = vec![self.load_overlay(Path::new(".env"))?];
        if let Some(collection) = options.collection.as_deref().filter(|c| !c.is_empty()) {
            let overlay = PathBuf::from(".local").join(format!("{}.env", collection));
            overlays.push(self.load_overlay(&overlay)?);
        }

        if let Some(tag) = &options.tag {
            self.set("tag", tag.clone());
        }
        if let Some(project) = &options.project {
            self.set("project_name", project.clone());
        }
        if let Some(host) = &options.host {
            self.set("host_name", host.clone());
        }
        if options.live {
            self.remote = true;
        }
        if options.dry_run {
            self.enable_dry_run();
        }

        let prefix = self.derived_activation_prefix()?;
        self.merge("activation_prefix", &prefix, Source::Default);

        Ok(overlays)
    }

    /// Irreversible for the lifetime of the context.
    pub fn enable_dry_run(&mut self) {
        self.dry_run = true;
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn set_remote(&mut self, remote: bool) {
        self.remote = remote;
    }

    pub fn is_remote_target(&self) -> bool {
        self.remote
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// Resolve `path` against the working directory.
    pub fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_directory.join(path)
        }
    }

    /// Expand `~` and `$VARS` (looked up in this context), then make absolute.
    pub fn expand_path(&self, raw: &str) -> PathBuf {
        let expanded = shellexpand::full_with_context_no_errors(
            raw,
            || self.value("home").map(str::to_string),
            |var| self.value(var).map(str::to_string),
        );
        self.absolute(Path::new(expanded.as_ref()))
    }

    pub fn project_name(&self) -> String {
        self.get("project_name", "")
    }

    pub fn organisation(&self) -> String {
        self.get("organisation", "")
    }

    pub fn git_repo(&self) -> String {
        self.get("git_repo", "")
    }

    pub fn source_directory(&self) -> PathBuf {
        self.absolute(Path::new(&self.get("source_dir", "src")))
    }

    pub fn local_dotenv_path(&self) -> PathBuf {
        self.working_directory.join(".env")
    }

    /// Python package name: project name with `-` replaced by `_`.
    pub fn package_name(&self) -> String {
        self.project_name().replace('-', "_")
    }

    /// Explicit `IMAGE_NAME`, else `organisation/project_name`, else
    /// `project_name`.
    pub fn image_name(&self) -> Result<String> {
        if let Some(image) = self.value("image_name").filter(|v| !v.trim().is_empty()) {
            return Ok(image.trim().to_string());
        }
        let project = self.project_name();
        let organisation = self.organisation();
        match (organisation.trim(), project.trim()) {
            (_, "") => Err(Error::config_missing_key("image_name", None)),
            ("", project) => Ok(project.to_string()),
            (org, project) => Ok(format!("{}/{}", org, project)),
        }
    }

    pub fn venv_type(&self) -> Result<VenvType> {
        VenvType::parse(&self.get("venv_type", "conda"))
    }

    pub fn venv_name(&self) -> Result<String> {
        if let Some(name) = self.value("venv_name").filter(|v| !v.trim().is_empty()) {
            return Ok(name.to_string());
        }
        Ok(match self.venv_type()? {
            VenvType::Conda => self.project_name(),
            VenvType::Pip => "venv".to_string(),
        })
    }

    fn derived_activation_prefix(&self) -> Result<String> {
        Ok(self.venv_type()?.activation(&self.venv_name()?))
    }

    /// Empty until [`Self::configure`] derives it, unless set explicitly.
    pub fn activation_prefix(&self) -> String {
        self.get("activation_prefix", "")
    }

    pub fn remote_layout(&self) -> RemoteLayout {
        let project = self.project_name();
        let project_dir = format!("{}/{}", APPS_ROOT, project);
        RemoteLayout {
            server_dotenv_path: format!("{}/.env", project_dir),
            project_dir,
            build_dir: BUILD_ROOT.to_string(),
            postgres_data: POSTGRES_DATA.to_string(),
            virtual_host: self
                .value("virtual_host")
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or(project),
        }
    }

    /// Hosts from `HOST_NAME` (comma separated), in order.
    pub fn hosts(&self) -> Vec<String> {
        self.get("host_name", "")
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// `Remote(first host)` for a live context, `Local` otherwise.
    pub fn target(&self) -> Result<Target> {
        if !self.remote {
            return Ok(Target::Local);
        }
        self.hosts()
            .into_iter()
            .next()
            .map(Target::Remote)
            .ok_or_else(|| Error::config_missing_key("host_name", None))
    }

    pub fn resolve_tag(&self) -> ResolvedTag {
        let override_tag = self
            .settings
            .get("tag")
            .filter(|s| s.source == Source::Override)
            .map(|s| s.value.as_str());
        let source_dir = self.source_directory();
        version::resolve(&TagSources {
            override_tag,
            repo_dir: &self.working_directory,
            source_dir: &source_dir,
            version_setting: self.value("version"),
            vcs: self.vcs.as_ref(),
        })
    }

    pub fn tag(&self) -> String {
        self.resolve_tag().value
    }

    /// Tag used in image and wheel names. Refuses a version-control tag taken
    /// from an untagged or uncommitted tree.
    pub fn clean_tag(&self) -> Result<String> {
        let resolved = self.resolve_tag();
        if resolved.source == TagSource::VersionControl && resolved.dirty {
            return Err(Error::version_dirty(resolved.value));
        }
        Ok(resolved.value)
    }

    /// Values that came from overlay files, keyed as written. These are
    /// exported to live subprocesses.
    pub fn overlay_exports(&self) -> BTreeMap<String, String> {
        self.settings
            .values()
            .filter(|s| matches!(s.source, Source::Overlay(_)))
            .map(|s| (s.name.clone(), s.value.clone()))
            .collect()
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        let image_name = self.image_name().ok();
        ContextSnapshot {
            project_name: self.project_name(),
            organisation: self.organisation(),
            git_repo: self.git_repo(),
            image_name,
            tag: self.resolve_tag(),
            working_directory: self.working_directory.display().to_string(),
            source_directory: self.source_directory().display().to_string(),
            local_dotenv_path: self.local_dotenv_path().display().to_string(),
            venv_type: self.get("venv_type", "conda"),
            venv_name: self.venv_name().unwrap_or_default(),
            activation_prefix: self.activation_prefix(),
            dry_run: self.dry_run,
            remote: self.remote,
            hosts: self.hosts(),
            remote_layout: self.remote_layout(),
        }
    }
}

/// Serializable view of the resolved context.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub project_name: String,
    pub organisation: String,
    pub git_repo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    pub tag: ResolvedTag,
    pub working_directory: String,
    pub source_directory: String,
    pub local_dotenv_path: String,
    pub venv_type: String,
    pub venv_name: String,
    pub activation_prefix: String,
    pub dry_run: bool,
    pub remote: bool,
    pub hosts: Vec<String>,
    pub remote_layout: RemoteLayout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct NoVcs;

    impl VersionControl for NoVcs {
        fn describe(&self, _dir: &Path) -> Option<String> {
            None
        }
    }

    fn context(dir: &Path, env: &[(&str, &str)]) -> ConfigContext {
        ConfigContext::initialize(Defaults {
            working_directory: dir.to_path_buf(),
            environment: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
        .with_version_control(Box::new(NoVcs))
    }

    #[test]
    fn defaults_come_from_working_directory() {
        let dir = TempDir::new().unwrap();
        let ctx = context(dir.path(), &[]);
        let name = dir.path().file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(ctx.project_name(), name);
        assert_eq!(ctx.source_directory(), dir.path().join("src"));
        assert_eq!(ctx.activation_prefix(), "");
        assert!(!ctx.is_dry_run());
    }

    #[test]
    fn process_env_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let ctx = context(dir.path(), &[("PROJECT_NAME", "demo")]);
        assert_eq!(ctx.get("project_name", ""), "demo");
        assert_eq!(ctx.get("PROJECT_NAME", ""), "demo");
        assert_eq!(ctx.source_of("project_name"), Some(Source::Environment));
    }

    #[test]
    fn overlay_fills_unset_keys() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.env"), "TAG=1.0.0\n").unwrap();
        let mut ctx = context(dir.path(), &[]);
        let load = ctx.load_overlay(Path::new("a.env")).unwrap();
        assert!(load.found);
        assert_eq!(load.applied, 1);
        assert_eq!(ctx.get("tag", ""), "1.0.0");
    }

    #[test]
    fn env_outranks_overlays_and_later_overlay_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.env"), "PROJECT_NAME=from-a\nIMAGE_NAME=a/img\n").unwrap();
        fs::write(dir.path().join("b.env"), "PROJECT_NAME=from-b\nIMAGE_NAME=b/img\n").unwrap();

        let mut ctx = context(dir.path(), &[("PROJECT_NAME", "from-env")]);
        ctx.load_overlay(Path::new("a.env")).unwrap();
        let second = ctx.load_overlay(Path::new("b.env")).unwrap();

        assert_eq!(second.shadowed, 1);
        assert_eq!(ctx.project_name(), "from-env");
        assert_eq!(ctx.image_name().unwrap(), "b/img");
    }

    #[test]
    fn set_outranks_everything() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), &[("ORGANISATION", "env-org")]);
        ctx.set("organisation", "cli-org");
        assert_eq!(ctx.organisation(), "cli-org");
        assert_eq!(ctx.source_of("ORGANISATION"), Some(Source::Override));
    }

    #[test]
    fn missing_overlay_is_skipped() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), &[]);
        let load = ctx.load_overlay(Path::new("nope.env")).unwrap();
        assert!(!load.found);
        assert_eq!(load.applied, 0);
    }

    #[test]
    fn image_name_derivation() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), &[]);
        ctx.set("project_name", "toolset");
        assert_eq!(ctx.image_name().unwrap(), "toolset");
        ctx.set("organisation", "obitec");
        assert_eq!(ctx.image_name().unwrap(), "obitec/toolset");
        ctx.set("image_name", "registry.local/toolset");
        assert_eq!(ctx.image_name().unwrap(), "registry.local/toolset");
    }

    #[test]
    fn image_name_without_project_is_config_error() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), &[]);
        ctx.set("project_name", "");
        let err = ctx.image_name().unwrap_err();
        assert_eq!(err.code.as_str(), "config.missing_key");
        assert_eq!(err.details["key"], "image_name");
    }

    #[test]
    fn project_file_sits_below_overlays() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(PROJECT_FILE),
            "project:\n  name: from-yaml\n  organisation: obitec\n",
        )
        .unwrap();
        fs::write(dir.path().join(".env"), "PROJECT_NAME=from-dotenv\n").unwrap();

        let mut ctx = context(dir.path(), &[]);
        ctx.configure(&ConfigureOptions::default()).unwrap();
        assert_eq!(ctx.project_name(), "from-dotenv");
        assert_eq!(ctx.organisation(), "obitec");
    }

    #[test]
    fn collection_overlay_wins_over_dotenv() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".local")).unwrap();
        fs::write(dir.path().join(".env"), "HOST_NAME=dev.example.org\n").unwrap();
        fs::write(
            dir.path().join(".local/production.env"),
            "HOST_NAME=prod.example.org\n",
        )
        .unwrap();

        let mut ctx = context(dir.path(), &[]);
        let overlays = ctx
            .configure(&ConfigureOptions {
                collection: Some("production".to_string()),
                live: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(overlays.len(), 2);
        assert_eq!(
            ctx.target().unwrap(),
            Target::Remote("prod.example.org".to_string())
        );
    }

    #[test]
    fn configure_derives_activation_prefix() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), &[("PROJECT_NAME", "toolset")]);
        ctx.configure(&ConfigureOptions::default()).unwrap();
        if cfg!(windows) {
            assert_eq!(ctx.activation_prefix(), "activate toolset");
        } else {
            assert_eq!(ctx.activation_prefix(), "source activate toolset");
        }

        let mut ctx = context(dir.path(), &[("VENV_TYPE", "pip")]);
        ctx.configure(&ConfigureOptions::default()).unwrap();
        if !cfg!(windows) {
            assert_eq!(ctx.activation_prefix(), "source venv/bin/activate");
        }
    }

    #[test]
    fn invalid_venv_type_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), &[("VENV_TYPE", "poetry")]);
        let err = ctx.configure(&ConfigureOptions::default()).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    }

    #[test]
    fn live_without_host_is_missing_key() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), &[]);
        assert_eq!(ctx.target().unwrap(), Target::Local);
        ctx.set_remote(true);
        let err = ctx.target().unwrap_err();
        assert_eq!(err.details["key"], "host_name");
    }

    struct Describe(&'static str);

    impl VersionControl for Describe {
        fn describe(&self, _dir: &Path) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    #[test]
    fn clean_tag_refuses_dirty_describe_but_not_an_override() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), &[])
            .with_version_control(Box::new(Describe("v1.0.0-2-gabc1234-dirty")));
        let err = ctx.clean_tag().unwrap_err();
        assert_eq!(err.code.as_str(), "version.dirty");

        ctx.set("tag", "1.0.1");
        assert_eq!(ctx.clean_tag().unwrap(), "1.0.1");

        let clean = context(dir.path(), &[])
            .with_version_control(Box::new(Describe("v1.0.0-0-gabc1234")));
        assert_eq!(clean.clean_tag().unwrap(), "1.0.0");
    }

    #[test]
    fn cli_tag_overrides_but_overlay_tag_does_not() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), "TAG=9.9.9\nVERSION=0.5.0\n").unwrap();
        let mut ctx = context(dir.path(), &[]);
        ctx.load_overlay(Path::new(".env")).unwrap();

        let tag = ctx.resolve_tag();
        assert_eq!(tag.value, "0.5.0");
        assert_eq!(tag.source, TagSource::Environment);

        ctx.set("tag", "");
        assert_eq!(ctx.resolve_tag().value, "0.5.0");

        ctx.set("tag", "2.0.0");
        assert_eq!(ctx.resolve_tag().source, TagSource::Override);
        assert_eq!(ctx.tag(), "2.0.0");
    }

    #[test]
    fn overlay_exports_keep_original_casing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), "DATABASE_URL=postgres://db/app\n").unwrap();
        let mut ctx = context(dir.path(), &[("HOME", "/home/ops")]);
        ctx.load_overlay(Path::new(".env")).unwrap();

        let exports = ctx.overlay_exports();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports["DATABASE_URL"], "postgres://db/app");
    }

    #[test]
    fn expand_path_uses_context_values() {
        let dir = TempDir::new().unwrap();
        let ctx = context(dir.path(), &[("HOME", "/home/ops"), ("APP", "toolset")]);
        assert_eq!(ctx.expand_path("~/apps"), PathBuf::from("/home/ops/apps"));
        assert_eq!(ctx.expand_path("/srv/$APP"), PathBuf::from("/srv/toolset"));
        assert_eq!(ctx.expand_path("build"), dir.path().join("build"));
    }

    #[test]
    fn remote_layout_follows_project_name() {
        let dir = TempDir::new().unwrap();
        let ctx = context(dir.path(), &[("PROJECT_NAME", "toolset")]);
        let layout = ctx.remote_layout();
        assert_eq!(layout.project_dir, "/srv/apps/toolset");
        assert_eq!(layout.server_dotenv_path, "/srv/apps/toolset/.env");
        assert_eq!(layout.virtual_host, "toolset");
    }
}
