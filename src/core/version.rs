//! Release tag resolution.
//!
//! The tag is resolved from, in order: an explicit override, `git describe`,
//! `version.txt` in the source tree, the `VERSION` setting, and finally
//! [`FALLBACK_TAG`]. The first source that yields a value wins.

use std::path::Path;
use std::process::Command;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

pub const FALLBACK_TAG: &str = "0.0.0-dev";
pub const VERSION_FILE: &str = "version.txt";

/// Where a resolved tag came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagSource {
    Override,
    VersionControl,
    VersionFile,
    Environment,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTag {
    pub value: String,
    pub source: TagSource,
    /// True when the tag came from version control and the tree is not
    /// exactly on a clean tag.
    pub dirty: bool,
}

/// Version-control query used during tag resolution.
pub trait VersionControl {
    /// Raw `git describe --tags --long --dirty` style output, or `None` when
    /// the directory has no usable history.
    fn describe(&self, dir: &Path) -> Option<String>;
}

/// [`VersionControl`] backed by the `git` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitDescribe;

impl VersionControl for GitDescribe {
    fn describe(&self, dir: &Path) -> Option<String> {
        let output = Command::new("git")
            .args(["describe", "--tags", "--long", "--dirty"])
            .current_dir(dir)
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!stdout.is_empty()).then_some(stdout)
    }
}

/// Parsed `git describe --long` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeVersion {
    pub tag: String,
    pub distance: u32,
    pub hash: String,
    pub dirty: bool,
}

impl DescribeVersion {
    pub fn parse(describe: &str) -> Option<Self> {
        let re = Regex::new(r"^v?(?P<tag>.+)-(?P<distance>\d+)-g(?P<hash>[0-9a-f]+)(?P<dirty>-dirty)?$")
            .ok()?;
        let caps = re.captures(describe.trim())?;
        Some(Self {
            tag: caps["tag"].to_string(),
            distance: caps["distance"].parse().ok()?,
            hash: caps["hash"].to_string(),
            dirty: caps.name("dirty").is_some(),
        })
    }

    /// Exactly on a tag with no local modifications.
    pub fn is_clean_release(&self) -> bool {
        self.distance == 0 && !self.dirty
    }

    /// `1.2.3` on a clean tag, otherwise `1.2.3.<distance>+g<hash>[.dirty]`.
    pub fn render(&self) -> String {
        if self.is_clean_release() {
            return self.tag.clone();
        }
        let mut rendered = format!("{}.{}+g{}", self.tag, self.distance, self.hash);
        if self.dirty {
            rendered.push_str(".dirty");
        }
        rendered
    }
}

/// True when the version has more than three dot-separated numeric
/// components before any `+` build metadata.
pub fn has_extra_components(version: &str) -> bool {
    let public = version.split('+').next().unwrap_or(version);
    public
        .split('.')
        .filter(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
        .count()
        > 3
}

/// Inputs for [`resolve`]. Every field is optional; missing ones are skipped.
pub struct TagSources<'a> {
    pub override_tag: Option<&'a str>,
    pub repo_dir: &'a Path,
    pub source_dir: &'a Path,
    pub version_setting: Option<&'a str>,
    pub vcs: &'a dyn VersionControl,
}

pub fn resolve(sources: &TagSources<'_>) -> ResolvedTag {
    if let Some(tag) = non_empty(sources.override_tag) {
        return ResolvedTag {
            value: tag.to_string(),
            source: TagSource::Override,
            dirty: false,
        };
    }

    if let Some(raw) = sources.vcs.describe(sources.repo_dir) {
        if let Some(parsed) = DescribeVersion::parse(&raw) {
            let value = parsed.render();
            let dirty = !parsed.is_clean_release() || has_extra_components(&value);
            return ResolvedTag {
                value,
                source: TagSource::VersionControl,
                dirty,
            };
        }
    }

    let version_file = sources.source_dir.join(VERSION_FILE);
    if let Ok(content) = std::fs::read_to_string(&version_file) {
        if let Some(first) = content.lines().next().map(str::trim).filter(|l| !l.is_empty()) {
            return ResolvedTag {
                value: first.to_string(),
                source: TagSource::VersionFile,
                dirty: false,
            };
        }
    }

    if let Some(version) = non_empty(sources.version_setting) {
        return ResolvedTag {
            value: version.to_string(),
            source: TagSource::Environment,
            dirty: false,
        };
    }

    ResolvedTag {
        value: FALLBACK_TAG.to_string(),
        source: TagSource::Fallback,
        dirty: false,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `major.minor.patch` of a tag, dropping a leading `v`, pre-release and
/// build metadata. Errors when the tag is not SemVer-shaped.
pub fn release_version(tag: &str) -> Result<String> {
    let trimmed = tag.trim().trim_start_matches('v');
    let core = trimmed.split('+').next().unwrap_or(trimmed);
    let numeric: Vec<&str> = core.split('.').take(3).collect();
    let candidate = numeric.join(".");
    let version = semver::Version::parse(&candidate)
        .or_else(|_| semver::Version::parse(core))
        .map_err(|e| Error::config_invalid_value("tag", Some(tag.to_string()), e.to_string()))?;
    Ok(format!("{}.{}.{}", version.major, version.minor, version.patch))
}

/// Release bump kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
}

/// Increment a version, keeping any pre-release suffix (`1.2.3-rc1` →
/// `1.2.4-rc1` for a patch bump).
pub fn bump(version: &str, kind: BumpKind) -> Result<String> {
    let trimmed = version.trim().trim_start_matches('v');
    let mut parsed = semver::Version::parse(trimmed).map_err(|e| {
        Error::config_invalid_value("version", Some(version.to_string()), e.to_string())
    })?;

    match kind {
        BumpKind::Major => {
            parsed.major += 1;
            parsed.minor = 0;
            parsed.patch = 0;
        }
        BumpKind::Minor => {
            parsed.minor += 1;
            parsed.patch = 0;
        }
        BumpKind::Patch => parsed.patch += 1,
    }
    parsed.build = semver::BuildMetadata::EMPTY;

    Ok(parsed.to_string())
}
