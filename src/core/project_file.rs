//! `project.yml`: per-repository defaults that sit below overlay files and
//! the process environment.
//!
//! ```yaml
//! project:
//!   name: toolset
//!   organisation: obitec
//!   git_repo: git@github.com:obitec/toolset.git
//!   version: 1.2.0
//! deployment:
//!   docker_image_name: obitec/toolset
//!   hosts: [apps.example.org]
//! development:
//!   venv_name: toolset
//!   venv_type: conda
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::io;

pub const PROJECT_FILE: &str = "project.yml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectFile {
    pub project: ProjectSection,
    pub deployment: DeploymentSection,
    pub development: DevelopmentSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    pub name: Option<String>,
    pub organisation: Option<String>,
    pub git_repo: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeploymentSection {
    pub docker_image_name: Option<String>,
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DevelopmentSection {
    pub venv_name: Option<String>,
    pub venv_type: Option<String>,
}

impl ProjectFile {
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str(content).map_err(|e| Error::config_invalid_yaml(origin, e.to_string()))
    }

    /// Load the file, `Ok(None)` when it does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let Some(content) = io::read_file_optional(path, "read project file")? else {
            return Ok(None);
        };
        Self::parse(&content, &path.display().to_string()).map(Some)
    }

    /// Flatten into configuration keys. Unset fields are omitted.
    pub fn settings(&self) -> Vec<(&'static str, String)> {
        let mut settings = Vec::new();
        let mut push = |key: &'static str, value: &Option<String>| {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                settings.push((key, v.to_string()));
            }
        };

        push("project_name", &self.project.name);
        push("organisation", &self.project.organisation);
        push("git_repo", &self.project.git_repo);
        push("version", &self.project.version);
        push("image_name", &self.deployment.docker_image_name);
        push("venv_name", &self.development.venv_name);
        push("venv_type", &self.development.venv_type);

        if !self.deployment.hosts.is_empty() {
            settings.push(("host_name", self.deployment.hosts.join(",")));
        }

        settings
    }
}
