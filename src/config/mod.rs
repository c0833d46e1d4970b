//! Project configuration loaded from `kodegen-release.toml`.
//!
//! ```toml
//! project = "mytool"
//!
//! [[builds]]
//! name = "linux-amd64"
//! command = ["cargo", "build", "--release", "--target", "x86_64-unknown-linux-gnu"]
//! artifact = "target/x86_64-unknown-linux-gnu/release/mytool"
//!
//! [archive]
//! extra_files = ["README.md", "LICENSE"]
//!
//! [release]
//! repository_owner = "acme"
//! repository = "mytool"
//! name = "mytool {tag}"
//! release_notes_file = "RELEASE_NOTES.md"
//! ```

mod settings;

pub use settings::{ReleaseSettings, ServiceType};

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Default project file name
pub const DEFAULT_CONFIG_FILE: &str = "kodegen-release.toml";

/// Whole project file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Project name, used in archive names and dist paths
    pub project: String,

    /// Build definitions, in build order
    #[serde(default)]
    pub builds: Vec<BuildConfig>,

    /// Archive phase options
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Release phase options
    #[serde(default)]
    pub release: Option<ReleaseConfig>,

    /// Directory the project file was loaded from; relative paths resolve against it
    #[serde(skip)]
    pub root: PathBuf,
}

/// One build of the project
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Build name, unique within the project (e.g. `linux-amd64`)
    pub name: String,
    /// Program and arguments to run
    pub command: Vec<String>,
    /// File the command produces, relative to the project root
    pub artifact: PathBuf,
    /// Extra environment for the command
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Archive phase options
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Files added next to the binary in every archive
    #[serde(default)]
    pub extra_files: Vec<PathBuf>,
}

/// Release phase options
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseConfig {
    /// Release service type
    #[serde(default = "default_service")]
    pub service: String,

    /// Per-release settings
    #[serde(flatten)]
    pub settings: ReleaseSettings,
}

fn default_service() -> String {
    "github".to_string()
}

impl ProjectConfig {
    /// Load and validate the project file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::ProjectFileNotFound {
                    path: path.to_path_buf(),
                }
                .into()
            } else {
                crate::error::ReleaseError::Io(e)
            }
        })?;

        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Self::parse(&content, root)
    }

    /// Parse and validate project file content
    pub fn parse(content: &str, root: PathBuf) -> Result<Self> {
        let mut config: ProjectConfig = toml::from_str(content)?;
        config.root = root;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            return Err(invalid("'project' must not be empty"));
        }

        let mut seen = HashSet::new();
        for build in &self.builds {
            if build.name.trim().is_empty() {
                return Err(invalid("build 'name' must not be empty"));
            }
            if !seen.insert(build.name.as_str()) {
                return Err(invalid(format!("duplicate build name '{}'", build.name)));
            }
            if build.command.is_empty() || build.command[0].trim().is_empty() {
                return Err(invalid(format!("build '{}' has an empty command", build.name)));
            }
            if build.artifact.file_name().is_none() {
                return Err(invalid(format!(
                    "build '{}' has no artifact file name",
                    build.name
                )));
            }
        }

        if let Some(release) = &self.release {
            release.settings.validate()?;
        }

        Ok(())
    }

    /// Resolve `path` against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Builds, or an error when the phase needs at least one
    pub fn require_builds(&self) -> Result<&[BuildConfig]> {
        if self.builds.is_empty() {
            return Err(invalid("no [[builds]] defined"));
        }
        Ok(&self.builds)
    }

    /// Release section, or an error when missing
    pub fn require_release(&self) -> Result<&ReleaseConfig> {
        self.release
            .as_ref()
            .ok_or_else(|| invalid("no [release] section defined"))
    }
}

pub(crate) fn invalid(reason: impl Into<String>) -> crate::error::ReleaseError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReleaseError;

    const FULL: &str = r#"
project = "mytool"

[[builds]]
name = "linux-amd64"
command = ["cargo", "build", "--release"]
artifact = "target/release/mytool"
env = { RUSTFLAGS = "-C strip=symbols" }

[archive]
extra_files = ["README.md"]

[release]
repository_owner = "acme"
repository = "mytool"
name = "mytool {tag}"
release_notes_file = "NOTES.md"
draft = true
"#;

    #[test]
    fn parses_full_project() {
        let config = ProjectConfig::parse(FULL, PathBuf::from("/work")).unwrap();
        assert_eq!(config.project, "mytool");
        assert_eq!(config.builds.len(), 1);
        assert_eq!(config.builds[0].env["RUSTFLAGS"], "-C strip=symbols");
        assert_eq!(config.archive.extra_files, vec![PathBuf::from("README.md")]);

        let release = config.require_release().unwrap();
        assert_eq!(release.service, "github");
        assert_eq!(release.settings.repository_owner, "acme");
        assert!(release.settings.draft);
        assert!(!release.settings.prerelease);
        assert_eq!(
            config.resolve(Path::new("NOTES.md")),
            PathBuf::from("/work/NOTES.md")
        );
    }

    #[test]
    fn rejects_duplicate_build_names() {
        let content = r#"
project = "p"
[[builds]]
name = "a"
command = ["true"]
artifact = "x"
[[builds]]
name = "a"
command = ["true"]
artifact = "y"
"#;
        let err = ProjectConfig::parse(content, PathBuf::from(".")).unwrap_err();
        assert!(err.to_string().contains("duplicate build name"), "{err}");
    }

    #[test]
    fn rejects_empty_command() {
        let content = r#"
project = "p"
[[builds]]
name = "a"
command = []
artifact = "x"
"#;
        assert!(matches!(
            ProjectConfig::parse(content, PathBuf::from(".")),
            Err(ReleaseError::Config(ConfigError::Invalid { .. }))
        ));
    }

    #[test]
    fn release_section_is_optional_until_required() {
        let config = ProjectConfig::parse("project = \"p\"", PathBuf::from(".")).unwrap();
        assert!(config.require_release().is_err());
        assert!(config.require_builds().is_err());
    }

    #[test]
    fn missing_file_is_reported_as_such() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(
            err,
            ReleaseError::Config(ConfigError::ProjectFileNotFound { .. })
        ));
    }
}
