//! Per-release settings handed to the release publishing client.

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Release service types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    /// GitHub releases
    GitHub,
}

impl ServiceType {
    /// Parse a service type as written in the project file
    pub fn parse(service: &str) -> Result<Self> {
        match service.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(ServiceType::GitHub),
            _ => Err(ConfigError::UnsupportedService {
                service: service.to_string(),
            }
            .into()),
        }
    }
}

/// Immutable configuration for one release
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReleaseSettings {
    /// Repository owner (user or organization)
    pub repository_owner: String,
    /// Repository name
    pub repository: String,
    /// Release display name; `{tag}` is replaced by the release tag
    #[serde(default)]
    pub name: String,
    /// File whose content becomes the release body
    #[serde(default)]
    pub release_notes_file: Option<PathBuf>,
    /// Create the release as a draft
    #[serde(default)]
    pub draft: bool,
    /// Mark the release as a prerelease
    #[serde(default)]
    pub prerelease: bool,
    /// Ask the service to generate release notes
    #[serde(default)]
    pub generate_release_notes: bool,
}

impl ReleaseSettings {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.repository_owner.trim().is_empty() || self.repository.trim().is_empty() {
            return Err(super::invalid(
                "[release] needs both 'repository_owner' and 'repository'",
            ));
        }
        if let Some(notes) = &self.release_notes_file
            && notes.file_name().is_none()
        {
            return Err(super::invalid(format!(
                "release_notes_file '{}' is not a file path",
                notes.display()
            )));
        }
        Ok(())
    }

    /// Settings for a concrete tag: name template expanded, notes path resolved
    pub fn for_tag(&self, tag: &str, root: &Path) -> Self {
        let name = if self.name.is_empty() {
            tag.to_string()
        } else {
            self.name.replace("{tag}", tag)
        };
        let release_notes_file = self.release_notes_file.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                root.join(p)
            }
        });

        Self {
            name,
            release_notes_file,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_github_is_supported() {
        assert_eq!(ServiceType::parse("github").unwrap(), ServiceType::GitHub);
        assert_eq!(ServiceType::parse("GitHub").unwrap(), ServiceType::GitHub);
        let err = ServiceType::parse("gitlab").unwrap_err();
        assert!(err.to_string().contains("gitlab"));
    }

    #[test]
    fn tag_is_expanded_in_name() {
        let settings = ReleaseSettings {
            repository_owner: "o".into(),
            repository: "r".into(),
            name: "tool {tag}".into(),
            release_notes_file: Some("notes/{tag}.md".into()),
            ..Default::default()
        };
        let resolved = settings.for_tag("v1.2.3", Path::new("/p"));
        assert_eq!(resolved.name, "tool v1.2.3");
        assert_eq!(
            resolved.release_notes_file,
            Some(PathBuf::from("/p/notes/{tag}.md"))
        );
    }

    #[test]
    fn empty_name_defaults_to_tag() {
        let resolved = ReleaseSettings::default().for_tag("v2", Path::new("."));
        assert_eq!(resolved.name, "v2");
    }
}
