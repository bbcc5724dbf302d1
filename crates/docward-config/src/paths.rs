//! Config file locations

use crate::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const PROJECT_CONFIG_FILE: &str = "docward.toml";
pub const LOCAL_CONFIG_FILE: &str = "docward.local.toml";
pub const USER_CONFIG_FILE: &str = "config.toml";

/// XDG-compliant paths for docward
pub struct Paths {
    project_dirs: Option<ProjectDirs>,
}

impl Paths {
    pub fn new() -> Self {
        Self {
            project_dirs: ProjectDirs::from("com", "docward", "docward"),
        }
    }

    /// User config directory (`~/.config/docward/` on Linux)
    pub fn user_config_dir(&self) -> Result<PathBuf, ConfigError> {
        self.project_dirs
            .as_ref()
            .map(|p| p.config_dir().to_path_buf())
            .ok_or_else(|| {
                ConfigError::XdgError("Failed to determine user config directory".to_string())
            })
    }

    /// `~/.config/docward/config.toml`
    pub fn user_config_file(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.user_config_dir()?.join(USER_CONFIG_FILE))
    }

    /// `<project>/docward.toml`
    pub fn project_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join(PROJECT_CONFIG_FILE)
    }

    /// `<project>/docward.local.toml`, meant to stay out of version control
    pub fn local_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join(LOCAL_CONFIG_FILE)
    }

    /// Whether the directory carries a project config file
    pub fn is_configured(project_dir: impl AsRef<Path>) -> bool {
        Self::project_config_file(project_dir).exists()
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_user_paths() {
        let paths = Paths::new();

        // Not every platform has a home directory in CI
        if let Ok(file) = paths.user_config_file() {
            assert!(file.to_string_lossy().contains("docward"));
            assert!(file.ends_with(USER_CONFIG_FILE));
        }
    }

    #[test]
    fn test_project_paths() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        assert_eq!(
            Paths::project_config_file(project_dir),
            project_dir.join("docward.toml")
        );
        assert_eq!(
            Paths::local_config_file(project_dir),
            project_dir.join("docward.local.toml")
        );

        assert!(!Paths::is_configured(project_dir));
        std::fs::write(Paths::project_config_file(project_dir), "[audit]\nenabled = false\n")
            .unwrap();
        assert!(Paths::is_configured(project_dir));
    }
}
