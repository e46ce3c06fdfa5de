//! Directory resolution for the client.

use std::io;
use std::path::{Path, PathBuf};

use gavel_config::{ConfigError, default_config_dir};

const APP_NAME: &str = "gavel";

/// Errors that can occur while resolving directories.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The platform config directory could not be determined.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Directory creation failed.
    #[error("platform I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Where the client keeps its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    /// `config.ron` and `serverlist.txt`.
    pub config_dir: PathBuf,
    /// JSON logs in debug builds.
    pub log_dir: PathBuf,
}

impl AppDirs {
    /// Resolve directories without creating them. `override_dir` replaces
    /// the platform config directory (from `--config`).
    pub fn resolve(override_dir: Option<&Path>) -> Result<Self, PlatformError> {
        let config_dir = match override_dir {
            Some(dir) => dir.to_path_buf(),
            None => default_config_dir()?,
        };
        let log_dir = config_dir.join("logs");
        Ok(Self {
            config_dir,
            log_dir,
        })
    }

    /// Resolve directories rooted under a custom base path.
    pub fn resolve_with_root(root: &Path) -> Self {
        let app_dir = root.join(APP_NAME);
        Self {
            log_dir: app_dir.join("logs"),
            config_dir: app_dir,
        }
    }

    /// Create all directories on disk.
    pub fn create_dirs(&self) -> Result<(), PlatformError> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_dir_used() {
        let dirs = AppDirs::resolve(Some(Path::new("/tmp/gavel-custom"))).unwrap();
        assert_eq!(dirs.config_dir, PathBuf::from("/tmp/gavel-custom"));
        assert_eq!(dirs.log_dir, PathBuf::from("/tmp/gavel-custom/logs"));
    }

    #[test]
    fn test_directory_creation() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = AppDirs::resolve_with_root(tmp.path());
        dirs.create_dirs().unwrap();
        assert!(dirs.config_dir.ends_with("gavel"));
        assert!(dirs.config_dir.exists());
        assert!(dirs.log_dir.exists());
    }
}
