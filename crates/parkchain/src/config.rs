//! Repository configuration.
//!
//! A parkchain repository is a directory containing `.parkchain/`, which
//! holds `config.yaml`, the relations file and the car directory file:
//!
//! ```yaml
//! storage:
//!   backend: jsonl
//!   data_file: .parkchain/relations.jsonl
//! directory_file: .parkchain/cars.yaml
//! notifications:
//!   dispatch: inline
//! ```
//!
//! Configured paths are relative to the repository root and may not leave
//! it.

use crate::error::{ConfigError, Result};
use crate::notify::DispatchMode;
use crate::storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Name of the parkchain directory
pub const PARKCHAIN_DIR_NAME: &str = ".parkchain";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the relations data file
pub const RELATIONS_FILE_NAME: &str = "relations.jsonl";

/// Name of the car directory file
pub const DIRECTORY_FILE_NAME: &str = "cars.yaml";

/// Name of the gitignore file within .parkchain
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Maximum directory depth to traverse when searching for the repository root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParkchainConfig {
    /// Storage configuration
    pub storage: StorageConfig,

    /// Path to the YAML car directory
    pub directory_file: String,

    /// Notification dispatch settings
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Storage configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Storage backend type: "memory" (nothing written) or "jsonl"
    pub backend: String,

    /// Path to the data file, used by the jsonl backend
    pub data_file: String,
}

/// Notification section
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationConfig {
    /// How notifications are handed to the gateway
    #[serde(default)]
    pub dispatch: DispatchMode,
}

impl Default for ParkchainConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                backend: "jsonl".to_string(),
                data_file: format!("{PARKCHAIN_DIR_NAME}/{RELATIONS_FILE_NAME}"),
            },
            directory_file: format!("{PARKCHAIN_DIR_NAME}/{DIRECTORY_FILE_NAME}"),
            // A short-lived CLI process would exit before a spawned task runs
            notifications: NotificationConfig {
                dispatch: DispatchMode::Inline,
            },
        }
    }
}

impl ParkchainConfig {
    /// Load configuration from a file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await.map_err(ConfigError::Io)?;
        Ok(serde_yaml::from_str(&content).map_err(ConfigError::Yaml)?)
    }

    /// Save configuration to a file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).map_err(ConfigError::Yaml)?;
        fs::write(path, content).await.map_err(ConfigError::Io)?;
        Ok(())
    }

    /// Absolute path of the car directory file under `root`.
    pub fn directory_path(&self, root: &Path) -> Result<PathBuf> {
        resolve_in_repository(root, &self.directory_file)
    }
}

impl StorageConfig {
    /// Turn this section into a storage backend rooted at `root`.
    ///
    /// # Errors
    ///
    /// - `ConfigError::UnknownBackend` for an unrecognized backend name
    /// - `ConfigError::PathOutsideRepository` if `data_file` escapes `root`
    pub fn to_backend(&self, root: &Path) -> Result<StorageBackend> {
        match self.backend.as_str() {
            "memory" => Ok(StorageBackend::InMemory),
            "jsonl" => Ok(StorageBackend::Jsonl(resolve_in_repository(
                root,
                &self.data_file,
            )?)),
            other => Err(ConfigError::UnknownBackend(other.to_string()).into()),
        }
    }
}

fn resolve_in_repository(root: &Path, relative: &str) -> Result<PathBuf> {
    let path = Path::new(relative);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ConfigError::PathOutsideRepository(relative.to_string()).into());
    }
    Ok(root.join(path))
}

/// Find the repository root by searching up the directory tree.
///
/// Starts from the given directory and traverses parent directories until a
/// `.parkchain/` directory is found, the filesystem root is reached, or
/// [`MAX_TRAVERSAL_DEPTH`] is exceeded.
pub fn find_parkchain_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(PARKCHAIN_DIR_NAME).is_dir() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}
