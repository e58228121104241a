//! Implementation of the `init` command.
//!
//! Creates the `.parkchain/` directory with a default configuration, an
//! empty relations file and a sample car directory to edit.

use crate::config::{
    CONFIG_FILE_NAME, DIRECTORY_FILE_NAME, GITIGNORE_FILE_NAME, PARKCHAIN_DIR_NAME,
    ParkchainConfig, RELATIONS_FILE_NAME,
};
use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

const SAMPLE_DIRECTORY: &str = "\
# Cars known to this repository and the users owning them.
# Replace with an export from the car service.
- id: 1
  plate: AA-001-AA
  owners: [1]
- id: 2
  plate: BB-002-BB
  owners: [2]
- id: 3
  plate: CC-003-CC
  owners: [3]
";

const GITIGNORE: &str = "\
# Temporary files left by an interrupted save
*.tmp
";

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the `.parkchain` directory
    pub parkchain_dir: PathBuf,
    /// Path to the configuration file
    pub config_file: PathBuf,
    /// Path to the relations file
    pub relations_file: PathBuf,
    /// Path to the car directory file
    pub directory_file: PathBuf,
    /// Whether an existing repository was reinitialized
    pub reinitialized: bool,
}

/// Initialize a new parkchain repository in `base_dir`.
///
/// With `force`, an existing repository gets a fresh configuration file
/// while its relations and car directory are left as they are.
///
/// # Errors
///
/// - `ConfigError::AlreadyInitialized` if `.parkchain/` exists and `force`
///   is not set
/// - `ConfigError::Io` if a file cannot be written
pub async fn init(base_dir: &Path, force: bool) -> Result<InitResult> {
    let parkchain_dir = base_dir.join(PARKCHAIN_DIR_NAME);
    let reinitialized = parkchain_dir.exists();

    if reinitialized && !force {
        return Err(ConfigError::AlreadyInitialized(parkchain_dir).into());
    }

    fs::create_dir_all(&parkchain_dir)
        .await
        .map_err(ConfigError::Io)?;

    let config_file = parkchain_dir.join(CONFIG_FILE_NAME);
    ParkchainConfig::default().save(&config_file).await?;

    let relations_file = parkchain_dir.join(RELATIONS_FILE_NAME);
    write_if_missing(&relations_file, "").await?;

    let directory_file = parkchain_dir.join(DIRECTORY_FILE_NAME);
    write_if_missing(&directory_file, SAMPLE_DIRECTORY).await?;

    write_if_missing(&parkchain_dir.join(GITIGNORE_FILE_NAME), GITIGNORE).await?;

    tracing::info!(
        path = %parkchain_dir.display(),
        reinitialized,
        "Initialized parkchain repository"
    );

    Ok(InitResult {
        parkchain_dir,
        config_file,
        relations_file,
        directory_file,
        reinitialized,
    })
}

async fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if !path.exists() {
        fs::write(path, content).await.map_err(ConfigError::Io)?;
    }
    Ok(())
}
