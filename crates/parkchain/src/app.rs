//! Application context for CLI command execution.
//!
//! [`App`] finds the repository, loads its configuration and assembles a
//! [`BlockingService`] over the configured store, car directory and
//! notification gateway.
//!
//! # Example
//!
//! ```no_run
//! use parkchain::app::App;
//! use parkchain::domain::CarId;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new(".")).await?;
//!     let view = app.service().relations_of(CarId(1)).await?;
//!     println!("{view:?}");
//!     Ok(())
//! }
//! ```

use crate::config::{CONFIG_FILE_NAME, PARKCHAIN_DIR_NAME, ParkchainConfig, find_parkchain_root};
use crate::directory::{CarDirectory, InMemoryDirectory};
use crate::error::{ConfigError, Result};
use crate::notify::{Dispatcher, LogGateway, NotificationGateway};
use crate::service::BlockingService;
use crate::storage::{RelationStore, create_store};
use std::path::Path;
use std::sync::Arc;

/// Application context for CLI operations.
#[derive(Debug)]
pub struct App {
    service: BlockingService,
}

impl App {
    /// Create an App from the given working directory, logging notifications
    /// instead of delivering them.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No parkchain repository is found in the directory tree
    /// - Configuration or the car directory cannot be loaded
    /// - Storage initialization fails
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        Self::with_gateway(working_dir, Arc::new(LogGateway)).await
    }

    /// Create an App that sends notifications through `gateway`.
    pub async fn with_gateway(
        working_dir: &Path,
        gateway: Arc<dyn NotificationGateway>,
    ) -> Result<Self> {
        let root_dir = find_parkchain_root(working_dir).ok_or(ConfigError::NotInitialized)?;
        let config_path = root_dir.join(PARKCHAIN_DIR_NAME).join(CONFIG_FILE_NAME);
        let config = ParkchainConfig::load(&config_path).await?;

        let backend = config.storage.to_backend(&root_dir)?;
        let store: Arc<dyn RelationStore> = Arc::from(create_store(backend).await?);

        let directory_path = config.directory_path(&root_dir)?;
        let directory: Arc<dyn CarDirectory> = if directory_path.exists() {
            Arc::new(InMemoryDirectory::load_yaml(&directory_path).await?)
        } else {
            tracing::warn!(
                path = %directory_path.display(),
                "Car directory file missing, every car will be unknown"
            );
            Arc::new(InMemoryDirectory::new())
        };

        let dispatcher = Dispatcher::new(gateway, config.notifications.dispatch);
        let service = BlockingService::new(store, directory, dispatcher);

        tracing::debug!(root = %root_dir.display(), "Opened parkchain repository");
        Ok(Self { service })
    }

    /// The blocking service
    pub fn service(&self) -> &BlockingService {
        &self.service
    }
}
