//! Car directory: resolves car ids and answers ownership questions.
//!
//! Car and user records are owned by an external service. The blocking graph
//! only needs three answers from it, expressed by [`CarDirectory`]. The
//! [`InMemoryDirectory`] implementation serves tests and the CLI, which loads
//! it from a YAML file listing cars and their owners:
//!
//! ```yaml
//! - id: 1
//!   plate: AB-123-CD
//!   owners: [10]
//! - id: 2
//!   owners: [11, 12]
//! ```

use crate::domain::{CarHandle, CarId, UserId};
use crate::error::{ConfigError, Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Lookup interface onto the external car/user service.
#[async_trait]
pub trait CarDirectory: Send + Sync {
    /// Resolve a car id.
    ///
    /// # Errors
    ///
    /// Returns `Error::CarNotFound` if the car is unknown.
    async fn resolve_car(&self, car: CarId) -> Result<CarHandle>;

    /// Users owning `car`; empty when the car has no registered owner.
    async fn owners_of(&self, car: CarId) -> Result<Vec<UserId>>;

    /// Cars owned by `user`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `Error::UserNotFound` if the user is unknown.
    async fn cars_owned_by(&self, user: UserId) -> Result<Vec<CarId>>;
}

/// One car as listed in a directory file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Car identifier
    pub id: CarId,

    /// License plate (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,

    /// Owners of the car
    #[serde(default)]
    pub owners: Vec<UserId>,
}

impl DirectoryEntry {
    /// Create an entry with no plate
    pub fn new(id: u64, owners: &[u64]) -> Self {
        Self {
            id: CarId::from(id),
            plate: None,
            owners: owners.iter().copied().map(UserId::from).collect(),
        }
    }
}

#[derive(Default)]
struct Tables {
    cars: BTreeMap<CarId, DirectoryEntry>,
    owned: BTreeMap<UserId, BTreeSet<CarId>>,
}

impl Tables {
    fn insert(&mut self, entry: DirectoryEntry) {
        self.remove(entry.id);
        for owner in &entry.owners {
            self.owned.entry(*owner).or_default().insert(entry.id);
        }
        self.cars.insert(entry.id, entry);
    }

    fn remove(&mut self, car: CarId) {
        let Some(entry) = self.cars.remove(&car) else {
            return;
        };
        for owner in &entry.owners {
            if let Some(cars) = self.owned.get_mut(owner) {
                cars.remove(&car);
            }
        }
    }
}

/// A car directory held in memory.
///
/// Users are known to the directory once they own at least one car; a user
/// whose only car is reassigned by a later entry stays known with an empty
/// car list. The tables are fixed once built.
#[derive(Default)]
pub struct InMemoryDirectory {
    tables: Tables,
}

impl InMemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from a list of entries.
    ///
    /// A later entry with the same car id replaces the earlier one.
    pub fn from_entries(entries: impl IntoIterator<Item = DirectoryEntry>) -> Self {
        let mut tables = Tables::default();
        for entry in entries {
            tables.insert(entry);
        }
        Self { tables }
    }

    /// Load a directory from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` or `ConfigError::Yaml` if the file cannot
    /// be read or parsed.
    pub async fn load_yaml(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(ConfigError::Io)?;
        let entries: Vec<DirectoryEntry> =
            serde_yaml::from_str(&content).map_err(ConfigError::Yaml)?;
        tracing::debug!(path = %path.display(), cars = entries.len(), "Loaded car directory");
        Ok(Self::from_entries(entries))
    }
}

#[async_trait]
impl CarDirectory for InMemoryDirectory {
    async fn resolve_car(&self, car: CarId) -> Result<CarHandle> {
        self.tables
            .cars
            .get(&car)
            .map(|entry| CarHandle {
                id: entry.id,
                plate: entry.plate.clone(),
            })
            .ok_or(Error::CarNotFound(car))
    }

    async fn owners_of(&self, car: CarId) -> Result<Vec<UserId>> {
        Ok(self
            .tables
            .cars
            .get(&car)
            .map(|entry| entry.owners.clone())
            .unwrap_or_default())
    }

    async fn cars_owned_by(&self, user: UserId) -> Result<Vec<CarId>> {
        self.tables
            .owned
            .get(&user)
            .map(|cars| cars.iter().copied().collect())
            .ok_or(Error::UserNotFound(user))
    }
}
