//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use parkchain::directory::{DirectoryEntry, InMemoryDirectory};
use parkchain::domain::{BlockingRelation, CarId, NewRelation, Notification, RelationId};
use parkchain::error::{Error, Result, StorageError};
use parkchain::notify::{DispatchMode, Dispatcher, GatewayError, NotificationGateway};
use parkchain::service::BlockingService;
use parkchain::storage::RelationStore;
use parkchain::storage::in_memory::new_in_memory_store;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};

/// Run the parkchain binary in `dir`
pub fn run_parkchain_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_parkchain"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env("RUST_LOG", "parkchain=warn")
        .output()
        .expect("Failed to execute parkchain binary")
}

/// Gateway that keeps every notification it is handed
#[derive(Default)]
pub struct CollectingGateway {
    sent: Mutex<Vec<Notification>>,
}

impl CollectingGateway {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

#[async_trait]
impl NotificationGateway for CollectingGateway {
    async fn dispatch(
        &self,
        notification: &Notification,
    ) -> std::result::Result<(), GatewayError> {
        self.sent.lock().unwrap().push(*notification);
        Ok(())
    }
}

/// Build a directory from `(car, owners)` pairs
pub fn directory(cars: &[(u64, &[u64])]) -> InMemoryDirectory {
    InMemoryDirectory::from_entries(
        cars.iter()
            .map(|(car, owners)| DirectoryEntry::new(*car, owners)),
    )
}

/// A service over a fresh in-memory store, delivering inline to a collector
pub fn service_with(
    store: Arc<dyn RelationStore>,
    cars: &[(u64, &[u64])],
) -> (BlockingService, Arc<CollectingGateway>) {
    let gateway = Arc::new(CollectingGateway::default());
    let service = BlockingService::new(
        store,
        Arc::new(directory(cars)),
        Dispatcher::new(gateway.clone(), DispatchMode::Inline),
    );
    (service, gateway)
}

/// Same as [`service_with`] over an empty in-memory store
pub fn service(cars: &[(u64, &[u64])]) -> (BlockingService, Arc<CollectingGateway>) {
    service_with(Arc::from(new_in_memory_store()), cars)
}

pub fn relation(id: u64, blocking: u64, blocked: u64) -> BlockingRelation {
    BlockingRelation {
        id: RelationId(id),
        blocking_car_id: CarId(blocking),
        blocked_car_id: CarId(blocked),
        created_at: Utc::now(),
    }
}

/// A read-only store serving a fixed list of relations as-is.
///
/// Nothing is validated, so it can hold the duplicates and loops a real
/// store would refuse.
pub struct FixedStore {
    relations: Vec<BlockingRelation>,
}

impl FixedStore {
    pub fn new(relations: Vec<BlockingRelation>) -> Self {
        Self { relations }
    }

    fn read_only() -> Error {
        StorageError::Unsupported("fixed store is read-only".to_string()).into()
    }
}

#[async_trait]
impl RelationStore for FixedStore {
    async fn edges_from(&self, car: CarId) -> Result<Vec<BlockingRelation>> {
        Ok(self
            .relations
            .iter()
            .filter(|r| r.blocking_car_id == car)
            .cloned()
            .collect())
    }

    async fn edges_to(&self, car: CarId) -> Result<Vec<BlockingRelation>> {
        Ok(self
            .relations
            .iter()
            .filter(|r| r.blocked_car_id == car)
            .cloned()
            .collect())
    }

    async fn all_edges(&self) -> Result<Vec<BlockingRelation>> {
        Ok(self.relations.clone())
    }

    async fn save(&self, _relation: NewRelation) -> Result<BlockingRelation> {
        Err(Self::read_only())
    }

    async fn delete(&self, _relation: &BlockingRelation) -> Result<()> {
        Err(Self::read_only())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        Ok(())
    }
}
