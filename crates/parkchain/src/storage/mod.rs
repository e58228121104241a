//! Storage abstraction layer for blocking relations.
//!
//! This module provides the relation store trait and a factory for creating
//! store backends:
//!
//! - **In-memory**: Fast, ephemeral storage backed by a petgraph adjacency index
//! - **JSONL**: In-memory storage persisted to a JSON Lines file, one relation per line
//!
//! # Architecture
//!
//! The store is a thin adjacency accessor. It answers "edges where source = X"
//! and "edges where target = X", assigns relation ids, and enforces the
//! storage-level uniqueness constraint on `(blocking_car_id, blocked_car_id)`.
//! It does **not** reject self-loops or cycles; that is the validator's job
//! (see [`crate::graph::validator`]).
//!
//! All methods take `&self`. Implementations use interior mutability so a
//! single store can be shared as `Arc<dyn RelationStore>` between the
//! lifecycle manager, the query service and the propagation engine.
//!
//! # Test Utilities
//!
//! With the `test-util` feature enabled, [`FailingStore`] is available for
//! exercising persistence-failure paths.
//!
//! # Example
//!
//! ```no_run
//! use parkchain::domain::{CarId, NewRelation};
//! use parkchain::storage::{create_store, StorageBackend};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let store = create_store(StorageBackend::InMemory).await?;
//!     let relation = store.save(NewRelation::new(CarId(1), CarId(2))).await?;
//!     println!("Recorded {}", relation.id);
//!     Ok(())
//! }
//! ```

use crate::domain::{BlockingRelation, CarId, NewRelation};
use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

// Storage backend implementations
pub mod in_memory;

/// Core storage trait for blocking relations.
///
/// Implementations must be `Send + Sync` to support concurrent access in
/// async contexts.
///
/// # Error Handling
///
/// Every failure is reported as `Error::Persistence`:
/// - `StorageError::UniqueViolation`: the ordered pair is already stored
/// - `StorageError::MissingRecord`: the relation to delete does not exist
/// - `StorageError::Io` / `Serialization`: backend failures
#[async_trait]
pub trait RelationStore: Send + Sync {
    // ========== Adjacency ==========

    /// Relations where `car` is the blocking car, ordered by relation id.
    async fn edges_from(&self, car: CarId) -> Result<Vec<BlockingRelation>>;

    /// Relations where `car` is the blocked car, ordered by relation id.
    async fn edges_to(&self, car: CarId) -> Result<Vec<BlockingRelation>>;

    /// Every stored relation, ordered by relation id.
    async fn all_edges(&self) -> Result<Vec<BlockingRelation>>;

    // ========== Mutation ==========

    /// Persist a new relation and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UniqueViolation` if the ordered pair exists.
    async fn save(&self, relation: NewRelation) -> Result<BlockingRelation>;

    /// Remove a stored relation.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MissingRecord` if no relation with this id and
    /// endpoints is stored.
    async fn delete(&self, relation: &BlockingRelation) -> Result<()>;

    // ========== Persistence ==========

    /// Write pending changes to durable storage.
    ///
    /// A no-op for purely in-memory stores.
    async fn flush(&self) -> Result<()>;

    /// Discard in-memory state and reload it from durable storage.
    ///
    /// Used after a failed `flush()` so later requests do not observe
    /// relations that never reached disk. A no-op for purely in-memory stores.
    async fn reload(&self) -> Result<()>;
}

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-memory storage (ephemeral)
    InMemory,

    /// JSONL file storage (persistent)
    Jsonl(PathBuf),
}

/// In-memory store that writes itself to a JSONL file on `flush()`.
struct JsonlBackedStore {
    inner: in_memory::InMemoryStore,
    path: PathBuf,
}

#[async_trait]
impl RelationStore for JsonlBackedStore {
    async fn edges_from(&self, car: CarId) -> Result<Vec<BlockingRelation>> {
        self.inner.edges_from(car).await
    }

    async fn edges_to(&self, car: CarId) -> Result<Vec<BlockingRelation>> {
        self.inner.edges_to(car).await
    }

    async fn all_edges(&self) -> Result<Vec<BlockingRelation>> {
        self.inner.all_edges().await
    }

    async fn save(&self, relation: NewRelation) -> Result<BlockingRelation> {
        self.inner.save(relation).await
    }

    async fn delete(&self, relation: &BlockingRelation) -> Result<()> {
        self.inner.delete(relation).await
    }

    async fn flush(&self) -> Result<()> {
        in_memory::save_to_jsonl(&self.inner, &self.path).await
    }

    async fn reload(&self) -> Result<()> {
        let fresh = if self.path.exists() {
            let (inner, warnings) = in_memory::load_inner(&self.path).await?;
            for warning in &warnings {
                tracing::warn!(warning = ?warning, "JSONL reload warning");
            }
            inner
        } else {
            in_memory::InMemoryStoreInner::new()
        };
        *self.inner.lock().await = fresh;
        Ok(())
    }
}

/// Create a store instance for the given backend.
///
/// # Errors
///
/// - `StorageError::Io` if the JSONL file exists but cannot be read
/// - `StorageError::InvalidFormat` for unrecoverable file contents
pub async fn create_store(backend: StorageBackend) -> Result<Box<dyn RelationStore>> {
    match backend {
        StorageBackend::InMemory => Ok(in_memory::new_in_memory_store()),
        StorageBackend::Jsonl(path) => {
            let inner = if path.exists() {
                let (inner, warnings) = in_memory::load_inner(&path).await?;
                // Warnings are non-fatal: the offending lines were skipped
                for warning in &warnings {
                    tracing::warn!(warning = ?warning, "JSONL load warning");
                }
                inner
            } else {
                tracing::debug!(path = %path.display(), "No relations file yet, starting empty");
                in_memory::InMemoryStoreInner::new()
            };
            Ok(Box::new(JsonlBackedStore {
                inner: in_memory::wrap(inner),
                path,
            }))
        }
    }
}

// ========== Test Utilities ==========

/// A store whose every operation fails with a simulated IO error.
///
/// Use it to check that storage failures surface as `Error::Persistence`
/// instead of being swallowed.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct FailingStore;

#[cfg(any(test, feature = "test-util"))]
impl FailingStore {
    /// Create a new FailingStore instance.
    pub fn new() -> Self {
        Self
    }

    fn failure() -> crate::error::Error {
        crate::error::StorageError::Io(std::io::Error::other("simulated storage failure")).into()
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl RelationStore for FailingStore {
    async fn edges_from(&self, _car: CarId) -> Result<Vec<BlockingRelation>> {
        Err(Self::failure())
    }

    async fn edges_to(&self, _car: CarId) -> Result<Vec<BlockingRelation>> {
        Err(Self::failure())
    }

    async fn all_edges(&self) -> Result<Vec<BlockingRelation>> {
        Err(Self::failure())
    }

    async fn save(&self, _relation: NewRelation) -> Result<BlockingRelation> {
        Err(Self::failure())
    }

    async fn delete(&self, _relation: &BlockingRelation) -> Result<()> {
        Err(Self::failure())
    }

    async fn flush(&self) -> Result<()> {
        Err(Self::failure())
    }

    async fn reload(&self) -> Result<()> {
        Ok(())
    }
}
