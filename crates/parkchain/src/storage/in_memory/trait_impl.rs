//! RelationStore trait implementation for in-memory storage.

use super::InMemoryStore;
use crate::domain::{BlockingRelation, CarId, NewRelation};
use crate::error::{Result, StorageError};
use crate::storage::RelationStore;
use async_trait::async_trait;
use chrono::Utc;
use petgraph::Direction;

#[async_trait]
impl RelationStore for InMemoryStore {
    async fn edges_from(&self, car: CarId) -> Result<Vec<BlockingRelation>> {
        let inner = self.lock().await;
        Ok(inner.adjacent(car, Direction::Outgoing))
    }

    async fn edges_to(&self, car: CarId) -> Result<Vec<BlockingRelation>> {
        let inner = self.lock().await;
        Ok(inner.adjacent(car, Direction::Incoming))
    }

    async fn all_edges(&self) -> Result<Vec<BlockingRelation>> {
        let inner = self.lock().await;
        Ok(inner.all())
    }

    async fn save(&self, relation: NewRelation) -> Result<BlockingRelation> {
        let mut inner = self.lock().await;

        // Check the constraint before burning an id
        if inner
            .find(relation.blocking_car_id, relation.blocked_car_id)
            .is_some()
        {
            return Err(StorageError::UniqueViolation {
                blocking: relation.blocking_car_id,
                blocked: relation.blocked_car_id,
            }
            .into());
        }

        let stored = BlockingRelation {
            id: inner.next_id(),
            blocking_car_id: relation.blocking_car_id,
            blocked_car_id: relation.blocked_car_id,
            created_at: Utc::now(),
        };
        inner.insert(stored.clone())?;

        tracing::trace!(
            id = %stored.id,
            blocking = %stored.blocking_car_id,
            blocked = %stored.blocked_car_id,
            "Relation stored"
        );
        Ok(stored)
    }

    async fn delete(&self, relation: &BlockingRelation) -> Result<()> {
        let mut inner = self.lock().await;
        inner.remove(relation)?;
        tracing::trace!(id = %relation.id, "Relation removed");
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        // In-memory storage doesn't persist to disk
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        // No backing store to reload from
        Ok(())
    }
}
