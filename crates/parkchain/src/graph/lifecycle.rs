//! Creation and deletion of blocking relations.
//!
//! Every mutation runs validate-then-write followed by a flush to durable
//! storage, all under one mutation guard. Two requests sharing a
//! [`RelationLifecycle`] therefore never interleave between the duplicate or
//! cycle check and the write. The store's uniqueness constraint backs up the
//! duplicate check for writers that do not share the guard. Cycle freedom
//! across separate processes writing the same backing file is not
//! guaranteed.
//!
//! The lifecycle never sends notifications. It returns enough information
//! (both car ids, or the set of freed cars) for the caller to decide who to
//! tell.

use super::validator;
use crate::domain::{BlockingRelation, CarId, NewRelation};
use crate::error::{Error, Result, StorageError};
use crate::storage::RelationStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Orchestrates relation creation and deletion through the validator and the store.
pub struct RelationLifecycle {
    store: Arc<dyn RelationStore>,
    guard: Mutex<()>,
}

impl RelationLifecycle {
    /// Create a lifecycle manager over `store`
    pub fn new(store: Arc<dyn RelationStore>) -> Self {
        Self {
            store,
            guard: Mutex::new(()),
        }
    }

    /// Record that `blocking` blocks `blocked`.
    ///
    /// Checks run in order: self-blocking, exact duplicate, cycle.
    ///
    /// # Errors
    ///
    /// - `Error::SelfBlocking` if both ids are the same car
    /// - `Error::DuplicateRelation` if the ordered pair is already stored
    /// - `Error::CircularBlocking` if `blocked` already reaches `blocking`
    /// - `Error::Persistence` if the store fails
    pub async fn create_relation(
        &self,
        blocking: CarId,
        blocked: CarId,
    ) -> Result<BlockingRelation> {
        validator::ensure_not_self(blocking, blocked)?;

        let _guard = self.guard.lock().await;

        if validator::existing_edge(self.store.as_ref(), blocking, blocked)
            .await?
            .is_some()
        {
            return Err(Error::DuplicateRelation { blocking, blocked });
        }

        validator::validate_candidate(self.store.as_ref(), blocking, blocked).await?;

        let relation = self
            .store
            .save(NewRelation::new(blocking, blocked))
            .await
            .map_err(|e| match e {
                Error::Persistence(StorageError::UniqueViolation { blocking, blocked }) => {
                    Error::DuplicateRelation { blocking, blocked }
                }
                other => other,
            })?;

        self.commit().await?;

        tracing::info!(id = %relation.id, %blocking, %blocked, "Blocking relation created");
        Ok(relation)
    }

    /// Remove the relation `blocking -> blocked` and return it.
    ///
    /// # Errors
    ///
    /// - `Error::RelationNotFound` if no such relation is stored
    /// - `Error::Persistence` if the store fails
    pub async fn delete_relation(
        &self,
        blocking: CarId,
        blocked: CarId,
    ) -> Result<BlockingRelation> {
        let _guard = self.guard.lock().await;

        let relation = validator::existing_edge(self.store.as_ref(), blocking, blocked)
            .await?
            .ok_or(Error::RelationNotFound { blocking, blocked })?;

        self.store.delete(&relation).await.map_err(|e| match e {
            Error::Persistence(StorageError::MissingRecord(_)) => {
                Error::RelationNotFound { blocking, blocked }
            }
            other => other,
        })?;

        self.commit().await?;

        tracing::info!(id = %relation.id, %blocking, %blocked, "Blocking relation deleted");
        Ok(relation)
    }

    /// Remove every relation where `car` is either end.
    ///
    /// Returns the cars `car` was directly blocking just before the removal,
    /// ordered by id, so the caller can tell them they are free. A car with
    /// no relations is not an error; the result is simply empty.
    pub async fn delete_all_relations_for_car(&self, car: CarId) -> Result<Vec<CarId>> {
        let _guard = self.guard.lock().await;

        let outgoing = self.store.edges_from(car).await?;
        let incoming = self.store.edges_to(car).await?;

        let freed: BTreeSet<CarId> = outgoing
            .iter()
            .map(|rel| rel.blocked_car_id)
            .filter(|blocked| *blocked != car)
            .collect();

        let mut seen = BTreeSet::new();
        let mut removed = 0usize;
        for relation in outgoing.iter().chain(incoming.iter()) {
            // A corrupted self-loop shows up on both sides
            if !seen.insert(relation.id) {
                continue;
            }
            match self.store.delete(relation).await {
                Ok(()) => removed += 1,
                Err(Error::Persistence(StorageError::MissingRecord(_))) => {
                    tracing::debug!(id = %relation.id, "Relation already gone");
                }
                Err(e) => return Err(e),
            }
        }

        if removed > 0 {
            self.commit().await?;
        }

        tracing::info!(%car, removed, freed = freed.len(), "Relations cleared for car");
        Ok(freed.into_iter().collect())
    }

    /// Flush the store, reloading from disk if the flush fails so memory
    /// never runs ahead of durable state.
    async fn commit(&self) -> Result<()> {
        if let Err(e) = self.store.flush().await {
            tracing::error!(error = %e, "Flush failed, reloading relations from storage");
            if let Err(reload_err) = self.store.reload().await {
                tracing::error!(error = %reload_err, "Reload after failed flush also failed");
            }
            return Err(e);
        }
        Ok(())
    }
}
