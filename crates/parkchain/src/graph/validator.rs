//! Legality checks for candidate blocking relations.
//!
//! A candidate edge `blocking -> blocked` may be added only if:
//!
//! 1. the two cars differ, and
//! 2. `blocked` does not already reach `blocking`. Otherwise the new edge
//!    would close the loop `blocking -> blocked => blocking`.
//!
//! Exact duplicates are detected separately by [`existing_edge`] so callers
//! can report "relationship already exists" instead of a cycle.
//!
//! # Algorithm
//!
//! The reachability check loads every relation once, groups it by source,
//! and runs an iterative depth-first search from `blocked` toward
//! `blocking`. The visited set bounds the search to O(V + E) even on
//! disconnected or degenerate graphs. The full scan is acceptable because a
//! deployment holds few relations.

use crate::domain::{BlockingRelation, CarId};
use crate::error::{Error, Result};
use crate::storage::RelationStore;
use std::collections::{HashMap, HashSet};

/// Forward adjacency: blocking car -> cars it blocks
pub type Adjacency = HashMap<CarId, Vec<CarId>>;

/// Group relations by their blocking car.
pub fn adjacency_by_source(relations: &[BlockingRelation]) -> Adjacency {
    let mut adjacency: Adjacency = HashMap::new();
    for rel in relations {
        adjacency
            .entry(rel.blocking_car_id)
            .or_default()
            .push(rel.blocked_car_id);
    }
    adjacency
}

/// Returns `true` if a directed path leads from `from` to `to`.
///
/// A car always reaches itself.
pub fn path_exists(adjacency: &Adjacency, from: CarId, to: CarId) -> bool {
    let mut visited = HashSet::new();
    let mut stack = vec![from];

    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(next) = adjacency.get(&current) {
            stack.extend(next.iter().filter(|car| !visited.contains(*car)));
        }
    }

    false
}

/// Reject a relation from a car to itself.
///
/// # Errors
///
/// Returns `Error::SelfBlocking` if `blocking == blocked`.
pub fn ensure_not_self(blocking: CarId, blocked: CarId) -> Result<()> {
    if blocking == blocked {
        return Err(Error::SelfBlocking { car: blocking });
    }
    Ok(())
}

/// Decide whether `blocking -> blocked` may be added to the stored graph.
///
/// The self-loop check runs before any storage access.
///
/// # Errors
///
/// - `Error::SelfBlocking` if both ends are the same car
/// - `Error::CircularBlocking` if `blocked` already reaches `blocking`
/// - `Error::Persistence` if the store cannot be read
pub async fn validate_candidate(
    store: &dyn RelationStore,
    blocking: CarId,
    blocked: CarId,
) -> Result<()> {
    ensure_not_self(blocking, blocked)?;

    let adjacency = adjacency_by_source(&store.all_edges().await?);
    if path_exists(&adjacency, blocked, blocking) {
        tracing::debug!(%blocking, %blocked, "Candidate relation would close a cycle");
        return Err(Error::CircularBlocking { blocking, blocked });
    }

    Ok(())
}

/// Look up the relation stored for the exact ordered pair, if any.
pub async fn existing_edge(
    store: &dyn RelationStore,
    blocking: CarId,
    blocked: CarId,
) -> Result<Option<BlockingRelation>> {
    Ok(store
        .edges_from(blocking)
        .await?
        .into_iter()
        .find(|rel| rel.blocked_car_id == blocked))
}
