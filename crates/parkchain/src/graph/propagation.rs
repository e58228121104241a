//! "Need to go" propagation.
//!
//! When a driver wants to leave, every car blocking theirs, directly or
//! through a chain, has to move. [`NeedToGoPropagation::plan`] walks the
//! backward edges from the leaving car and produces one `NEED_TO_GO`
//! notification per owner of each upstream blocker.
//!
//! # Algorithm
//!
//! An iterative depth-first search with an explicit frame stack. Each car is
//! pushed as an `Enter` frame; entering it also pushes a matching `Exit`
//! frame underneath its blockers, so the `on_path` set always holds the
//! chain from the leaving car to the car being processed.
//!
//! Reaching a car a second time is either:
//!
//! - a **cycle**, if the car is still on the current path. The branch is
//!   truncated and a warning logged. Stored data should never contain one,
//!   but the walk does not rely on that.
//! - a **join**, if the car was finished through another branch (a diamond,
//!   or a duplicated edge). Nothing is notified twice.
//!
//! Every car enters `visited` once and never leaves it, so the walk is
//! O(V + E) whatever shape the stored graph has. The walk never writes.

use crate::directory::CarDirectory;
use crate::domain::{BlockingRelation, CarId, MessageKind, Notification, UserId};
use crate::error::{Error, Result};
use crate::storage::RelationStore;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of a need-to-go walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropagationPlan {
    /// The car that wants to leave
    pub origin: CarId,

    /// One message per distinct owner, in discovery order
    pub notifications: Vec<Notification>,

    /// Upstream blockers in the order they were reached
    pub blockers: Vec<CarId>,

    /// Blockers skipped because nobody owns them
    pub ownerless: Vec<CarId>,

    /// Back-edges that were ignored because they close a loop, as
    /// `(blocking, blocked)` pairs
    pub truncated_cycles: Vec<(CarId, CarId)>,
}

impl PropagationPlan {
    fn new(origin: CarId) -> Self {
        Self {
            origin,
            notifications: Vec::new(),
            blockers: Vec::new(),
            ownerless: Vec::new(),
            truncated_cycles: Vec::new(),
        }
    }

    /// Users that will receive a message
    pub fn recipients(&self) -> Vec<UserId> {
        self.notifications.iter().map(|n| n.recipient).collect()
    }
}

enum Frame {
    /// Visit `car`, reached from `via` (the car it blocks)
    Enter { car: CarId, via: CarId },
    Exit(CarId),
}

/// Walks backward edges to find everyone who has to move.
pub struct NeedToGoPropagation {
    store: Arc<dyn RelationStore>,
    directory: Arc<dyn CarDirectory>,
}

impl NeedToGoPropagation {
    /// Create a propagation engine
    pub fn new(store: Arc<dyn RelationStore>, directory: Arc<dyn CarDirectory>) -> Self {
        Self { store, directory }
    }

    /// Compute who must be told that `origin` needs to leave.
    ///
    /// # Errors
    ///
    /// - `Error::NotBlocked` if nothing blocks `origin`
    /// - `Error::Persistence` if the store cannot be read
    pub async fn plan(&self, origin: CarId) -> Result<PropagationPlan> {
        let direct = self.store.edges_to(origin).await?;
        if direct.is_empty() {
            return Err(Error::NotBlocked(origin));
        }

        let mut plan = PropagationPlan::new(origin);
        let mut visited = HashSet::from([origin]);
        let mut on_path = HashSet::from([origin]);
        let mut notified = HashSet::new();

        let mut stack = vec![Frame::Exit(origin)];
        push_blockers(&mut stack, &direct, origin);

        while let Some(frame) = stack.pop() {
            let (car, via) = match frame {
                Frame::Exit(car) => {
                    on_path.remove(&car);
                    continue;
                }
                Frame::Enter { car, via } => (car, via),
            };

            if on_path.contains(&car) {
                tracing::warn!(
                    blocking = %car,
                    blocked = %via,
                    origin = %origin,
                    "Cycle in blocking relations, truncating branch"
                );
                plan.truncated_cycles.push((car, via));
                continue;
            }
            if !visited.insert(car) {
                tracing::debug!(
                    car = %car,
                    via = %via,
                    "Blocker already reached through another branch"
                );
                continue;
            }

            on_path.insert(car);
            plan.blockers.push(car);
            self.notify_owners(&mut plan, &mut notified, car).await?;

            let upstream = self.store.edges_to(car).await?;
            stack.push(Frame::Exit(car));
            push_blockers(&mut stack, &upstream, car);
        }

        tracing::info!(
            origin = %origin,
            blockers = plan.blockers.len(),
            notifications = plan.notifications.len(),
            "Need-to-go walk finished"
        );
        Ok(plan)
    }

    async fn notify_owners(
        &self,
        plan: &mut PropagationPlan,
        notified: &mut HashSet<UserId>,
        car: CarId,
    ) -> Result<()> {
        let owners = self.directory.owners_of(car).await?;
        if owners.is_empty() {
            tracing::warn!(
                car = %car,
                origin = %plan.origin,
                "Blocking car has no owner, nobody to notify"
            );
            plan.ownerless.push(car);
            return Ok(());
        }

        for owner in owners {
            if notified.insert(owner) {
                plan.notifications.push(Notification::new(
                    owner,
                    MessageKind::NeedToGo,
                    car,
                    plan.origin,
                ));
            }
        }
        Ok(())
    }
}

/// Push blockers so the lowest relation id is visited first.
fn push_blockers(stack: &mut Vec<Frame>, relations: &[BlockingRelation], via: CarId) {
    stack.extend(relations.iter().rev().map(|rel| Frame::Enter {
        car: rel.blocking_car_id,
        via,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DirectoryEntry, InMemoryDirectory};
    use crate::domain::NewRelation;
    use crate::storage::in_memory::new_in_memory_store;
    use crate::storage::FailingStore;

    async fn engine(pairs: &[(u64, u64)], entries: Vec<DirectoryEntry>) -> NeedToGoPropagation {
        let store: Arc<dyn RelationStore> = Arc::from(new_in_memory_store());
        for (blocking, blocked) in pairs {
            store
                .save(NewRelation::new(CarId(*blocking), CarId(*blocked)))
                .await
                .unwrap();
        }
        NeedToGoPropagation::new(store, Arc::new(InMemoryDirectory::from_entries(entries)))
    }

    #[tokio::test]
    async fn test_chain_notifies_every_upstream_owner() {
        // 1 blocks 2 blocks 3 blocks 4
        let engine = engine(
            &[(1, 2), (2, 3), (3, 4)],
            vec![
                DirectoryEntry::new(1, &[10]),
                DirectoryEntry::new(2, &[20]),
                DirectoryEntry::new(3, &[30]),
                DirectoryEntry::new(4, &[40]),
            ],
        )
        .await;

        let plan = engine.plan(CarId(4)).await.unwrap();
        assert_eq!(plan.blockers, vec![CarId(3), CarId(2), CarId(1)]);
        assert_eq!(plan.recipients(), vec![UserId(30), UserId(20), UserId(10)]);
        assert!(plan.notifications.iter().all(|n| n.kind == MessageKind::NeedToGo
            && n.context.counterpart_car == CarId(4)));
        assert!(plan.truncated_cycles.is_empty());
    }

    #[tokio::test]
    async fn test_diamond_visits_shared_blocker_once() {
        // 1 blocks both 2 and 3, which both block 4
        let engine = engine(
            &[(2, 4), (3, 4), (1, 2), (1, 3)],
            vec![
                DirectoryEntry::new(1, &[10]),
                DirectoryEntry::new(2, &[20]),
                DirectoryEntry::new(3, &[30]),
            ],
        )
        .await;

        let plan = engine.plan(CarId(4)).await.unwrap();
        assert_eq!(plan.blockers, vec![CarId(2), CarId(1), CarId(3)]);
        assert_eq!(plan.recipients(), vec![UserId(20), UserId(10), UserId(30)]);
        assert!(plan.truncated_cycles.is_empty());
    }

    #[tokio::test]
    async fn test_owner_of_several_blockers_notified_once() {
        let engine = engine(
            &[(1, 3), (2, 3)],
            vec![DirectoryEntry::new(1, &[10]), DirectoryEntry::new(2, &[10, 11])],
        )
        .await;

        let plan = engine.plan(CarId(3)).await.unwrap();
        assert_eq!(plan.recipients(), vec![UserId(10), UserId(11)]);
        assert_eq!(plan.notifications[1].context.subject_car, CarId(2));
    }

    #[tokio::test]
    async fn test_ownerless_blocker_does_not_stop_walk() {
        let engine = engine(
            &[(1, 2), (2, 3)],
            vec![DirectoryEntry::new(1, &[10]), DirectoryEntry::new(2, &[])],
        )
        .await;

        let plan = engine.plan(CarId(3)).await.unwrap();
        assert_eq!(plan.ownerless, vec![CarId(2)]);
        assert_eq!(plan.recipients(), vec![UserId(10)]);
    }

    #[tokio::test]
    async fn test_cycle_in_storage_is_truncated() {
        // The store only enforces uniqueness, so a loop saved past the validator stays
        let engine = engine(
            &[(1, 2), (2, 3), (3, 1)],
            vec![
                DirectoryEntry::new(1, &[10]),
                DirectoryEntry::new(2, &[20]),
                DirectoryEntry::new(3, &[30]),
            ],
        )
        .await;

        let plan = engine.plan(CarId(3)).await.unwrap();
        assert_eq!(plan.blockers, vec![CarId(2), CarId(1)]);
        assert_eq!(plan.recipients(), vec![UserId(20), UserId(10)]);
        assert_eq!(plan.truncated_cycles, vec![(CarId(3), CarId(1))]);
    }

    #[tokio::test]
    async fn test_unblocked_car_is_rejected() {
        let engine = engine(&[(1, 2)], vec![DirectoryEntry::new(1, &[10])]).await;
        assert!(matches!(
            engine.plan(CarId(1)).await,
            Err(Error::NotBlocked(CarId(1)))
        ));
        assert!(matches!(
            engine.plan(CarId(42)).await,
            Err(Error::NotBlocked(CarId(42)))
        ));
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces() {
        let engine = NeedToGoPropagation::new(
            Arc::new(FailingStore::new()),
            Arc::new(InMemoryDirectory::new()),
        );
        assert!(matches!(
            engine.plan(CarId(1)).await,
            Err(Error::Persistence(_))
        ));
    }
}
