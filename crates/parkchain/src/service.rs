//! The operations exposed to HTTP or CLI layers.
//!
//! [`BlockingService`] wires the relation graph to the car directory and the
//! notification dispatcher. It resolves cars before touching the graph,
//! decides who is told about a change, and returns the views callers render.
//!
//! Notification routing depends on who made the request:
//!
//! | Operation | Initiator | Recipients | Message | Response |
//! |-----------|-----------|------------|---------|----------|
//! | create | blocked owner | blocking car's owners | `BEEN_BLOCKING` | blocked car |
//! | create | blocking owner | blocked car's owners | `BEEN_BLOCKED` | blocking car |
//! | delete | either | blocked car's owners | `FREE_TO_GO` | initiator's car |
//! | delete all | n/a | owners of each freed car | `FREE_TO_GO` | freed cars |
//! | need to go | blocked owner | every upstream owner | `NEED_TO_GO` | walk summary |

use crate::directory::CarDirectory;
use crate::domain::{
    CarId, CarRelations, MessageKind, Notification, RelatedCar, Situation, UserId,
    UserRelations,
};
use crate::error::Result;
use crate::graph::{
    NeedToGoPropagation, PropagationPlan, RelationLifecycle, RelationQuery, validator,
};
use crate::notify::Dispatcher;
use crate::storage::RelationStore;
use std::sync::Arc;

/// Facade over the blocking-relation graph.
pub struct BlockingService {
    directory: Arc<dyn CarDirectory>,
    lifecycle: RelationLifecycle,
    query: RelationQuery,
    propagation: NeedToGoPropagation,
    dispatcher: Dispatcher,
}

impl std::fmt::Debug for BlockingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingService")
            .field("store", &"<dyn RelationStore>")
            .field("directory", &"<dyn CarDirectory>")
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl BlockingService {
    /// Build the service from its collaborators
    pub fn new(
        store: Arc<dyn RelationStore>,
        directory: Arc<dyn CarDirectory>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            lifecycle: RelationLifecycle::new(Arc::clone(&store)),
            query: RelationQuery::new(Arc::clone(&store), Arc::clone(&directory)),
            propagation: NeedToGoPropagation::new(store, Arc::clone(&directory)),
            directory,
            dispatcher,
        }
    }

    /// Record that `blocking` blocks `blocked`.
    ///
    /// `situation` names the side that reported it; the other side's owners
    /// are notified and the reporter's car view is returned. If that view
    /// cannot be read once the relation is saved, the failure is logged and
    /// the view holds only the new relation.
    ///
    /// # Errors
    ///
    /// - `Error::SelfBlocking`, checked before anything else
    /// - `Error::CarNotFound` if either car is unknown
    /// - `Error::DuplicateRelation` or `Error::CircularBlocking`
    /// - `Error::Persistence` if the change could not be saved
    pub async fn create_relation(
        &self,
        blocking: CarId,
        blocked: CarId,
        situation: Situation,
    ) -> Result<CarRelations> {
        validator::ensure_not_self(blocking, blocked)?;
        self.resolve_pair(blocking, blocked).await?;

        self.lifecycle.create_relation(blocking, blocked).await?;

        let (reporter, notified, kind) = match situation {
            Situation::Blocked => (blocked, blocking, MessageKind::BeenBlocking),
            Situation::Blocking => (blocking, blocked, MessageKind::BeenBlocked),
        };
        let notifications = self.owner_notifications(notified, kind, reporter).await;
        self.dispatcher.send(notifications).await;

        Ok(self
            .committed_view(reporter, Some((blocking, blocked)))
            .await)
    }

    /// Remove the relation `blocking -> blocked` and tell the blocked car's
    /// owners they are free to go.
    ///
    /// A failure to read the reporter's view after the removal is saved is
    /// logged and yields an empty view.
    ///
    /// # Errors
    ///
    /// - `Error::CarNotFound` if either car is unknown
    /// - `Error::RelationNotFound` if the pair is not recorded
    /// - `Error::Persistence` if the change could not be saved
    pub async fn delete_relation(
        &self,
        blocking: CarId,
        blocked: CarId,
        situation: Situation,
    ) -> Result<CarRelations> {
        self.resolve_pair(blocking, blocked).await?;

        self.lifecycle.delete_relation(blocking, blocked).await?;

        let notifications = self
            .owner_notifications(blocked, MessageKind::FreeToGo, blocking)
            .await;
        self.dispatcher.send(notifications).await;

        let reporter = match situation {
            Situation::Blocking => blocking,
            Situation::Blocked => blocked,
        };
        Ok(self.committed_view(reporter, None).await)
    }

    /// Drop every relation touching `car`, typically because the car itself
    /// is being removed from the directory.
    ///
    /// The car is not resolved first, so relations of a car the directory
    /// already forgot can still be cleaned up. Returns the cars that were
    /// freed; their owners receive `FREE_TO_GO`.
    pub async fn delete_all_relations_for_car(&self, car: CarId) -> Result<Vec<CarId>> {
        let freed = self.lifecycle.delete_all_relations_for_car(car).await?;

        let mut notifications = Vec::new();
        for freed_car in &freed {
            notifications.extend(
                self.owner_notifications(*freed_car, MessageKind::FreeToGo, car)
                    .await,
            );
        }
        self.dispatcher.send(notifications).await;

        Ok(freed)
    }

    /// Direct relations of `car`.
    ///
    /// # Errors
    ///
    /// Returns `Error::CarNotFound` if the car is unknown.
    pub async fn relations_of(&self, car: CarId) -> Result<CarRelations> {
        self.directory.resolve_car(car).await?;
        self.query.relations_of(car).await
    }

    /// Relations of every car owned by `user`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UserNotFound` if the user is unknown.
    pub async fn relations_of_user(&self, user: UserId) -> Result<UserRelations> {
        self.query.relations_of_user(user).await
    }

    /// Ask everyone upstream of `car` to move.
    ///
    /// # Errors
    ///
    /// - `Error::CarNotFound` if the car is unknown
    /// - `Error::NotBlocked` if nothing blocks it
    pub async fn send_need_to_go(&self, car: CarId) -> Result<PropagationPlan> {
        self.directory.resolve_car(car).await?;

        let plan = self.propagation.plan(car).await?;
        self.dispatcher.send(plan.notifications.clone()).await;

        Ok(plan)
    }

    async fn resolve_pair(&self, blocking: CarId, blocked: CarId) -> Result<()> {
        self.directory.resolve_car(blocking).await?;
        self.directory.resolve_car(blocked).await?;
        Ok(())
    }

    /// View of `reporter` once a change is saved.
    ///
    /// The change cannot be undone at this point, so a read failure is
    /// logged and the view falls back to the `written` edge alone.
    async fn committed_view(
        &self,
        reporter: CarId,
        written: Option<(CarId, CarId)>,
    ) -> CarRelations {
        match self.query.relations_of(reporter).await {
            Ok(view) => view,
            Err(e) => {
                tracing::warn!(
                    car = %reporter,
                    error = %e,
                    "Reading relations after commit failed"
                );
                let mut view = CarRelations {
                    car: reporter,
                    is_blocking: Vec::new(),
                    is_blocked_by: Vec::new(),
                };
                if let Some((blocking, blocked)) = written {
                    if reporter == blocking {
                        view.is_blocking.push(self.related(blocked).await);
                    } else {
                        view.is_blocked_by.push(self.related(blocking).await);
                    }
                }
                view
            }
        }
    }

    async fn related(&self, car_id: CarId) -> RelatedCar {
        let has_owner = self
            .directory
            .owners_of(car_id)
            .await
            .is_ok_and(|owners| !owners.is_empty());
        RelatedCar { car_id, has_owner }
    }

    /// Build one message per owner of `car`.
    ///
    /// Runs after the relation change is committed, so a directory failure
    /// here only costs the notification.
    async fn owner_notifications(
        &self,
        car: CarId,
        kind: MessageKind,
        counterpart: CarId,
    ) -> Vec<Notification> {
        match self.directory.owners_of(car).await {
            Ok(owners) => {
                if owners.is_empty() {
                    tracing::debug!(car = %car, kind = %kind, "No owner to notify");
                }
                owners
                    .into_iter()
                    .map(|owner| Notification::new(owner, kind, car, counterpart))
                    .collect()
            }
            Err(e) => {
                tracing::warn!(car = %car, kind = %kind, error = %e, "Owner lookup failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DirectoryEntry, InMemoryDirectory};
    use crate::error::Error;
    use crate::domain::{BlockingRelation, NewRelation};
    use crate::error::StorageError;
    use crate::notify::{DispatchMode, RecordingGateway};
    use crate::storage::in_memory::new_in_memory_store;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn service_over(store: Arc<dyn RelationStore>) -> (BlockingService, Arc<RecordingGateway>) {
        let gateway = Arc::new(RecordingGateway::new());
        let directory = InMemoryDirectory::from_entries([
            DirectoryEntry::new(1, &[10]),
            DirectoryEntry::new(2, &[20]),
            DirectoryEntry::new(3, &[30, 31]),
        ]);
        let service = BlockingService::new(
            store,
            Arc::new(directory),
            Dispatcher::new(gateway.clone(), DispatchMode::Inline),
        );
        (service, gateway)
    }

    fn service() -> (BlockingService, Arc<RecordingGateway>) {
        service_over(Arc::from(new_in_memory_store()))
    }

    /// Stops answering adjacency reads once a flush has succeeded
    struct ReadsFailAfterFlush {
        inner: Box<dyn RelationStore>,
        failing: AtomicBool,
    }

    impl ReadsFailAfterFlush {
        fn new() -> Self {
            Self {
                inner: new_in_memory_store(),
                failing: AtomicBool::new(false),
            }
        }

        fn check(&self) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::other("read timed out")).into());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RelationStore for ReadsFailAfterFlush {
        async fn edges_from(&self, car: CarId) -> Result<Vec<BlockingRelation>> {
            self.check()?;
            self.inner.edges_from(car).await
        }

        async fn edges_to(&self, car: CarId) -> Result<Vec<BlockingRelation>> {
            self.check()?;
            self.inner.edges_to(car).await
        }

        async fn all_edges(&self) -> Result<Vec<BlockingRelation>> {
            self.check()?;
            self.inner.all_edges().await
        }

        async fn save(&self, relation: NewRelation) -> Result<BlockingRelation> {
            self.inner.save(relation).await
        }

        async fn delete(&self, relation: &BlockingRelation) -> Result<()> {
            self.inner.delete(relation).await
        }

        async fn flush(&self) -> Result<()> {
            self.inner.flush().await?;
            self.failing.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn reload(&self) -> Result<()> {
            self.inner.reload().await
        }
    }

    #[tokio::test]
    async fn test_unknown_car_rejected_before_graph() {
        let (service, gateway) = service();

        let result = service.create_relation(CarId(1), CarId(99), Situation::Blocking).await;
        assert!(matches!(result, Err(Error::CarNotFound(CarId(99)))));

        let result = service.create_relation(CarId(99), CarId(99), Situation::Blocking).await;
        assert!(matches!(result, Err(Error::SelfBlocking { .. })));

        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failed_create_sends_nothing() {
        let (service, gateway) = service();
        service
            .create_relation(CarId(1), CarId(2), Situation::Blocking)
            .await
            .unwrap();
        gateway.clear();

        let result = service.create_relation(CarId(2), CarId(1), Situation::Blocked).await;
        assert!(matches!(result, Err(Error::CircularBlocking { .. })));
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_notifies_freed_owners() {
        let (service, gateway) = service();
        service
            .create_relation(CarId(2), CarId(3), Situation::Blocking)
            .await
            .unwrap();
        service
            .create_relation(CarId(1), CarId(2), Situation::Blocking)
            .await
            .unwrap();
        gateway.clear();

        let freed = service.delete_all_relations_for_car(CarId(2)).await.unwrap();
        assert_eq!(freed, vec![CarId(3)]);

        let sent = gateway.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|n| n.kind == MessageKind::FreeToGo
            && n.context.subject_car == CarId(3)
            && n.context.counterpart_car == CarId(2)));

        let top = service.relations_of(CarId(1)).await.unwrap();
        assert!(top.is_blocking.is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_after_commit_still_succeeds() {
        let store = Arc::new(ReadsFailAfterFlush::new());
        let (service, gateway) = service_over(store.clone());

        let view = service
            .create_relation(CarId(1), CarId(2), Situation::Blocked)
            .await
            .unwrap();
        assert_eq!(view.car, CarId(2));
        assert!(view.is_blocking.is_empty());
        assert_eq!(
            view.is_blocked_by,
            vec![RelatedCar {
                car_id: CarId(1),
                has_owner: true
            }]
        );
        assert_eq!(gateway.sent().len(), 1);

        store.failing.store(false, Ordering::SeqCst);
        let view = service
            .delete_relation(CarId(1), CarId(2), Situation::Blocking)
            .await
            .unwrap();
        assert_eq!(view.car, CarId(1));
        assert!(view.is_blocking.is_empty());
        assert!(view.is_blocked_by.is_empty());

        store.failing.store(false, Ordering::SeqCst);
        assert!(store.all_edges().await.unwrap().is_empty());
    }
}
