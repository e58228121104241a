//! Read projections over the relation graph.

use crate::directory::CarDirectory;
use crate::domain::{BlockingRelation, CarId, CarRelations, RelatedCar, UserId, UserRelations};
use crate::error::Result;
use crate::storage::RelationStore;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Builds first-degree relation views for cars and users.
pub struct RelationQuery {
    store: Arc<dyn RelationStore>,
    directory: Arc<dyn CarDirectory>,
}

impl RelationQuery {
    /// Create a query service over `store`, annotating neighbors via `directory`
    pub fn new(store: Arc<dyn RelationStore>, directory: Arc<dyn CarDirectory>) -> Self {
        Self { store, directory }
    }

    /// Direct relations of `car`.
    ///
    /// Neighbor lists are ordered by car id. Only edges touching `car` are
    /// read; the view never contains the transitive closure. A car with no
    /// relations yields two empty lists.
    pub async fn relations_of(&self, car: CarId) -> Result<CarRelations> {
        let outgoing = self.store.edges_from(car).await?;
        let incoming = self.store.edges_to(car).await?;

        let is_blocking = self
            .annotate(neighbors(&outgoing, |rel| rel.blocked_car_id))
            .await?;
        let is_blocked_by = self
            .annotate(neighbors(&incoming, |rel| rel.blocking_car_id))
            .await?;

        Ok(CarRelations {
            car,
            is_blocking,
            is_blocked_by,
        })
    }

    /// Relations of every car owned by `user`, one entry per car.
    ///
    /// # Errors
    ///
    /// Returns `Error::UserNotFound` if the directory does not know `user`.
    pub async fn relations_of_user(&self, user: UserId) -> Result<UserRelations> {
        let owned = self.directory.cars_owned_by(user).await?;

        let mut cars = Vec::with_capacity(owned.len());
        for car in owned {
            cars.push(self.relations_of(car).await?);
        }

        Ok(UserRelations { user, cars })
    }

    async fn annotate(&self, cars: BTreeSet<CarId>) -> Result<Vec<RelatedCar>> {
        let mut related = Vec::with_capacity(cars.len());
        for car_id in cars {
            let has_owner = !self.directory.owners_of(car_id).await?.is_empty();
            related.push(RelatedCar { car_id, has_owner });
        }
        Ok(related)
    }
}

fn neighbors(
    relations: &[BlockingRelation],
    endpoint: impl Fn(&BlockingRelation) -> CarId,
) -> BTreeSet<CarId> {
    relations.iter().map(endpoint).collect()
}
