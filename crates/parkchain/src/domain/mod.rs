//! Domain types for blocking relations.
//!
//! Cars and users are owned by external collaborators; this module only models
//! their identifiers plus the blocking edges and the read projections built
//! from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a car
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CarId(pub u64);

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "car-{}", self.0)
    }
}

impl From<u64> for CarId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Unique identifier for a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user-{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Surrogate storage identifier for a blocking relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationId(pub u64);

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rel-{}", self.0)
    }
}

/// A directed, immutable fact: `blocking_car_id` blocks `blocked_car_id`.
///
/// Relations are never updated in place. Changing which car blocks which is
/// a delete followed by a create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingRelation {
    /// Storage identifier assigned by the relation store
    pub id: RelationId,

    /// The car standing in the way
    pub blocking_car_id: CarId,

    /// The car that cannot leave
    pub blocked_car_id: CarId,

    /// When the relation was recorded
    pub created_at: DateTime<Utc>,
}

impl BlockingRelation {
    /// Returns `true` if this relation connects `blocking` to `blocked`.
    pub fn connects(&self, blocking: CarId, blocked: CarId) -> bool {
        self.blocking_car_id == blocking && self.blocked_car_id == blocked
    }
}

/// Data for recording a new blocking relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewRelation {
    /// The car standing in the way
    pub blocking_car_id: CarId,

    /// The car that cannot leave
    pub blocked_car_id: CarId,
}

impl NewRelation {
    /// Create a new relation request
    pub fn new(blocking_car_id: CarId, blocked_car_id: CarId) -> Self {
        Self {
            blocking_car_id,
            blocked_car_id,
        }
    }
}

/// A car as resolved by the car directory.
///
/// Only the id carries meaning here; the plate is kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarHandle {
    /// Car identifier
    pub id: CarId,

    /// License plate, if the directory knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
}

/// A first-degree neighbor in a [`CarRelations`] view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedCar {
    /// The neighboring car
    pub car_id: CarId,

    /// Whether the directory lists at least one owner for this car
    pub has_owner: bool,
}

/// Direct relations of a single car.
///
/// This is a read projection, not a stored entity, and it never contains the
/// transitive closure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarRelations {
    /// The car the view was built for
    pub car: CarId,

    /// Cars this car directly blocks
    pub is_blocking: Vec<RelatedCar>,

    /// Cars directly blocking this car
    pub is_blocked_by: Vec<RelatedCar>,
}

impl CarRelations {
    /// Ids of the cars this car blocks
    pub fn blocking_ids(&self) -> Vec<CarId> {
        self.is_blocking.iter().map(|c| c.car_id).collect()
    }

    /// Ids of the cars blocking this car
    pub fn blocked_by_ids(&self) -> Vec<CarId> {
        self.is_blocked_by.iter().map(|c| c.car_id).collect()
    }
}

/// Relations of every car a user owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRelations {
    /// The owner
    pub user: UserId,

    /// One entry per owned car, ordered by car id
    pub cars: Vec<CarRelations>,
}

/// Which side of a relation initiated a create or delete request.
///
/// The graph alone cannot tell who reported a blocking, so callers state it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Situation {
    /// The owner of the blocking car made the request
    Blocking,

    /// The owner of the blocked car made the request
    Blocked,
}

/// Kind of message sent through the notification gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    /// A car further down the chain needs to leave; move yours
    NeedToGo,

    /// Your car has just been blocked
    BeenBlocked,

    /// Your car has been reported as blocking another car
    BeenBlocking,

    /// Your car is no longer blocked
    FreeToGo,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::NeedToGo => "NEED_TO_GO",
            MessageKind::BeenBlocked => "BEEN_BLOCKED",
            MessageKind::BeenBlocking => "BEEN_BLOCKING",
            MessageKind::FreeToGo => "FREE_TO_GO",
        };
        f.write_str(name)
    }
}

/// Cars a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContext {
    /// The recipient's car
    pub subject_car: CarId,

    /// The other car involved (the one that needs to go, or the one blocking)
    pub counterpart_car: CarId,
}

/// A single message addressed to one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Who receives the message
    pub recipient: UserId,

    /// What the message says
    pub kind: MessageKind,

    /// Which cars it concerns
    pub context: NotificationContext,
}

impl Notification {
    /// Create a notification for `recipient` about `subject_car`.
    pub fn new(
        recipient: UserId,
        kind: MessageKind,
        subject_car: CarId,
        counterpart_car: CarId,
    ) -> Self {
        Self {
            recipient,
            kind,
            context: NotificationContext {
                subject_car,
                counterpart_car,
            },
        }
    }
}
