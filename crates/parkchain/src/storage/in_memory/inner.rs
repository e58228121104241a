//! Core in-memory store data structures.
//!
//! This module contains the inner store structure that holds all data and is
//! wrapped in `Arc<Mutex<>>` for thread safety.

use crate::domain::{BlockingRelation, CarId, RelationId};
use crate::error::{Result, StorageError};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Inner store structure (not thread-safe).
///
/// See the module-level documentation for the edge direction convention.
pub(crate) struct InMemoryStoreInner {
    /// Relations indexed by id
    pub(super) relations: HashMap<RelationId, BlockingRelation>,

    /// Adjacency index.
    ///
    /// Nodes contain `CarId` values, edges contain the `RelationId` of the
    /// relation they stand for. Edge direction: blocking -> blocked.
    pub(super) graph: StableDiGraph<CarId, RelationId>,

    /// Mapping from CarId to graph NodeIndex.
    ///
    /// Every endpoint of a stored relation has an entry; cars without
    /// relations have none.
    pub(super) node_map: HashMap<CarId, NodeIndex>,

    /// Next relation id to hand out
    next_id: u64,
}

impl InMemoryStoreInner {
    /// Create a new empty store
    pub(crate) fn new() -> Self {
        Self {
            relations: HashMap::new(),
            graph: StableDiGraph::new(),
            node_map: HashMap::new(),
            next_id: 1,
        }
    }

    /// The id the next saved relation gets. `insert` moves it forward.
    pub(super) fn next_id(&self) -> RelationId {
        RelationId(self.next_id)
    }

    /// Get the node for `car`, adding one if the car is not in the graph yet
    pub(super) fn node_for(&mut self, car: CarId) -> NodeIndex {
        if let Some(&node) = self.node_map.get(&car) {
            return node;
        }
        let node = self.graph.add_node(car);
        self.node_map.insert(car, node);
        node
    }

    /// Look up the relation stored for an ordered pair
    pub(super) fn find(&self, blocking: CarId, blocked: CarId) -> Option<&BlockingRelation> {
        let from = self.node_map.get(&blocking)?;
        let to = self.node_map.get(&blocked)?;
        let edge = self.graph.find_edge(*from, *to)?;
        self.relations.get(&self.graph[edge])
    }

    /// Insert a relation that already has an id.
    ///
    /// Enforces the `(blocking, blocked)` uniqueness constraint and keeps the
    /// id allocator ahead of every inserted id. `u64::MAX` is not a valid id
    /// since nothing could be allocated after it.
    pub(super) fn insert(&mut self, relation: BlockingRelation) -> Result<()> {
        let blocking = relation.blocking_car_id;
        let blocked = relation.blocked_car_id;
        let following = relation.id.0.checked_add(1).ok_or_else(|| {
            StorageError::InvalidFormat(format!("relation id {} is out of range", relation.id))
        })?;

        if self.find(blocking, blocked).is_some() {
            return Err(StorageError::UniqueViolation { blocking, blocked }.into());
        }
        if self.relations.contains_key(&relation.id) {
            return Err(StorageError::InvalidFormat(format!(
                "relation id {} is already in use",
                relation.id
            ))
            .into());
        }

        let from = self.node_for(blocking);
        let to = self.node_for(blocked);
        self.graph.add_edge(from, to, relation.id);

        self.next_id = self.next_id.max(following);
        self.relations.insert(relation.id, relation);
        Ok(())
    }

    /// Remove a relation, pruning endpoints left without edges.
    pub(super) fn remove(&mut self, relation: &BlockingRelation) -> Result<()> {
        let missing = || StorageError::MissingRecord(relation.id.to_string());

        match self.relations.get(&relation.id) {
            Some(stored)
                if stored.connects(relation.blocking_car_id, relation.blocked_car_id) => {}
            _ => return Err(missing().into()),
        }

        let from = *self.node_map.get(&relation.blocking_car_id).ok_or_else(missing)?;
        let to = *self.node_map.get(&relation.blocked_car_id).ok_or_else(missing)?;
        let edge = self.graph.find_edge(from, to).ok_or_else(missing)?;

        self.graph.remove_edge(edge);
        self.relations.remove(&relation.id);
        self.prune(relation.blocking_car_id);
        self.prune(relation.blocked_car_id);
        Ok(())
    }

    /// Relations adjacent to `car` in the given direction, ordered by id
    pub(super) fn adjacent(&self, car: CarId, direction: Direction) -> Vec<BlockingRelation> {
        let Some(&node) = self.node_map.get(&car) else {
            return Vec::new();
        };

        let mut found: Vec<BlockingRelation> = self
            .graph
            .edges_directed(node, direction)
            .filter_map(|edge| self.relations.get(edge.weight()).cloned())
            .collect();
        found.sort_by_key(|rel| rel.id);
        found
    }

    /// All relations, ordered by id
    pub(super) fn all(&self) -> Vec<BlockingRelation> {
        let mut all: Vec<BlockingRelation> = self.relations.values().cloned().collect();
        all.sort_by_key(|rel| rel.id);
        all
    }

    fn prune(&mut self, car: CarId) {
        let Some(&node) = self.node_map.get(&car) else {
            return;
        };
        let has_edges = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .next()
            .is_some()
            || self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .next()
                .is_some();
        if !has_edges {
            self.graph.remove_node(node);
            self.node_map.remove(&car);
        }
    }
}
