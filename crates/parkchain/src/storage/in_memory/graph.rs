//! Graph checks over the in-memory adjacency index.
//!
//! The relation store itself accepts any edge that satisfies the uniqueness
//! constraint. These helpers are used when *loading* a file, where a
//! hand-edited or corrupted line must not smuggle a loop into the graph.

use crate::domain::{CarId, RelationId};
use petgraph::algo;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use std::collections::HashMap;

/// Check whether adding `blocking -> blocked` would close a cycle.
///
/// Uses petgraph's `has_path_connecting`: if `blocked` already reaches
/// `blocking`, the new edge completes a loop. Cars not yet in the graph
/// cannot be part of any path, so they never close a cycle (unless the edge
/// is a self-loop).
pub(super) fn would_close_cycle(
    graph: &StableDiGraph<CarId, RelationId>,
    node_map: &HashMap<CarId, NodeIndex>,
    blocking: CarId,
    blocked: CarId,
) -> bool {
    if blocking == blocked {
        return true;
    }

    let (Some(&from), Some(&to)) = (node_map.get(&blocking), node_map.get(&blocked)) else {
        return false;
    };

    algo::has_path_connecting(graph, to, from, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BlockingRelation;
    use crate::storage::in_memory::InMemoryStoreInner;
    use chrono::Utc;

    fn chain(pairs: &[(u64, u64)]) -> InMemoryStoreInner {
        let mut inner = InMemoryStoreInner::new();
        for (i, (a, b)) in pairs.iter().enumerate() {
            inner
                .insert(BlockingRelation {
                    id: RelationId(i as u64 + 1),
                    blocking_car_id: CarId(*a),
                    blocked_car_id: CarId(*b),
                    created_at: Utc::now(),
                })
                .unwrap();
        }
        inner
    }

    #[test]
    fn test_back_edge_closes_cycle() {
        let inner = chain(&[(1, 2), (2, 3)]);
        assert!(would_close_cycle(&inner.graph, &inner.node_map, CarId(3), CarId(1)));
        assert!(would_close_cycle(&inner.graph, &inner.node_map, CarId(2), CarId(1)));
    }

    #[test]
    fn test_forward_and_unknown_edges_are_safe() {
        let inner = chain(&[(1, 2), (2, 3)]);
        assert!(!would_close_cycle(&inner.graph, &inner.node_map, CarId(1), CarId(3)));
        assert!(!would_close_cycle(&inner.graph, &inner.node_map, CarId(9), CarId(1)));
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let inner = InMemoryStoreInner::new();
        assert!(would_close_cycle(&inner.graph, &inner.node_map, CarId(5), CarId(5)));
    }
}
