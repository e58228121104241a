//! In-memory relation store using HashMap and petgraph.
//!
//! All data is held in RAM and **lost when the process exits** unless it is
//! written out with [`save_to_jsonl`] (the JSONL backend does this on
//! `flush()`).
//!
//! # Architecture
//!
//! The implementation uses:
//! - `HashMap<RelationId, BlockingRelation>` as the relation arena
//! - `petgraph::StableDiGraph<CarId, RelationId>` as the adjacency index
//! - `HashMap<CarId, NodeIndex>` for mapping cars to graph nodes
//!
//! Cars exist in the graph only while they touch at least one relation.
//! `StableDiGraph` keeps the remaining node indices valid when an isolated
//! car is pruned.
//!
//! ## Edge Direction Convention
//!
//! Edges point **blocking -> blocked**, the same direction as the relation:
//!
//! - If car 1 blocks car 2, the edge is `1 -> 2` with weight `RelationId`
//! - Outgoing edges of a car answer `edges_from` (who it blocks)
//! - Incoming edges of a car answer `edges_to` (who blocks it)
//!
//! # Thread Safety
//!
//! The inner state is wrapped in `Arc<Mutex<InMemoryStoreInner>>`. Every trait
//! call holds the lock for its whole duration, so each call is atomic with
//! respect to other calls on the same store.
//!
//! # Performance Characteristics
//!
//! - Save: O(1) amortized (duplicate check is an O(d) `find_edge`)
//! - Delete: O(d) where d is the degree of the blocking car
//! - Adjacency: O(d log d) (results are sorted by relation id)
//! - All edges: O(e log e)

mod graph;
mod inner;
mod jsonl;
mod trait_impl;

use crate::storage::RelationStore;
use std::sync::Arc;
use tokio::sync::Mutex;

pub(crate) use inner::InMemoryStoreInner;
pub(crate) use jsonl::load_inner;

// Re-export public API
pub use jsonl::{LoadWarning, load_from_jsonl, save_to_jsonl};

/// Thread-safe in-memory store.
///
/// This type alias wraps the inner store in `Arc<Mutex<>>` for thread-safe
/// async access. It implements [`RelationStore`] in `trait_impl.rs`.
pub(crate) type InMemoryStore = Arc<Mutex<InMemoryStoreInner>>;

pub(crate) fn wrap(inner: InMemoryStoreInner) -> InMemoryStore {
    Arc::new(Mutex::new(inner))
}

/// Create a new, empty in-memory store.
///
/// # Example
///
/// ```
/// use parkchain::storage::in_memory::new_in_memory_store;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let store = new_in_memory_store();
///     assert!(store.all_edges().await.unwrap().is_empty());
/// }
/// ```
pub fn new_in_memory_store() -> Box<dyn RelationStore> {
    Box::new(wrap(InMemoryStoreInner::new()))
}
