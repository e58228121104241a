//! The blocking-relation graph.
//!
//! - [`validator`]: legality checks (self-loop, cycle) for candidate edges
//! - [`lifecycle`]: creation and deletion, serialized per instance
//! - [`query`]: first-degree relation views
//! - [`propagation`]: the need-to-go walk over backward edges

pub mod lifecycle;
pub mod propagation;
pub mod query;
pub mod validator;

pub use lifecycle::RelationLifecycle;
pub use propagation::{NeedToGoPropagation, PropagationPlan};
pub use query::RelationQuery;
