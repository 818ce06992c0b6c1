//! In-memory view of an enterprise's dependency edges, rebuilt from the
//! store for each operation that needs it.

pub mod cascade;
pub mod dag_enforcement;
pub mod indexed;
pub mod traversal;

pub use indexed::{DependencyEdge, IndexedGraph};
pub use traversal::{Neighborhood, TraversalConfig};
