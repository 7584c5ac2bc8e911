//! Query-time resolvers: pure functions over an already-built graph.
//!
//! Both resolvers read a shared immutable [`crate::model::Graph`] snapshot,
//! so any number of them can run concurrently without locking.

mod elevation;
mod path;

pub use elevation::{resolve_concept, ElevationError, Resolution};
pub use path::{resolve_join_path, JoinStep, PathError};
