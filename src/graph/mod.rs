//! Graph module, the structural backbone of dsp.
//!
//! Provides the Engine and the structured result types for every graph
//! operation: creation, linking, updating, removal, queries, traversals,
//! and analyses.

pub mod engine;
pub mod mutation;
pub mod query;
pub mod types;

pub use engine::Engine;
pub use types::{EntityInfo, GraphStats, Recipient, SearchHit, SharedEntry, TreeNode};
