//! Structured result types returned by Engine queries.
//!
//! The Engine returns plain data, never pre-formatted text; rendering is
//! the CLI's job. Everything here is serde-serializable for machine
//! consumption.

use serde::Serialize;

use crate::record::{Description, ImportEdge};

/// One recorded importer of an entity: who, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub uid: String,
    /// Reason text; empty when recovered from the fallback scan.
    pub why: String,
}

/// Full snapshot of one entity.
#[derive(Debug, Clone, Serialize)]
pub struct EntityInfo {
    pub uid: String,
    pub description: Description,
    pub imports: Vec<ImportEdge>,
    pub shared: Vec<String>,
    /// Complete computed importer set (three-tier merge).
    pub exported_to: Vec<Recipient>,
}

/// One entry of an exporter's shared list with its export sub-collection.
#[derive(Debug, Clone, Serialize)]
pub struct SharedEntry {
    pub shared_uid: String,
    pub description: String,
    pub recipients: Vec<Recipient>,
}

/// A node in a bounded-depth traversal tree.
#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    pub uid: String,
    pub kind: String,
    pub purpose: String,
    /// Reason text carried on parent edges; absent on child traversals
    /// and on the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
    /// Set when this uid was already visited elsewhere in the traversal;
    /// the node is emitted as a leaf and not expanded.
    pub cycle: bool,
    pub children: Vec<TreeNode>,
}

/// One search hit: the entity, the field that matched, and its value.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub uid: String,
    pub field: String,
    pub matched: String,
}

/// Aggregate counts over the whole graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub entities: usize,
    pub objects: usize,
    pub functions: usize,
    pub externals: usize,
    pub imports: usize,
    pub shared: usize,
    pub cycles: usize,
    pub orphans: usize,
}
