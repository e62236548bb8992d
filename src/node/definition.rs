// src/node/definition.rs

use serde::{Deserialize, Serialize};

use crate::store::doc_store::{NodeId, TreeId};
use crate::value::{Namespace, Value};

/// One entry of a node: a key and the short string identifier it maps
/// to. The engine never interprets `v`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub k: Value,
    pub v: String,
}

impl Item {
    pub fn new(k: Value, v: impl Into<String>) -> Self {
        Item { k, v: v.into() }
    }
}

/// A B-tree node as stored in the `node` table.
///
/// `items` are strictly ascending under the value order. `subtrees` is
/// either empty (leaf) or exactly `items.len() + 1` child node ids
/// (internal); all keys reachable through `subtrees[i]` lie strictly
/// between `items[i - 1].k` and `items[i].k`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub items: Vec<Item>,
    pub subtrees: Vec<NodeId>,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.subtrees.is_empty()
    }
}

/// The per-namespace record in the `tree` table. At most one record
/// exists per namespace (`by_namespace` unique index).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TreeRecord {
    pub id: TreeId,
    pub namespace: Namespace,
    pub root: NodeId,
    /// The fanout: even, at least 4.
    pub max_node_size: usize,
}

/// Partial update of a node document. `None` fields keep their stored
/// value.
#[derive(Debug, Clone, Default)]
pub struct NodePatch {
    pub items: Option<Vec<Item>>,
    pub subtrees: Option<Vec<NodeId>>,
}

impl NodePatch {
    pub fn items(items: Vec<Item>) -> Self {
        NodePatch {
            items: Some(items),
            subtrees: None,
        }
    }

    pub fn full(items: Vec<Item>, subtrees: Vec<NodeId>) -> Self {
        NodePatch {
            items: Some(items),
            subtrees: Some(subtrees),
        }
    }
}
