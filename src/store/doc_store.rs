// src/store/doc_store.rs

use async_trait::async_trait;

use crate::error::Result;
use crate::node::definition::{Item, Node, NodePatch, TreeRecord};
use crate::value::Namespace;

/// Identifier of a record in the `tree` table.
pub type TreeId = String;

/// Identifier of a record in the `node` table.
pub type NodeId = String;

/// The narrow interface the engine consumes from the host document
/// store, scoped to one transaction.
///
/// The host guarantees read-after-write visibility within the
/// transaction: a `get_node` following a `patch_node` observes the
/// patch. The engine's multi-step edits (overflow detection after a
/// local write, the delete tombstone step) depend on it.
///
/// `list_trees` iterates `tree` records in ascending id order, which
/// is the only total, store-provided order over namespaces. Ids are
/// opaque; the engine never constructs one.
#[async_trait]
pub trait DocStore: std::fmt::Debug + Send + Sync + 'static {
    /// Unique lookup through the `by_namespace` index.
    async fn find_tree(&self, namespace: &Namespace) -> Result<Option<TreeRecord>>;

    /// Up to `limit` tree records with id strictly greater than
    /// `after`, ascending.
    async fn list_trees(&self, after: Option<&TreeId>, limit: usize) -> Result<Vec<TreeRecord>>;

    async fn insert_tree(
        &self,
        namespace: Namespace,
        root: NodeId,
        max_node_size: usize,
    ) -> Result<TreeId>;

    async fn patch_tree_root(&self, id: &TreeId, root: &NodeId) -> Result<()>;

    async fn delete_tree(&self, id: &TreeId) -> Result<()>;

    /// Returns `Ok(None)` when the id does not resolve.
    async fn get_node(&self, id: &NodeId) -> Result<Option<Node>>;

    async fn insert_node(&self, items: Vec<Item>, subtrees: Vec<NodeId>) -> Result<NodeId>;

    async fn patch_node(&self, id: &NodeId, patch: NodePatch) -> Result<()>;

    async fn delete_node(&self, id: &NodeId) -> Result<()>;

    /// Enqueues deferred work that will eventually call
    /// `Grove::purge_node` with `node`, outside this transaction.
    /// Deliveries may repeat; the purge step is idempotent.
    async fn schedule_purge(&self, node: NodeId) -> Result<()>;
}
