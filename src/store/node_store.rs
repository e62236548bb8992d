// src/store/node_store.rs

use std::sync::Arc;

use crate::error::{GroveError, Result};
use crate::node::definition::{Item, Node, NodePatch, TreeRecord};
use crate::value::Namespace;

use super::doc_store::{DocStore, NodeId, TreeId};

/// Fanout used when neither the caller nor the `undefined`-namespace
/// tree specifies one.
pub const DEFAULT_MAX_NODE_SIZE: usize = 16;

/// Derives `MIN` from the fanout, validating it as a side effect.
pub fn min_node_size(max_node_size: usize) -> Result<usize> {
    if max_node_size < 4 || max_node_size % 2 != 0 {
        return Err(GroveError::InvalidFanout(max_node_size));
    }
    Ok(max_node_size / 2)
}

/// Typed view over the `tree` and `node` tables.
///
/// All engine access to the store funnels through here, so the
/// "absent document" cases turn into typed errors in exactly one
/// place.
#[derive(Debug)]
pub struct NodeStore<S: DocStore> {
    store: Arc<S>,
}

impl<S: DocStore> NodeStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        NodeStore { store }
    }

    pub async fn get_tree(&self, namespace: &Namespace) -> Result<Option<TreeRecord>> {
        self.store.find_tree(namespace).await
    }

    pub async fn must_get_tree(&self, namespace: &Namespace) -> Result<TreeRecord> {
        self.get_tree(namespace)
            .await?
            .ok_or(GroveError::NotInitialized)
    }

    /// Returns the namespace's tree, creating it (with a fresh empty
    /// leaf root) when absent. A `max_node_size` hint only applies on
    /// creation; an existing tree keeps its fanout. The default chain
    /// on creation is the `undefined`-namespace tree's fanout, else
    /// `DEFAULT_MAX_NODE_SIZE`.
    pub async fn get_or_create_tree(
        &self,
        namespace: &Namespace,
        max_node_size: Option<usize>,
    ) -> Result<TreeRecord> {
        if let Some(tree) = self.get_tree(namespace).await? {
            return Ok(tree);
        }
        let max_node_size = match max_node_size {
            Some(m) => m,
            None => match self.get_tree(&None).await? {
                Some(default_tree) => default_tree.max_node_size,
                None => DEFAULT_MAX_NODE_SIZE,
            },
        };
        min_node_size(max_node_size)?;
        let root = self.insert_node(vec![], vec![]).await?;
        let id = self
            .store
            .insert_tree(namespace.clone(), root.clone(), max_node_size)
            .await?;
        Ok(TreeRecord {
            id,
            namespace: namespace.clone(),
            root,
            max_node_size,
        })
    }

    pub async fn list_trees(
        &self,
        after: Option<&TreeId>,
        limit: usize,
    ) -> Result<Vec<TreeRecord>> {
        self.store.list_trees(after, limit).await
    }

    pub async fn patch_tree_root(&self, id: &TreeId, root: &NodeId) -> Result<()> {
        self.store.patch_tree_root(id, root).await
    }

    pub async fn delete_tree(&self, id: &TreeId) -> Result<()> {
        self.store.delete_tree(id).await
    }

    pub async fn get_node(&self, id: &NodeId) -> Result<Option<Node>> {
        self.store.get_node(id).await
    }

    /// A dangling node id is store corruption, not user error.
    pub async fn must_get_node(&self, id: &NodeId) -> Result<Node> {
        self.get_node(id)
            .await?
            .ok_or_else(|| GroveError::NodeMissing(id.clone()))
    }

    pub async fn insert_node(&self, items: Vec<Item>, subtrees: Vec<NodeId>) -> Result<NodeId> {
        self.store.insert_node(items, subtrees).await
    }

    pub async fn patch_node(&self, id: &NodeId, patch: NodePatch) -> Result<()> {
        self.store.patch_node(id, patch).await
    }

    pub async fn delete_node(&self, id: &NodeId) -> Result<()> {
        self.store.delete_node(id).await
    }

    pub async fn schedule_purge(&self, node: NodeId) -> Result<()> {
        self.store.schedule_purge(node).await
    }
}
