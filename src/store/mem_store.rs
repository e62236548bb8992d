// src/store/mem_store.rs

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{GroveError, Result};
use crate::node::definition::{Item, Node, NodePatch, TreeRecord};
use crate::value::Namespace;

use super::doc_store::{DocStore, NodeId, TreeId};

#[derive(Debug, Default)]
struct InMemoryStoreInner {
    seq: u64,
    trees: BTreeMap<TreeId, TreeRecord>,
    nodes: HashMap<NodeId, Node>,
    purge_queue: VecDeque<NodeId>,
}

impl InMemoryStoreInner {
    fn next_id(&mut self) -> String {
        self.seq += 1;
        // Zero-padded so lexicographic id order is allocation order.
        format!("{:012}", self.seq)
    }
}

/// An in-memory `DocStore` over `tokio::sync::RwLock`-guarded tables.
///
/// Every operation behaves as if it ran inside one open transaction:
/// reads observe earlier writes immediately. Scheduled purge work is
/// collected in a queue for the embedder to drain.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<InMemoryStoreInner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pops the oldest scheduled purge job, if any. Drivers loop this
    /// together with `Grove::purge_node` to run deferred deletions.
    pub async fn pop_purge(&self) -> Option<NodeId> {
        self.inner.write().await.purge_queue.pop_front()
    }

    /// Number of node documents currently stored.
    pub async fn node_count(&self) -> usize {
        self.inner.read().await.nodes.len()
    }

    /// Number of tree records currently stored.
    pub async fn tree_count(&self) -> usize {
        self.inner.read().await.trees.len()
    }
}

#[async_trait]
impl DocStore for InMemoryStore {
    async fn find_tree(&self, namespace: &Namespace) -> Result<Option<TreeRecord>> {
        let guard = self.inner.read().await;
        Ok(guard
            .trees
            .values()
            .find(|t| &t.namespace == namespace)
            .cloned())
    }

    async fn list_trees(&self, after: Option<&TreeId>, limit: usize) -> Result<Vec<TreeRecord>> {
        let guard = self.inner.read().await;
        let lower = match after {
            Some(id) => Bound::Excluded(id.clone()),
            None => Bound::Unbounded,
        };
        Ok(guard
            .trees
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, t)| t.clone())
            .collect())
    }

    async fn insert_tree(
        &self,
        namespace: Namespace,
        root: NodeId,
        max_node_size: usize,
    ) -> Result<TreeId> {
        let mut guard = self.inner.write().await;
        if guard.trees.values().any(|t| t.namespace == namespace) {
            return Err(GroveError::Storage(
                "unique index by_namespace violated".to_string(),
            ));
        }
        let id = guard.next_id();
        guard.trees.insert(
            id.clone(),
            TreeRecord {
                id: id.clone(),
                namespace,
                root,
                max_node_size,
            },
        );
        Ok(id)
    }

    async fn patch_tree_root(&self, id: &TreeId, root: &NodeId) -> Result<()> {
        let mut guard = self.inner.write().await;
        let tree = guard
            .trees
            .get_mut(id)
            .ok_or_else(|| GroveError::TreeMissing(id.clone()))?;
        tree.root = root.clone();
        Ok(())
    }

    async fn delete_tree(&self, id: &TreeId) -> Result<()> {
        let mut guard = self.inner.write().await;
        guard
            .trees
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| GroveError::TreeMissing(id.clone()))
    }

    async fn get_node(&self, id: &NodeId) -> Result<Option<Node>> {
        let guard = self.inner.read().await;
        Ok(guard.nodes.get(id).cloned())
    }

    async fn insert_node(&self, items: Vec<Item>, subtrees: Vec<NodeId>) -> Result<NodeId> {
        let mut guard = self.inner.write().await;
        let id = guard.next_id();
        guard.nodes.insert(id.clone(), Node { items, subtrees });
        Ok(id)
    }

    async fn patch_node(&self, id: &NodeId, patch: NodePatch) -> Result<()> {
        let mut guard = self.inner.write().await;
        let node = guard
            .nodes
            .get_mut(id)
            .ok_or_else(|| GroveError::NodeMissing(id.clone()))?;
        if let Some(items) = patch.items {
            node.items = items;
        }
        if let Some(subtrees) = patch.subtrees {
            node.subtrees = subtrees;
        }
        Ok(())
    }

    async fn delete_node(&self, id: &NodeId) -> Result<()> {
        let mut guard = self.inner.write().await;
        guard.nodes.remove(id);
        Ok(())
    }

    async fn schedule_purge(&self, node: NodeId) -> Result<()> {
        let mut guard = self.inner.write().await;
        guard.purge_queue.push_back(node);
        Ok(())
    }
}
