// src/tree/grove.rs

use std::sync::Arc;

use log::trace;

use crate::error::{GroveError, Result};
use crate::node::definition::Item;
use crate::store::doc_store::{DocStore, NodeId};
use crate::store::node_store::{min_node_size, NodeStore};
use crate::value::{Namespace, Value};

use super::cursor::{decode_cursor, page_through, WalkStatus};
use super::types::{NamespacePage, Order, Page, PaginateArgs, END_CURSOR};
use super::{core_logic, validate};

/// Tree records swept per catalog batch during `clear_all`.
const NAMESPACE_BATCH: usize = 100;

/// The namespaced index facade. Every method is a complete engine
/// operation intended to run inside a single host transaction; the
/// store adapter supplies read-after-write visibility within it.
#[derive(Debug)]
pub struct Grove<S: DocStore> {
    store: NodeStore<S>,
}

impl<S: DocStore> Grove<S> {
    pub fn new(store: Arc<S>) -> Self {
        Grove {
            store: NodeStore::new(store),
        }
    }

    /// Creates the namespace's tree explicitly. Unlike the write
    /// operations, which create lazily, this fails when the tree
    /// already exists.
    pub async fn init(&self, namespace: &Namespace, max_node_size: Option<usize>) -> Result<()> {
        if self.store.get_tree(namespace).await?.is_some() {
            return Err(GroveError::AlreadyInitialized);
        }
        self.store
            .get_or_create_tree(namespace, max_node_size)
            .await?;
        Ok(())
    }

    /// Empties the namespace: the tree record is deleted, its node
    /// graph is handed to the deferred purge worker, and a fresh empty
    /// tree is created at `max_node_size`, else the previous fanout,
    /// else the default chain.
    pub async fn clear(&self, namespace: &Namespace, max_node_size: Option<usize>) -> Result<()> {
        let existing = self.store.get_tree(namespace).await?;
        let preserved = existing.as_ref().map(|tree| tree.max_node_size);
        if let Some(tree) = existing {
            self.store.delete_tree(&tree.id).await?;
            self.store.schedule_purge(tree.root).await?;
        }
        self.store
            .get_or_create_tree(namespace, max_node_size.or(preserved))
            .await?;
        Ok(())
    }

    /// Inserts `(key, value)`, creating the tree on first write.
    /// Fails with `DuplicateKey` when the key is already present.
    pub async fn insert(
        &self,
        namespace: &Namespace,
        key: Value,
        value: impl Into<String>,
    ) -> Result<()> {
        let tree = self.store.get_or_create_tree(namespace, None).await?;
        let push_up = core_logic::insert_into_node(
            &self.store,
            tree.max_node_size,
            tree.root.clone(),
            key,
            value.into(),
        )
        .await?;
        if let Some(push) = push_up {
            // The root itself split: the only way the tree grows.
            let new_root = self
                .store
                .insert_node(vec![push.separator], vec![push.left, push.right])
                .await?;
            self.store.patch_tree_root(&tree.id, &new_root).await?;
        }
        Ok(())
    }

    /// Deletes `key` and returns the removed item. Fails with
    /// `MissingKey` when absent (including on a fresh namespace,
    /// whose tree is auto-created empty).
    pub async fn delete(&self, namespace: &Namespace, key: &Value) -> Result<Item> {
        let tree = self.store.get_or_create_tree(namespace, None).await?;
        let min = min_node_size(tree.max_node_size)?;
        let removed =
            core_logic::delete_from_node(&self.store, min, tree.root.clone(), key).await?;

        // Root collapse: the only way the tree shrinks.
        let root = self.store.must_get_node(&tree.root).await?;
        if root.items.is_empty() && root.subtrees.len() == 1 {
            let promoted = root.subtrees[0].clone();
            self.store.patch_tree_root(&tree.id, &promoted).await?;
            self.store.delete_node(&tree.root).await?;
        }
        Ok(removed)
    }

    /// `delete` that suppresses `MissingKey`, and only `MissingKey`.
    pub async fn delete_if_exists(
        &self,
        namespace: &Namespace,
        key: &Value,
    ) -> Result<Option<Item>> {
        match self.delete(namespace, key).await {
            Ok(item) => Ok(Some(item)),
            Err(GroveError::MissingKey(_)) => Ok(None),
            Err(other) => Err(other),
        }
    }

    /// Delete-then-insert in one transaction. `new_namespace` moves
    /// the item to another namespace's tree.
    pub async fn replace(
        &self,
        namespace: &Namespace,
        current_key: &Value,
        new_key: Value,
        value: impl Into<String>,
        new_namespace: Option<&Namespace>,
    ) -> Result<()> {
        self.delete(namespace, current_key).await?;
        self.insert(new_namespace.unwrap_or(namespace), new_key, value)
            .await
    }

    /// `replace` that tolerates a missing `current_key`.
    pub async fn replace_or_insert(
        &self,
        namespace: &Namespace,
        current_key: &Value,
        new_key: Value,
        value: impl Into<String>,
        new_namespace: Option<&Namespace>,
    ) -> Result<()> {
        self.delete_if_exists(namespace, current_key).await?;
        self.insert(new_namespace.unwrap_or(namespace), new_key, value)
            .await
    }

    /// Upsert: after this call `get(key)` yields `value` regardless of
    /// prior state.
    pub async fn insert_if_does_not_exist(
        &self,
        namespace: &Namespace,
        key: Value,
        value: impl Into<String>,
    ) -> Result<()> {
        let current = key.clone();
        self.replace_or_insert(namespace, &current, key, value, None)
            .await
    }

    /// Point lookup. Fails with `NotInitialized` when the namespace
    /// has no tree at all (as opposed to an empty one).
    pub async fn get(&self, namespace: &Namespace, key: &Value) -> Result<Option<Item>> {
        let tree = self.store.must_get_tree(namespace).await?;
        core_logic::get_in_node(&self.store, tree.root, key).await
    }

    /// One page of the ordered range walk described by `args`. See
    /// `PaginateArgs` and `Page` for the cursor protocol.
    pub async fn paginate(&self, namespace: &Namespace, args: PaginateArgs) -> Result<Page> {
        if args.limit == 0 {
            return Err(GroveError::InvalidLimit(args.limit));
        }
        let tree = match self.store.get_tree(namespace).await? {
            Some(tree) => tree,
            None => {
                return Ok(Page {
                    page: Vec::new(),
                    cursor: String::new(),
                    is_done: true,
                })
            }
        };

        let cursor_key = match args.cursor.as_deref() {
            None | Some("") => None,
            Some(cursor) => Some(decode_cursor(cursor)?),
        };
        // The cursor is the last key already returned: it replaces the
        // bound on the resumed side, and the walk skips the key itself.
        let (k1, k2) = match args.order {
            Order::Asc => (cursor_key.as_ref().or(args.k1.as_ref()), args.k2.as_ref()),
            Order::Desc => (args.k1.as_ref(), cursor_key.as_ref().or(args.k2.as_ref())),
        };

        let mut page = Vec::with_capacity(args.limit.min(1024));
        let status = page_through(
            &self.store,
            tree.root,
            k1,
            k2,
            args.order,
            cursor_key.as_ref(),
            args.limit,
            &mut page,
        )
        .await?;
        Ok(match status {
            WalkStatus::Done => Page {
                page,
                cursor: String::new(),
                is_done: true,
            },
            WalkStatus::More(cursor) => Page {
                page,
                cursor,
                is_done: false,
            },
        })
    }

    /// One page of the namespace catalog, ordered by tree record id.
    /// Missing (undefined) namespaces surface as `Value::Null`.
    pub async fn paginate_namespaces(
        &self,
        limit: usize,
        cursor: Option<String>,
    ) -> Result<NamespacePage> {
        if limit == 0 {
            return Err(GroveError::InvalidLimit(limit));
        }
        if cursor.as_deref() == Some(END_CURSOR) {
            return Ok(NamespacePage {
                page: Vec::new(),
                cursor: END_CURSOR.to_string(),
                is_done: true,
            });
        }
        let after = cursor.filter(|cursor| !cursor.is_empty());
        let trees = self.store.list_trees(after.as_ref(), limit).await?;
        let page: Vec<Value> = trees
            .iter()
            .map(|tree| tree.namespace.clone().unwrap_or(Value::Null))
            .collect();
        match trees.last() {
            Some(last) if trees.len() == limit => Ok(NamespacePage {
                page,
                cursor: last.id.clone(),
                is_done: false,
            }),
            _ => Ok(NamespacePage {
                page,
                cursor: END_CURSOR.to_string(),
                is_done: true,
            }),
        }
    }

    /// Clears every namespace, then the `undefined` namespace even if
    /// it had no tree record, so the stored default fanout survives
    /// with an empty tree.
    pub async fn clear_all(&self) -> Result<()> {
        // Snapshot the namespace set before clearing: clears recreate
        // tree records under fresh ids, which a live id-ordered walk
        // would keep revisiting.
        let mut namespaces: Vec<Namespace> = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let trees = self
                .store
                .list_trees(after.as_ref(), NAMESPACE_BATCH)
                .await?;
            let exhausted = trees.len() < NAMESPACE_BATCH;
            after = trees.last().map(|tree| tree.id.clone());
            namespaces.extend(trees.into_iter().map(|tree| tree.namespace));
            if exhausted {
                break;
            }
        }

        let saw_undefined = namespaces.iter().any(|namespace| namespace.is_none());
        for namespace in &namespaces {
            self.clear(namespace, None).await?;
        }
        if !saw_undefined {
            self.clear(&None, None).await?;
        }
        trace!("cleared {} namespaces", namespaces.len());
        Ok(())
    }

    /// Re-checks the structural invariants of the namespace's tree.
    /// An absent tree is vacuously valid.
    pub async fn validate(&self, namespace: &Namespace) -> Result<()> {
        match self.store.get_tree(namespace).await? {
            Some(tree) => validate::validate_tree(&self.store, &tree).await,
            None => Ok(()),
        }
    }

    /// One unit of deferred node-graph deletion: schedules the node's
    /// children and deletes the node. Safe to re-deliver; a node that
    /// is already gone is a no-op.
    pub async fn purge_node(&self, node: &NodeId) -> Result<()> {
        crate::purge::purge_node(&self.store, node).await
    }
}
