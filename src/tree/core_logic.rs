// src/tree/core_logic.rs

use std::future::Future;
use std::pin::Pin;

use crate::error::{GroveError, Result};
use crate::node::definition::{Item, Node, NodePatch};
use crate::store::doc_store::{DocStore, NodeId};
use crate::store::node_store::NodeStore;
use crate::value::Value;

use super::modification;
use super::types::PushUp;

/// Point lookup: descend from `node_id` until the key is found or a
/// leaf runs out of candidates.
pub(super) fn get_in_node<'a, S: DocStore>(
    store: &'a NodeStore<S>,
    node_id: NodeId,
    key: &'a Value,
) -> Pin<Box<dyn Future<Output = Result<Option<Item>>> + Send + 'a>> {
    Box::pin(async move {
        let node = store.must_get_node(&node_id).await?;
        match node.items.binary_search_by(|item| item.k.cmp(key)) {
            Ok(index) => Ok(Some(node.items[index].clone())),
            Err(index) => {
                if node.is_leaf() {
                    return Ok(None);
                }
                get_in_node(store, node.subtrees[index].clone(), key).await
            }
        }
    })
}

/// Inserts `(key, value)` under `node_id`, returning the push-up when
/// this node overflowed and split.
///
/// The overflow check re-reads the node after the local write, so it
/// observes the spliced push-up of a child split exactly as the store
/// will commit it.
pub(super) fn insert_into_node<'a, S: DocStore>(
    store: &'a NodeStore<S>,
    max_node_size: usize,
    node_id: NodeId,
    key: Value,
    value: String,
) -> Pin<Box<dyn Future<Output = Result<Option<PushUp>>> + Send + 'a>> {
    Box::pin(async move {
        let node = store.must_get_node(&node_id).await?;
        let index = match node.items.binary_search_by(|item| item.k.cmp(&key)) {
            Ok(_) => return Err(GroveError::DuplicateKey(key)),
            Err(index) => index,
        };

        let Node { items, subtrees } = node;
        if subtrees.is_empty() {
            let mut items = items;
            items.insert(index, Item { k: key, v: value });
            store.patch_node(&node_id, NodePatch::items(items)).await?;
        } else {
            let child = subtrees[index].clone();
            match insert_into_node(store, max_node_size, child, key, value).await? {
                None => return Ok(None),
                Some(push) => {
                    let mut items = items;
                    let mut subtrees = subtrees;
                    items.insert(index, push.separator);
                    subtrees.splice(index..=index, [push.left, push.right]);
                    store
                        .patch_node(&node_id, NodePatch::full(items, subtrees))
                        .await?;
                }
            }
        }

        let node = store.must_get_node(&node_id).await?;
        if node.items.len() <= max_node_size {
            return Ok(None);
        }
        split_node(store, max_node_size, &node_id, node).await.map(Some)
    })
}

/// Splits an overflowing node in half, keeping the low half in place,
/// moving the high half into a fresh sibling and pushing the middle
/// item up. The overflow must be exactly one item wide.
async fn split_node<S: DocStore>(
    store: &NodeStore<S>,
    max_node_size: usize,
    node_id: &NodeId,
    node: Node,
) -> Result<PushUp> {
    let min_node_size = max_node_size / 2;
    if node.items.len() != 2 * min_node_size + 1 {
        return Err(GroveError::InvariantViolation(format!(
            "overflowing node holds {} items, expected {}",
            node.items.len(),
            2 * min_node_size + 1
        )));
    }

    let Node { mut items, mut subtrees } = node;
    let sibling_items = items.split_off(min_node_size + 1);
    let separator = items.pop().ok_or_else(|| {
        GroveError::Internal("overflowing node lost its separator".to_string())
    })?;
    let sibling_subtrees = if subtrees.is_empty() {
        Vec::new()
    } else {
        subtrees.split_off(min_node_size + 1)
    };

    let sibling = store.insert_node(sibling_items, sibling_subtrees).await?;
    store
        .patch_node(node_id, NodePatch::full(items, subtrees))
        .await?;
    Ok(PushUp {
        separator,
        left: node_id.clone(),
        right: sibling,
    })
}

/// Deletes `key` from the subtree under `node_id` and returns the
/// removed item. Fails with `MissingKey` when the key is absent.
///
/// A hit in an internal node is rewritten as the deletion of its
/// predecessor: the separator is patched to the predecessor item
/// first, then the predecessor key is deleted from the left subtree.
/// Either way the touched child is re-read afterwards and repaired if
/// it dropped below the minimum.
pub(super) fn delete_from_node<'a, S: DocStore>(
    store: &'a NodeStore<S>,
    min_node_size: usize,
    node_id: NodeId,
    key: &'a Value,
) -> Pin<Box<dyn Future<Output = Result<Item>> + Send + 'a>> {
    Box::pin(async move {
        let node = store.must_get_node(&node_id).await?;
        let (index, removed) = match node.items.binary_search_by(|item| item.k.cmp(key)) {
            Ok(index) => {
                if node.is_leaf() {
                    let mut items = node.items;
                    let removed = items.remove(index);
                    store.patch_node(&node_id, NodePatch::items(items)).await?;
                    return Ok(removed);
                }
                let removed = node.items[index].clone();
                let child = node.subtrees[index].clone();
                let predecessor = find_max(store, child.clone()).await?;

                let mut items = node.items;
                items[index] = predecessor.clone();
                store.patch_node(&node_id, NodePatch::items(items)).await?;

                delete_from_node(store, min_node_size, child, &predecessor.k).await?;
                (index, removed)
            }
            Err(index) => {
                if node.is_leaf() {
                    return Err(GroveError::MissingKey(key.clone()));
                }
                let child = node.subtrees[index].clone();
                let removed = delete_from_node(store, min_node_size, child, key).await?;
                (index, removed)
            }
        };

        repair_if_deficient(store, min_node_size, &node_id, index).await?;
        Ok(removed)
    })
}

/// Re-reads the child at `child_index` and rebalances when the
/// recursive delete left it under-filled. The parent is re-read too:
/// the tombstone step may have patched it since the descent.
async fn repair_if_deficient<S: DocStore>(
    store: &NodeStore<S>,
    min_node_size: usize,
    parent_id: &NodeId,
    child_index: usize,
) -> Result<()> {
    let parent = store.must_get_node(parent_id).await?;
    let child_id = parent.subtrees.get(child_index).ok_or_else(|| {
        GroveError::Internal(format!(
            "child index {child_index} out of bounds after delete"
        ))
    })?;
    let child = store.must_get_node(child_id).await?;
    if child.items.len() >= min_node_size {
        return Ok(());
    }
    modification::repair_deficient_child(store, min_node_size, parent_id, parent, child_index)
        .await
}

/// The maximum item of the subtree under `node_id`: rightmost descent
/// to a leaf.
pub(super) fn find_max<'a, S: DocStore>(
    store: &'a NodeStore<S>,
    node_id: NodeId,
) -> Pin<Box<dyn Future<Output = Result<Item>> + Send + 'a>> {
    Box::pin(async move {
        let node = store.must_get_node(&node_id).await?;
        match node.subtrees.last() {
            Some(rightmost) => find_max(store, rightmost.clone()).await,
            None => node.items.last().cloned().ok_or_else(|| {
                GroveError::InvariantViolation(
                    "empty leaf reached while resolving a predecessor".to_string(),
                )
            }),
        }
    })
}
