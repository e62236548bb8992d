// src/tree/modification.rs

use crate::error::{GroveError, Result};
use crate::node::definition::{Node, NodePatch};
use crate::store::doc_store::{DocStore, NodeId};
use crate::store::node_store::NodeStore;

/// Repairs the under-filled child at `child_index` with the first
/// applicable rule: rotate an item in from the left sibling, else
/// from the right sibling, else merge with a sibling (preferring the
/// left one). The caller passes the freshly re-read parent.
pub(super) async fn repair_deficient_child<S: DocStore>(
    store: &NodeStore<S>,
    min_node_size: usize,
    parent_id: &NodeId,
    parent: Node,
    child_index: usize,
) -> Result<()> {
    if child_index > 0 {
        let left_sibling = store.must_get_node(&parent.subtrees[child_index - 1]).await?;
        if left_sibling.items.len() > min_node_size {
            return rotate_right(store, parent_id, parent, child_index, left_sibling).await;
        }
    }
    if child_index + 1 < parent.subtrees.len() {
        let right_sibling = store.must_get_node(&parent.subtrees[child_index + 1]).await?;
        if right_sibling.items.len() > min_node_size {
            return rotate_left(store, parent_id, parent, child_index, right_sibling).await;
        }
    }
    if child_index > 0 {
        merge_siblings(store, parent_id, parent, child_index - 1).await
    } else {
        if parent.subtrees.len() <= 1 {
            return Err(GroveError::Internal(
                "deficient child has no sibling to merge with".to_string(),
            ));
        }
        merge_siblings(store, parent_id, parent, child_index).await
    }
}

/// Moves the left sibling's last item up into the parent separator and
/// the old separator down as the child's first item; an internal
/// sibling also hands over its last subtree.
async fn rotate_right<S: DocStore>(
    store: &NodeStore<S>,
    parent_id: &NodeId,
    parent: Node,
    child_index: usize,
    left_sibling: Node,
) -> Result<()> {
    let separator_index = child_index - 1;
    let child_id = parent.subtrees[child_index].clone();
    let child = store.must_get_node(&child_id).await?;

    let Node { mut items, mut subtrees } = child;
    items.insert(0, parent.items[separator_index].clone());

    let Node {
        items: mut sibling_items,
        subtrees: mut sibling_subtrees,
    } = left_sibling;
    if !subtrees.is_empty() {
        let moved = sibling_subtrees.pop().ok_or_else(|| {
            GroveError::Internal("left sibling has no subtree to rotate".to_string())
        })?;
        subtrees.insert(0, moved);
    }
    let promoted = sibling_items.pop().ok_or_else(|| {
        GroveError::Internal("left sibling has no item to rotate".to_string())
    })?;

    store
        .patch_node(&child_id, NodePatch::full(items, subtrees))
        .await?;
    store
        .patch_node(
            &parent.subtrees[separator_index],
            NodePatch::full(sibling_items, sibling_subtrees),
        )
        .await?;

    let mut parent_items = parent.items;
    parent_items[separator_index] = promoted;
    store
        .patch_node(parent_id, NodePatch::items(parent_items))
        .await
}

/// Mirror image of `rotate_right`, borrowing from the right sibling.
async fn rotate_left<S: DocStore>(
    store: &NodeStore<S>,
    parent_id: &NodeId,
    parent: Node,
    child_index: usize,
    right_sibling: Node,
) -> Result<()> {
    let child_id = parent.subtrees[child_index].clone();
    let child = store.must_get_node(&child_id).await?;

    let Node { mut items, mut subtrees } = child;
    items.push(parent.items[child_index].clone());

    let Node {
        items: mut sibling_items,
        subtrees: mut sibling_subtrees,
    } = right_sibling;
    if !subtrees.is_empty() {
        if sibling_subtrees.is_empty() {
            return Err(GroveError::Internal(
                "right sibling has no subtree to rotate".to_string(),
            ));
        }
        subtrees.push(sibling_subtrees.remove(0));
    }
    if sibling_items.is_empty() {
        return Err(GroveError::Internal(
            "right sibling has no item to rotate".to_string(),
        ));
    }
    let promoted = sibling_items.remove(0);

    store
        .patch_node(&child_id, NodePatch::full(items, subtrees))
        .await?;
    store
        .patch_node(
            &parent.subtrees[child_index + 1],
            NodePatch::full(sibling_items, sibling_subtrees),
        )
        .await?;

    let mut parent_items = parent.items;
    parent_items[child_index] = promoted;
    store
        .patch_node(parent_id, NodePatch::items(parent_items))
        .await
}

/// Concatenates the sibling pair at `left_index`/`left_index + 1`
/// around their parent separator into the left node, deletes the
/// right node and drops the separator slot from the parent.
async fn merge_siblings<S: DocStore>(
    store: &NodeStore<S>,
    parent_id: &NodeId,
    parent: Node,
    left_index: usize,
) -> Result<()> {
    let left_id = parent.subtrees[left_index].clone();
    let right_id = parent.subtrees[left_index + 1].clone();
    let left = store.must_get_node(&left_id).await?;
    let right = store.must_get_node(&right_id).await?;

    let Node { mut items, mut subtrees } = left;
    items.push(parent.items[left_index].clone());
    items.extend(right.items);
    subtrees.extend(right.subtrees);

    store
        .patch_node(&left_id, NodePatch::full(items, subtrees))
        .await?;
    store.delete_node(&right_id).await?;

    let Node {
        items: mut parent_items,
        subtrees: mut parent_subtrees,
    } = parent;
    parent_items.remove(left_index);
    parent_subtrees.remove(left_index + 1);
    store
        .patch_node(parent_id, NodePatch::full(parent_items, parent_subtrees))
        .await
}
