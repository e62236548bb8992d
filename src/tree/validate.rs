// src/tree/validate.rs

use std::future::Future;
use std::pin::Pin;

use crate::error::{GroveError, Result};
use crate::node::definition::TreeRecord;
use crate::store::doc_store::{DocStore, NodeId};
use crate::store::node_store::{min_node_size, NodeStore};
use crate::value::Value;

/// Re-checks every structural invariant of a tree: strict item order,
/// fanout bounds, items/subtrees arity, key separation against the
/// ancestor separators, uniform leaf depth, and collapsed-root shape.
pub(super) async fn validate_tree<S: DocStore>(
    store: &NodeStore<S>,
    tree: &TreeRecord,
) -> Result<()> {
    let min = min_node_size(tree.max_node_size)?;
    let root = store.must_get_node(&tree.root).await?;
    if root.items.is_empty() && root.subtrees.len() == 1 {
        return Err(GroveError::InvariantViolation(
            "root with no items and a single subtree was not collapsed".to_string(),
        ));
    }
    check_node(
        store,
        tree.root.clone(),
        min,
        tree.max_node_size,
        true,
        None,
        None,
    )
    .await?;
    Ok(())
}

/// Validates one node and its subtree, returning the leaf depth below
/// it so siblings can be compared.
fn check_node<'a, S: DocStore>(
    store: &'a NodeStore<S>,
    node_id: NodeId,
    min: usize,
    max: usize,
    is_root: bool,
    lower: Option<&'a Value>,
    upper: Option<&'a Value>,
) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'a>> {
    Box::pin(async move {
        let node = store.must_get_node(&node_id).await?;
        let count = node.items.len();

        if count > max {
            return Err(GroveError::InvariantViolation(format!(
                "node {node_id} holds {count} items, above the maximum {max}"
            )));
        }
        if !is_root && count < min {
            return Err(GroveError::InvariantViolation(format!(
                "node {node_id} holds {count} items, below the minimum {min}"
            )));
        }
        for pair in node.items.windows(2) {
            if pair[0].k >= pair[1].k {
                return Err(GroveError::InvariantViolation(format!(
                    "node {node_id} items are not strictly ascending"
                )));
            }
        }
        for item in &node.items {
            if lower.map_or(false, |lower| item.k <= *lower)
                || upper.map_or(false, |upper| item.k >= *upper)
            {
                return Err(GroveError::InvariantViolation(format!(
                    "node {node_id} holds a key outside its separator bounds"
                )));
            }
        }

        if node.is_leaf() {
            return Ok(1);
        }
        if node.subtrees.len() != count + 1 {
            return Err(GroveError::InvariantViolation(format!(
                "internal node {node_id} has {} subtrees for {count} items",
                node.subtrees.len()
            )));
        }

        let mut depth = None;
        for i in 0..=count {
            let sub_lower = if i > 0 { Some(&node.items[i - 1].k) } else { lower };
            let sub_upper = if i < count { Some(&node.items[i].k) } else { upper };
            let child_depth = check_node(
                store,
                node.subtrees[i].clone(),
                min,
                max,
                false,
                sub_lower,
                sub_upper,
            )
            .await?;
            match depth {
                None => depth = Some(child_depth),
                Some(expected) if expected != child_depth => {
                    return Err(GroveError::InvariantViolation(format!(
                        "node {node_id} has leaves at unequal depths"
                    )));
                }
                Some(_) => {}
            }
        }
        let depth = depth.ok_or_else(|| {
            GroveError::Internal("internal node validated without children".to_string())
        })?;
        Ok(depth + 1)
    })
}
