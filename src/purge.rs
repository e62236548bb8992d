// src/purge.rs

use log::trace;

use crate::error::Result;
use crate::store::doc_store::{DocStore, NodeId};
use crate::store::node_store::NodeStore;

/// Deletes one node and re-schedules its children.
///
/// This is the unit of deferred work behind `clear`: instead of
/// transactionally deleting an arbitrarily large node graph, every
/// scheduled step deletes a single node and enqueues its subtrees.
/// Re-delivered work items find the node gone and do nothing.
pub(crate) async fn purge_node<S: DocStore>(store: &NodeStore<S>, node_id: &NodeId) -> Result<()> {
    let node = match store.get_node(node_id).await? {
        Some(node) => node,
        None => {
            trace!("purge: node {node_id} already deleted");
            return Ok(());
        }
    };
    for subtree in node.subtrees {
        store.schedule_purge(subtree).await?;
    }
    store.delete_node(node_id).await?;
    trace!("purge: deleted node {node_id}");
    Ok(())
}
