// src/tree/range.rs

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::node::definition::Item;
use crate::store::doc_store::{DocStore, NodeId};
use crate::store::node_store::NodeStore;
use crate::value::Value;

/// One in-range contribution of a subtree walk: either a concrete
/// item, or a reference to a child whose keys are all guaranteed to
/// lie within the requested bounds and which may be expanded lazily.
#[derive(Debug, Clone)]
pub(crate) enum RangeEntry {
    Item(Item),
    Subtree(NodeId),
}

/// Produces the ordered in-range contributions of the subtree rooted
/// at `node_id` for the inclusive bounds `[k1, k2]` (either side may
/// be unbounded).
///
/// Children that straddle a bound are expanded inline; children whose
/// whole key range falls inside the bounds are returned opaque, so a
/// fully unbounded walk loads only the nodes it actually pages
/// through. A bound is dropped on recursion as soon as an ancestor
/// separator already guarantees it.
pub(crate) fn filter_between<'a, S: DocStore>(
    store: &'a NodeStore<S>,
    node_id: NodeId,
    k1: Option<&'a Value>,
    k2: Option<&'a Value>,
) -> Pin<Box<dyn Future<Output = Result<Vec<RangeEntry>>> + Send + 'a>> {
    Box::pin(async move {
        let node = store.must_get_node(&node_id).await?;
        let count = node.items.len();
        let mut entries = Vec::new();

        for i in 0..=count {
            if !node.subtrees.is_empty() {
                // Keys in subtree i lie strictly between the
                // neighbouring separators.
                let lower = if i > 0 { Some(&node.items[i - 1].k) } else { None };
                let upper = if i < count { Some(&node.items[i].k) } else { None };

                let below_range =
                    matches!((k1, upper), (Some(k1), Some(upper)) if *upper <= *k1);
                let above_range =
                    matches!((k2, lower), (Some(k2), Some(lower)) if *lower >= *k2);
                if !below_range && !above_range {
                    let lower_covered = match k1 {
                        None => true,
                        Some(k1) => matches!(lower, Some(lower) if *lower >= *k1),
                    };
                    let upper_covered = match k2 {
                        None => true,
                        Some(k2) => matches!(upper, Some(upper) if *upper <= *k2),
                    };
                    if lower_covered && upper_covered {
                        entries.push(RangeEntry::Subtree(node.subtrees[i].clone()));
                    } else {
                        let sub_k1 = if lower_covered { None } else { k1 };
                        let sub_k2 = if upper_covered { None } else { k2 };
                        let inner =
                            filter_between(store, node.subtrees[i].clone(), sub_k1, sub_k2)
                                .await?;
                        entries.extend(inner);
                    }
                }
            }
            if i < count {
                let item = &node.items[i];
                let above_k1 = k1.map_or(true, |k1| item.k >= *k1);
                let below_k2 = k2.map_or(true, |k2| item.k <= *k2);
                if above_k1 && below_k2 {
                    entries.push(RangeEntry::Item(item.clone()));
                }
            }
        }
        Ok(entries)
    })
}
