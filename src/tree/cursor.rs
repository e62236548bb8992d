// src/tree/cursor.rs

use std::future::Future;
use std::pin::Pin;

use crate::error::{GroveError, Result};
use crate::node::definition::Item;
use crate::store::doc_store::{DocStore, NodeId};
use crate::store::node_store::NodeStore;
use crate::value::Value;

use super::range::{filter_between, RangeEntry};
use super::types::Order;

/// Encodes the last-returned key as an opaque resumption cursor.
///
/// The encoding is textual JSON over the value domain, with floats
/// carried as bit patterns, so decoding always yields a key that
/// compares equal to the original. Cursors therefore stay valid
/// across arbitrary intervening writes.
pub(super) fn encode_cursor(key: &Value) -> Result<String> {
    serde_json::to_string(key)
        .map_err(|e| GroveError::Internal(format!("cursor encoding failed: {e}")))
}

pub(super) fn decode_cursor(cursor: &str) -> Result<Value> {
    serde_json::from_str(cursor)
        .map_err(|e| GroveError::InvalidCursor(format!("{cursor:?}: {e}")))
}

/// Outcome of one page walk.
pub(super) enum WalkStatus {
    /// The range is exhausted; everything in range is in the page.
    Done,
    /// The page filled up; the carried cursor resumes after it.
    More(String),
}

/// Fills `page` from the subtree under `node_id`, walking the range
/// contributions in `order` and expanding opaque subtrees only while
/// the page has room. `exclude` drops the single item equal to the
/// resumption cursor, which turns the inclusive re-walk bound into a
/// strict one.
pub(super) fn page_through<'a, S: DocStore>(
    store: &'a NodeStore<S>,
    node_id: NodeId,
    k1: Option<&'a Value>,
    k2: Option<&'a Value>,
    order: Order,
    exclude: Option<&'a Value>,
    limit: usize,
    page: &'a mut Vec<Item>,
) -> Pin<Box<dyn Future<Output = Result<WalkStatus>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = filter_between(store, node_id, k1, k2).await?;
        if order == Order::Desc {
            entries.reverse();
        }
        for entry in entries {
            if page.len() >= limit {
                let last = page.last().ok_or_else(|| {
                    GroveError::Internal("page filled with a zero limit".to_string())
                })?;
                return Ok(WalkStatus::More(encode_cursor(&last.k)?));
            }
            match entry {
                RangeEntry::Item(item) => {
                    if exclude.map_or(false, |cursor_key| item.k == *cursor_key) {
                        continue;
                    }
                    page.push(item);
                }
                RangeEntry::Subtree(subtree) => {
                    // The reference is guaranteed in-range, so the
                    // expansion runs unbounded.
                    match page_through(store, subtree, None, None, order, exclude, limit, page)
                        .await?
                    {
                        WalkStatus::Done => {}
                        more => return Ok(more),
                    }
                }
            }
        }
        Ok(WalkStatus::Done)
    })
}
