// src/tree/types.rs

use serde::{Deserialize, Serialize};

use crate::node::definition::Item;
use crate::store::doc_store::NodeId;
use crate::value::Value;

// --- Internal Helper Structs/Enums ---

/// Returned by a child that overflowed and split: the separator to
/// splice into the parent, with the two halves flanking it.
#[derive(Debug)]
pub(crate) struct PushUp {
    pub(crate) separator: Item,
    pub(crate) left: NodeId,
    pub(crate) right: NodeId,
}

// --- Public API Data Structs ---

/// Direction of a range walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Asc,
    Desc,
}

/// Arguments to `Grove::paginate`. `k1`/`k2` are inclusive bounds;
/// either may be absent for an unbounded side. A non-empty `cursor`
/// resumes a previous walk and takes precedence over the bound it
/// replaces (`k1` ascending, `k2` descending).
#[derive(Debug, Clone)]
pub struct PaginateArgs {
    pub limit: usize,
    pub order: Order,
    pub cursor: Option<String>,
    pub k1: Option<Value>,
    pub k2: Option<Value>,
}

impl PaginateArgs {
    pub fn new(limit: usize, order: Order) -> Self {
        PaginateArgs {
            limit,
            order,
            cursor: None,
            k1: None,
            k2: None,
        }
    }
}

/// One page of items. An empty `cursor` means the walk is complete;
/// otherwise it encodes the last key of `page` for resumption.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub page: Vec<Item>,
    pub cursor: String,
    pub is_done: bool,
}

/// One page of namespace tags. The cursor is the id of the last tree
/// record returned, or `"endcursor"` once the catalog is exhausted.
#[derive(Debug, Clone, Serialize)]
pub struct NamespacePage {
    pub page: Vec<Value>,
    pub cursor: String,
    pub is_done: bool,
}

/// Sentinel cursor ending namespace pagination.
pub const END_CURSOR: &str = "endcursor";
