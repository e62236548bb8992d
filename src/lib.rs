// src/lib.rs

//! Persistent, namespaced, ordered index over an external
//! transactional document store.
//!
//! Keys are structured [`Value`]s under a total cross-type order;
//! values are opaque short string identifiers. Each namespace owns
//! one B-tree whose nodes are documents in the host store, reached
//! through the [`DocStore`] adapter trait: every algorithmic step is
//! a load or write against the store, and every public operation is
//! meant to run inside a single host transaction.
//!
//! The bundled [`InMemoryStore`] behaves like one permanently open
//! transaction and is the adapter used by the test suite.

pub mod error;
pub mod node;
mod purge;
pub mod store;
pub mod tree;
pub mod value;

pub use error::{GroveError, Result};
pub use node::definition::{Item, Node, NodePatch, TreeRecord};
pub use store::{DocStore, InMemoryStore, NodeId, NodeStore, TreeId, DEFAULT_MAX_NODE_SIZE};
pub use tree::{Grove, NamespacePage, Order, Page, PaginateArgs, END_CURSOR};
pub use value::{Namespace, Value};
