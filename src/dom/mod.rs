//! In-memory document model
//!
//! A mutable element/text tree with DOM-style ranges and a native selection
//! slot. Everything the highlighter does to a page goes through the
//! [`DocumentAdapter`] trait, which [`Document`] implements.

mod adapter;
mod classify;
mod node;
mod parse;
mod range;
mod serialize;

pub use adapter::{DocumentAdapter, SpanMark};
pub use classify::{block_kind, classify, BlockKind, NodeClass};
pub use node::{Document, ElementData, NodeData, NodeId};
pub use range::{Boundary, DomRange, WrapError};
