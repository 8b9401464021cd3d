//! Highlight records and the in-memory store
//!
//! Highlights are scoped by (submission, question, section). The store is an
//! explicitly owned value; share it between annotators with [`SharedStore`].

mod store;
mod types;

pub use store::{HighlightStore, SharedStore};
pub use types::{Highlight, NewHighlight, ScopeKey, Section};
