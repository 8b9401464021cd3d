//! Transcript Highlights Library
//!
//! Free-text highlighting for feedback views: durable anchors for user
//! selections, validation of what may be highlighted, and a reconciler that
//! repaints stored highlights after the host re-renders its content.
//!
//! # Modules
//!
//! - `dom`: In-memory document tree, ranges and the adapter seam
//! - `anchor`: Range <-> path/offset anchors
//! - `validator`: Selection acceptance pipeline
//! - `highlights`: Highlight records and the shared store
//! - `reconciler`: Strip, re-resolve and repaint passes
//! - `controller`: Per-container annotator driven by input events
//! - `db`: SQLite persistence of highlight records

pub mod anchor;
pub mod config;
pub mod controller;
pub mod db;
pub mod dom;
pub mod error;
pub mod highlights;
pub mod reconciler;
pub mod scheduler;
pub mod validator;

pub use anchor::Anchor;
pub use config::HighlightConfig;
pub use controller::{Annotator, CapturedSelection, EventOutcome, InputEvent, KeyStroke};
pub use error::{HighlightError, Result};
pub use highlights::{Highlight, HighlightStore, NewHighlight, ScopeKey, Section, SharedStore};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use validator::{Rejection, SelectionValidator};
