//! Node classification
//!
//! One function decides what a node is for highlighting purposes, so the
//! validator and reconciler match on a closed set of kinds instead of poking
//! at class names and attributes themselves.

use super::adapter::DocumentAdapter;
use super::node::NodeId;
use crate::config::MarkupConventions;

/// What a node means to the highlighter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    Text,
    /// Ordinary content element
    Plain,
    /// Form control or element with `role="button"`
    Interactive,
    /// A materialized highlight
    HighlightSpan,
    /// Inert pronunciation feedback display; safe to highlight through
    PronunciationCarrier,
    /// Tooltip or open popover content
    Popover,
    /// Transient invalid-selection overlay
    SelectionCue,
}

impl NodeClass {
    /// Elements a new selection may not contain
    pub fn is_restricted(self) -> bool {
        matches!(
            self,
            NodeClass::Interactive | NodeClass::HighlightSpan | NodeClass::Popover
        )
    }

    /// Markup the highlighter itself adds; ignored when anchoring
    pub fn is_transparent(self) -> bool {
        matches!(self, NodeClass::HighlightSpan | NodeClass::SelectionCue)
    }
}

/// Major structural blocks a selection may not straddle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    ListItem,
    TableCell,
    Section,
    Article,
}

impl BlockKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "p" => Some(BlockKind::Paragraph),
            "h1" => Some(BlockKind::Heading(1)),
            "h2" => Some(BlockKind::Heading(2)),
            "h3" => Some(BlockKind::Heading(3)),
            "h4" => Some(BlockKind::Heading(4)),
            "h5" => Some(BlockKind::Heading(5)),
            "h6" => Some(BlockKind::Heading(6)),
            "li" => Some(BlockKind::ListItem),
            "td" | "th" => Some(BlockKind::TableCell),
            "section" => Some(BlockKind::Section),
            "article" => Some(BlockKind::Article),
            _ => None,
        }
    }
}

const INTERACTIVE_TAGS: &[&str] = &["button", "input", "select", "textarea"];
const POPOVER_CLASSES: &[&str] = &["popover-content", "tooltip"];

/// Classify a node. Precedence: highlight, cue, pronunciation carrier,
/// interactive, popover.
pub fn classify<D: DocumentAdapter + ?Sized>(
    doc: &D,
    node: NodeId,
    markup: &MarkupConventions,
) -> NodeClass {
    let Some(tag) = doc.tag(node) else {
        return NodeClass::Text;
    };

    if doc.has_class(node, &markup.highlight_class) {
        return NodeClass::HighlightSpan;
    }
    if doc.has_class(node, &markup.cue_class) {
        return NodeClass::SelectionCue;
    }
    if doc
        .attribute(node, "title")
        .is_some_and(|title| title.contains(markup.pronunciation_marker.as_str()))
    {
        return NodeClass::PronunciationCarrier;
    }

    let role = doc.attribute(node, "role");
    if INTERACTIVE_TAGS.contains(&tag) || role == Some("button") {
        return NodeClass::Interactive;
    }
    if POPOVER_CLASSES.iter().any(|class| doc.has_class(node, class))
        || role == Some("tooltip")
        || doc.attribute(node, "data-state") == Some("open")
    {
        return NodeClass::Popover;
    }

    NodeClass::Plain
}

/// Block kind of an element, if it is a major structural block
pub fn block_kind<D: DocumentAdapter + ?Sized>(doc: &D, node: NodeId) -> Option<BlockKind> {
    doc.tag(node).and_then(BlockKind::from_tag)
}
