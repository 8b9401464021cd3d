//! Selection Validator
//!
//! An ordered pipeline of checks a fresh selection must pass before it may
//! become a highlight. The first failing check decides the rejection.

use std::cmp::Ordering;

use thiserror::Error;

use crate::config::{MarkupConventions, SelectionPolicy};
use crate::dom::{block_kind, classify, Boundary, DocumentAdapter, DomRange, NodeClass, NodeId};

/// Why a selection cannot be highlighted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Selection is empty")]
    Empty,

    #[error("Selection extends outside the annotatable container")]
    OutsideContainer,

    #[error("Selection too short")]
    TooShort,

    #[error("Selection contains restricted elements (existing highlights, buttons, etc.)")]
    RestrictedContent,

    #[error("Selection crosses different structural elements")]
    CrossesBlocks,

    #[error("Selection overlaps with existing highlight")]
    OverlapsHighlight,

    #[error("Selection cannot be anchored")]
    Unanchorable,
}

pub struct SelectionValidator<'a> {
    policy: &'a SelectionPolicy,
    markup: &'a MarkupConventions,
}

impl<'a> SelectionValidator<'a> {
    pub fn new(policy: &'a SelectionPolicy, markup: &'a MarkupConventions) -> Self {
        Self { policy, markup }
    }

    /// Run every check in order
    pub fn validate<D: DocumentAdapter + ?Sized>(
        &self,
        doc: &D,
        range: &DomRange,
        container: NodeId,
    ) -> Result<(), Rejection> {
        self.check_content(doc, range, container)?;
        if self.has_restricted_element(doc, range) {
            return Err(Rejection::RestrictedContent);
        }
        if self.crosses_blocks(doc, range, container) {
            return Err(Rejection::CrossesBlocks);
        }
        if self.overlaps_highlight(doc, range, container) {
            return Err(Rejection::OverlapsHighlight);
        }
        Ok(())
    }

    /// Non-empty, inside the container and long enough
    fn check_content<D: DocumentAdapter + ?Sized>(
        &self,
        doc: &D,
        range: &DomRange,
        container: NodeId,
    ) -> Result<(), Rejection> {
        let text = doc.range_text(range);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Rejection::Empty);
        }
        if !doc.contains(container, range.start.node) || !doc.contains(container, range.end.node) {
            return Err(Rejection::OutsideContainer);
        }
        if trimmed.chars().count() < self.policy.min_selection_chars {
            return Err(Rejection::TooShort);
        }
        Ok(())
    }

    /// Whether the selected contents include a restricted element. Pronunciation
    /// carriers are skipped together with everything inside them.
    pub fn has_restricted_element<D: DocumentAdapter + ?Sized>(
        &self,
        doc: &D,
        range: &DomRange,
    ) -> bool {
        let Some(ancestor) = doc.common_ancestor(range.start.node, range.end.node) else {
            return false;
        };

        let mut stack: Vec<NodeId> = doc.children(ancestor).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if doc.is_text(node) || !doc.intersects_node(range, node) {
                continue;
            }
            match classify(doc, node, self.markup) {
                NodeClass::PronunciationCarrier => continue,
                class if class.is_restricted() => return true,
                _ => {}
            }
            stack.extend(doc.children(node).iter().rev().copied());
        }
        false
    }

    /// Whether the ends sit in two different major blocks, unless both are in
    /// the same pronunciation carrier
    pub fn crosses_blocks<D: DocumentAdapter + ?Sized>(
        &self,
        doc: &D,
        range: &DomRange,
        container: NodeId,
    ) -> bool {
        let element_of = |node: NodeId| {
            if doc.is_text(node) {
                doc.parent(node)
            } else {
                Some(node)
            }
        };
        let (Some(start), Some(end)) = (element_of(range.start.node), element_of(range.end.node))
        else {
            return true;
        };

        if let (Some(a), Some(b)) = (
            self.carrier_of(doc, start, container),
            self.carrier_of(doc, end, container),
        ) {
            if a == b {
                return false;
            }
        }

        let start_block = enclosing_block(doc, start, container);
        let end_block = enclosing_block(doc, end, container);
        start_block != end_block && start_block != Some(container) && end_block != Some(container)
    }

    fn carrier_of<D: DocumentAdapter + ?Sized>(
        &self,
        doc: &D,
        element: NodeId,
        container: NodeId,
    ) -> Option<NodeId> {
        let mut current = Some(element);
        while let Some(node) = current {
            if node == container {
                return None;
            }
            if classify(doc, node, self.markup) == NodeClass::PronunciationCarrier {
                return Some(node);
            }
            current = doc.parent(node);
        }
        None
    }

    /// Whether the range genuinely overlaps a painted highlight. Touching
    /// ranges are fine.
    pub fn overlaps_highlight<D: DocumentAdapter + ?Sized>(
        &self,
        doc: &D,
        range: &DomRange,
        container: NodeId,
    ) -> bool {
        let range_text = doc.range_text(range);
        for node in doc.descendants(container) {
            if classify(doc, node, self.markup) != NodeClass::HighlightSpan {
                continue;
            }
            let painted = DomRange::new(
                Boundary::new(node, 0),
                Boundary::new(node, doc.node_length(node)),
            );
            let ends_after_start = doc.compare_points(range.end, painted.start);
            let starts_before_end = doc.compare_points(range.start, painted.end);
            if ends_after_start != Some(Ordering::Greater)
                || starts_before_end != Some(Ordering::Less)
            {
                continue;
            }

            let painted_text = doc.range_text(&painted);
            if range_text.is_empty() || painted_text.is_empty() {
                continue;
            }
            if range_text.contains(&painted_text) || painted_text.contains(&range_text) {
                return true;
            }
        }
        false
    }
}

/// Nearest major block at or above `element`, or the container itself
fn enclosing_block<D: DocumentAdapter + ?Sized>(
    doc: &D,
    element: NodeId,
    container: NodeId,
) -> Option<NodeId> {
    let mut current = Some(element);
    while let Some(node) = current {
        if node == container || block_kind(doc, node).is_some() {
            return Some(node);
        }
        current = doc.parent(node);
    }
    None
}
