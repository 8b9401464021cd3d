//! Boundary points and ranges
//!
//! Mirrors the DOM `Range` model: a boundary is a node plus an offset, where
//! the offset counts chars inside text nodes and children inside elements.
//! Points are ordered by their tree position, the same way annotation
//! locations are ordered by comparing their index paths step by step.

use std::cmp::Ordering;

use thiserror::Error;

use super::adapter::DocumentAdapter;
use super::node::{Document, NodeId};

/// One end of a range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A contiguous span of the document between two boundary points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomRange {
    pub start: Boundary,
    pub end: Boundary,
}

impl DomRange {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    /// Range inside a single node, e.g. a character span of one text node
    pub fn within(node: NodeId, start: usize, end: usize) -> Self {
        Self {
            start: Boundary::new(node, start),
            end: Boundary::new(node, end),
        }
    }
}

/// Errors raised when wrapping a range in a new element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WrapError {
    #[error("Boundary offset out of bounds")]
    InvalidBoundary,

    #[error("Range start is after its end")]
    Reversed,

    #[error("Range partially selects a non-text node")]
    PartialElement,

    #[error("Range is not attached to the document")]
    Detached,
}

impl Document {
    /// Child indices from the top of the tree down to `node`
    pub fn tree_path(&self, node: NodeId) -> (NodeId, Vec<usize>) {
        let mut path = Vec::new();
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            path.push(self.index_in_parent(current).unwrap_or(0));
            current = parent;
        }
        path.reverse();
        (current, path)
    }

    /// Compare two boundary points; `None` when they live in different trees
    pub fn compare_points(&self, a: Boundary, b: Boundary) -> Option<Ordering> {
        let (root_a, path_a) = self.tree_path(a.node);
        let (root_b, path_b) = self.tree_path(b.node);
        if root_a != root_b {
            return None;
        }

        if path_a == path_b {
            return Some(a.offset.cmp(&b.offset));
        }

        // a.node is an ancestor of b.node
        if path_b.starts_with(&path_a) {
            let child_index = path_b[path_a.len()];
            return Some(if child_index < a.offset {
                Ordering::Greater
            } else {
                Ordering::Less
            });
        }

        // b.node is an ancestor of a.node
        if path_a.starts_with(&path_b) {
            let child_index = path_a[path_b.len()];
            return Some(if child_index < b.offset {
                Ordering::Less
            } else {
                Ordering::Greater
            });
        }

        Some(path_a.cmp(&path_b))
    }

    /// Whether both ends denote the same point
    pub fn is_collapsed(&self, range: &DomRange) -> bool {
        self.compare_points(range.start, range.end) == Some(Ordering::Equal)
    }

    /// Text covered by the range, like `Range.toString()`
    pub fn range_text(&self, range: &DomRange) -> String {
        let Some(ancestor) = self.common_ancestor(range.start.node, range.end.node) else {
            return String::new();
        };

        let mut candidates = vec![ancestor];
        candidates.extend(self.descendants(ancestor));

        let mut out = String::new();
        for node in candidates {
            let Some(text) = self.text(node) else {
                continue;
            };
            let len = text.chars().count();
            if self.compare_points(Boundary::new(node, len), range.start) != Some(Ordering::Greater) {
                continue;
            }
            if self.compare_points(Boundary::new(node, 0), range.end) != Some(Ordering::Less) {
                continue;
            }
            let from = if node == range.start.node { range.start.offset } else { 0 };
            let to = if node == range.end.node { range.end.offset.min(len) } else { len };
            if from < to {
                out.extend(text.chars().skip(from).take(to - from));
            }
        }
        out
    }

    /// Move the range's contents into `wrapper` and put `wrapper` in their
    /// place, like `Range.surroundContents`
    pub fn surround(&mut self, range: &DomRange, wrapper: NodeId) -> Result<NodeId, WrapError> {
        let DomRange { start, end } = *range;
        if start.offset > self.node_length(start.node) || end.offset > self.node_length(end.node) {
            return Err(WrapError::InvalidBoundary);
        }
        match self.compare_points(start, end) {
            None => return Err(WrapError::Detached),
            Some(Ordering::Greater) => return Err(WrapError::Reversed),
            _ => {}
        }

        let container_of = |doc: &Self, b: Boundary| {
            if doc.is_text(b.node) {
                doc.parent(b.node)
            } else {
                Some(b.node)
            }
        };
        let parent = match (container_of(self, start), container_of(self, end)) {
            (Some(a), Some(b)) if a == b => a,
            (Some(_), Some(_)) => return Err(WrapError::PartialElement),
            _ => return Err(WrapError::Detached),
        };

        // The first node after the contents; split the end before the start
        // so the start offset stays valid when both share a text node.
        let stop = if self.is_text(end.node) {
            if end.offset == 0 {
                Some(end.node)
            } else {
                if end.offset < self.node_length(end.node) {
                    self.split_text(end.node, end.offset);
                }
                self.next_sibling(end.node)
            }
        } else {
            self.children(parent).get(end.offset).copied()
        };

        let first = if self.is_text(start.node) {
            if start.offset == 0 {
                Some(start.node)
            } else {
                self.split_text(start.node, start.offset)
            }
        } else {
            self.children(parent).get(start.offset).copied()
        };

        let mut contents = Vec::new();
        if let Some(first) = first {
            if Some(first) != stop {
                let siblings = self.children(parent);
                if let Some(from) = siblings.iter().position(|&c| c == first) {
                    for &child in &siblings[from..] {
                        if Some(child) == stop {
                            break;
                        }
                        contents.push(child);
                    }
                }
            }
        }

        let reference = contents.first().copied().or(stop);
        self.insert_before(parent, wrapper, reference);
        for child in contents {
            self.append_child(wrapper, child);
        }
        Ok(wrapper)
    }

    /// Replace an element by its children and merge the text around it
    pub fn unwrap(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.parent(node) else {
            return false;
        };
        for child in self.children(node).to_vec() {
            self.insert_before(parent, child, Some(node));
        }
        self.detach(node);
        self.normalize(parent);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `<div><p>The quick <b>brown</b> fox</p><p>jumps</p></div>`
    fn sample() -> (Document, Vec<NodeId>) {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let p1 = doc.create_element("p");
        let t1 = doc.create_text("The quick ");
        let b = doc.create_element("b");
        let t2 = doc.create_text("brown");
        let t3 = doc.create_text(" fox");
        let p2 = doc.create_element("p");
        let t4 = doc.create_text("jumps");
        doc.append_child(doc.root(), div);
        doc.append_child(div, p1);
        doc.append_child(p1, t1);
        doc.append_child(p1, b);
        doc.append_child(b, t2);
        doc.append_child(p1, t3);
        doc.append_child(div, p2);
        doc.append_child(p2, t4);
        (doc, vec![div, p1, t1, b, t2, t3, p2, t4])
    }

    #[test]
    fn test_compare_points_same_node() {
        let (doc, n) = sample();
        let t1 = n[2];
        assert_eq!(
            doc.compare_points(Boundary::new(t1, 1), Boundary::new(t1, 4)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_compare_points_ancestor() {
        let (doc, n) = sample();
        let (p1, t2) = (n[1], n[4]);
        // (p1, 1) sits right before <b>, so inside <b> is after it
        assert_eq!(
            doc.compare_points(Boundary::new(p1, 1), Boundary::new(t2, 0)),
            Some(Ordering::Less)
        );
        assert_eq!(
            doc.compare_points(Boundary::new(p1, 2), Boundary::new(t2, 3)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_compare_points_detached() {
        let (mut doc, n) = sample();
        let loose = doc.create_text("loose");
        assert_eq!(
            doc.compare_points(Boundary::new(loose, 0), Boundary::new(n[2], 0)),
            None
        );
    }

    #[test]
    fn test_range_text_across_elements() {
        let (doc, n) = sample();
        let range = DomRange::new(Boundary::new(n[2], 4), Boundary::new(n[5], 2));
        assert_eq!(doc.range_text(&range), "quick brown f");
    }

    #[test]
    fn test_range_text_element_boundaries() {
        let (doc, n) = sample();
        let range = DomRange::new(Boundary::new(n[1], 1), Boundary::new(n[1], 2));
        assert_eq!(doc.range_text(&range), "brown");
    }

    #[test]
    fn test_surround_within_text() {
        let (mut doc, n) = sample();
        let span = doc.create_element("span");
        doc.surround(&DomRange::within(n[2], 4, 9), span).unwrap();

        assert_eq!(doc.text_content(span), "quick");
        assert_eq!(doc.text_content(n[1]), "The quick brown fox");
        assert_eq!(doc.parent(span), Some(n[1]));
        assert_eq!(doc.index_in_parent(span), Some(1));
    }

    #[test]
    fn test_surround_across_siblings() {
        let (mut doc, n) = sample();
        let span = doc.create_element("span");
        let range = DomRange::new(Boundary::new(n[2], 4), Boundary::new(n[5], 2));
        doc.surround(&range, span).unwrap();

        assert_eq!(doc.text_content(span), "quick brown f");
        assert!(doc.contains(span, n[3]));
    }

    #[test]
    fn test_surround_rejects_partial_element() {
        let (mut doc, n) = sample();
        let span = doc.create_element("span");
        let range = DomRange::new(Boundary::new(n[2], 4), Boundary::new(n[4], 2));
        assert_eq!(doc.surround(&range, span), Err(WrapError::PartialElement));
        assert_eq!(doc.text_content(n[1]), "The quick brown fox");
    }

    #[test]
    fn test_surround_rejects_bad_offsets() {
        let (mut doc, n) = sample();
        let span = doc.create_element("span");
        assert_eq!(
            doc.surround(&DomRange::within(n[2], 4, 40), span),
            Err(WrapError::InvalidBoundary)
        );
        assert_eq!(
            doc.surround(&DomRange::within(n[2], 6, 2), span),
            Err(WrapError::Reversed)
        );
    }

    #[test]
    fn test_unwrap_restores_text() {
        let (mut doc, n) = sample();
        let span = doc.create_element("span");
        doc.surround(&DomRange::within(n[2], 4, 9), span).unwrap();

        assert!(doc.unwrap(span));
        assert_eq!(doc.children(n[1])[0], n[2]);
        assert_eq!(doc.text(n[2]), Some("The quick "));
        assert!(!doc.unwrap(span));
    }

    #[test]
    fn test_intersects_node() {
        let (doc, n) = sample();
        let inside_b = DomRange::new(Boundary::new(n[2], 4), Boundary::new(n[5], 2));
        assert!(doc.intersects_node(&inside_b, n[3]));
        assert!(!doc.intersects_node(&inside_b, n[6]));
    }
}
