//! Anchor Codec
//!
//! Turns a live range into a durable address (child-index path plus offset
//! for each end, relative to the annotatable container) and back.
//!
//! Paths are computed in the coordinates of the *stripped* container: the
//! highlighter's own spans are treated as if unwrapped and adjacent text is
//! treated as merged, which is exactly what the reconciler leaves behind
//! before it resolves anchors. An anchor captured while other highlights are
//! painted therefore still resolves on the next pass.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::config::MarkupConventions;
use crate::dom::{classify, Boundary, DocumentAdapter, DomRange, NodeId};

/// Serializable address of a range inside a container
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    pub start_container_path: Vec<usize>,
    pub start_offset: usize,
    pub end_container_path: Vec<usize>,
    pub end_offset: usize,
}

impl Anchor {
    /// Whether both anchors share at least one character. Anchors that only
    /// touch at a boundary do not overlap.
    ///
    /// Works purely on the stored coordinates, so it also covers highlights
    /// that are not painted yet.
    pub fn overlaps(&self, other: &Anchor) -> bool {
        let (start, end) = (self.start(), self.end());
        let (other_start, other_end) = (other.start(), other.end());
        compare(&end, &other_start) == Ordering::Greater
            && compare(&start, &other_end) == Ordering::Less
    }

    fn start(&self) -> (&[usize], usize) {
        (&self.start_container_path, self.start_offset)
    }

    fn end(&self) -> (&[usize], usize) {
        (&self.end_container_path, self.end_offset)
    }
}

/// Document order of two canonical points. A point is a node path plus an
/// offset into that node (child index for elements, char index for text).
fn compare(a: &(&[usize], usize), b: &(&[usize], usize)) -> Ordering {
    let ((path_a, offset_a), (path_b, offset_b)) = (a, b);
    if path_a == path_b {
        return offset_a.cmp(offset_b);
    }
    if path_b.starts_with(path_a) {
        // b sits inside child `path_b[len]` of a's node
        return if path_b[path_a.len()] < *offset_a {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if path_a.starts_with(path_b) {
        return if path_a[path_b.len()] < *offset_b {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }
    path_a.cmp(path_b)
}

/// Encode a range relative to `container`. `None` when either end lies
/// outside the container.
pub fn encode<D: DocumentAdapter + ?Sized>(
    doc: &D,
    range: &DomRange,
    container: NodeId,
    markup: &MarkupConventions,
) -> Option<Anchor> {
    let view = StrippedView {
        doc,
        container,
        markup,
    };
    let start = view.point(range.start)?;
    let end = view.point(range.end)?;
    Some(Anchor {
        start_container_path: start.path,
        start_offset: start.offset,
        end_container_path: end.path,
        end_offset: end.offset,
    })
}

/// Resolve an anchor against `container`. `None` when a path step is out of
/// bounds; offsets are not checked here.
pub fn decode<D: DocumentAdapter + ?Sized>(
    doc: &D,
    anchor: &Anchor,
    container: NodeId,
) -> Option<DomRange> {
    let start = doc.resolve_path(container, &anchor.start_container_path)?;
    let end = doc.resolve_path(container, &anchor.end_container_path)?;
    Some(DomRange::new(
        Boundary::new(start, anchor.start_offset),
        Boundary::new(end, anchor.end_offset),
    ))
}

struct Point {
    path: Vec<usize>,
    offset: usize,
}

/// A child of an element as seen after stripping
enum Item {
    /// Consecutive text nodes that normalize into one
    Run(Vec<NodeId>),
    Node(NodeId),
}

struct StrippedView<'a, D: ?Sized> {
    doc: &'a D,
    container: NodeId,
    markup: &'a MarkupConventions,
}

impl<D: DocumentAdapter + ?Sized> StrippedView<'_, D> {
    fn transparent(&self, node: NodeId) -> bool {
        node != self.container && classify(self.doc, node, self.markup).is_transparent()
    }

    fn items(&self, parent: NodeId) -> Vec<Item> {
        let mut items = Vec::new();
        self.flatten_into(parent, &mut items);
        items.retain(|item| match item {
            Item::Run(parts) => parts.iter().any(|&p| self.doc.node_length(p) > 0),
            Item::Node(_) => true,
        });
        items
    }

    fn flatten_into(&self, parent: NodeId, items: &mut Vec<Item>) {
        for &child in self.doc.children(parent) {
            if self.doc.is_text(child) {
                match items.last_mut() {
                    Some(Item::Run(parts)) => parts.push(child),
                    _ => items.push(Item::Run(vec![child])),
                }
            } else if self.transparent(child) {
                self.flatten_into(child, items);
            } else {
                items.push(Item::Node(child));
            }
        }
    }

    fn index_of_element(&self, parent: NodeId, element: NodeId) -> Option<usize> {
        self.items(parent)
            .iter()
            .position(|item| matches!(item, Item::Node(n) if *n == element))
    }

    /// Nearest ancestor that survives stripping
    fn parent(&self, node: NodeId) -> Option<NodeId> {
        if node == self.container {
            return None;
        }
        let mut current = self.doc.parent(node)?;
        while self.transparent(current) {
            current = self.doc.parent(current)?;
        }
        Some(current)
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.doc.parent(node)?;
        let siblings = self.doc.children(parent);
        let index = siblings.iter().position(|&c| c == node)?;
        siblings.get(index + 1).copied()
    }

    fn element_path(&self, element: NodeId) -> Option<Vec<usize>> {
        if element == self.container {
            return Some(Vec::new());
        }
        let parent = self.parent(element)?;
        let index = self.index_of_element(parent, element)?;
        let mut path = self.element_path(parent)?;
        path.push(index);
        Some(path)
    }

    fn point(&self, boundary: Boundary) -> Option<Point> {
        if !self.doc.contains(self.container, boundary.node) {
            return None;
        }
        if self.doc.is_text(boundary.node) {
            return self.text_point(boundary.node, boundary.offset);
        }
        match self.doc.children(boundary.node).get(boundary.offset) {
            Some(&child) => self.before(child),
            None if self.transparent(boundary.node) => self.after(boundary.node),
            None => self.end_of(boundary.node),
        }
    }

    fn text_point(&self, text: NodeId, offset: usize) -> Option<Point> {
        let parent = self.parent(text)?;
        for (index, item) in self.items(parent).iter().enumerate() {
            let Item::Run(parts) = item else {
                continue;
            };
            if let Some(position) = parts.iter().position(|&p| p == text) {
                let preceding: usize = parts[..position]
                    .iter()
                    .map(|&p| self.doc.node_length(p))
                    .sum();
                let mut path = self.element_path(parent)?;
                path.push(index);
                return Some(Point {
                    path,
                    offset: preceding + offset,
                });
            }
        }
        // Only empty text around here; it disappears on normalize
        self.after(text)
    }

    /// The point right before `node`
    fn before(&self, node: NodeId) -> Option<Point> {
        if self.doc.is_text(node) {
            if self.doc.node_length(node) == 0 {
                return self.after(node);
            }
            return self.text_point(node, 0);
        }
        if self.transparent(node) {
            return match self.doc.children(node).first() {
                Some(&first) => self.before(first),
                None => self.after(node),
            };
        }
        let parent = self.parent(node)?;
        Some(Point {
            path: self.element_path(parent)?,
            offset: self.index_of_element(parent, node)?,
        })
    }

    /// The point right after `node`
    fn after(&self, node: NodeId) -> Option<Point> {
        if node == self.container {
            return None;
        }
        if let Some(next) = self.next_sibling(node) {
            return self.before(next);
        }
        let parent = self.doc.parent(node)?;
        if self.transparent(parent) {
            return self.after(parent);
        }
        self.end_of(parent)
    }

    fn end_of(&self, element: NodeId) -> Option<Point> {
        Some(Point {
            path: self.element_path(element)?,
            offset: self.items(element).len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn conventions() -> MarkupConventions {
        MarkupConventions::default()
    }

    fn strip(doc: &mut Document, container: NodeId) {
        let markup = conventions();
        for node in doc.descendants(container) {
            if classify(doc, node, &markup).is_transparent() {
                doc.unwrap(node);
            }
        }
        doc.normalize(container);
    }

    #[test]
    fn test_round_trip_single_text_node() {
        let (doc, div) = Document::parse_fragment("<div><p>The quick brown fox</p></div>").unwrap();
        let text = doc.children(doc.children(div)[0])[0];
        let range = DomRange::within(text, 4, 9);

        let anchor = encode(&doc, &range, div, &conventions()).unwrap();
        assert_eq!(anchor.start_container_path, vec![0, 0]);
        assert_eq!(anchor.start_offset, 4);
        assert_eq!(anchor.end_offset, 9);

        let decoded = decode(&doc, &anchor, div).unwrap();
        assert_eq!(doc.range_text(&decoded), doc.range_text(&range));
        assert_eq!(doc.range_text(&decoded), "quick");
    }

    #[test]
    fn test_encode_ignores_painted_highlights() {
        let (mut doc, div) = Document::parse_fragment(
            r#"<div><p>The <span class="text-highlight">quick</span> brown fox</p></div>"#,
        )
        .unwrap();
        let p = doc.children(div)[0];
        let tail = doc.children(p)[2];
        assert_eq!(doc.text(tail), Some(" brown fox"));

        let anchor = encode(&doc, &DomRange::within(tail, 7, 10), div, &conventions()).unwrap();
        assert_eq!(anchor.start_container_path, vec![0, 0]);
        assert_eq!((anchor.start_offset, anchor.end_offset), (16, 19));

        strip(&mut doc, div);
        let decoded = decode(&doc, &anchor, div).unwrap();
        assert_eq!(doc.range_text(&decoded), "fox");
    }

    #[test]
    fn test_encode_inside_highlight_span() {
        let (doc, div) = Document::parse_fragment(
            r#"<div><p>The <span class="text-highlight">quick</span> brown fox</p></div>"#,
        )
        .unwrap();
        let p = doc.children(div)[0];
        let inner = doc.children(doc.children(p)[1])[0];

        let anchor = encode(&doc, &DomRange::within(inner, 1, 4), div, &conventions()).unwrap();
        assert_eq!(anchor.start_container_path, vec![0, 0]);
        assert_eq!((anchor.start_offset, anchor.end_offset), (5, 8));
    }

    #[test]
    fn test_encode_element_boundaries() {
        let (doc, div) = Document::parse_fragment("<div><p>a<b>bold</b>c</p></div>").unwrap();
        let p = doc.children(div)[0];
        let range = DomRange::new(Boundary::new(p, 1), Boundary::new(p, 2));

        let anchor = encode(&doc, &range, div, &conventions()).unwrap();
        assert_eq!(anchor.start_container_path, vec![0]);
        assert_eq!(anchor.start_offset, 1);
        assert_eq!(anchor.end_container_path, vec![0, 2]);
        assert_eq!(anchor.end_offset, 0);

        let decoded = decode(&doc, &anchor, div).unwrap();
        assert_eq!(doc.range_text(&decoded), "bold");
    }

    #[test]
    fn test_encode_outside_container() {
        let (mut doc, div) = Document::parse_fragment("<div><p>inside</p></div>").unwrap();
        let root = doc.root();
        let outside = doc.create_text("outside");
        doc.append_child(root, outside);

        let range = DomRange::within(outside, 0, 3);
        assert!(encode(&doc, &range, div, &conventions()).is_none());
    }

    fn span(path: &[usize], start: usize, end: usize) -> Anchor {
        Anchor {
            start_container_path: path.to_vec(),
            start_offset: start,
            end_container_path: path.to_vec(),
            end_offset: end,
        }
    }

    #[test]
    fn test_overlaps_within_one_text_node() {
        let quick = span(&[0, 0], 4, 9);
        assert!(quick.overlaps(&span(&[0, 0], 4, 15)));
        assert!(span(&[0, 0], 4, 15).overlaps(&quick));
        assert!(quick.overlaps(&span(&[0, 0], 6, 7)));

        // Touching ends are allowed
        assert!(!quick.overlaps(&span(&[0, 0], 9, 15)));
        assert!(!quick.overlaps(&span(&[0, 0], 0, 4)));
    }

    #[test]
    fn test_overlaps_across_paragraphs() {
        let first = span(&[0, 0], 0, 5);
        let second = span(&[1, 0], 0, 5);
        assert!(!first.overlaps(&second));

        let spanning = Anchor {
            start_container_path: vec![0, 0],
            start_offset: 3,
            end_container_path: vec![1, 0],
            end_offset: 2,
        };
        assert!(spanning.overlaps(&first));
        assert!(spanning.overlaps(&second));
        assert!(!spanning.overlaps(&span(&[2, 0], 0, 1)));
    }

    #[test]
    fn test_overlaps_with_element_boundaries() {
        // <p>a<b>bold</b>c</p>: [p,1]..[p,2] covers the <b> element
        let bold = Anchor {
            start_container_path: vec![0],
            start_offset: 1,
            end_container_path: vec![0],
            end_offset: 2,
        };
        assert!(bold.overlaps(&span(&[0, 1, 0], 1, 3)));
        assert!(!bold.overlaps(&span(&[0, 0], 0, 1)));
        assert!(!bold.overlaps(&span(&[0, 2], 0, 1)));
    }

    #[test]
    fn test_decode_out_of_bounds() {
        let (doc, div) = Document::parse_fragment("<div><p>only</p></div>").unwrap();
        let anchor = Anchor {
            start_container_path: vec![3, 0],
            start_offset: 0,
            end_container_path: vec![0, 0],
            end_offset: 2,
        };
        assert!(decode(&doc, &anchor, div).is_none());
    }
}
