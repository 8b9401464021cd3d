//! Document Adapter
//!
//! The seam between the highlighting algorithms and whatever hosts the text.
//! Anchoring, validation and reconciliation only talk to a document through
//! this trait; [`Document`] is the in-memory implementation.

use std::cmp::Ordering;

use super::node::{Document, NodeId};
use super::range::{Boundary, DomRange, WrapError};

/// Element to create around a range: tag plus attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanMark {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

impl SpanMark {
    pub fn span() -> Self {
        Self {
            tag: "span".to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.push((name.to_string(), value.into()));
        self
    }
}

pub trait DocumentAdapter {
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> &[NodeId];

    /// Lowercase tag, `None` for text nodes
    fn tag(&self, node: NodeId) -> Option<&str>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    /// Chars for text nodes, child count for elements
    fn node_length(&self, node: NodeId) -> usize;

    fn text_content(&self, node: NodeId) -> String;

    fn compare_points(&self, a: Boundary, b: Boundary) -> Option<Ordering>;

    fn range_text(&self, range: &DomRange) -> String;

    /// Merge adjacent text nodes below `node`
    fn normalize(&mut self, node: NodeId);

    /// The live user selection, if any
    fn selection(&self) -> Option<DomRange>;

    fn clear_selection(&mut self);

    /// Wrap the range in a new element built from `mark`
    fn wrap_range(&mut self, range: &DomRange, mark: &SpanMark) -> Result<NodeId, WrapError>;

    /// Replace a wrapper element by its contents; `false` if it was detached
    fn unwrap_span(&mut self, span: NodeId) -> bool;

    fn is_text(&self, node: NodeId) -> bool {
        self.tag(node).is_none()
    }

    /// Whether the whitespace-separated `class` attribute lists `class`
    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|value| value.split_whitespace().any(|c| c == class))
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let mut current = Some(a);
        while let Some(candidate) = current {
            if self.contains(candidate, b) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    /// Descendants in document order, excluding `node`
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Whether part of `node` lies strictly inside the range
    fn intersects_node(&self, range: &DomRange, node: NodeId) -> bool {
        let Some(parent) = self.parent(node) else {
            return true;
        };
        let Some(index) = self.children(parent).iter().position(|&c| c == node) else {
            return false;
        };
        self.compare_points(Boundary::new(parent, index), range.end) == Some(Ordering::Less)
            && self.compare_points(Boundary::new(parent, index + 1), range.start)
                == Some(Ordering::Greater)
    }

    /// Follow child indices down from `container`; `None` as soon as an
    /// index is out of bounds
    fn resolve_path(&self, container: NodeId, path: &[usize]) -> Option<NodeId> {
        let mut current = container;
        for &index in path {
            current = *self.children(current).get(index)?;
        }
        Some(current)
    }
}

impl DocumentAdapter for Document {
    fn parent(&self, node: NodeId) -> Option<NodeId> {
        Document::parent(self, node)
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        Document::children(self, node)
    }

    fn tag(&self, node: NodeId) -> Option<&str> {
        Document::tag(self, node)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        Document::attribute(self, node, name)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        Document::set_attribute(self, node, name, value)
    }

    fn node_length(&self, node: NodeId) -> usize {
        Document::node_length(self, node)
    }

    fn text_content(&self, node: NodeId) -> String {
        Document::text_content(self, node)
    }

    fn compare_points(&self, a: Boundary, b: Boundary) -> Option<Ordering> {
        Document::compare_points(self, a, b)
    }

    fn range_text(&self, range: &DomRange) -> String {
        Document::range_text(self, range)
    }

    fn normalize(&mut self, node: NodeId) {
        Document::normalize(self, node)
    }

    fn selection(&self) -> Option<DomRange> {
        Document::selection(self)
    }

    fn clear_selection(&mut self) {
        Document::clear_selection(self)
    }

    fn wrap_range(&mut self, range: &DomRange, mark: &SpanMark) -> Result<NodeId, WrapError> {
        let wrapper = self.create_element(&mark.tag);
        for (name, value) in &mark.attributes {
            Document::set_attribute(self, wrapper, name, value);
        }
        self.surround(range, wrapper)
    }

    fn unwrap_span(&mut self, span: NodeId) -> bool {
        self.unwrap(span)
    }

    fn is_text(&self, node: NodeId) -> bool {
        Document::is_text(self, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_path() {
        let (doc, div) =
            Document::parse_fragment("<div><p>one</p><p>two <i>three</i></p></div>").unwrap();

        let node = DocumentAdapter::resolve_path(&doc, div, &[1, 1, 0]).unwrap();
        assert_eq!(doc.text(node), Some("three"));
        assert!(DocumentAdapter::resolve_path(&doc, div, &[2]).is_none());
        assert!(DocumentAdapter::resolve_path(&doc, div, &[0, 0, 0]).is_none());
        assert_eq!(DocumentAdapter::resolve_path(&doc, div, &[]), Some(div));
    }

    #[test]
    fn test_wrap_range_applies_mark() {
        let (mut doc, p) = Document::parse_fragment("<p>The quick brown fox</p>").unwrap();
        let text = doc.children(p)[0];
        let mark = SpanMark::span()
            .with_attribute("class", "text-highlight")
            .with_attribute("data-highlight-id", "h1");

        let span = doc.wrap_range(&DomRange::within(text, 4, 9), &mark).unwrap();

        assert_eq!(doc.tag(span), Some("span"));
        assert_eq!(doc.attribute(span, "data-highlight-id"), Some("h1"));
        assert_eq!(
            doc.to_html(p),
            r#"<p>The <span class="text-highlight" data-highlight-id="h1">quick</span> brown fox</p>"#
        );

        assert!(doc.unwrap_span(span));
        assert_eq!(doc.to_html(p), "<p>The quick brown fox</p>");
        assert_eq!(doc.children(p).len(), 1);
    }

    #[test]
    fn test_tree_queries() {
        let (doc, div) = Document::parse_fragment(
            r#"<div><p class="note text-highlighted">one</p><p>two <i>three</i></p></div>"#,
        )
        .unwrap();
        let first = doc.children(div)[0];
        let second = doc.children(div)[1];
        let italic = doc.children(second)[1];
        let three = doc.children(italic)[0];

        assert!(doc.has_class(first, "note"));
        assert!(doc.has_class(first, "text-highlighted"));
        assert!(!doc.has_class(first, "text-highlight"));
        assert!(!doc.has_class(three, "note"));

        assert!(doc.contains(div, three));
        assert!(doc.contains(three, three));
        assert!(!doc.contains(first, three));
        assert_eq!(doc.common_ancestor(three, first), Some(div));

        let texts: Vec<String> = doc
            .descendants(div)
            .into_iter()
            .filter(|&n| doc.is_text(n))
            .filter_map(|n| doc.text(n).map(str::to_string))
            .collect();
        assert_eq!(texts, vec!["one", "two ", "three"]);
    }
}
