//! Markup loading
//!
//! Builds a [`Document`] subtree from a well-formed XHTML fragment, the shape
//! transcripts and feedback panels are rendered in.

use super::node::{Document, NodeId};
use crate::error::Result;

impl Document {
    /// Parse a fragment into a fresh document, returning it with the
    /// fragment's root element
    pub fn parse_fragment(markup: &str) -> Result<(Self, NodeId)> {
        let mut doc = Self::new();
        let root = doc.root();
        let element = doc.load_fragment(root, markup)?;
        Ok((doc, element))
    }

    /// Parse a fragment and append it under `parent`
    pub fn load_fragment(&mut self, parent: NodeId, markup: &str) -> Result<NodeId> {
        let source = roxmltree::Document::parse(markup)?;
        let element = self.import(source.root_element());
        self.append_child(parent, element);
        Ok(element)
    }

    fn import(&mut self, source: roxmltree::Node<'_, '_>) -> NodeId {
        let element = self.create_element(source.tag_name().name());
        for attr in source.attributes() {
            self.set_attribute(element, attr.name(), attr.value());
        }

        for child in source.children() {
            if child.is_element() {
                let node = self.import(child);
                self.append_child(element, node);
            } else if child.is_text() {
                if let Some(text) = child.text() {
                    let node = self.create_text(text);
                    self.append_child(element, node);
                }
            }
        }
        element
    }
}
