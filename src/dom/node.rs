//! Arena-backed document tree
//!
//! A small mutable tree of element and text nodes with the handful of
//! operations the highlighter needs: insertion, removal, text splitting and
//! normalization. Removed nodes stay in the arena and are simply detached.

use super::range::DomRange;

/// Handle to a node inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Payload of a node
#[derive(Debug, Clone)]
pub enum NodeData {
    Element(ElementData),
    Text(String),
}

/// Element tag and attributes (insertion order preserved)
#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Tag used for the synthetic document root
pub const DOCUMENT_TAG: &str = "#document";

/// A mutable document tree plus the current native selection
///
/// Detached nodes are never reclaimed, so a `NodeId` stays valid for the life
/// of the document and a handle held elsewhere (a queued cue, a stored range)
/// never aliases a newer node. Every repaint adds a few split and span nodes;
/// after a long session, [`Document::compact`] copies the live tree into a
/// fresh arena.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    selection: Option<DomRange>,
}

impl Document {
    /// Create an empty document containing only the synthetic root
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            selection: None,
        };
        doc.root = doc.push(NodeData::Element(ElementData {
            tag: DOCUMENT_TAG.to_string(),
            attributes: Vec::new(),
        }));
        doc
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Arena size, detached nodes included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Copy the tree reachable from the root into a fresh document. Returns
    /// the copy and the new id of `node`, or `None` if `node` is detached.
    /// The selection is not carried over.
    pub fn compact(&self, node: NodeId) -> Option<(Document, NodeId)> {
        let mut copy = Document::new();
        let root = copy.root();
        let mut mapped = None;
        for &child in self.children(self.root) {
            let new_child = self.copy_into(&mut copy, child, node, &mut mapped);
            copy.append_child(root, new_child);
        }
        if node == self.root {
            mapped = Some(root);
        }
        mapped.map(|id| (copy, id))
    }

    fn copy_into(
        &self,
        copy: &mut Document,
        source: NodeId,
        wanted: NodeId,
        mapped: &mut Option<NodeId>,
    ) -> NodeId {
        let id = copy.push(self.data(source).clone());
        if source == wanted {
            *mapped = Some(id);
        }
        for &child in self.children(source) {
            let new_child = self.copy_into(copy, child, wanted, mapped);
            copy.append_child(id, new_child);
        }
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        }))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.0].data
    }

    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(self.nodes[node.0].data, NodeData::Text(_))
    }

    /// Lowercase tag name, `None` for text nodes
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element(el) => Some(el.tag.as_str()),
            NodeData::Text(_) => None,
        }
    }

    /// Text of a text node, `None` for elements
    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => Some(text.as_str()),
            NodeData::Element(_) => None,
        }
    }

    /// Replace the content of a text node. No-op on elements.
    pub fn set_text(&mut self, node: NodeId, value: &str) {
        if let NodeData::Text(text) = &mut self.nodes[node.0].data {
            *text = value.to_string();
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element(el) => el
                .attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let NodeData::Element(el) = &mut self.nodes[node.0].data {
            match el.attributes.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => el.attributes.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let NodeData::Element(el) = &mut self.nodes[node.0].data {
            el.attributes.retain(|(key, _)| key != name);
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn index_in_parent(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&c| c == node)
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let index = self.index_in_parent(node)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Length in DOM terms: chars for text, child count for elements
    pub fn node_length(&self, node: NodeId) -> usize {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => text.chars().count(),
            NodeData::Element(_) => self.nodes[node.0].children.len(),
        }
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element(_) => {
                for &child in &self.nodes[node.0].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Detach `node` from its parent, if any
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` before `reference`, or append when `reference` is `None`
    /// or not a child of `parent`
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        self.detach(child);
        let index = reference
            .and_then(|r| self.nodes[parent.0].children.iter().position(|&c| c == r))
            .unwrap_or(self.nodes[parent.0].children.len());
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index, child);
    }

    /// Split a text node at a char offset; the original keeps the head and the
    /// returned node (inserted right after it) holds the tail
    pub fn split_text(&mut self, node: NodeId, offset: usize) -> Option<NodeId> {
        let text = self.text(node)?.to_string();
        let byte = char_to_byte(&text, offset)?;
        let (head, tail) = text.split_at(byte);
        let tail = tail.to_string();
        self.set_text(node, head);
        let tail_node = self.create_text(&tail);
        if let Some(parent) = self.parent(node) {
            let reference = self.next_sibling(node);
            self.insert_before(parent, tail_node, reference);
        }
        Some(tail_node)
    }

    /// Merge adjacent text nodes and drop empty ones below `node`
    pub fn normalize(&mut self, node: NodeId) {
        let children = self.children(node).to_vec();
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());
        for child in children {
            if let Some(text) = self.text(child).map(str::to_string) {
                if text.is_empty() {
                    self.nodes[child.0].parent = None;
                    continue;
                }
                if let Some(&last) = kept.last() {
                    if let NodeData::Text(previous) = &mut self.nodes[last.0].data {
                        previous.push_str(&text);
                        self.nodes[child.0].parent = None;
                        continue;
                    }
                }
                kept.push(child);
            } else {
                self.normalize(child);
                kept.push(child);
            }
        }
        self.nodes[node.0].children = kept;
    }

    /// The current native selection, like `window.getSelection().getRangeAt(0)`
    pub fn selection(&self) -> Option<DomRange> {
        self.selection
    }

    pub fn set_selection(&mut self, range: DomRange) {
        self.selection = Some(range);
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte index of the `offset`-th char, allowing `offset == len`
pub(crate) fn char_to_byte(text: &str, offset: usize) -> Option<usize> {
    if offset == 0 {
        return Some(0);
    }
    let mut indices = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len()));
    indices.nth(offset)
}
