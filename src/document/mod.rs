//! Host document model.
//!
//! An arena of elements standing in for the rendered outline view. Elements
//! are addressed by [`ElementId`]; ids stay valid for the life of the
//! document even when an element is detached. Every insertion is recorded so
//! the host can hand the tree engine a [`MutationBatch`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Handle to an element in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(usize);

impl ElementId {
    /// Returns the raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A batch of structural changes, in the order they happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    pub added_nodes: Vec<ElementId>,
}

impl MutationBatch {
    pub fn new(added_nodes: Vec<ElementId>) -> Self {
        Self { added_nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.added_nodes.is_empty()
    }
}

/// A single element.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub hidden: bool,
    children: Vec<ElementId>,
    parent: Option<ElementId>,
}

impl Element {
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Tags rendered on the same outline line as their parent.
const INLINE_TAGS: &[&str] = &["a", "button", "span"];

/// The host document.
#[derive(Debug, Clone)]
pub struct Document {
    elements: Vec<Element>,
    root: ElementId,
    pending: Vec<ElementId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a document with an empty `body` root.
    pub fn new() -> Self {
        Self {
            elements: vec![Element {
                tag: "body".to_string(),
                ..Element::default()
            }],
            root: ElementId(0),
            pending: Vec::new(),
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: &str) -> ElementId {
        let id = ElementId(self.elements.len());
        self.elements.push(Element {
            tag: tag.to_string(),
            ..Element::default()
        });
        id
    }

    pub fn get(&self, id: ElementId) -> Result<&Element, AppError> {
        self.elements
            .get(id.0)
            .ok_or(AppError::ElementNotFound(id.0))
    }

    pub fn get_mut(&mut self, id: ElementId) -> Result<&mut Element, AppError> {
        self.elements
            .get_mut(id.0)
            .ok_or(AppError::ElementNotFound(id.0))
    }

    /// Appends `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), AppError> {
        self.insert_child(parent, child, None)
    }

    /// Inserts `child` as the first child of `parent`, detaching it first.
    pub fn prepend_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), AppError> {
        self.insert_child(parent, child, Some(0))
    }

    fn insert_child(
        &mut self,
        parent: ElementId,
        child: ElementId,
        position: Option<usize>,
    ) -> Result<(), AppError> {
        self.get(parent)?;
        self.detach(child)?;

        let siblings = &mut self.get_mut(parent)?.children;
        let index = position.map_or(siblings.len(), |i| i.min(siblings.len()));
        siblings.insert(index, child);
        self.get_mut(child)?.parent = Some(parent);
        self.pending.push(child);
        Ok(())
    }

    /// Removes an element from its parent. Its own subtree stays intact.
    pub fn detach(&mut self, id: ElementId) -> Result<(), AppError> {
        if let Some(parent) = self.get(id)?.parent {
            self.get_mut(parent)?.children.retain(|c| *c != id);
            self.get_mut(id)?.parent = None;
        }
        Ok(())
    }

    /// Replaces the element's content with plain text, detaching its children.
    pub fn replace_text(&mut self, id: ElementId, text: &str) -> Result<(), AppError> {
        let children = std::mem::take(&mut self.get_mut(id)?.children);
        for child in children {
            self.get_mut(child)?.parent = None;
        }
        self.get_mut(id)?.text = text.to_string();
        Ok(())
    }

    pub fn set_text(&mut self, id: ElementId, text: &str) -> Result<(), AppError> {
        self.get_mut(id)?.text = text.to_string();
        Ok(())
    }

    pub fn text(&self, id: ElementId) -> Result<&str, AppError> {
        Ok(&self.get(id)?.text)
    }

    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) -> Result<(), AppError> {
        self.get_mut(id)?
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn attribute(&self, id: ElementId, name: &str) -> Option<&str> {
        self.elements
            .get(id.0)
            .and_then(|e| e.attributes.get(name))
            .map(String::as_str)
    }

    pub fn remove_attribute(&mut self, id: ElementId, name: &str) -> Result<Option<String>, AppError> {
        Ok(self.get_mut(id)?.attributes.remove(name))
    }

    pub fn add_class(&mut self, id: ElementId, class: &str) -> Result<(), AppError> {
        let element = self.get_mut(id)?;
        if !element.has_class(class) {
            element.classes.push(class.to_string());
        }
        Ok(())
    }

    pub fn set_hidden(&mut self, id: ElementId, hidden: bool) -> Result<(), AppError> {
        self.get_mut(id)?.hidden = hidden;
        Ok(())
    }

    /// True if neither the element nor any ancestor is hidden.
    pub fn is_visible(&self, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(cursor) = current {
            match self.elements.get(cursor.0) {
                Some(element) if !element.hidden => current = element.parent,
                _ => return false,
            }
        }
        true
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.elements
            .get(id.0)
            .map(|e| e.children.as_slice())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.elements.get(id.0).and_then(|e| e.parent)
    }

    /// The element and all of its descendants, in document order.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if self.elements.get(current.0).is_none() {
                continue;
            }
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// Elements in the subtree of `id` (inclusive) carrying `attribute`.
    pub fn query_attribute(&self, id: ElementId, attribute: &str) -> Vec<ElementId> {
        self.descendants(id)
            .into_iter()
            .filter(|e| self.attribute(*e, attribute).is_some())
            .collect()
    }

    /// Elements in the subtree of `id` (inclusive) carrying `class`.
    pub fn query_class(&self, id: ElementId, class: &str) -> Vec<ElementId> {
        self.descendants(id)
            .into_iter()
            .filter(|e| self.elements[e.0].has_class(class))
            .collect()
    }

    /// Sibling-index path from the topmost ancestor; sorting by it yields
    /// document order.
    pub fn position(&self, id: ElementId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let index = self
                .children(parent)
                .iter()
                .position(|c| *c == current)
                .unwrap_or_default();
            path.push(index);
            current = parent;
        }
        path.push(current.0);
        path.reverse();
        path
    }

    /// Drains the insertions recorded since the last call.
    pub fn take_mutations(&mut self) -> MutationBatch {
        MutationBatch::new(std::mem::take(&mut self.pending))
    }

    /// Renders visible content as an indented outline, one block per line.
    ///
    /// Inline children (links, buttons) share their parent's line; buttons
    /// render as `[label]`.
    pub fn render_outline(&self, id: ElementId) -> String {
        let mut out = String::new();
        self.render_into(id, 0, &mut out);
        out
    }

    fn render_into(&self, id: ElementId, depth: usize, out: &mut String) {
        let Some(element) = self.elements.get(id.0) else {
            return;
        };
        if element.hidden {
            return;
        }

        let mut parts: Vec<String> = Vec::new();
        let mut blocks = Vec::new();
        for child in &element.children {
            let Some(child_element) = self.elements.get(child.0) else {
                continue;
            };
            if child_element.hidden {
                continue;
            }
            if INLINE_TAGS.contains(&child_element.tag.as_str()) {
                parts.push(self.inline_text(child_element));
            } else {
                blocks.push(*child);
            }
        }
        if !element.text.is_empty() {
            parts.push(element.text.clone());
        }

        let child_depth = if parts.is_empty() {
            depth
        } else {
            out.push_str(&"  ".repeat(depth));
            out.push_str(&parts.join(" "));
            out.push('\n');
            depth + 1
        };

        for block in blocks {
            self.render_into(block, child_depth, out);
        }
    }

    fn inline_text(&self, element: &Element) -> String {
        if element.tag == "button" {
            format!("[{}]", element.text)
        } else {
            element.text.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_records_mutation() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.append_child(doc.root(), div).unwrap();

        assert_eq!(doc.take_mutations().added_nodes, vec![div]);
        assert!(doc.take_mutations().is_empty());
    }

    #[test]
    fn test_prepend_and_reparent() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let root = doc.root();
        doc.append_child(root, a).unwrap();
        doc.prepend_child(root, b).unwrap();
        assert_eq!(doc.children(root), &[b, a]);

        doc.append_child(a, b).unwrap();
        assert_eq!(doc.children(root), &[a]);
        assert_eq!(doc.parent(b), Some(a));
    }

    #[test]
    fn test_query_attribute_in_document_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        let sibling = doc.create_element("div");
        doc.append_child(root, outer).unwrap();
        doc.append_child(outer, inner).unwrap();
        doc.append_child(root, sibling).unwrap();
        for id in [outer, inner, sibling] {
            doc.set_attribute(id, "data-x", "1").unwrap();
        }

        assert_eq!(doc.query_attribute(root, "data-x"), vec![outer, inner, sibling]);
        assert!(doc.position(inner) < doc.position(sibling));
    }

    #[test]
    fn test_visibility_inherits_from_ancestors() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(doc.root(), outer).unwrap();
        doc.append_child(outer, inner).unwrap();

        doc.set_hidden(outer, true).unwrap();
        assert!(!doc.is_visible(inner));
        doc.set_hidden(outer, false).unwrap();
        assert!(doc.is_visible(inner));
    }

    #[test]
    fn test_replace_text_detaches_children() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let child = doc.create_element("span");
        doc.append_child(div, child).unwrap();

        doc.replace_text(div, "hello").unwrap();
        assert!(doc.children(div).is_empty());
        assert_eq!(doc.parent(child), None);
        assert_eq!(doc.text(div).unwrap(), "hello");
    }

    #[test]
    fn test_render_outline() {
        let mut doc = Document::new();
        let root = doc.root();
        let tree = doc.create_element("div");
        doc.set_text(tree, "Title").unwrap();
        let button = doc.create_element("button");
        doc.set_text(button, "-").unwrap();
        let node = doc.create_element("div");
        let link = doc.create_element("a");
        doc.set_text(link, "Apple").unwrap();

        doc.append_child(root, tree).unwrap();
        doc.prepend_child(tree, button).unwrap();
        doc.append_child(tree, node).unwrap();
        doc.append_child(node, link).unwrap();

        assert_eq!(doc.render_outline(root), "[-] Title\n  Apple\n");

        doc.set_hidden(node, true).unwrap();
        assert_eq!(doc.render_outline(root), "[-] Title\n");
    }

    #[test]
    fn test_missing_element() {
        let doc = Document::new();
        assert!(matches!(
            doc.get(ElementId(42)),
            Err(AppError::ElementNotFound(42))
        ));
    }
}
