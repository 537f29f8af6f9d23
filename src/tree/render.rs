//! Builds the elements that make up a tree node.

use crate::config::Glyphs;
use crate::document::{Document, ElementId};
use crate::error::AppError;

pub const CLASS_CONTROL: &str = "tree-button";
pub const CLASS_NODE: &str = "pagetree-node";
pub const CLASS_LINK: &str = "page-ref";
pub const CLASS_TREE: &str = "pagetree";

/// Attribute marking a control that ignores activation.
pub const ATTR_DISABLED: &str = "disabled";

/// Creates controls, links and node containers, and applies toggles.
///
/// Stateless apart from the glyph set; node state lives in the engine.
#[derive(Debug, Clone)]
pub struct TreeNodeRenderer {
    glyphs: Glyphs,
}

impl TreeNodeRenderer {
    pub fn new(glyphs: Glyphs) -> Self {
        Self { glyphs }
    }

    pub fn glyphs(&self) -> &Glyphs {
        &self.glyphs
    }

    /// Creates a `button.tree-button`.
    ///
    /// Non-interactive controls always show the leaf glyph.
    pub fn make_control(
        &self,
        doc: &mut Document,
        label: &str,
        interactive: bool,
    ) -> Result<ElementId, AppError> {
        let control = doc.create_element("button");
        doc.add_class(control, CLASS_CONTROL)?;
        if interactive {
            doc.set_text(control, label)?;
        } else {
            doc.set_text(control, &self.glyphs.leaf)?;
            doc.set_attribute(control, ATTR_DISABLED, "")?;
        }
        Ok(control)
    }

    /// Creates an `a.page-ref` pointing at the page route for `target_name`.
    pub fn make_link(
        &self,
        doc: &mut Document,
        target_name: &str,
        display_name: &str,
    ) -> Result<ElementId, AppError> {
        let link = doc.create_element("a");
        doc.add_class(link, CLASS_LINK)?;
        doc.set_attribute(link, "href", &page_href(target_name))?;
        doc.set_text(link, display_name)?;
        Ok(link)
    }

    /// Wraps a control and a link in a `div.pagetree-node`.
    pub fn make_node(
        &self,
        doc: &mut Document,
        control: ElementId,
        link: ElementId,
    ) -> Result<ElementId, AppError> {
        let node = doc.create_element("div");
        doc.add_class(node, CLASS_NODE)?;
        doc.append_child(node, control)?;
        doc.append_child(node, link)?;
        Ok(node)
    }

    /// Sets a control's label.
    pub fn set_label(&self, doc: &mut Document, control: ElementId, label: &str) -> Result<(), AppError> {
        doc.set_text(control, label)
    }

    /// Makes a control inert and shows the leaf glyph.
    pub fn make_inert(&self, doc: &mut Document, control: ElementId) -> Result<(), AppError> {
        doc.set_text(control, &self.glyphs.leaf)?;
        doc.set_attribute(control, ATTR_DISABLED, "")
    }

    /// Shows or hides the node children next to `control` and updates its
    /// label. Pure presentation; never queries.
    pub fn toggle(&self, doc: &mut Document, control: ElementId, open: bool) -> Result<(), AppError> {
        let label = if open {
            &self.glyphs.expanded
        } else {
            &self.glyphs.collapsed
        };
        doc.set_text(control, label)?;

        let Some(container) = doc.parent(control) else {
            return Ok(());
        };
        let siblings: Vec<ElementId> = doc
            .children(container)
            .iter()
            .copied()
            .filter(|child| {
                doc.get(*child)
                    .map(|e| e.has_class(CLASS_NODE))
                    .unwrap_or(false)
            })
            .collect();
        for sibling in siblings {
            doc.set_hidden(sibling, !open)?;
        }
        Ok(())
    }
}

/// Page route for a page name, percent-encoded as one path segment.
pub fn page_href(name: &str) -> String {
    format!("#/page/{}", urlencoding::encode(name))
}
