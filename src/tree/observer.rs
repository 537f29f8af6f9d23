//! Discovery and mounting of tree placeholders.

use std::sync::Arc;

use crate::document::{Document, ElementId, MutationBatch};
use crate::error::AppError;
use crate::graph::QueryExecutor;

use super::query::QueryKind;
use super::render::CLASS_TREE;
use super::state::NodeState;
use super::{Direction, NodeTarget, PageTree, TreeContext, TreeNode, ATTR_TREE_DIRECTION, ATTR_TREE_PROP};

impl<E: QueryExecutor> PageTree<E> {
    /// Reacts to a batch of structural mutations.
    ///
    /// Any non-empty batch triggers a scan of the attached document for
    /// placeholders still carrying [`ATTR_TREE_PROP`]. They are mounted in
    /// document order. Malformed placeholders are logged and left untouched
    /// so a later batch can retry them.
    ///
    /// Returns the number of trees mounted.
    pub async fn handle_mutations(
        &mut self,
        doc: &mut Document,
        batch: &MutationBatch,
    ) -> Result<usize, AppError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let placeholders = doc.query_attribute(doc.root(), ATTR_TREE_PROP);
        tracing::debug!(
            added = batch.added_nodes.len(),
            placeholders = placeholders.len(),
            "Scanning for tree placeholders"
        );

        let mut mounted = 0;
        for placeholder in placeholders {
            match self.mount(doc, placeholder).await {
                Ok(_) => mounted += 1,
                Err(AppError::MalformedConfiguration(reason)) => {
                    tracing::warn!(%placeholder, %reason, "Skipping malformed tree placeholder");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(mounted)
    }

    /// Builds a tree inside `placeholder` and returns its root control.
    ///
    /// The relation attribute is consumed before any query runs, so a
    /// placeholder is mounted at most once. Root query failures render an
    /// empty tree.
    pub async fn mount(
        &mut self,
        doc: &mut Document,
        placeholder: ElementId,
    ) -> Result<ElementId, AppError> {
        let ctx = Arc::new(read_placeholder(doc, placeholder)?);
        doc.remove_attribute(placeholder, ATTR_TREE_PROP)?;

        let roots = match self
            .client
            .run_query(ctx.direction, QueryKind::Roots, &ctx.relation)
            .await
        {
            Ok(roots) => roots,
            Err(e) => {
                tracing::warn!(
                    relation = %ctx.relation,
                    direction = %ctx.direction,
                    error = %e,
                    "Root query failed, rendering empty tree"
                );
                Vec::new()
            }
        };

        let title = self.config.title(ctx.direction, &ctx.relation);
        doc.replace_text(placeholder, &title)?;
        doc.add_class(placeholder, CLASS_TREE)?;

        let (control, state) = if roots.is_empty() {
            let control = self.renderer.make_control(doc, "", false)?;
            self.renderer
                .set_label(doc, control, &self.renderer.glyphs().empty)?;
            (control, NodeState::Leaf)
        } else {
            let state = NodeState::ExpandedEager { open: true };
            let label = state.glyph(self.renderer.glyphs()).to_string();
            (self.renderer.make_control(doc, &label, true)?, state)
        };
        doc.prepend_child(placeholder, control)?;

        let max_depth = self.config.max_depth;
        self.nodes.insert(
            control,
            TreeNode {
                target: NodeTarget::Placeholder,
                context: Arc::clone(&ctx),
                container: placeholder,
                control,
                link: None,
                depth_remaining: max_depth,
                state,
            },
        );

        tracing::info!(
            relation = %ctx.relation,
            direction = %ctx.direction,
            roots = roots.len(),
            "Mounting page tree"
        );
        self.fill(doc, placeholder, ctx, roots, max_depth).await?;
        Ok(control)
    }
}

/// Reads relation and direction from a placeholder without consuming them.
fn read_placeholder(doc: &Document, placeholder: ElementId) -> Result<TreeContext, AppError> {
    let relation = match doc.attribute(placeholder, ATTR_TREE_PROP) {
        Some(relation) if !relation.trim().is_empty() => relation.trim().to_string(),
        Some(_) => {
            return Err(AppError::MalformedConfiguration(format!(
                "empty {} attribute",
                ATTR_TREE_PROP
            )))
        }
        None => {
            return Err(AppError::MalformedConfiguration(format!(
                "missing {} attribute",
                ATTR_TREE_PROP
            )))
        }
    };
    let direction: Direction = doc
        .attribute(placeholder, ATTR_TREE_DIRECTION)
        .ok_or_else(|| {
            AppError::MalformedConfiguration(format!("missing {} attribute", ATTR_TREE_DIRECTION))
        })?
        .parse()?;

    Ok(TreeContext::new(direction, relation))
}
