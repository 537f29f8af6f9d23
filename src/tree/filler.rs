//! Recursive, bounded expansion of tree nodes.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::document::{Document, ElementId};
use crate::error::AppError;
use crate::graph::QueryExecutor;
use crate::models::PageEntity;

use super::query::QueryKind;
use super::state::{Activation, NodeState};
use super::{NodeTarget, PageTree, TreeContext, TreeNode};

impl<E: QueryExecutor> PageTree<E> {
    /// Materializes `children` under `container`.
    ///
    /// Every child's own children are queried up front. A child is expanded
    /// eagerly while `depth_budget > 1` and it has at most `max_siblings`
    /// children; otherwise it gets a deferred control, or an inert one when
    /// it has no children at all. Nodes are appended once their subtree is
    /// complete.
    pub fn fill<'a>(
        &'a mut self,
        doc: &'a mut Document,
        container: ElementId,
        ctx: Arc<TreeContext>,
        children: Vec<PageEntity>,
        depth_budget: u32,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        async move {
            for child in children {
                let grandchildren = self.resolve_children(&ctx, &child.original_name).await;
                let small = depth_budget > 1 && grandchildren.len() <= self.config.max_siblings;
                let state = NodeState::initial(grandchildren.len(), small);

                let label = state.glyph(self.renderer.glyphs()).to_string();
                let control =
                    self.renderer
                        .make_control(doc, &label, state != NodeState::Leaf)?;
                let link = self
                    .renderer
                    .make_link(doc, &child.name, &child.original_name)?;
                let node = self.renderer.make_node(doc, control, link)?;

                tracing::trace!(
                    page = %child.original_name,
                    children = grandchildren.len(),
                    depth_budget,
                    ?state,
                    "Built tree node"
                );

                self.nodes.insert(
                    control,
                    TreeNode {
                        target: NodeTarget::Page(child),
                        context: Arc::clone(&ctx),
                        container: node,
                        control,
                        link: Some(link),
                        depth_remaining: depth_budget,
                        state,
                    },
                );

                if let NodeState::ExpandedEager { .. } = state {
                    self.fill(doc, node, Arc::clone(&ctx), grandchildren, depth_budget - 1)
                        .await?;
                }
                doc.append_child(container, node)?;
            }
            Ok(())
        }
        .boxed()
    }

    /// Queries the children of `parent`, treating a store failure as none.
    async fn resolve_children(&self, ctx: &TreeContext, parent: &str) -> Vec<PageEntity> {
        match self
            .client
            .run_query(ctx.direction, QueryKind::Children { parent }, &ctx.relation)
            .await
        {
            Ok(children) => children,
            Err(e) => {
                tracing::warn!(
                    parent,
                    relation = %ctx.relation,
                    error = %e,
                    "Child query failed, rendering node as a leaf"
                );
                Vec::new()
            }
        }
    }

    /// Handles a click on `control`.
    ///
    /// Deferred nodes query their children once, build them with a fresh
    /// `max_depth` budget and open. Expanded nodes toggle visibility without
    /// querying. Leaves and unknown elements are ignored.
    ///
    /// Returns the node's state after the click, or `None` if `control` is
    /// not a tree control.
    pub async fn activate(
        &mut self,
        doc: &mut Document,
        control: ElementId,
    ) -> Result<Option<NodeState>, AppError> {
        let Some(node) = self.nodes.get_mut(&control) else {
            tracing::debug!(%control, "Activation on unknown control ignored");
            return Ok(None);
        };

        match node.state.activation() {
            Activation::Inert => Ok(Some(node.state)),
            Activation::Toggle => {
                let open = node.state.toggle().unwrap_or(true);
                let state = node.state;
                self.renderer.toggle(doc, control, open)?;
                tracing::debug!(%control, open, "Toggled tree node");
                Ok(Some(state))
            }
            Activation::Resolve => {
                let Some(parent) = node.page().map(|p| p.original_name.clone()) else {
                    return Ok(Some(node.state));
                };
                node.state.begin_expansion();
                let ctx = Arc::clone(&node.context);
                let container = node.container;
                let label = node.state.glyph(self.renderer.glyphs()).to_string();
                self.renderer.set_label(doc, control, &label)?;

                let children = self.resolve_children(&ctx, &parent).await;
                let has_children = !children.is_empty();
                let max_depth = self.config.max_depth;
                let filled = self.fill(doc, container, ctx, children, max_depth).await;

                let Some(node) = self.nodes.get_mut(&control) else {
                    return filled.map(|_| None);
                };
                node.state.finish_expansion(has_children);
                node.depth_remaining = max_depth;
                let state = node.state;

                if has_children {
                    self.renderer
                        .set_label(doc, control, &self.renderer.glyphs().expanded)?;
                } else {
                    self.renderer.make_inert(doc, control)?;
                }
                tracing::debug!(page = %parent, ?state, "Resolved deferred tree node");

                filled.map(|_| Some(state))
            }
        }
    }
}
