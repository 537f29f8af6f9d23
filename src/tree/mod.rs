//! Lazy, bounded, bidirectional page trees.
//!
//! A [`PageTree`] owns the engine state for every tree mounted into a
//! [`Document`]: the query client, the configured bounds, the node renderer
//! and the state of each interactive control.
//!
//! ```text
//! placeholder ─mount─▶ roots query ─▶ fill (depth budget) ─▶ nodes
//!                                         │
//!                          click on "…" ──┘ (fresh budget)
//! ```

mod client;
mod filler;
mod observer;
mod query;
mod render;
mod state;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{Glyphs, TreeConfig};
use crate::document::{Document, ElementId};
use crate::error::AppError;
use crate::graph::QueryExecutor;
use crate::models::PageEntity;

pub use client::GraphQueryClient;
pub use query::{build_query, children_from, children_to, roots_from, roots_to, QueryKind};
pub use render::{page_href, TreeNodeRenderer, CLASS_CONTROL, CLASS_LINK, CLASS_NODE, CLASS_TREE};
pub use state::{Activation, NodeState};

/// Placeholder attribute naming the relation property. Removed once mounted.
pub const ATTR_TREE_PROP: &str = "data-treeprop";

/// Placeholder attribute holding `from` or `to`.
pub const ATTR_TREE_DIRECTION: &str = "data-treedirection";

/// Which side of a relation edge is treated as the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Children are pages whose relation lists the parent.
    From,
    /// Children are pages listed in the parent's relation.
    To,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::From => "from",
            Direction::To => "to",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "from" => Ok(Direction::From),
            "to" => Ok(Direction::To),
            other => Err(AppError::MalformedConfiguration(format!(
                "unknown tree direction '{}'",
                other
            ))),
        }
    }
}

/// Configuration shared by every node of one mounted tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeContext {
    pub direction: Direction,
    pub relation: String,
}

impl TreeContext {
    pub fn new(direction: Direction, relation: impl Into<String>) -> Self {
        Self {
            direction,
            relation: relation.into(),
        }
    }
}

/// What a control expands.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTarget {
    /// The root control of a mounted tree; toggles the top-level list.
    Placeholder,
    Page(PageEntity),
}

/// Engine-side record of one control.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub target: NodeTarget,
    pub context: Arc<TreeContext>,
    /// Element holding this node's children.
    pub container: ElementId,
    pub control: ElementId,
    pub link: Option<ElementId>,
    /// Budget this node was built with.
    pub depth_remaining: u32,
    pub state: NodeState,
}

impl TreeNode {
    /// True once this node's children have been queried.
    pub fn resolved(&self) -> bool {
        self.state.is_resolved()
    }

    pub fn page(&self) -> Option<&PageEntity> {
        match &self.target {
            NodeTarget::Page(page) => Some(page),
            NodeTarget::Placeholder => None,
        }
    }
}

/// Tree engine over a graph store.
pub struct PageTree<E> {
    client: GraphQueryClient<E>,
    config: TreeConfig,
    renderer: TreeNodeRenderer,
    nodes: HashMap<ElementId, TreeNode>,
}

impl<E: QueryExecutor> PageTree<E> {
    pub fn new(executor: E, config: TreeConfig, glyphs: Glyphs) -> Self {
        Self {
            client: GraphQueryClient::new(executor),
            config,
            renderer: TreeNodeRenderer::new(glyphs),
            nodes: HashMap::new(),
        }
    }

    pub fn client(&self) -> &GraphQueryClient<E> {
        &self.client
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Engine state for a control, if it belongs to a mounted tree.
    pub fn node(&self, control: ElementId) -> Option<&TreeNode> {
        self.nodes.get(&control)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Controls of every node showing `page_name`, in document order.
    ///
    /// Matching is case-insensitive, like page lookup in the store.
    pub fn find_controls(&self, doc: &Document, page_name: &str) -> Vec<ElementId> {
        let wanted = page_name.to_lowercase();
        let mut controls: Vec<ElementId> = self
            .nodes
            .values()
            .filter(|node| node.page().is_some_and(|page| page.name == wanted))
            .map(|node| node.control)
            .collect();
        controls.sort_by_key(|control| doc.position(*control));
        controls
    }

    /// Drops state for controls that are no longer attached under the root.
    pub fn prune(&mut self, doc: &Document) -> usize {
        let attached: std::collections::HashSet<ElementId> =
            doc.descendants(doc.root()).into_iter().collect();
        let before = self.nodes.len();
        self.nodes.retain(|control, _| attached.contains(control));
        before - self.nodes.len()
    }
}
