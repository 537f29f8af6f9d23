//! Expansion state of a tree node.

use crate::config::Glyphs;

/// Where a node is in its expansion lifecycle.
///
/// ```text
/// Leaf                                   (terminal)
/// Collapsed --activate--> Expanding --resolved--> ExpandedDeferred
/// ExpandedEager                          (reached at construction)
/// ```
///
/// Both expanded states toggle `open` without re-querying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Leaf,
    Collapsed,
    Expanding,
    ExpandedEager { open: bool },
    ExpandedDeferred { open: bool },
}

/// What activating a control should do, given its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Nothing to do (leaf, or a resolution already in flight).
    Inert,
    /// Query and materialize the children, then open.
    Resolve,
    /// Flip visibility of the existing children.
    Toggle,
}

impl NodeState {
    /// Initial state for a node with `child_count` children.
    ///
    /// `small` is true when the remaining depth budget and the sibling
    /// ceiling both allow eager pre-expansion.
    pub fn initial(child_count: usize, small: bool) -> Self {
        match (child_count, small) {
            (0, _) => NodeState::Leaf,
            (_, true) => NodeState::ExpandedEager { open: true },
            (_, false) => NodeState::Collapsed,
        }
    }

    /// True once the node's children have been queried.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, NodeState::Collapsed | NodeState::Expanding)
    }

    pub fn is_open(&self) -> bool {
        matches!(
            self,
            NodeState::ExpandedEager { open: true } | NodeState::ExpandedDeferred { open: true }
        )
    }

    pub fn activation(&self) -> Activation {
        match self {
            NodeState::Leaf | NodeState::Expanding => Activation::Inert,
            NodeState::Collapsed => Activation::Resolve,
            NodeState::ExpandedEager { .. } | NodeState::ExpandedDeferred { .. } => {
                Activation::Toggle
            }
        }
    }

    /// `Collapsed` → `Expanding`. Returns false from any other state.
    pub fn begin_expansion(&mut self) -> bool {
        if *self == NodeState::Collapsed {
            *self = NodeState::Expanding;
            true
        } else {
            false
        }
    }

    /// `Expanding` → `ExpandedDeferred`, or `Leaf` when the resolution came
    /// back empty.
    pub fn finish_expansion(&mut self, has_children: bool) {
        if *self == NodeState::Expanding {
            *self = if has_children {
                NodeState::ExpandedDeferred { open: true }
            } else {
                NodeState::Leaf
            };
        }
    }

    /// Flips `open` on an expanded node and returns the new value.
    pub fn toggle(&mut self) -> Option<bool> {
        match self {
            NodeState::ExpandedEager { open } | NodeState::ExpandedDeferred { open } => {
                *open = !*open;
                Some(*open)
            }
            _ => None,
        }
    }

    /// Label shown on the node's control.
    pub fn glyph<'g>(&self, glyphs: &'g Glyphs) -> &'g str {
        match self {
            NodeState::Leaf => &glyphs.leaf,
            NodeState::Collapsed | NodeState::Expanding => &glyphs.deferred,
            NodeState::ExpandedEager { open } | NodeState::ExpandedDeferred { open } => {
                if *open {
                    &glyphs.expanded
                } else {
                    &glyphs.collapsed
                }
            }
        }
    }
}
