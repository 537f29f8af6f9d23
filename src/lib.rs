//! pagetree - lazy, bounded relation trees over an outliner graph store
//!
//! Pages relate to each other through multi-valued properties. A tree
//! placeholder in a host [`document::Document`] names a relation property and
//! a direction; the [`tree::PageTree`] engine discovers the roots, expands
//! small subtrees eagerly and defers the rest to user activation.

pub mod cli;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod graph;
pub mod models;
pub mod session;
pub mod tree;
