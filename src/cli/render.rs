//! Render subcommand - mount a tree and print it.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;

use crate::config::Config;
use crate::context::Context;
use crate::document::Document;
use crate::session::Session;
use crate::tree::{Direction, ATTR_TREE_DIRECTION, ATTR_TREE_PROP};

/// Mount a tree over a graph export and print the resulting outline.
#[derive(Parser)]
pub struct RenderCommand {
    /// JSON graph export (overrides `[store] path`).
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    /// Relation property the tree follows.
    #[arg(short, long)]
    pub prop: String,

    /// Which side of the relation is the child.
    #[arg(short, long, value_enum, default_value_t = Direction::From)]
    pub direction: Direction,

    /// Activate the control of every node showing this page, in order.
    #[arg(short, long)]
    pub expand: Vec<String>,

    /// Override `[tree] max_depth`.
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Override `[tree] max_siblings`.
    #[arg(long)]
    pub max_siblings: Option<usize>,
}

impl RenderCommand {
    /// Run the render command.
    pub async fn run(self) -> Result<()> {
        let mut config = Config::load()?;
        if let Some(max_depth) = self.max_depth {
            config.tree.max_depth = max_depth;
        }
        if let Some(max_siblings) = self.max_siblings {
            config.tree.max_siblings = max_siblings;
        }

        let ctx = Context::from_config(config, self.store.as_deref())?;

        let mut document = Document::new();
        let placeholder = document.create_element("div");
        document.set_attribute(placeholder, ATTR_TREE_PROP, &self.prop)?;
        document.set_attribute(placeholder, ATTR_TREE_DIRECTION, self.direction.as_str())?;
        document.append_child(document.root(), placeholder)?;

        let mut session = Session::new(document, ctx.page_tree());
        let mounted = session.flush().await?;
        if mounted == 0 {
            return Err(color_eyre::eyre::eyre!(
                "Tree placeholder for '{}' was not mounted",
                self.prop
            ));
        }

        for page in &self.expand {
            let controls = session.tree.find_controls(&session.document, page);
            if controls.is_empty() {
                tracing::warn!(page = %page, "No tree node shows this page");
            }
            for control in controls {
                let state = session
                    .tree
                    .activate(&mut session.document, control)
                    .await?;
                tracing::debug!(page = %page, ?state, "Activated node");
            }
        }

        tracing::debug!(
            queries = session.tree.client().executor().query_count(),
            nodes = session.tree.node_count(),
            max_depth = session.tree.config().max_depth,
            max_siblings = session.tree.config().max_siblings,
            "Render complete"
        );
        print!("{}", session.document.render_outline(placeholder));
        Ok(())
    }
}
