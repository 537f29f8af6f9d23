//! Query subcommand - show the query behind a tree level.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;

use crate::config::Config;
use crate::context::Context;
use crate::tree::{build_query, Direction, QueryKind};

/// Print the query for the roots of a tree, or for one parent's children.
#[derive(Parser)]
pub struct QueryCommand {
    /// Relation property the tree follows.
    #[arg(short, long)]
    pub prop: String,

    /// Which side of the relation is the child.
    #[arg(short, long, value_enum, default_value_t = Direction::From)]
    pub direction: Direction,

    /// Parent page; omit for the roots query.
    #[arg(long)]
    pub parent: Option<String>,

    /// Also run the query against this JSON graph export.
    #[arg(short, long)]
    pub store: Option<PathBuf>,
}

impl QueryCommand {
    fn kind(&self) -> QueryKind<'_> {
        match &self.parent {
            Some(parent) => QueryKind::Children {
                parent: parent.as_str(),
            },
            None => QueryKind::Roots,
        }
    }

    /// Run the query command.
    pub async fn run(self) -> Result<()> {
        println!("{}", build_query(self.direction, self.kind(), &self.prop));

        let Some(store) = &self.store else {
            return Ok(());
        };
        let ctx = Context::from_config(Config::load()?, Some(store))?;
        let tree = ctx.page_tree();
        let pages = tree
            .client()
            .run_query(self.direction, self.kind(), &self.prop)
            .await?;

        println!();
        for page in &pages {
            println!("{}", page.original_name);
        }
        tracing::info!(count = pages.len(), "Query complete");
        Ok(())
    }
}
