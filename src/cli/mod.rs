//! CLI module for pagetree.
//!
//! Subcommands:
//! - `render`: Build a tree from a graph export and print it as an outline
//! - `query`: Print (and optionally run) the query behind a tree level

mod query;
mod render;

use clap::{Parser, Subcommand};

pub use query::QueryCommand;
pub use render::RenderCommand;

/// pagetree - lazy relation trees over an outliner graph
#[derive(Parser)]
#[command(name = "pagetree")]
#[command(about = "Render bounded, lazily expanded relation trees from a page graph")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Mount a tree over a graph export and print the resulting outline
    Render(RenderCommand),

    /// Print the query for a tree level
    Query(QueryCommand),
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> color_eyre::Result<()> {
        match self.command {
            Command::Render(cmd) => cmd.run().await,
            Command::Query(cmd) => cmd.run().await,
        }
    }
}
