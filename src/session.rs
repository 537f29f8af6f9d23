//! Host event loop driving a [`PageTree`] over one [`Document`].
//!
//! The host delivers [`HostEvent`]s in order over a channel. Each event is
//! handled to completion before the next is read, so a click's queries are
//! fully resolved before any later event observes the tree.

use tokio::sync::mpsc;

use crate::document::{Document, ElementId, MutationBatch};
use crate::error::AppError;
use crate::graph::QueryExecutor;
use crate::tree::{NodeState, PageTree};

/// Something that happened in the host view.
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// Elements were inserted into the document.
    Mutations(MutationBatch),
    /// A control was clicked.
    Activate(ElementId),
}

/// What handling an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Mounted(usize),
    Activated(Option<NodeState>),
}

/// A document together with the tree engine that decorates it.
pub struct Session<E> {
    pub document: Document,
    pub tree: PageTree<E>,
}

impl<E: QueryExecutor> Session<E> {
    pub fn new(document: Document, tree: PageTree<E>) -> Self {
        Self { document, tree }
    }

    /// Handles one event.
    pub async fn handle(&mut self, event: HostEvent) -> Result<Outcome, AppError> {
        match event {
            HostEvent::Mutations(batch) => {
                let mounted = self.tree.handle_mutations(&mut self.document, &batch).await?;
                let pruned = self.tree.prune(&self.document);
                if pruned > 0 {
                    tracing::debug!(pruned, "Dropped state for detached controls");
                }
                Ok(Outcome::Mounted(mounted))
            }
            HostEvent::Activate(control) => {
                let state = self.tree.activate(&mut self.document, control).await?;
                Ok(Outcome::Activated(state))
            }
        }
    }

    /// Feeds the document's own pending insertions back through the engine
    /// until none remain. Returns the number of trees mounted.
    pub async fn flush(&mut self) -> Result<usize, AppError> {
        let mut mounted = 0;
        loop {
            let batch = self.document.take_mutations();
            if batch.is_empty() {
                return Ok(mounted);
            }
            if let Outcome::Mounted(count) = self.handle(HostEvent::Mutations(batch)).await? {
                mounted += count;
            }
        }
    }

    /// Processes events until the channel closes, then returns the session.
    ///
    /// Errors are logged and do not stop the loop.
    pub async fn run(mut self, mut events: mpsc::Receiver<HostEvent>) -> Self {
        tracing::debug!("Session started");
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle(event).await {
                tracing::error!(error = %e, "Failed to handle host event");
            }
            // Insertions made by the tree itself never contain placeholders,
            // but the host may have added some alongside.
            if let Err(e) = self.flush().await {
                tracing::error!(error = %e, "Failed to flush document mutations");
            }
        }
        tracing::debug!("Session closed");
        self
    }
}
