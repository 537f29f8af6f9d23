//! Core trait for graph store access.
//!
//! Backends implement [`QueryExecutor`]. The store is read-only from this
//! crate's point of view, so there is no write or transaction surface.

use async_trait::async_trait;

use crate::error::AppError;
use crate::graph::row::RowStream;

/// Executes Datalog queries against a graph store.
///
/// This is the core trait that all graph backends must implement.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Executes a Datalog query and returns a stream of result tuples.
    ///
    /// # Arguments
    ///
    /// * `datalog` - The query string, e.g. `[:find (pull ?p [*]) :where ...]`
    ///
    /// # Errors
    ///
    /// A query that matches nothing returns an empty stream, not an error.
    /// Malformed queries and an unreachable store are errors.
    async fn execute_query(&self, datalog: &str) -> Result<RowStream<'_>, AppError>;
}

#[async_trait]
impl<T: QueryExecutor + ?Sized> QueryExecutor for std::sync::Arc<T> {
    async fn execute_query(&self, datalog: &str) -> Result<RowStream<'_>, AppError> {
        (**self).execute_query(datalog).await
    }
}
