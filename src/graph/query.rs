//! Query builder for running Datalog queries.

use futures::TryStreamExt;

use crate::error::AppError;
use crate::graph::row::{Row, RowStream};
use crate::graph::traits::QueryExecutor;

/// A pending Datalog query bound to an executor.
///
/// # Example
///
/// ```ignore
/// let rows = Query::new(&store, "[:find ?n :where [?p :block/name ?n]]")
///     .fetch_all()
///     .await?;
/// ```
pub struct Query<'a, E: QueryExecutor + ?Sized> {
    executor: &'a E,
    datalog: String,
}

impl<'a, E: QueryExecutor + ?Sized> Query<'a, E> {
    /// Creates a new query.
    pub fn new(executor: &'a E, datalog: &str) -> Self {
        Self {
            executor,
            datalog: datalog.to_string(),
        }
    }

    /// Returns the query text.
    pub fn text(&self) -> &str {
        &self.datalog
    }

    /// Executes the query and returns a stream of rows.
    pub async fn execute(self) -> Result<RowStream<'a>, AppError> {
        self.executor.execute_query(&self.datalog).await
    }

    /// Executes the query and collects all rows into a vector.
    pub async fn fetch_all(self) -> Result<Vec<Row>, AppError> {
        self.execute().await?.try_collect().await
    }

    /// Executes the query and returns the first row, if any.
    pub async fn fetch_one(self) -> Result<Option<Row>, AppError> {
        let mut stream = self.execute().await?;
        use futures::StreamExt;
        stream.next().await.transpose()
    }
}

/// Extension trait providing a convenient `query()` method.
///
/// Automatically implemented for all [`QueryExecutor`] types.
pub trait QueryExt: QueryExecutor {
    /// Creates a new query for this executor.
    fn query(&self, datalog: &str) -> Query<'_, Self>
    where
        Self: Sized,
    {
        Query::new(self, datalog)
    }
}

// Blanket implementation for all QueryExecutor types
impl<E: QueryExecutor> QueryExt for E {}
