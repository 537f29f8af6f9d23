//! Runs tree queries and shapes their results into sorted page lists.

use std::collections::HashSet;

use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::graph::{Query, QueryExecutor};
use crate::models::PageEntity;

use super::query::{build_query, QueryKind};
use super::Direction;

/// Executes tree queries against a graph store.
///
/// Results are flattened, validated into [`PageEntity`] records, deduplicated
/// by name and sorted by display name. Nothing is cached.
#[derive(Debug, Clone)]
pub struct GraphQueryClient<E> {
    executor: E,
}

impl<E: QueryExecutor> GraphQueryClient<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Returns the underlying executor.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Runs the query for `direction`/`kind` over `relation`.
    ///
    /// # Errors
    ///
    /// Any store failure is reported as [`AppError::StoreUnavailable`].
    /// Records without a usable name are skipped with a warning.
    pub async fn run_query(
        &self,
        direction: Direction,
        kind: QueryKind<'_>,
        relation: &str,
    ) -> Result<Vec<PageEntity>, AppError> {
        let datalog = build_query(direction, kind, relation);
        tracing::debug!(%direction, ?kind, relation, "Running tree query");

        let rows = Query::new(&self.executor, &datalog)
            .fetch_all()
            .await
            .map_err(|e| match e {
                AppError::StoreUnavailable(_) => e,
                other => AppError::StoreUnavailable(other.to_string()),
            })?;

        let mut records = Vec::new();
        for row in rows {
            for value in row.into_inner() {
                flatten_into(value, &mut records);
            }
        }

        let mut seen = HashSet::new();
        let mut pages = Vec::with_capacity(records.len());
        for record in records {
            match PageEntity::from_record(record) {
                Ok(page) => {
                    if seen.insert(page.name.clone()) {
                        pages.push(page);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Skipping malformed page record"),
            }
        }

        pages.sort_by(|a, b| a.display_order(b));
        tracing::debug!(count = pages.len(), "Tree query resolved");
        Ok(pages)
    }
}

/// Unwraps nested groupings down to individual records.
fn flatten_into(value: JsonValue, out: &mut Vec<JsonValue>) {
    match value {
        JsonValue::Array(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        record => out.push(record),
    }
}
