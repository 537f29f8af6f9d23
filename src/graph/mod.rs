//! Graph store abstraction.
//!
//! The tree engine talks to the store only through [`QueryExecutor`]: it
//! hands over a Datalog query string and receives result tuples. Backends
//! live under [`backends`].
//!
//! # Usage
//!
//! ```ignore
//! use pagetree::graph::QueryExt;
//!
//! let rows = store
//!     .query("[:find (pull ?p [*]) :where [?p :block/name \"apple\"]]")
//!     .fetch_all()
//!     .await?;
//! ```

mod query;
mod row;
mod traits;

pub mod backends;
pub mod datalog;

// Re-export core types
pub use query::{Query, QueryExt};
pub use row::{Row, RowStream};
pub use traits::QueryExecutor;
