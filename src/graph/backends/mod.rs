//! Backend implementations for graph stores.
//!
//! Each backend implements [`QueryExecutor`](crate::graph::QueryExecutor).
//!
//! # Available Backends
//!
//! | Backend | Module | Status |
//! |---------|--------|--------|
//! | In-memory outliner store | [`memory`] | Available |
//!
//! # Implementing a Backend
//!
//! 1. Create a store struct
//! 2. Implement `QueryExecutor::execute_query`, returning an empty stream
//!    for queries that match nothing
//! 3. Report an unreachable store as `AppError::StoreUnavailable`

pub mod memory;
