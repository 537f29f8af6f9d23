//! Application context shared by CLI commands.

use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::graph::backends::memory::MemoryStore;
use crate::tree::PageTree;

/// Root application context.
#[derive(Clone)]
pub struct Context {
    /// Graph store loaded from the configured export.
    pub store: Arc<MemoryStore>,
    /// Application configuration.
    pub config: Arc<Config>,
}

impl Context {
    /// Creates a new context with the given dependencies.
    pub fn new(store: MemoryStore, config: Config) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }

    /// Loads the store named by `store_path`, falling back to `[store] path`.
    pub fn from_config(config: Config, store_path: Option<&Path>) -> Result<Self, AppError> {
        let path = store_path
            .map(Path::to_path_buf)
            .or_else(|| config.store.path.clone())
            .ok_or_else(|| {
                AppError::StoreUnavailable(
                    "no graph export given (use --store or [store] path)".to_string(),
                )
            })?;

        Ok(Self::new(MemoryStore::load(&path)?, config))
    }

    /// A fresh tree engine over the shared store.
    pub fn page_tree(&self) -> PageTree<Arc<MemoryStore>> {
        PageTree::new(
            Arc::clone(&self.store),
            self.config.tree.clone(),
            self.config.glyphs.clone(),
        )
    }
}
