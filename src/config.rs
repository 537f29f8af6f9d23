//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/pagetree/config.toml` (XDG) or platform config dir
//! 2. Project config: `.pagetree.toml`
//! 3. Environment variables: `PAGETREE_*`, sections split on `__`
//!    (e.g. `PAGETREE_TREE__MAX_DEPTH=8`)
//!
//! Every field has a default, so an empty configuration is valid:
//!
//! ```toml
//! [tree]
//! max_depth = 16
//! max_siblings = 16
//! title_from = "Tree from {prop}:"
//! title_to = "Tree to {prop}:"
//!
//! [glyphs]
//! expanded = "-"
//! collapsed = "+"
//! deferred = "…"
//! leaf = " "
//! empty = "Ø"
//!
//! [store]
//! path = "graph.json"
//! ```

use std::ops::Deref;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::tree::Direction;

/// Placeholder in tree titles replaced by the relation property name.
pub const TITLE_PROP_PLACEHOLDER: &str = "{prop}";

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub glyphs: Glyphs,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Bounds and labels for tree construction.
///
/// The bounds only throttle automatic pre-expansion. A user activating a
/// deferred node always gets a fresh `max_depth` budget below it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Depth budget handed to the root list and to every manual expansion.
    pub max_depth: u32,
    /// Nodes with more children than this are never pre-expanded.
    pub max_siblings: usize,
    /// Title for `from` trees; `{prop}` is replaced by the relation name.
    pub title_from: String,
    /// Title for `to` trees.
    pub title_to: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 16,
            max_siblings: 16,
            title_from: "Tree from {prop}:".to_string(),
            title_to: "Tree to {prop}:".to_string(),
        }
    }
}

impl TreeConfig {
    /// Returns the placeholder title for a tree over `relation`.
    pub fn title(&self, direction: Direction, relation: &str) -> String {
        let template = match direction {
            Direction::From => &self.title_from,
            Direction::To => &self.title_to,
        };
        template.replace(TITLE_PROP_PLACEHOLDER, relation)
    }
}

/// Labels shown on tree controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Glyphs {
    pub expanded: String,
    pub collapsed: String,
    pub deferred: String,
    pub leaf: String,
    /// Root control label when a tree has no roots at all.
    pub empty: String,
}

impl Default for Glyphs {
    fn default() -> Self {
        Self {
            expanded: "-".to_string(),
            collapsed: "+".to_string(),
            deferred: "…".to_string(),
            leaf: " ".to_string(),
            empty: "Ø".to_string(),
        }
    }
}

/// Graph store location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON graph export loaded into the in-memory store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load config with layered resolution (defaults → user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        let user_config = Self::user_config_path();

        Self::figment(user_config, ".pagetree.toml")
            .extract()
            .map_err(ConfigError::from)
    }

    /// Builds the layered provider chain without extracting it.
    pub fn figment(user_config: impl Into<PathBuf>, project_config: impl Into<PathBuf>) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(user_config.into()))
            // Layer 2: Project config
            .merge(Toml::file(project_config.into()))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed("PAGETREE_").split("__"))
    }

    /// User config path: ~/.config/pagetree/config.toml (XDG) or platform config dir.
    fn user_config_path() -> PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("pagetree").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        // Fall back to platform-specific config dir
        dirs::config_dir()
            .map(|p| p.join("pagetree").join("config.toml"))
            .unwrap_or_default()
    }
}
