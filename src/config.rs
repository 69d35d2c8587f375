//! Configuration for the catalog service core.
//!
//! Plain structs with defaults; every section can be overridden from a TOML
//! file. Missing sections and fields fall back to defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::enrich::EnrichConfig;
use crate::error::{LibraryError, LibraryResult};
use crate::llm::OllamaConfig;
use crate::rec::RecommenderConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Data directory for catalog persistence. `None` for memory-only mode.
    pub data_dir: Option<PathBuf>,
    /// Recommendation tuning.
    pub recommend: RecommenderConfig,
    /// Enrichment retry policy.
    pub enrich: EnrichConfig,
    /// Ollama capability endpoint.
    pub ollama: OllamaConfig,
}

impl LibraryConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> LibraryResult<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| LibraryError::InvalidConfig {
            message: format!("read {}: {e}", path.display()),
        })?;
        toml::from_str(&data).map_err(|e| LibraryError::InvalidConfig {
            message: format!("parse {}: {e}", path.display()),
        })
    }
}
