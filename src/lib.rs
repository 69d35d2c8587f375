//! # lumina
//!
//! Catalog service core: content-based recommendations over AI-enriched
//! text, plus the asynchronous enrichment pipeline that produces that text.
//!
//! ## Architecture
//!
//! - **Recommendation engine** (`rec`): TF-IDF vectorization, cosine
//!   ranking, profile building, and a popularity cold-start fallback
//! - **Enrichment pipeline** (`enrich`): queue/worker boundary calling the
//!   text capability with timeout, retries, and a dead-letter outcome
//! - **Text capability** (`llm`): Ollama client for summaries and sentiment
//! - **Catalog store** (`store`): in-memory records with JSON persistence
//! - **Facade** (`engine`): the operations a request surface calls into
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use lumina::config::LibraryConfig;
//! use lumina::engine::Library;
//! use lumina::llm::{OllamaClient, OllamaConfig};
//!
//! let capability = Arc::new(OllamaClient::new(OllamaConfig::default()));
//! let library = Library::new(LibraryConfig::default(), capability).unwrap();
//! let item = library.add_item("Dune", "Frank Herbert", "the spice must flow").unwrap();
//! let picks = library.recommendations(42);
//! # let _ = (item, picks);
//! ```

pub mod config;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod llm;
pub mod model;
pub mod rec;
pub mod store;
