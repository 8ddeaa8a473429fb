//! Client-side toolkit for an extractor service: manage extractors, run
//! extractions against text or files, and turn the loosely-typed results
//! into a rectangular table.
//!
//! ```rust
//! use extract_view::project;
//! use serde_json::json;
//!
//! let records = vec![json!({"name": "Alice", "age": 30}), json!({"name": "Bob"})];
//! let table = project(&records);
//!
//! assert_eq!(table.columns, vec!["name", "age"]);
//! assert_eq!(table.rows, vec![vec!["Alice", "30"], vec!["Bob", ""]]);
//! ```

pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{FileKeyStore, LocalStorage, TomlConfig};

pub use core::{
    client::ExtractorClient,
    engine::{ExtractionEngine, RunReport},
    identity::{ensure_api_key, ApiKey},
    pipeline::{ExtractionPipeline, OutputSettings},
    projector::{discover_columns, format_value, project, project_row},
    render::OutputFormat,
};
pub use domain::model::{ExtractionRequest, ExtractionResponse, TableProjection};
pub use utils::error::{ExtractError, Result};
