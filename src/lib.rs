pub mod config;
pub mod constants;
pub mod error;
pub mod exporter;
pub mod fetcher;
pub mod files;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod rate_limiter;
pub mod roster;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{Result, ScraperError};
pub use exporter::Exporter;
pub use fetcher::{Fetcher, HttpFetcher};
pub use parser::ProfileParser;
pub use pipeline::{Pipeline, PipelineResult};
pub use store::PlayerStore;
pub use types::{ExportFormat, FieldKind, FieldSpec, FieldValue, PlayerRecord};
