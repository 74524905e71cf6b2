pub mod config;
pub mod export;
pub mod extractor;
pub mod model;
pub mod observation_source;
pub mod session;
pub mod sql_generator;

pub use extractor::DataExtractor;
pub use model::{ExtractionResult, MetricConfig, Observation, SqlGenerationOptions};
