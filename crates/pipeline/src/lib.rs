//! Reading ingestion and threshold evaluation.
//!
//! Persistence sits behind the traits in [`store`] so the evaluator and both
//! ingestion paths run against PostgreSQL in production and in-memory stores
//! in tests.

pub mod error;
pub mod evaluator;
pub mod ingestion;
pub mod live;
pub mod store;

pub use error::{EvaluationError, PipelineError, StoreError};
pub use evaluator::{Evaluation, ThresholdEvaluator};
pub use ingestion::{ImportRequest, ImportResult, IngestionPipeline, DEFAULT_CHUNK_SIZE};
pub use live::{LiveIngestor, LiveOutcome};
