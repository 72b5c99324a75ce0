mod config;
mod content;
mod format;
mod record;

pub use config::{
    Config, DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_EMBEDDING_URL,
    EmbeddingConfig, EmbeddingStage, OutputConfig, PipelineConfig, ProcessingMode,
};
pub use content::{Batch, ContentUnit, Payload};
pub use format::OutputFormat;
pub use record::{EmbedOutcome, ProcessingError, VectorRecord};
