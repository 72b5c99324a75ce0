pub mod cli;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use cli::{Cli, Commands};
pub use error::{EmbeddingError, PipelineError};
pub use models::{Config, ContentUnit, EmbedOutcome, ProcessingError, VectorRecord};
pub use services::{ResultStreamer, VectorizationClient, stream_outcomes, stream_vectors};
