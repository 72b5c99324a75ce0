mod accumulator;
mod embedding;
mod pool;
mod processor;
mod streamer;

#[cfg(test)]
pub(crate) mod test_support;

pub use accumulator::BatchAccumulator;
pub use embedding::{HealthResponse, HttpEmbeddingClient, VectorizationClient};
pub use pool::{PendingTask, ShutdownReport, TaskPool};
pub use processor::{BatchHandler, BatchProcessor, PerItemProcessor};
pub use streamer::{ResultStreamer, stream_outcomes, stream_vectors};
