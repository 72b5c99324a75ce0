//! Streams vectorization results in batch-completion order.

use std::sync::Arc;
use std::time::Instant;

use async_stream::stream;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, info, info_span, warn};

use crate::error::PipelineError;
use crate::models::{ContentUnit, EmbedOutcome, EmbeddingStage, VectorRecord};
use crate::services::accumulator::BatchAccumulator;
use crate::services::embedding::VectorizationClient;
use crate::services::pool::TaskPool;
use crate::services::processor::{BatchHandler, BatchProcessor, PerItemProcessor};

/// Feeds content units through a bounded pool of batch tasks.
///
/// A streamer is consumed by [`ResultStreamer::run`]; build a new one for each run.
pub struct ResultStreamer<H: BatchHandler> {
    handler: Arc<H>,
    accumulator: BatchAccumulator,
    pool: TaskPool<H::Output>,
    cancel: CancellationToken,
    span: Span,
}

impl<H: BatchHandler> ResultStreamer<H> {
    /// Fails before any work starts if `batch_size` or `concurrency_limit` is zero.
    pub fn new(
        handler: H,
        batch_size: usize,
        concurrency_limit: usize,
    ) -> Result<Self, PipelineError> {
        let span = info_span!("vectorize", batch_size, concurrency_limit);
        Ok(Self {
            handler: Arc::new(handler),
            accumulator: BatchAccumulator::new(batch_size)?,
            pool: TaskPool::new(concurrency_limit)?.with_span(span.clone()),
            cancel: CancellationToken::new(),
            span,
        })
    }

    /// Report through `span` instead of the default `vectorize` span.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.pool = self.pool.with_span(span.clone());
        self.span = span;
        self
    }

    /// Stop the run when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Consumes `input` one unit at a time and yields results as batches complete.
    ///
    /// Records within a batch keep their input order; batches are yielded in the
    /// order they finish. On failure or cancellation every submitted batch is
    /// awaited before the error is yielded, and the stream ends after it.
    ///
    /// Dropping the stream before it ends aborts the batches still in flight
    /// without waiting for them. Cancel through [`ResultStreamer::with_cancellation`]
    /// and keep polling when those batches must settle.
    pub fn run<S>(self, input: S) -> impl Stream<Item = Result<H::Output, PipelineError>> + Send
    where
        S: Stream<Item = ContentUnit> + Send + 'static,
    {
        let Self {
            handler,
            mut accumulator,
            mut pool,
            cancel,
            span,
        } = self;

        stream! {
            let mut input = std::pin::pin!(input);
            let started = Instant::now();
            let mut emitted = 0usize;
            let mut failure = None;
            info!(parent: &span, "vectorization run started");

            'feed: loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    unit = input.next() => Some(unit),
                };
                let Some(next) = next else {
                    failure = Some(PipelineError::Cancelled);
                    break 'feed;
                };

                let exhausted = next.is_none();
                let batch = match next {
                    Some(unit) => accumulator.add(unit),
                    None => accumulator.flush(),
                };
                let Some(batch) = batch else {
                    if exhausted {
                        break 'feed;
                    }
                    continue;
                };

                if let Err(e) = pool.submit(&handler, batch) {
                    failure = Some(e);
                    break 'feed;
                }

                // No more input is read while the pool is full.
                while pool.is_full() || pool.has_failed() {
                    match next_completed(&mut pool, &cancel).instrument(span.clone()).await {
                        Ok(items) => {
                            for item in items {
                                emitted += 1;
                                yield Ok(item);
                            }
                        }
                        Err(e) => {
                            failure = Some(e);
                            break 'feed;
                        }
                    }
                }

                if exhausted {
                    break 'feed;
                }
            }

            if failure.is_none() {
                while !pool.is_empty() || pool.has_failed() {
                    match next_completed(&mut pool, &cancel).instrument(span.clone()).await {
                        Ok(items) => {
                            for item in items {
                                emitted += 1;
                                yield Ok(item);
                            }
                        }
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
            }

            match failure {
                Some(err) => {
                    let report = pool.shutdown().instrument(span.clone()).await;
                    warn!(
                        parent: &span,
                        error = %err,
                        emitted,
                        settled = report.settled,
                        suppressed = report.errors.len(),
                        "vectorization run aborted"
                    );
                    yield Err(err);
                }
                None => {
                    info!(
                        parent: &span,
                        emitted,
                        batches = accumulator.batches_formed(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "vectorization run finished"
                    );
                }
            }
        }
    }
}

/// Vectorizes `units` in batches of `batch_size`, failing the stream on the first batch error.
///
/// The concurrency ceiling is read from `client` once, here.
pub fn stream_vectors(
    client: Arc<dyn VectorizationClient>,
    units: Vec<ContentUnit>,
    batch_size: usize,
    stage: EmbeddingStage,
) -> Result<impl Stream<Item = Result<VectorRecord, PipelineError>> + Send, PipelineError> {
    let limit = client.concurrency_limit();
    let streamer = ResultStreamer::new(BatchProcessor::new(client, stage), batch_size, limit)?;
    Ok(streamer.run(futures::stream::iter(units)))
}

/// Like [`stream_vectors`], but reports failures per unit instead of ending the stream.
pub fn stream_outcomes(
    client: Arc<dyn VectorizationClient>,
    units: Vec<ContentUnit>,
    batch_size: usize,
    stage: EmbeddingStage,
) -> Result<impl Stream<Item = Result<EmbedOutcome, PipelineError>> + Send, PipelineError> {
    let limit = client.concurrency_limit();
    let handler = PerItemProcessor::new(BatchProcessor::new(client, stage));
    let streamer = ResultStreamer::new(handler, batch_size, limit)?;
    Ok(streamer.run(futures::stream::iter(units)))
}

/// Waits for the next completed batch unless the run is cancelled first.
async fn next_completed<T: Send + 'static>(
    pool: &mut TaskPool<T>,
    cancel: &CancellationToken,
) -> Result<Vec<T>, PipelineError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        result = pool.await_any() => result,
    }
}
