//! Bounded set of in-flight batch tasks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::{Id, JoinError, JoinSet};
use tracing::{Instrument, Span, debug, warn};

use crate::error::PipelineError;
use crate::models::Batch;
use crate::services::processor::BatchHandler;

/// Bookkeeping for a batch the pool currently owns.
#[derive(Debug, Clone)]
pub struct PendingTask {
    pub batch_seq: u64,
    pub units: usize,
    pub submitted_at: Instant,
}

/// Outcome of [`TaskPool::shutdown`].
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Tasks that reached a terminal state during shutdown.
    pub settled: usize,
    /// Errors collected from those tasks instead of being propagated.
    pub errors: Vec<String>,
}

type TaskResult<T> = Result<Vec<T>, PipelineError>;

/// Runs at most `limit` batch tasks at a time.
///
/// The pool never waits for capacity on its own: callers check [`TaskPool::is_full`]
/// and call [`TaskPool::await_any`] before submitting more work. Dropping the pool
/// aborts whatever is still running.
pub struct TaskPool<T> {
    limit: usize,
    tasks: JoinSet<TaskResult<T>>,
    pending: HashMap<Id, PendingTask>,
    /// Failure settled behind successful siblings, returned by the next wait.
    failed: Option<PipelineError>,
    span: Span,
}

impl<T: Send + 'static> TaskPool<T> {
    pub fn new(limit: usize) -> Result<Self, PipelineError> {
        if limit < 1 {
            return Err(PipelineError::InvalidConfig(format!(
                "concurrency limit must be at least 1, got {limit}"
            )));
        }
        Ok(Self {
            limit,
            tasks: JoinSet::new(),
            pending: HashMap::new(),
            failed: None,
            span: Span::current(),
        })
    }

    /// Attach batch tasks and pool events to `span`.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.pending.len() >= self.limit
    }

    /// True when a settled failure is waiting to be returned by [`TaskPool::await_any`].
    pub fn has_failed(&self) -> bool {
        self.failed.is_some()
    }

    /// Tasks currently owned by the pool.
    pub fn pending(&self) -> impl Iterator<Item = &PendingTask> {
        self.pending.values()
    }

    /// Starts processing `batch` in the background without waiting for it.
    pub fn submit<H>(&mut self, handler: &Arc<H>, batch: Batch) -> Result<(), PipelineError>
    where
        H: BatchHandler<Output = T>,
    {
        if self.is_full() {
            return Err(PipelineError::PoolFull { limit: self.limit });
        }

        let ticket = PendingTask {
            batch_seq: batch.seq(),
            units: batch.len(),
            submitted_at: Instant::now(),
        };
        let handler = Arc::clone(handler);
        let span = self.span.clone();
        let handle = self
            .tasks
            .spawn(async move { handler.handle(batch).await }.instrument(span));

        let _enter = self.span.enter();
        debug!(
            batch = ticket.batch_seq,
            units = ticket.units,
            in_flight = self.pending.len() + 1,
            "batch submitted"
        );
        self.pending.insert(handle.id(), ticket);
        Ok(())
    }

    /// Waits for at least one task, then collects every task that has finished.
    ///
    /// Returns an empty list when nothing is in flight. Records of batches that
    /// finished before a failed one are returned first; the failure is held and
    /// returned by the next call without waiting. Tasks not yet collected stay
    /// in the pool.
    pub async fn await_any(&mut self) -> Result<Vec<T>, PipelineError> {
        if let Some(err) = self.failed.take() {
            return Err(err);
        }
        let Some(first) = self.tasks.join_next_with_id().await else {
            return Ok(Vec::new());
        };
        let mut items = self.settle(first)?;
        while let Some(joined) = self.tasks.try_join_next_with_id() {
            match self.settle(joined) {
                Ok(batch) => items.extend(batch),
                Err(err) => {
                    self.failed = Some(err);
                    break;
                }
            }
        }
        Ok(items)
    }

    /// Waits for every remaining task, in completion order.
    pub async fn drain_all(&mut self) -> Result<Vec<T>, PipelineError> {
        if let Some(err) = self.failed.take() {
            return Err(err);
        }
        let mut items = Vec::new();
        while let Some(joined) = self.tasks.join_next_with_id().await {
            items.extend(self.settle(joined)?);
        }
        Ok(items)
    }

    /// Waits for every remaining task, collecting failures rather than returning them.
    pub async fn shutdown(&mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        if let Some(err) = self.failed.take() {
            report.errors.push(err.to_string());
        }
        while let Some(joined) = self.tasks.join_next_with_id().await {
            report.settled += 1;
            if let Err(e) = self.settle(joined) {
                report.errors.push(e.to_string());
            }
        }

        let _enter = self.span.enter();
        for error in &report.errors {
            warn!(%error, "batch failed during shutdown");
        }
        debug!(settled = report.settled, "task pool shut down");
        report
    }

    fn settle(&mut self, joined: Result<(Id, TaskResult<T>), JoinError>) -> TaskResult<T> {
        let (id, result) = match joined {
            Ok((id, result)) => (id, result),
            Err(err) => (err.id(), Err(PipelineError::from(err))),
        };

        let _enter = self.span.enter();
        match self.pending.remove(&id) {
            Some(ticket) => debug!(
                batch = ticket.batch_seq,
                units = ticket.units,
                elapsed_ms = ticket.submitted_at.elapsed().as_millis() as u64,
                ok = result.is_ok(),
                "batch settled"
            ),
            None => warn!(task = %id, "settled task was not tracked"),
        }
        result
    }
}

impl<T> Drop for TaskPool<T> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            let _enter = self.span.enter();
            warn!(
                in_flight = self.pending.len(),
                "task pool dropped with batches in flight, aborting them"
            );
        }
    }
}
