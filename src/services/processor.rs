//! Maps batches of content units through a vectorization provider.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{EmbeddingError, PipelineError};
use crate::models::{
    Batch, ContentUnit, EmbedOutcome, EmbeddingStage, Payload, ProcessingError, VectorRecord,
};
use crate::services::embedding::VectorizationClient;

/// Work executed for every batch submitted to the task pool.
#[async_trait]
pub trait BatchHandler: Send + Sync + 'static {
    type Output: Send + 'static;

    async fn handle(&self, batch: Batch) -> Result<Vec<Self::Output>, PipelineError>;
}

/// Vectorizes batches with a single provider call each.
#[derive(Clone)]
pub struct BatchProcessor {
    client: Arc<dyn VectorizationClient>,
    stage: EmbeddingStage,
}

impl BatchProcessor {
    pub fn new(client: Arc<dyn VectorizationClient>, stage: EmbeddingStage) -> Self {
        Self { client, stage }
    }

    /// Vectorizes a whole batch. Any failure discards the batch's results.
    pub async fn process(&self, batch: Batch) -> Result<Vec<VectorRecord>, PipelineError> {
        let seq = batch.seq();
        let mut units = batch.into_units();
        let texts = units
            .iter_mut()
            .map(take_text)
            .collect::<Result<Vec<_>, _>>()?;

        let vectors = self.client.get_vectors(&texts, self.stage).await?;
        let vectors = check_count(vectors, units.len())?;
        debug!(batch = seq, records = units.len(), "batch vectorized");

        Ok(units
            .into_iter()
            .zip(texts)
            .zip(vectors)
            .map(|((unit, text), vector)| VectorRecord::from_unit(unit, text, vector))
            .collect())
    }

    /// Vectorizes one unit, capturing any failure instead of propagating it.
    pub async fn process_one(&self, mut unit: ContentUnit) -> EmbedOutcome {
        let Ok(text) = take_text(&mut unit) else {
            warn!(unit = %unit.id, document = %unit.document_id, "skipping non-text payload");
            return EmbedOutcome::Failed(ProcessingError::for_unit(
                &unit,
                "payload is binary, expected text",
            ));
        };

        let texts = [text];
        let result = self
            .client
            .get_vectors(&texts, self.stage)
            .await
            .and_then(|vectors| check_count(vectors, 1));

        match result {
            Ok(mut vectors) => {
                let [text] = texts;
                let vector = vectors.pop().unwrap_or_default();
                EmbedOutcome::Record(VectorRecord::from_unit(unit, text, vector))
            }
            Err(e) => {
                warn!(unit = %unit.id, document = %unit.document_id, error = %e, "unit failed");
                EmbedOutcome::Failed(ProcessingError::for_unit(&unit, e.to_string()))
            }
        }
    }
}

#[async_trait]
impl BatchHandler for BatchProcessor {
    type Output = VectorRecord;

    async fn handle(&self, batch: Batch) -> Result<Vec<VectorRecord>, PipelineError> {
        self.process(batch).await
    }
}

/// Vectorizes each unit of a batch independently, so failures stay per unit.
#[derive(Clone)]
pub struct PerItemProcessor {
    inner: BatchProcessor,
}

impl PerItemProcessor {
    pub fn new(inner: BatchProcessor) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl BatchHandler for PerItemProcessor {
    type Output = EmbedOutcome;

    async fn handle(&self, batch: Batch) -> Result<Vec<EmbedOutcome>, PipelineError> {
        let mut outcomes = Vec::with_capacity(batch.len());
        for unit in batch.into_units() {
            outcomes.push(self.inner.process_one(unit).await);
        }
        Ok(outcomes)
    }
}

/// Moves the text out of `unit`; the unit's payload is left empty.
fn take_text(unit: &mut ContentUnit) -> Result<String, PipelineError> {
    match &mut unit.payload {
        Payload::Text(text) => Ok(std::mem::take(text)),
        Payload::Binary(_) => Err(PipelineError::NonTextPayload {
            unit_id: unit.id.clone(),
            document_id: unit.document_id.clone(),
        }),
    }
}

fn check_count(vectors: Vec<Vec<f32>>, expected: usize) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if vectors.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: vectors.len(),
        });
    }
    Ok(vectors)
}
