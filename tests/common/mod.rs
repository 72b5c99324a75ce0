use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use vstream::EmbeddingError;
use vstream::models::{ContentUnit, EmbeddingStage};
use vstream::services::VectorizationClient;

/// Provider double that tracks concurrency and settlement of every call.
pub struct RecordingClient {
    limit: usize,
    delay: Duration,
    failing: HashSet<String>,
    pub started: AtomicUsize,
    pub finished: AtomicUsize,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub batches: Mutex<Vec<Vec<String>>>,
}

impl RecordingClient {
    pub fn new(limit: usize, delay: Duration) -> Self {
        Self {
            limit,
            delay,
            failing: HashSet::new(),
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorizationClient for RecordingClient {
    async fn get_vectors(
        &self,
        texts: &[String],
        _stage: EmbeddingStage,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(texts.to_vec());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);

        if texts.iter().any(|t| self.failing.contains(t)) {
            return Err(EmbeddingError::ServerError("status 500: rejected".to_string()));
        }
        Ok(texts.iter().map(|t| vec![t.len() as f32; 4]).collect())
    }

    fn concurrency_limit(&self) -> usize {
        self.limit
    }
}

pub fn units(n: usize) -> Vec<ContentUnit> {
    (1..=n)
        .map(|i| {
            ContentUnit::new(format!("u{i}"), format!("doc-{i}"), format!("chunk {i}"))
                .with_owner("owner")
                .with_collections(vec!["default".to_string()])
                .with_metadata("chunk_order", serde_json::json!(i))
        })
        .collect()
}
