//! Scriptable in-memory provider for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::EmbeddingError;
use crate::models::EmbeddingStage;
use crate::services::embedding::VectorizationClient;

pub struct MockClient {
    limit: usize,
    delay: Duration,
    slow: HashMap<String, Duration>,
    fail: HashSet<String>,
    drop_vector: HashSet<String>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    settled: AtomicUsize,
    seen: Mutex<Vec<Vec<String>>>,
}

impl MockClient {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            delay: Duration::from_millis(5),
            slow: HashMap::new(),
            fail: HashSet::new(),
            drop_vector: HashSet::new(),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            settled: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Calls containing `text` sleep for `delay` instead of the default.
    pub fn slow_on(mut self, text: &str, delay: Duration) -> Self {
        self.slow.insert(text.to_string(), delay);
        self
    }

    /// Calls containing `text` fail with a server error.
    pub fn fail_on(mut self, text: &str) -> Self {
        self.fail.insert(text.to_string());
        self
    }

    /// Calls containing `text` return one vector too few.
    pub fn drop_vector_on(mut self, text: &str) -> Self {
        self.drop_vector.insert(text.to_string());
        self
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        vec![text.len() as f32, 1.0, 0.0]
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn settled(&self) -> usize {
        self.settled.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Vec<String>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorizationClient for MockClient {
    async fn get_vectors(
        &self,
        texts: &[String],
        _stage: EmbeddingStage,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(texts.to_vec());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = texts
            .iter()
            .filter_map(|t| self.slow.get(t))
            .max()
            .copied()
            .unwrap_or(self.delay);
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.settled.fetch_add(1, Ordering::SeqCst);

        if texts.iter().any(|t| self.fail.contains(t)) {
            return Err(EmbeddingError::ServerError("status 500: mock failure".to_string()));
        }

        let mut vectors: Vec<_> = texts.iter().map(|t| Self::vector_for(t)).collect();
        if texts.iter().any(|t| self.drop_vector.contains(t)) {
            vectors.pop();
        }
        Ok(vectors)
    }

    fn concurrency_limit(&self) -> usize {
        self.limit
    }
}
