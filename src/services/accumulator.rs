//! Groups streamed content units into fixed-size batches.

use crate::error::PipelineError;
use crate::models::{Batch, ContentUnit};

/// Buffers units until `batch_size` is reached.
#[derive(Debug)]
pub struct BatchAccumulator {
    batch_size: usize,
    buffer: Vec<ContentUnit>,
    next_seq: u64,
}

impl BatchAccumulator {
    pub fn new(batch_size: usize) -> Result<Self, PipelineError> {
        if batch_size < 1 {
            return Err(PipelineError::InvalidConfig(format!(
                "batch size must be at least 1, got {batch_size}"
            )));
        }
        Ok(Self {
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            next_seq: 0,
        })
    }

    /// Appends a unit, returning a full batch once `batch_size` units are buffered.
    pub fn add(&mut self, unit: ContentUnit) -> Option<Batch> {
        self.buffer.push(unit);
        if self.buffer.len() >= self.batch_size {
            Some(self.take())
        } else {
            None
        }
    }

    /// Returns the trailing partial batch, if any.
    pub fn flush(&mut self) -> Option<Batch> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches handed out so far.
    pub fn batches_formed(&self) -> u64 {
        self.next_seq
    }

    fn take(&mut self) -> Batch {
        let units = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_size));
        let batch = Batch::new(self.next_seq, units);
        self.next_seq += 1;
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(i: usize) -> ContentUnit {
        ContentUnit::new(format!("u{i}"), "doc", format!("text {i}"))
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        assert!(matches!(
            BatchAccumulator::new(0),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_batches_are_full_except_last() {
        for n in 0..12usize {
            for b in 1..5usize {
                let mut acc = BatchAccumulator::new(b).unwrap();
                let mut sizes = Vec::new();
                for i in 0..n {
                    if let Some(batch) = acc.add(unit(i)) {
                        sizes.push(batch.len());
                    }
                }
                if let Some(batch) = acc.flush() {
                    sizes.push(batch.len());
                }

                assert_eq!(sizes.len(), n.div_ceil(b), "n={n} b={b}");
                if let Some((last, rest)) = sizes.split_last() {
                    assert!(rest.iter().all(|&s| s == b));
                    assert!(*last >= 1 && *last <= b);
                }
                assert_eq!(sizes.iter().sum::<usize>(), n);
            }
        }
    }

    #[test]
    fn test_flush_empty_returns_none() {
        let mut acc = BatchAccumulator::new(3).unwrap();
        assert!(acc.flush().is_none());
        assert!(acc.add(unit(0)).is_none());
        let batch = acc.flush().unwrap();
        assert_eq!(batch.len(), 1);
        assert!(acc.flush().is_none());
    }

    #[test]
    fn test_batch_order_and_sequence() {
        let mut acc = BatchAccumulator::new(2).unwrap();
        assert!(acc.add(unit(1)).is_none());
        let first = acc.add(unit(2)).unwrap();
        assert!(acc.add(unit(3)).is_none());
        let second = acc.flush().unwrap();

        assert_eq!(first.seq(), 0);
        assert_eq!(second.seq(), 1);
        let ids: Vec<_> = first.units().iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2"]);
        assert_eq!(acc.batches_formed(), 2);
    }
}
