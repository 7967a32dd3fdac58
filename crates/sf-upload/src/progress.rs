//! Batch-wide progress from per-file byte counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Byte counters for every file of a batch.
///
/// The aggregate is weighted by size: `round(100 * transferred / total)`,
/// held at 99 until the last byte is in. A batch with no bytes at all is
/// complete.
#[derive(Debug)]
pub struct AggregateProgress {
    transferred: Vec<AtomicU64>,
    total: u64,
}

impl AggregateProgress {
    #[must_use]
    pub fn new(sizes: &[u64]) -> Self {
        Self {
            transferred: sizes.iter().map(|_| AtomicU64::new(0)).collect(),
            total: sizes.iter().sum(),
        }
    }

    /// Record file `index` as `bytes` in and return the new aggregate.
    pub fn update(&self, index: usize, bytes: u64) -> u8 {
        if let Some(counter) = self.transferred.get(index) {
            counter.store(bytes, Ordering::Relaxed);
        }
        self.percent()
    }

    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let done: u128 = self
            .transferred
            .iter()
            .map(|c| u128::from(c.load(Ordering::Relaxed)))
            .sum();
        let total = u128::from(self.total);
        if done >= total {
            return 100;
        }
        // Round half up without floats.
        let pct = ((done * 200 + total) / (2 * total)).min(99);
        u8::try_from(pct).unwrap_or(99)
    }
}
