//! Averages over the incoming distance stream.
//!
//! Two flavours are used on the bench: a sliding window while the spring
//! hangs at rest (its value becomes the equilibrium position) and a
//! block average printed during a collection run.

use heapless::HistoryBuffer;

/// Window of the at-rest sliding average.
pub const ROLLING_WINDOW: usize = 100;

/// Block length of the collection-run average.
pub const BLOCK_LEN: usize = 20;

/// Mean of the last `N` readings.  Reports nothing until the window is full.
pub struct RollingAverage<const N: usize = ROLLING_WINDOW> {
    window: HistoryBuffer<f32, N>,
    last: Option<f32>,
}

impl<const N: usize> Default for RollingAverage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RollingAverage<N> {
    pub fn new() -> Self {
        Self {
            window: HistoryBuffer::new(),
            last: None,
        }
    }

    /// Add a reading; returns the window mean once `N` readings are held.
    pub fn push(&mut self, distance_mm: f32) -> Option<f32> {
        self.window.write(distance_mm);
        if self.window.len() < self.window.capacity() {
            return None;
        }
        let avg = mean(self.window.as_slice());
        self.last = Some(avg);
        Some(avg)
    }

    /// Most recent full-window mean.
    pub fn last(&self) -> Option<f32> {
        self.last
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.len() == 0
    }
}

/// Mean of each consecutive block of `N` readings.  The buffer is emptied
/// after every report.
pub struct BlockAverage<const N: usize = BLOCK_LEN> {
    block: heapless::Vec<f32, N>,
}

impl<const N: usize> Default for BlockAverage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> BlockAverage<N> {
    pub fn new() -> Self {
        Self {
            block: heapless::Vec::new(),
        }
    }

    /// Add a reading; returns the block mean when it completes a block.
    pub fn push(&mut self, distance_mm: f32) -> Option<f32> {
        // Never full on entry: a full block is drained below.
        let _ = self.block.push(distance_mm);
        if !self.block.is_full() {
            return None;
        }
        let avg = mean(&self.block);
        self.block.clear();
        Some(avg)
    }

    pub fn len(&self) -> usize {
        self.block.len()
    }

    pub fn is_empty(&self) -> bool {
        self.block.is_empty()
    }
}

fn mean(values: &[f32]) -> f32 {
    let sum: f64 = values.iter().map(|&v| f64::from(v)).sum();
    (sum / values.len() as f64) as f32
}
