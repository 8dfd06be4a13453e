//! A fixed-capacity ring of recent gradient samples.
//!
//! 最近梯度样本的固定容量环形缓冲区。

/// Circular buffer that overwrites its oldest sample once full.
///
/// 写满后覆盖最旧样本的循环缓冲区。
#[derive(Debug, Clone)]
pub struct GradientRing {
    samples: Vec<f64>,
    /// Index the next sample is written to.
    cursor: usize,
    /// Number of valid samples, saturating at the capacity.
    filled: usize,
}

impl GradientRing {
    /// `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity.max(1)],
            cursor: 0,
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn push(&mut self, sample: f64) {
        self.samples[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % self.samples.len();
        self.filled = (self.filled + 1).min(self.samples.len());
    }

    /// Iterates the `n` most recent samples, newest first. Slots that were
    /// never written read as zero, so the count is always `n` up to capacity.
    ///
    /// 按从新到旧的顺序迭代最近的 `n` 个样本。
    pub fn last(&self, n: usize) -> impl Iterator<Item = f64> + '_ {
        let capacity = self.samples.len();
        (1..=n.min(capacity))
            .map(move |back| self.samples[(self.cursor + capacity - back) % capacity])
    }

    /// Mean of the `n` most recent samples.
    ///
    /// 最近 `n` 个样本的平均值。
    pub fn average_last(&self, n: usize) -> f64 {
        let n = n.clamp(1, self.samples.len());
        self.last(n).sum::<f64>() / n as f64
    }

    pub fn clear(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0.0);
        self.cursor = 0;
        self.filled = 0;
    }
}
