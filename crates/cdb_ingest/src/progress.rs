/// Blends per-layer percentages into one overall figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    completed: usize,
    total: usize,
}

impl ProgressState {
    pub fn new(total: usize) -> Self {
        Self {
            completed: 0,
            total,
        }
    }

    #[inline]
    pub fn completed(&self) -> usize {
        self.completed
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Marks the current layer done, saturating at `total`.
    pub fn advance(&mut self) {
        self.completed = (self.completed + 1).min(self.total);
    }

    /// `(completed + layer_percent / 100) / total * 100`, clamped to 0..=100.
    pub fn overall(&self, layer_percent: f64) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        let layer = layer_percent.clamp(0.0, 100.0) / 100.0;
        let pct = (self.completed as f64 + layer) / self.total as f64 * 100.0;
        pct.clamp(0.0, 100.0)
    }
}

/// Returns the percentage if `line` is a bare `NN%` / `NN.N%` progress marker.
pub fn parse_percent(line: &str) -> Option<f64> {
    let number = line.trim().strip_suffix('%')?;
    number.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
