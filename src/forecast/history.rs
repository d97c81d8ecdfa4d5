use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;

/// Per-region observation windows used by the forecasters.
///
/// Implementations must be safe to share across forecasting tasks; each
/// region's window is independent of every other region's.
pub trait HistoryStore: Send + Sync {
    /// Append `value` to the region's window and return the window mean.
    fn record(&self, region: &str, value: f64) -> f64;

    /// Current window contents, oldest first.
    fn window(&self, region: &str) -> Vec<f64>;

    fn clear(&self);
}

/// Arithmetic mean, 0 for an empty slice.
pub fn moving_average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Bounded ring buffer per region; the oldest value is evicted on overflow.
#[derive(Debug)]
pub struct RollingHistory {
    capacity: usize,
    windows: RwLock<HashMap<String, VecDeque<f64>>>,
}

impl RollingHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            windows: RwLock::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RollingHistory {
    fn default() -> Self {
        Self::new(4)
    }
}

impl HistoryStore for RollingHistory {
    fn record(&self, region: &str, value: f64) -> f64 {
        let mut windows = self.windows.write();
        let window = windows
            .entry(region.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));
        window.push_back(value);
        while window.len() > self.capacity {
            window.pop_front();
        }
        moving_average(window.make_contiguous())
    }

    fn window(&self, region: &str) -> Vec<f64> {
        self.windows
            .read()
            .get(region)
            .map(|w| w.iter().copied().collect())
            .unwrap_or_default()
    }

    fn clear(&self) {
        self.windows.write().clear();
    }
}
