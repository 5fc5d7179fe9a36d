use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Progress {
    /// 0..=100
    pub percent: f32,
    pub status: String,
}

/// Emits a progress update every `step` items (1% of the total, at least
/// one item) and always on the last one.
pub(crate) struct Ticker {
    total: usize,
    step: usize,
}

impl Ticker {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            step: (total / 100).max(1),
        }
    }

    /// `done` is the number of finished items.
    pub(crate) fn tick(&self, done: usize, status: &str) -> Option<Progress> {
        if done == 0 || (done % self.step != 0 && done != self.total) {
            return None;
        }
        let percent = if self.total == 0 {
            100.0
        } else {
            (done as f32 * 100.0 / self.total as f32).min(100.0)
        };
        Some(Progress {
            percent,
            status: format!("{status} {done}/{}", self.total),
        })
    }
}
