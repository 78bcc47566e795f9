/// Running count of stimulus clock ticks for one generated script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clock {
    total: u64,
}

/// Margin added after the last test so the testbench outlives its final
/// wait.
pub const TRAILING_TICKS: u64 = 1;

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, ticks: u64) {
        self.total += ticks;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Value published as `TOTAL_CLKS`.
    pub fn finish(mut self) -> u64 {
        self.add(TRAILING_TICKS);
        self.total
    }
}
