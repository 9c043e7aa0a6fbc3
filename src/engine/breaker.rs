/// Halts the live loop after too many failed ticks in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
}

#[derive(Debug, Clone)]
pub struct TickBreaker {
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub threshold: u32,
}

impl TickBreaker {
    pub fn new(threshold: u32) -> Self {
        Self { state: BreakerState::Closed, consecutive_failures: 0, threshold: threshold.max(1) }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.state = BreakerState::Closed;
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.threshold {
            self.state = BreakerState::Open;
        }
    }

    pub fn allow(&self) -> bool {
        matches!(self.state, BreakerState::Closed)
    }
}
