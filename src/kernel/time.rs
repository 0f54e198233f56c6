use tokio::time::{Duration, Instant};

/// Monotonic count of reactor plan ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick {
    pub frame: u64,
}

impl Tick {
    pub fn new() -> Self {
        Tick { frame: 0 }
    }

    pub fn next(&self) -> Self {
        Tick { frame: self.frame + 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BudgetPhase {
    Unstarted,
    Running { end_time: Instant },
    /// `remaining` is frozen until resume.
    Paused { remaining: Duration },
}

/// Session time budget.
///
/// While running, `remaining = end_time - now`. While paused the remainder is
/// frozen and resuming recomputes `end_time = now + remaining`. Clock reads go
/// through `tokio::time::Instant`.
#[derive(Debug, Clone)]
pub struct TimeBudget {
    duration: Duration,
    give_up_threshold: Duration,
    phase: BudgetPhase,
}

impl TimeBudget {
    pub fn new(duration: Duration, give_up_threshold: Duration) -> Self {
        Self {
            duration,
            give_up_threshold,
            phase: BudgetPhase::Unstarted,
        }
    }

    pub fn start(&mut self, duration: Duration) {
        let now = Instant::now();
        self.duration = duration;
        self.phase = BudgetPhase::Running {
            end_time: now + duration,
        };
    }

    pub fn pause(&mut self) {
        if let BudgetPhase::Running { .. } = self.phase {
            self.phase = BudgetPhase::Paused {
                remaining: self.remaining(),
            };
        }
    }

    /// Resumes a paused budget. An unstarted budget is started with its full duration.
    pub fn resume(&mut self) {
        match self.phase {
            BudgetPhase::Unstarted => self.start(self.duration),
            BudgetPhase::Paused { remaining } => {
                self.phase = BudgetPhase::Running {
                    end_time: Instant::now() + remaining,
                };
            }
            BudgetPhase::Running { .. } => {}
        }
    }

    pub fn remaining(&self) -> Duration {
        match self.phase {
            BudgetPhase::Unstarted => self.duration,
            BudgetPhase::Running { end_time } => end_time.saturating_duration_since(Instant::now()),
            BudgetPhase::Paused { remaining } => remaining,
        }
    }

    pub fn is_expired(&self, threshold: Duration) -> bool {
        self.remaining() <= threshold
    }

    /// `is_expired` against the configured give-up threshold.
    pub fn should_give_up(&self) -> bool {
        self.is_expired(self.give_up_threshold)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, BudgetPhase::Running { .. })
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn give_up_threshold(&self) -> Duration {
        self.give_up_threshold
    }

    pub fn reset(&mut self) {
        self.phase = BudgetPhase::Unstarted;
    }
}
