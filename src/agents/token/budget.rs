//! Turn and wall-clock budget for one user turn

use std::time::{Duration, Instant};

/// Which limit ran out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetLimit {
    Turns(u32),
    Duration(Duration),
}

impl std::fmt::Display for BudgetLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetLimit::Turns(n) => write!(f, "turn budget of {n} model calls"),
            BudgetLimit::Duration(d) => write!(f, "time budget of {}s", d.as_secs()),
        }
    }
}

/// Bounds the model/tool cycle of a single user turn.
#[derive(Debug, Clone)]
pub struct TurnBudget {
    max_turns: u32,
    max_duration: Duration,
    started: Instant,
    used: u32,
}

impl TurnBudget {
    pub fn new(max_turns: u32, max_duration: Duration) -> Self {
        Self {
            max_turns,
            max_duration,
            started: Instant::now(),
            used: 0,
        }
    }

    /// Take one model turn. Returns the limit that forbids it, if any.
    pub fn consume(&mut self) -> Result<(), BudgetLimit> {
        self.check()?;
        self.used += 1;
        Ok(())
    }

    /// The limit already reached, if any
    pub fn check(&self) -> Result<(), BudgetLimit> {
        if self.used >= self.max_turns {
            return Err(BudgetLimit::Turns(self.max_turns));
        }
        if self.started.elapsed() >= self.max_duration {
            return Err(BudgetLimit::Duration(self.max_duration));
        }
        Ok(())
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn remaining_turns(&self) -> u32 {
        self.max_turns.saturating_sub(self.used)
    }

    /// Time left before the wall-clock limit
    pub fn remaining_time(&self) -> Duration {
        self.max_duration.saturating_sub(self.started.elapsed())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
