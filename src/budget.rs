//! Search budgets and the progress clock that enforces them.

use std::time::{Duration, Instant};

/// How much work a search may do.
///
/// A search stops once at least `min_iterations` iterations are done and
/// either the iteration cap is reached or the time limit has elapsed. At
/// least one of `iterations` and `time_limit` must be set.
///
/// # Examples
/// ```rust
/// use std::time::Duration;
/// use grid_mcts::Budget;
///
/// let fixed = Budget::iterations(800);
/// let timed = Budget::time(Duration::from_secs(5));
/// let floored = Budget::time_with_floor(Duration::from_millis(200), 1_000);
/// assert_eq!(floored.min_iterations, 1_000);
/// assert!(fixed.is_bounded() && timed.is_bounded());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Budget {
    /// Maximum number of iterations.
    pub iterations: Option<u32>,
    /// Wall-clock limit, measured from the start of the search.
    pub time_limit: Option<Duration>,
    /// Iterations performed even after the time limit has passed.
    pub min_iterations: u32,
}

impl Budget {
    /// A fixed number of iterations.
    pub const fn iterations(iterations: u32) -> Self {
        Budget { iterations: Some(iterations), time_limit: None, min_iterations: 0 }
    }

    /// A wall-clock deadline.
    pub const fn time(limit: Duration) -> Self {
        Budget { iterations: None, time_limit: Some(limit), min_iterations: 0 }
    }

    /// A wall-clock deadline that cannot cut the search below `min_iterations`.
    pub const fn time_with_floor(limit: Duration, min_iterations: u32) -> Self {
        Budget { iterations: None, time_limit: Some(limit), min_iterations }
    }

    /// Adds an iteration cap to this budget.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = Some(iterations);
        self
    }

    /// Whether the budget can run out.
    #[inline]
    pub fn is_bounded(&self) -> bool {
        self.iterations.is_some() || self.time_limit.is_some()
    }
}

/// Tracks spent budget during one search and derives progress from it.
#[derive(Debug)]
pub(crate) struct BudgetClock {
    budget: Budget,
    start: Instant,
    done: u32,
    last_progress: u8,
}

impl BudgetClock {
    pub(crate) fn start(budget: Budget) -> Self {
        BudgetClock { budget, start: Instant::now(), done: 0, last_progress: 0 }
    }

    #[inline]
    pub(crate) fn record_iteration(&mut self) {
        self.done += 1;
    }

    #[inline]
    pub(crate) fn iterations(&self) -> u32 {
        self.done
    }

    #[inline]
    pub(crate) fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        if self.done < self.budget.min_iterations {
            return false;
        }

        let capped = self.budget.iterations.is_some_and(|cap| self.done >= cap);
        let timed_out = self.budget.time_limit.is_some_and(|limit| self.elapsed() >= limit);
        capped || timed_out
    }

    /// Percentage of the budget spent, in `[0, 100]`.
    ///
    /// The larger of the iteration and time fractions is used, truncated so
    /// that 100 is only reported once the budget is spent. The value never
    /// decreases between calls.
    pub(crate) fn progress(&mut self) -> u8 {
        let iteration_target = self.budget.iterations.unwrap_or(self.budget.min_iterations);
        let by_iterations = if iteration_target > 0 {
            u128::from(self.done) * 100 / u128::from(iteration_target)
        } else {
            0
        };
        let by_time = match self.budget.time_limit {
            Some(limit) if !limit.is_zero() => self.elapsed().as_nanos() * 100 / limit.as_nanos(),
            Some(_) => 100,
            None => 0,
        };

        let percent = by_iterations.max(by_time).min(100) as u8;
        self.last_progress = self.last_progress.max(percent);
        self.last_progress
    }

    /// Marks the budget as fully spent.
    pub(crate) fn finish(&mut self) -> u8 {
        self.last_progress = 100;
        self.last_progress
    }
}
