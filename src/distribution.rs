//! Visit-count distributions and the rules turning them into a move.

use rand::{rngs::StdRng, seq::IndexedRandom};

use crate::utils::{argmax_all, sample};

/// Visit count of each root action after a search, indexed by action.
///
/// Actions that were never explored, or that are not valid, count zero. An
/// all-zero distribution means no move was decided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisitDistribution {
    visits: Vec<u32>,
}

impl VisitDistribution {
    /// Creates a distribution from per-action visit counts.
    ///
    /// # Parameters
    /// - `visits`: one count per action of the game, indexed by action.
    pub fn new(visits: Vec<u32>) -> Self {
        VisitDistribution { visits }
    }

    #[inline]
    pub fn visits(&self) -> &[u32] {
        &self.visits
    }

    /// Visit count of `action`, zero when out of range.
    #[inline]
    pub fn get(&self, action: usize) -> u32 {
        self.visits.get(action).copied().unwrap_or(0)
    }

    /// Size of the action space.
    #[inline]
    pub fn len(&self) -> usize {
        self.visits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    /// Sum of all visit counts.
    pub fn total(&self) -> u32 {
        self.visits.iter().sum()
    }

    /// Whether no action was visited at all.
    pub fn is_zero(&self) -> bool {
        self.visits.iter().all(|&n| n == 0)
    }

    /// The most visited action, first one on ties.
    ///
    /// # Returns
    /// `None` when the distribution is all zero, never a default action.
    pub fn most_visited(&self) -> Option<usize> {
        self.most_visited_all().first().copied()
    }

    /// Every action tied at the maximum visit count, in action order.
    ///
    /// Empty when the distribution is all zero.
    pub fn most_visited_all(&self) -> Vec<usize> {
        if self.is_zero() {
            return Vec::new();
        }
        argmax_all(&self.visits)
    }

    /// Visit counts normalised to sum to 1, or all zero when nothing was visited.
    ///
    /// # Examples
    /// ```rust
    /// use grid_mcts::VisitDistribution;
    /// let distribution = VisitDistribution::new(vec![1, 0, 3]);
    /// assert_eq!(distribution.probabilities(), vec![0.25, 0.0, 0.75]);
    /// ```
    pub fn probabilities(&self) -> Vec<f64> {
        let total = self.total();
        if total == 0 {
            return vec![0.0; self.visits.len()];
        }
        self.visits.iter().map(|&n| n as f64 / total as f64).collect()
    }
}

/// Rule choosing the move to play from a visit distribution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MoveSelection {
    /// The most visited action, first one on ties.
    #[default]
    MostVisited,
    /// Uniformly random among the actions tied at the maximum.
    RandomAmongMostVisited,
    /// Random with probability proportional to visit count.
    Proportional,
}

impl MoveSelection {
    /// Picks an action.
    ///
    /// # Parameters
    /// - `distribution`: visit counts from a completed search.
    /// - `rng`: used by the randomised rules only.
    ///
    /// # Returns
    /// The chosen action, or `None` if the distribution is all zero.
    pub fn select(self, distribution: &VisitDistribution, rng: &mut StdRng) -> Option<usize> {
        match self {
            MoveSelection::MostVisited => distribution.most_visited(),
            MoveSelection::RandomAmongMostVisited => {
                distribution.most_visited_all().choose(rng).copied()
            }
            MoveSelection::Proportional => {
                let weights: Vec<f64> =
                    distribution.visits().iter().map(|&n| f64::from(n)).collect();
                sample(&weights, rng)
            }
        }
    }
}
