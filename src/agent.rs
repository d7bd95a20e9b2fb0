//! Players that pick a move for a position.

use rand::{rngs::StdRng, seq::IndexedRandom, SeedableRng};
use tracing::debug;

use crate::{
    Budget, CancelHandle, Evaluator, Game, Mcts, MctsConfig, MoveSelection, SearchError,
    SearchOutcome,
};

/// A player of a game.
pub trait Agent<G: Game> {
    /// Chooses the action to play from `state`.
    ///
    /// # Returns
    /// `None` when no move was decided: the search was aborted or the
    /// position has no valid action.
    fn select_action(&mut self, state: &G) -> Result<Option<usize>, SearchError>;

    /// Forgets everything learnt during the previous game.
    fn new_game(&mut self) {}
}

/// Callback receiving search progress in `[0, 100]`.
pub type ProgressCallback = Box<dyn FnMut(u8) + Send>;

/// An agent backed by a search session whose tree persists between moves.
pub struct MctsAgent<G: Game> {
    mcts: Mcts<G>,
    budget: Budget,
    selection: MoveSelection,
    rng: StdRng,
    on_progress: Option<ProgressCallback>,
}

impl<G: Game> MctsAgent<G> {
    /// Random rollouts with UCT, playing the most visited action.
    ///
    /// # Examples
    /// ```rust
    /// use grid_mcts::{Agent, Budget, GridRules, GridState, MctsAgent, Player};
    ///
    /// let mut agent: MctsAgent<GridState> = MctsAgent::uct(Budget::iterations(2_000));
    /// let state = GridState::new(GridRules::tic_tac_toe(), Player::X);
    /// let action = agent.select_action(&state).unwrap();
    /// assert!(action.is_some_and(|a| a < 9));
    /// ```
    pub fn uct(budget: Budget) -> Self {
        Self::from_mcts(Mcts::new(), budget, MoveSelection::MostVisited)
    }

    /// Evaluator-guided PUCT, playing uniformly among the most visited actions.
    pub fn guided<E: Evaluator + Send + 'static>(evaluator: E, budget: Budget) -> Self {
        Self::from_mcts(
            Mcts::guided(evaluator, &MctsConfig::GUIDED),
            budget,
            MoveSelection::RandomAmongMostVisited,
        )
    }

    /// Wraps an existing session.
    ///
    /// # Parameters
    /// - `mcts`: the session searching every move; its tree is kept between moves.
    /// - `budget`: spent on each call to `select_action`.
    /// - `selection`: rule turning the visit distribution into a move.
    pub fn from_mcts(mcts: Mcts<G>, budget: Budget, selection: MoveSelection) -> Self {
        MctsAgent { mcts, budget, selection, rng: StdRng::from_os_rng(), on_progress: None }
    }

    /// Seeds the generator used to break ties between moves.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Registers a callback invoked with the progress of every search.
    pub fn on_progress(mut self, callback: impl FnMut(u8) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// A handle aborting the current or next decision from another thread.
    #[inline]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.mcts.cancel_handle()
    }

    #[inline]
    pub fn mcts(&self) -> &Mcts<G> {
        &self.mcts
    }

    #[inline]
    pub fn budget(&self) -> &Budget {
        &self.budget
    }
}

impl<G: Game> Agent<G> for MctsAgent<G> {
    fn select_action(&mut self, state: &G) -> Result<Option<usize>, SearchError> {
        let outcome = match self.on_progress.as_mut() {
            Some(callback) => self.mcts.search_with_progress(state, &self.budget, callback)?,
            None => self.mcts.search(state, &self.budget)?,
        };

        let action = match outcome {
            SearchOutcome::Completed(distribution) => {
                self.selection.select(&distribution, &mut self.rng)
            }
            SearchOutcome::Aborted => None,
        };
        debug!(?action, "agent decided");
        Ok(action)
    }

    fn new_game(&mut self) {
        self.mcts.reset();
    }
}

/// An agent playing uniformly random valid actions.
pub struct RandomAgent {
    rng: StdRng,
}

impl RandomAgent {
    /// Creates an agent seeded from the OS.
    pub fn new() -> Self {
        RandomAgent { rng: StdRng::from_os_rng() }
    }

    /// Creates an agent whose moves are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        RandomAgent { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Game> Agent<G> for RandomAgent {
    fn select_action(&mut self, state: &G) -> Result<Option<usize>, SearchError> {
        Ok(state.valid_actions().choose(&mut self.rng).copied())
    }
}
