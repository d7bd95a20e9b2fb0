//! Implementation of the Monte Carlo Tree Search driver.
//!
//! An [`Mcts`] session owns a search tree that persists across calls to
//! [`Mcts::search`]: each call re-roots the tree on the given position,
//! keeping the statistics of the matching subtree, then runs the budgeted
//! select, expand, simulate and back-propagate loop until the budget is spent
//! or cancellation is observed.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use rand::{rngs::StdRng, SeedableRng};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    budget::BudgetClock, Budget, Evaluator, EvaluatorError, Game, LeafValue, NodeId, SearchTree,
    Selection, Simulation, TreeStats, VisitDistribution,
};

/// Lifecycle of a search session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchPhase {
    /// No tree yet, or the session was reset.
    Idle,
    /// A tree is rooted on the searched position; no result is available.
    Rooted,
    /// The budgeted loop is running.
    Iterating,
    /// The last search completed and its distribution is final.
    Done,
    /// The last search was aborted.
    Cancelled,
}

/// Represents possible errors that can occur during a search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The evaluator could not evaluate a frontier position.
    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),

    /// The evaluator's policy does not cover the action space.
    #[error("evaluator returned a policy of {got} entries, expected {expected}")]
    MalformedEvaluation { expected: usize, got: usize },

    /// The budget has neither an iteration cap nor a time limit.
    #[error("budget has neither an iteration cap nor a time limit")]
    UnboundedBudget,

    /// The operation is not available in the current phase.
    #[error("operation not available in phase {0:?}")]
    InvalidPhase(SearchPhase),
}

/// Result of a search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The budget was spent; visit counts of the root actions.
    Completed(VisitDistribution),
    /// Cancellation was observed; no move was decided.
    Aborted,
}

impl SearchOutcome {
    /// Whether the search stopped on a cancellation.
    #[inline]
    pub fn is_aborted(&self) -> bool {
        matches!(self, SearchOutcome::Aborted)
    }

    /// The distribution of a completed search.
    pub fn distribution(&self) -> Option<&VisitDistribution> {
        match self {
            SearchOutcome::Completed(distribution) => Some(distribution),
            SearchOutcome::Aborted => None,
        }
    }

    /// Consumes the outcome, keeping the distribution of a completed search.
    ///
    /// # Returns
    /// `None` for an aborted search.
    pub fn into_distribution(self) -> Option<VisitDistribution> {
        match self {
            SearchOutcome::Completed(distribution) => Some(distribution),
            SearchOutcome::Aborted => None,
        }
    }
}

/// Shared flag used to cancel a search from another thread.
///
/// The search polls it once per iteration. A cancellation requested while
/// no search is running aborts the next one at its first check.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Creates a handle that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of the running or next search.
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether a cancellation is pending.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clears the flag, returning whether it was set.
    #[inline]
    fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Configuration parameters for a search session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MctsConfig {
    /// The exploration coefficient of the selection rule.
    ///
    /// A higher value encourages exploration of rarely visited edges, a lower
    /// value exploitation of the best known ones.
    pub exploration_coef: f64,
    /// The rule used to descend the tree.
    pub selection: Selection,
    /// Seed of the random generator used by rollouts; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl MctsConfig {
    /// Plain UCT with coefficient `√2`, as used with random rollouts.
    pub const DEFAULT: MctsConfig = MctsConfig {
        exploration_coef: std::f64::consts::SQRT_2,
        selection: Selection::Uct,
        seed: None,
    };

    /// PUCT with coefficient `1.41`, as used with an evaluator.
    pub const GUIDED: MctsConfig = MctsConfig {
        exploration_coef: 1.41,
        selection: Selection::Puct,
        seed: None,
    };

    /// Sets the exploration coefficient.
    ///
    /// # Parameters
    /// - `exploration_coef`: the constant `c` of the UCT or PUCT score.
    ///
    /// # Returns
    /// The updated configuration.
    pub fn with_exploration_coef(mut self, exploration_coef: f64) -> Self {
        self.exploration_coef = exploration_coef;
        self
    }

    /// Sets the selection rule.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Fixes the seed of the random generator, making searches reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for MctsConfig {
    fn default() -> Self {
        MctsConfig::DEFAULT
    }
}

/// A Monte Carlo Tree Search session.
///
/// The session is created once per game and fed the authoritative position
/// before each move. Only one search runs at a time; [`CancelHandle`]s
/// obtained from [`Mcts::cancel_handle`] may be used from other threads.
///
/// # Type Parameters
/// - `G`: The game type that implements the `Game` trait.
pub struct Mcts<G: Game> {
    config: MctsConfig,
    simulation: Simulation,
    tree: Option<SearchTree<G>>,
    rng: StdRng,
    cancel: CancelHandle,
    phase: SearchPhase,
}

impl<G: Game> Mcts<G> {
    /// Creates a session using random rollouts and `MctsConfig::DEFAULT`.
    #[inline]
    pub fn new() -> Self {
        Self::from_config(&MctsConfig::DEFAULT)
    }

    /// Creates a session using random rollouts and the given configuration.
    #[inline]
    pub fn from_config(config: &MctsConfig) -> Self {
        Self::with_simulation(Simulation::Rollout, config)
    }

    /// Creates a session that values frontier positions with `evaluator`.
    ///
    /// # Parameters
    /// - `evaluator`: the policy/value evaluator, called once per new frontier.
    /// - `config`: typically `MctsConfig::GUIDED`.
    pub fn guided<E: Evaluator + Send + 'static>(evaluator: E, config: &MctsConfig) -> Self {
        Self::with_simulation(Simulation::Guided(Box::new(evaluator)), config)
    }

    /// Creates a session with an explicit frontier simulation.
    ///
    /// # Parameters
    /// - `simulation`: random rollouts or an evaluator call.
    /// - `config`: exploration coefficient, selection rule and seed.
    ///
    /// # Returns
    /// An idle session without a tree.
    pub fn with_simulation(simulation: Simulation, config: &MctsConfig) -> Self {
        let rng = config.seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        Mcts {
            config: *config,
            simulation,
            tree: None,
            rng,
            cancel: CancelHandle::new(),
            phase: SearchPhase::Idle,
        }
    }

    #[inline]
    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Where the session is in its lifecycle.
    #[inline]
    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    /// The search tree, once a search has rooted one.
    #[inline]
    pub fn tree(&self) -> Option<&SearchTree<G>> {
        self.tree.as_ref()
    }

    /// Size and depth of the current tree.
    pub fn stats(&self) -> Option<TreeStats> {
        self.tree.as_ref().map(SearchTree::stats)
    }

    /// Requests cooperative cancellation of the running (or next) search.
    #[inline]
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle able to cancel searches of this session from any thread.
    #[inline]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Discards the tree and any pending cancellation, as for a new game.
    pub fn reset(&mut self) {
        self.tree = None;
        self.cancel.take();
        self.phase = SearchPhase::Idle;
    }

    /// The root distribution of the last completed search.
    ///
    /// # Errors
    /// `SearchError::InvalidPhase` unless the last search completed.
    pub fn distribution(&self) -> Result<VisitDistribution, SearchError> {
        match (&self.tree, self.phase) {
            (Some(tree), SearchPhase::Done) => Ok(VisitDistribution::new(tree.root_visits())),
            (_, phase) => Err(SearchError::InvalidPhase(phase)),
        }
    }

    /// Searches from `state` until `budget` is spent.
    ///
    /// # Returns
    /// The visit distribution of the root actions, or `SearchOutcome::Aborted`
    /// if cancellation was observed.
    ///
    /// # Errors
    /// Evaluator failures, malformed evaluations and unbounded budgets.
    ///
    /// # Examples
    /// ```rust
    /// use grid_mcts::{Budget, GridRules, GridState, Mcts, MctsConfig, Player, SearchOutcome};
    ///
    /// let state = GridState::new(GridRules::tic_tac_toe(), Player::X);
    /// let mut mcts = Mcts::from_config(&MctsConfig::DEFAULT.with_seed(1));
    ///
    /// let outcome = mcts.search(&state, &Budget::iterations(500)).unwrap();
    /// assert_eq!(outcome.distribution().map(|d| d.total()), Some(500));
    /// ```
    #[inline]
    pub fn search(&mut self, state: &G, budget: &Budget) -> Result<SearchOutcome, SearchError> {
        self.search_with_progress(state, budget, |_| {})
    }

    /// Same as [`Mcts::search`], reporting progress in `[0, 100]` before every
    /// iteration and `100` on completion. Reported values never decrease.
    pub fn search_with_progress<F: FnMut(u8)>(
        &mut self,
        state: &G,
        budget: &Budget,
        mut on_progress: F,
    ) -> Result<SearchOutcome, SearchError> {
        if !budget.is_bounded() {
            return Err(SearchError::UnboundedBudget);
        }

        let result = self.run(state, budget, &mut on_progress);
        if result.is_err() {
            self.phase = SearchPhase::Rooted;
        }
        result
    }

    fn run(
        &mut self,
        state: &G,
        budget: &Budget,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<SearchOutcome, SearchError> {
        let mut created = false;
        let tree = self.tree.get_or_insert_with(|| {
            created = true;
            SearchTree::new(state.clone())
        });

        if created {
            debug!("created search tree");
        } else {
            let before = tree.len();
            if tree.reroot(state) {
                debug!(
                    before,
                    after = tree.len(),
                    root_visits = tree.root_node().visits(),
                    "reused search subtree"
                );
            } else {
                debug!(discarded = before, "position not in tree, starting fresh");
            }
        }
        self.phase = SearchPhase::Rooted;

        let root = tree.root();
        let root_state = tree.root_node().state();
        if root_state.is_terminal() || root_state.valid_actions().is_empty() {
            debug!("root position has no move to search");
            on_progress(100);
            self.phase = SearchPhase::Done;
            let visits = vec![0; root_state.action_count()];
            return Ok(SearchOutcome::Completed(VisitDistribution::new(visits)));
        }

        if !tree.root_node().is_expanded() {
            let priors = if self.simulation.is_guided() {
                self.simulation.simulate(tree.root_node().state(), &mut self.rng)?.priors
            } else {
                None
            };
            tree.expand(root, priors.as_deref());
        }

        self.phase = SearchPhase::Iterating;
        let mut clock = BudgetClock::start(*budget);
        let mut path: Vec<(NodeId, usize)> = Vec::new();

        loop {
            if self.cancel.take() {
                debug!(
                    iterations = clock.iterations(),
                    elapsed = ?clock.elapsed(),
                    "search aborted"
                );
                self.phase = SearchPhase::Cancelled;
                return Ok(SearchOutcome::Aborted);
            }
            if clock.is_exhausted() {
                break;
            }

            on_progress(clock.progress());
            Self::iterate(tree, &self.simulation, &mut self.rng, &self.config, &mut path)?;
            clock.record_iteration();
        }

        on_progress(clock.finish());

        let node = tree.root_node();
        let total = node.visits();
        let (selection, coef) = (self.config.selection, self.config.exploration_coef);
        for edge in node.edges() {
            debug!(
                action = edge.action(),
                n = edge.n(),
                w = edge.w(),
                q = edge.q(),
                score = selection.score(edge, total, node.edges().len(), coef),
                "root edge"
            );
        }
        debug!(
            iterations = clock.iterations(),
            elapsed = ?clock.elapsed(),
            nodes = tree.len(),
            "search finished"
        );

        self.phase = SearchPhase::Done;
        Ok(SearchOutcome::Completed(VisitDistribution::new(tree.root_visits())))
    }

    /// Performs one select, expand, simulate and back-propagate pass.
    ///
    /// # Parameters
    /// - `path`: scratch buffer receiving the `(node, edge)` breadcrumbs.
    fn iterate(
        tree: &mut SearchTree<G>,
        simulation: &Simulation,
        rng: &mut StdRng,
        config: &MctsConfig,
        path: &mut Vec<(NodeId, usize)>,
    ) -> Result<(), SearchError> {
        path.clear();
        let mut current = tree.root();

        loop {
            let node = tree.get(current);
            match config.selection.select(node.edges(), config.exploration_coef) {
                Some(edge) => {
                    path.push((current, edge));
                    current = node.edges()[edge].target();
                }
                None => break,
            }
        }

        let frontier = tree.get(current).state();
        let leaf_player = frontier.player();
        let value = if frontier.is_terminal() {
            frontier.terminal_value()
        } else {
            let LeafValue { value, priors } = simulation.simulate(frontier, rng)?;
            tree.expand(current, priors.as_deref());
            value
        };

        trace!(depth = path.len(), value, "iteration");
        tree.backpropagate(path, leaf_player, value);
        Ok(())
    }
}

impl<G: Game> Default for Mcts<G> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        thread,
        time::{Duration, Instant},
    };

    use super::*;
    use crate::{
        test_utils::{parse_board, FailingEvaluator, ScriptedEvaluator},
        GridRules, GridState, MoveSelection, Player, UniformEvaluator,
    };

    fn tic_tac_toe() -> GridState {
        GridState::new(GridRules::tic_tac_toe(), Player::X)
    }

    fn seeded(seed: u64) -> Mcts<GridState> {
        Mcts::from_config(&MctsConfig::DEFAULT.with_seed(seed))
    }

    fn completed(outcome: SearchOutcome) -> VisitDistribution {
        match outcome {
            SearchOutcome::Completed(distribution) => distribution,
            SearchOutcome::Aborted => panic!("search was aborted"),
        }
    }

    #[test]
    fn test_new_session_is_idle() {
        let mcts = Mcts::<GridState>::new();

        assert_eq!(mcts.phase(), SearchPhase::Idle);
        assert!(mcts.tree().is_none());
        assert!(mcts.stats().is_none());
        assert!(matches!(mcts.distribution(), Err(SearchError::InvalidPhase(SearchPhase::Idle))));
    }

    #[test]
    fn test_config_builders() {
        let config = MctsConfig::default()
            .with_exploration_coef(0.5)
            .with_selection(Selection::Puct)
            .with_seed(3);

        assert_eq!(config.exploration_coef, 0.5);
        assert_eq!(config.selection, Selection::Puct);
        assert_eq!(config.seed, Some(3));
        assert_eq!(Mcts::<GridState>::from_config(&config).config(), &config);
        assert_eq!(MctsConfig::GUIDED.selection, Selection::Puct);
    }

    #[test]
    fn test_puct_with_rollouts() -> Result<(), SearchError> {
        // Without priors every edge is treated as equally likely.
        let config = MctsConfig::DEFAULT.with_selection(Selection::Puct).with_seed(17);
        let state = parse_board(GridRules::tic_tac_toe(), "XX. OO. ...", Player::X);
        let mut mcts = Mcts::from_config(&config);

        let outcome = mcts.search(&state, &Budget::iterations(2_000))?;
        assert_eq!(outcome.into_distribution().and_then(|d| d.most_visited()), Some(2));
        Ok(())
    }

    #[test]
    fn test_unbounded_budget() {
        let mut mcts = seeded(0);
        let budget = Budget { iterations: None, time_limit: None, min_iterations: 5 };

        assert!(matches!(mcts.search(&tic_tac_toe(), &budget), Err(SearchError::UnboundedBudget)));
        assert_eq!(mcts.phase(), SearchPhase::Idle);
    }

    #[test]
    fn test_root_visits_equal_iterations() -> Result<(), SearchError> {
        let mut mcts = seeded(1);

        for k in [1, 9, 10, 250] {
            mcts.reset();
            let distribution = completed(mcts.search(&tic_tac_toe(), &Budget::iterations(k))?);
            assert_eq!(distribution.total(), k);
            assert_eq!(distribution.len(), 9);
            assert_eq!(mcts.phase(), SearchPhase::Done);
            assert_eq!(mcts.distribution()?, distribution);
        }
        Ok(())
    }

    #[test]
    fn test_first_iterations_try_every_root_action() -> Result<(), SearchError> {
        let mut mcts = seeded(2);
        let distribution = completed(mcts.search(&tic_tac_toe(), &Budget::iterations(9))?);

        assert_eq!(distribution.visits(), &[1; 9]);
        Ok(())
    }

    #[test]
    fn test_visit_flow_invariant() -> Result<(), SearchError> {
        let mut mcts = seeded(3);
        mcts.search(&tic_tac_toe(), &Budget::iterations(3_000))?;
        let tree = mcts.tree().unwrap();

        let mut inflow: HashMap<NodeId, u32> = HashMap::new();
        for id in tree.reachable(tree.root()) {
            for edge in tree.get(id).edges() {
                *inflow.entry(edge.target()).or_default() += edge.n();
            }
        }

        assert_eq!(tree.root_node().visits(), 3_000);
        for id in tree.reachable(tree.root()).into_iter().skip(1) {
            let node = tree.get(id);
            let passed = inflow.get(&id).copied().unwrap_or(0);

            if node.is_expanded() {
                // The first pass through a node expands it without descending.
                assert_eq!(node.visits(), passed - 1);
            } else if !node.state().is_terminal() {
                assert_eq!(passed, 0);
            }
            for edge in node.edges() {
                if edge.n() == 0 {
                    assert_eq!(edge.q(), 0.0);
                } else {
                    assert!((edge.q() - edge.w() / edge.n() as f64).abs() < 1e-12);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_finds_winning_move_uct() -> Result<(), SearchError> {
        let state = parse_board(GridRules::tic_tac_toe(), "XX. OO. ...", Player::X);
        let mut mcts = seeded(4);
        let distribution = completed(mcts.search(&state, &Budget::iterations(5_000))?);

        let root = mcts.tree().unwrap().root_node();
        let win = root.edges().iter().find(|e| e.action() == 2).unwrap();
        assert_eq!(win.q(), 1.0);
        for edge in root.edges().iter().filter(|e| e.action() != 2) {
            assert!(edge.q() < win.q());
        }
        assert_eq!(distribution.most_visited(), Some(2));
        Ok(())
    }

    #[test]
    fn test_finds_winning_move_guided() -> Result<(), SearchError> {
        let state = parse_board(GridRules::tic_tac_toe(), "XX. OO. ...", Player::X);
        let mut mcts = Mcts::guided(UniformEvaluator::new(), &MctsConfig::GUIDED.with_seed(4));
        let distribution = completed(mcts.search(&state, &Budget::iterations(1_000))?);

        let root = mcts.tree().unwrap().root_node();
        let win = root.edges().iter().find(|e| e.action() == 2).unwrap();
        assert_eq!(win.q(), 1.0);
        assert!(win.prior().is_some());
        for edge in root.edges().iter().filter(|e| e.action() != 2) {
            assert!(edge.q() < win.q());
        }
        assert_eq!(distribution.most_visited(), Some(2));
        Ok(())
    }

    #[test]
    fn test_blocks_opponent_win() -> Result<(), SearchError> {
        // O to move must block X on cell 2.
        let state = parse_board(GridRules::tic_tac_toe(), "XX. O.. ...", Player::O);
        let mut mcts = seeded(5);
        let distribution = completed(mcts.search(&state, &Budget::iterations(10_000))?);

        assert_eq!(distribution.most_visited(), Some(2));
        Ok(())
    }

    #[test]
    fn test_terminal_root() -> Result<(), SearchError> {
        let state = parse_board(GridRules::tic_tac_toe(), "XXX OO. ...", Player::O);
        let mut mcts = seeded(6);
        let mut reports = Vec::new();

        let outcome =
            mcts.search_with_progress(&state, &Budget::iterations(100), |p| reports.push(p))?;
        let distribution = completed(outcome);

        assert!(distribution.is_zero());
        assert_eq!(distribution.len(), 9);
        assert_eq!(reports, vec![100]);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(MoveSelection::MostVisited.select(&distribution, &mut rng), None);
        Ok(())
    }

    #[test]
    fn test_draw_root() -> Result<(), SearchError> {
        let state = parse_board(GridRules::tic_tac_toe(), "XOX XOO OXX", Player::O);
        let mut mcts = seeded(6);

        assert!(completed(mcts.search(&state, &Budget::iterations(10))?).is_zero());
        Ok(())
    }

    #[test]
    fn test_progress_is_monotonic_and_finishes() -> Result<(), SearchError> {
        let mut mcts = seeded(7);
        let mut reports = Vec::new();

        mcts.search_with_progress(&tic_tac_toe(), &Budget::iterations(200), |p| reports.push(p))?;

        assert_eq!(reports.len(), 201);
        assert_eq!(reports[0], 0);
        assert_eq!(reports.last(), Some(&100));
        assert!(reports[..200].iter().all(|&p| p < 100));
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        Ok(())
    }

    #[test]
    fn test_cancel_before_search() -> Result<(), SearchError> {
        let mut mcts = seeded(8);
        mcts.cancel();

        assert!(mcts.search(&tic_tac_toe(), &Budget::iterations(100))?.is_aborted());
        assert_eq!(mcts.phase(), SearchPhase::Cancelled);
        assert!(matches!(
            mcts.distribution(),
            Err(SearchError::InvalidPhase(SearchPhase::Cancelled))
        ));

        // The flag is consumed by the aborted search.
        assert!(!mcts.cancel_handle().is_cancelled());
        assert_eq!(completed(mcts.search(&tic_tac_toe(), &Budget::iterations(100))?).total(), 100);
        Ok(())
    }

    #[test]
    fn test_cancel_from_progress_callback() -> Result<(), SearchError> {
        let mut mcts = seeded(9);
        let handle = mcts.cancel_handle();
        let mut calls = 0;

        let outcome = mcts.search_with_progress(&tic_tac_toe(), &Budget::iterations(1_000), |_| {
            calls += 1;
            if calls == 100 {
                handle.cancel();
            }
        })?;

        assert_eq!(outcome, SearchOutcome::Aborted);
        assert_eq!(outcome.distribution(), None);
        // The iteration following the cancelling report still completes.
        assert_eq!(calls, 100);
        assert_eq!(mcts.tree().unwrap().root_node().visits(), 100);
        Ok(())
    }

    #[test]
    fn test_cancel_from_another_thread() -> Result<(), SearchError> {
        let mut mcts = seeded(10);
        let handle = mcts.cancel_handle();
        let start = Instant::now();

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            handle.cancel();
        });
        let outcome = mcts.search(&tic_tac_toe(), &Budget::time(Duration::from_secs(60)))?;
        canceller.join().unwrap();

        assert!(outcome.is_aborted());
        assert!(start.elapsed() < Duration::from_secs(10));
        Ok(())
    }

    #[test]
    fn test_evaluator_failure_is_surfaced() {
        let mut mcts = Mcts::guided(FailingEvaluator, &MctsConfig::GUIDED);

        let result = mcts.search(&tic_tac_toe(), &Budget::iterations(10));
        assert!(matches!(result, Err(SearchError::Evaluator(EvaluatorError::EvaluationFailed(_)))));
        assert_eq!(mcts.phase(), SearchPhase::Rooted);
    }

    #[test]
    fn test_evaluator_input_shape_is_surfaced() {
        let mut mcts = Mcts::guided(UniformEvaluator::with_cells(36), &MctsConfig::GUIDED);

        let result = mcts.search(&tic_tac_toe(), &Budget::iterations(10));
        assert!(matches!(
            result,
            Err(SearchError::Evaluator(EvaluatorError::InvalidInput { expected: 36, got: 9 }))
        ));
    }

    #[test]
    fn test_malformed_evaluation_is_surfaced() {
        let evaluator = ScriptedEvaluator::new(0.0, vec![0.5, 0.5]);
        let mut mcts = Mcts::guided(evaluator, &MctsConfig::GUIDED);

        match mcts.search(&tic_tac_toe(), &Budget::iterations(10)) {
            Err(SearchError::MalformedEvaluation { expected, got }) => {
                assert_eq!(expected, 9);
                assert_eq!(got, 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_guided_root_priors() -> Result<(), SearchError> {
        let mut policy = vec![0.0; 9];
        policy[4] = 0.9;
        policy[0] = 0.1;
        let mut mcts = Mcts::guided(ScriptedEvaluator::new(0.0, policy), &MctsConfig::GUIDED);

        let distribution = completed(mcts.search(&tic_tac_toe(), &Budget::iterations(50))?);

        let root = mcts.tree().unwrap().root_node();
        assert_eq!(root.edges()[4].prior(), Some(0.9));
        assert_eq!(distribution.total(), 50);
        assert_eq!(distribution.most_visited(), Some(4));
        Ok(())
    }

    #[test]
    fn test_same_seed_same_result() -> Result<(), SearchError> {
        let budget = Budget::iterations(400);
        let a = completed(seeded(11).search(&tic_tac_toe(), &budget)?);
        let b = completed(seeded(11).search(&tic_tac_toe(), &budget)?);

        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_tree_reuse_across_turns() -> Result<(), SearchError> {
        let mut mcts = seeded(12);
        let start = tic_tac_toe();
        mcts.search(&start, &Budget::iterations(2_000))?;

        let next = start.apply_action(4).apply_action(0);
        let tree = mcts.tree().unwrap();
        let carried = tree.find(&next.canonical_id()).map_or(0, |id| tree.get(id).visits());
        assert!(carried > 0);

        let distribution = completed(mcts.search(&next, &Budget::iterations(500))?);
        assert_eq!(distribution.total(), carried + 500);
        assert_eq!(distribution.get(4), 0);
        assert_eq!(distribution.get(0), 0);

        let tree = mcts.tree().unwrap();
        assert_eq!(tree.root_node().state().canonical_id(), next.canonical_id());
        assert_eq!(tree.keys().count(), tree.reachable(tree.root()).len());
        Ok(())
    }

    #[test]
    fn test_unexplored_position_starts_fresh() -> Result<(), SearchError> {
        let mut mcts = seeded(13);
        let start = tic_tac_toe();
        mcts.search(&start, &Budget::iterations(20))?;

        let far = parse_board(GridRules::tic_tac_toe(), "XO. XO. ...", Player::X);
        assert!(mcts.tree().unwrap().find(&far.canonical_id()).is_none());

        let distribution = completed(mcts.search(&far, &Budget::iterations(30))?);
        assert_eq!(distribution.total(), 30);
        Ok(())
    }

    #[test]
    fn test_same_board_other_player_starts_fresh() -> Result<(), SearchError> {
        let mut mcts = seeded(16);
        mcts.search(&tic_tac_toe(), &Budget::iterations(50))?;

        let o_first = GridState::new(GridRules::tic_tac_toe(), Player::O);
        let distribution = completed(mcts.search(&o_first, &Budget::iterations(40))?);
        assert_eq!(distribution.total(), 40);

        let root = mcts.tree().unwrap().root_node();
        assert_eq!(root.state().player(), Player::O);
        assert!(root.edges().iter().all(|edge| edge.player() == Player::O));
        Ok(())
    }

    #[test]
    fn test_reset() -> Result<(), SearchError> {
        let mut mcts = seeded(14);
        mcts.search(&tic_tac_toe(), &Budget::iterations(20))?;
        mcts.cancel();
        mcts.reset();

        assert!(mcts.tree().is_none());
        assert_eq!(mcts.phase(), SearchPhase::Idle);
        assert!(!mcts.search(&tic_tac_toe(), &Budget::iterations(20))?.is_aborted());
        Ok(())
    }

    #[test]
    fn test_time_budget_with_floor() -> Result<(), SearchError> {
        let mut mcts = seeded(15);
        let budget = Budget::time_with_floor(Duration::ZERO, 64);

        assert_eq!(completed(mcts.search(&tic_tac_toe(), &budget)?).total(), 64);
        Ok(())
    }

    #[test]
    fn test_four_in_a_row_search() -> Result<(), SearchError> {
        let rules = GridRules::four(6).unwrap();
        let mut mcts = seeded(16);
        let state = GridState::new(rules, Player::O);

        let distribution = completed(mcts.search(&state, &Budget::iterations(300))?);

        assert_eq!(distribution.len(), 36);
        assert_eq!(distribution.total(), 300);
        // Interior cells are not playable on an empty board.
        assert_eq!(distribution.get(rules.side() + 1), 0);
        let stats = mcts.stats().unwrap();
        assert_eq!(stats.root_visits, 300);
        assert!(stats.max_depth >= 2);
        Ok(())
    }
}
