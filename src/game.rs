//! Module defining the traits for games and evaluators consumed by the search.

use std::{fmt::Debug, hash::Hash};

use crate::EvaluatorError;

/// One of the two players of a zero-sum, alternating-move game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Player {
    X,
    O,
}

impl Player {
    /// Returns the other player.
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }

    /// Returns `1` for `X` and `-1` for `O`, the encoding used by canonical boards.
    #[inline]
    pub fn sign(self) -> i8 {
        match self {
            Player::X => 1,
            Player::O => -1,
        }
    }
}

/// Trait defining the interface for a game position that can be searched.
///
/// A value implementing this trait is one immutable position: the board, the
/// player to move, the valid actions and, when the game is over, the result.
/// Transitions never mutate the receiver.
///
/// Actions are identified by their index, from 0 to `action_count() - 1`.
///
/// Equality compares whole positions: board, player to move and rules. It
/// decides whether a stored search tree may be reused for a position.
pub trait Game: Clone + PartialEq {
    /// Identity of a position, used to merge transpositions in the search tree.
    ///
    /// It must be a pure function of the board content: two positions with the
    /// same board produce equal ids whatever the move order that reached them.
    type Id: Clone + Eq + Hash + Debug;

    /// Returns the size of the action space, i.e. the length of policy and
    /// visit-count vectors for this game.
    fn action_count(&self) -> usize;

    /// Returns the player to move in this position.
    fn player(&self) -> Player;

    /// Returns the actions that may be played from this position.
    ///
    /// The slice is empty when the position is terminal.
    ///
    /// # Examples
    /// ```rust
    /// use grid_mcts::{Game, GridRules, GridState, Player};
    /// let state = GridState::new(GridRules::tic_tac_toe(), Player::X);
    /// assert_eq!(state.valid_actions(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
    /// ```
    fn valid_actions(&self) -> &[usize];

    /// Determines if the game is over in this position.
    fn is_terminal(&self) -> bool;

    /// Returns the result of a finished game, seen from the player to move.
    ///
    /// Because the player to move did not make the last move, a win by the
    /// previous mover is reported as `-1.0`. A draw, or a position that is not
    /// terminal, is `0.0`.
    ///
    /// # Examples
    /// ```rust
    /// use grid_mcts::{Game, GridRules, GridState, Player};
    /// let state = GridState::new(GridRules::tic_tac_toe(), Player::X)
    ///     .apply_action(0).apply_action(3)
    ///     .apply_action(1).apply_action(4)
    ///     .apply_action(2);
    /// assert!(state.is_terminal());
    /// assert_eq!(state.player(), Player::O);
    /// assert_eq!(state.terminal_value(), -1.0);
    /// ```
    fn terminal_value(&self) -> f64;

    /// Returns the position reached by playing `action`.
    ///
    /// # Panics
    /// `action` must be one of `valid_actions()`. Anything else is a
    /// programming error and implementations panic.
    fn apply_action(&self, action: usize) -> Self;

    /// Returns the transposition identity of this position.
    fn canonical_id(&self) -> Self::Id;

    /// Encodes the board from the point of view of the player to move:
    /// own stones `1.0`, opponent stones `-1.0`, empty cells `0.0`.
    fn canonical_board(&self) -> Vec<f32>;
}

/// Output of an [`Evaluator`]: a prior over actions and a value estimate.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    /// Prior probability of each action, indexed by action.
    pub policy: Vec<f32>,
    /// Estimated outcome for the player to move, in `[-1, 1]`.
    pub value: f32,
}

/// Trait for evaluating positions, typically a policy/value network.
///
/// The search only ever calls it in guided mode, once per newly reached
/// frontier position, with the canonical board of that position.
pub trait Evaluator {
    /// Evaluates a canonical board.
    ///
    /// # Parameters
    /// - `canonical_board`: the board as produced by [`Game::canonical_board`].
    ///
    /// # Returns
    /// The prior policy and the value estimate, or an error if the input could
    /// not be evaluated. Errors abort the search; they are never defaulted.
    ///
    /// # Examples
    /// ```rust
    /// use grid_mcts::{Evaluator, UniformEvaluator};
    /// let evaluator = UniformEvaluator::new();
    /// let evaluation = evaluator.evaluate(&[0.0, 1.0, 0.0, -1.0]).unwrap();
    /// assert_eq!(evaluation.policy, vec![0.5, 0.0, 0.5, 0.0]);
    /// assert_eq!(evaluation.value, 0.0);
    /// ```
    fn evaluate(&self, canonical_board: &[f32]) -> Result<Evaluation, EvaluatorError>;
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn evaluate(&self, canonical_board: &[f32]) -> Result<Evaluation, EvaluatorError> {
        (**self).evaluate(canonical_board)
    }
}
