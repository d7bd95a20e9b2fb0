//! Test utilities for the search engine

use std::collections::HashMap;

use crate::{
    Agent, Evaluation, Evaluator, EvaluatorError, Game, GridRules, GridState, Player, SearchError,
};

/// Builds a grid position from a compact picture of the board.
///
/// `X`, `O` and `.` are read row by row; whitespace is ignored.
///
/// # Panics
/// On any other character or when the cell count does not match `rules`.
pub fn parse_board(rules: GridRules, rows: &str, to_move: Player) -> GridState {
    let board = rows
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            'X' => Some(Player::X),
            'O' => Some(Player::O),
            '.' => None,
            other => panic!("unexpected cell {other:?}"),
        })
        .collect();

    GridState::from_board(rules, board, to_move).expect("invalid test board")
}

/// An evaluator returning the same value and policy for every position.
pub struct ScriptedEvaluator {
    value: f32,
    policy: Vec<f32>,
}

impl ScriptedEvaluator {
    pub fn new(value: f32, policy: Vec<f32>) -> Self {
        ScriptedEvaluator { value, policy }
    }
}

impl Evaluator for ScriptedEvaluator {
    fn evaluate(&self, _canonical_board: &[f32]) -> Result<Evaluation, EvaluatorError> {
        Ok(Evaluation { policy: self.policy.clone(), value: self.value })
    }
}

/// An evaluator that always fails.
pub struct FailingEvaluator;

impl Evaluator for FailingEvaluator {
    fn evaluate(&self, _canonical_board: &[f32]) -> Result<Evaluation, EvaluatorError> {
        Err(EvaluatorError::EvaluationFailed("scripted failure".to_string()))
    }
}

/// Exact game value for the player to move, by exhaustive negamax.
///
/// Only practical for small games such as tic-tac-toe.
pub fn negamax<G: Game>(state: &G) -> f64 {
    negamax_memo(state, &mut HashMap::new())
}

fn negamax_memo<G: Game>(state: &G, memo: &mut HashMap<(G::Id, Player), f64>) -> f64 {
    if state.is_terminal() {
        return state.terminal_value();
    }

    let key = (state.canonical_id(), state.player());
    if let Some(&value) = memo.get(&key) {
        return value;
    }

    let value = state
        .valid_actions()
        .iter()
        .map(|&action| -negamax_memo(&state.apply_action(action), memo))
        .fold(f64::NEG_INFINITY, f64::max);

    memo.insert(key, value);
    value
}

/// Every action reaching the exact game value, in action order.
pub fn optimal_actions<G: Game>(state: &G) -> Vec<usize> {
    let mut memo = HashMap::new();
    let children: Vec<(usize, f64)> = state
        .valid_actions()
        .iter()
        .map(|&action| (action, -negamax_memo(&state.apply_action(action), &mut memo)))
        .collect();

    let best = children.iter().map(|(_, value)| *value).fold(f64::NEG_INFINITY, f64::max);
    children.into_iter().filter(|(_, value)| *value == best).map(|(action, _)| action).collect()
}

/// A deterministic perfect player: the first optimal action.
pub struct PerfectAgent;

impl<G: Game> Agent<G> for PerfectAgent {
    fn select_action(&mut self, state: &G) -> Result<Option<usize>, SearchError> {
        Ok(optimal_actions(state).first().copied())
    }
}

/// Utility function to compare float slices with tolerance
///
/// # Returns
/// `true` if both slices have the same length and all elements are
/// approximately equal
pub fn compare_array(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-8)
}
