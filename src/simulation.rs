//! Frontier evaluation: random rollouts or a single evaluator call.

use rand::{rngs::StdRng, seq::IndexedRandom};

use crate::{Evaluator, Game, SearchError};

/// How a newly reached frontier position is valued.
pub enum Simulation {
    /// Play uniformly random valid actions until the game ends.
    Rollout,
    /// Ask an evaluator for a value and the priors of the frontier's actions.
    Guided(Box<dyn Evaluator + Send>),
}

/// Result of simulating a frontier position.
#[derive(Clone, Debug, PartialEq)]
pub struct LeafValue {
    /// Value for the player to move at the frontier.
    pub value: f64,
    /// Priors indexed by action, present in guided mode.
    pub priors: Option<Vec<f32>>,
}

impl Simulation {
    /// Values a non-terminal frontier position.
    ///
    /// # Errors
    /// Evaluator failures and policy vectors whose length differs from the
    /// game's action count.
    pub fn simulate<G: Game>(&self, state: &G, rng: &mut StdRng) -> Result<LeafValue, SearchError> {
        match self {
            Simulation::Rollout => Ok(LeafValue { value: rollout(state, rng), priors: None }),
            Simulation::Guided(evaluator) => {
                let evaluation = evaluator.evaluate(&state.canonical_board())?;

                if evaluation.policy.len() != state.action_count() {
                    return Err(SearchError::MalformedEvaluation {
                        expected: state.action_count(),
                        got: evaluation.policy.len(),
                    });
                }

                Ok(LeafValue {
                    value: f64::from(evaluation.value),
                    priors: Some(evaluation.policy),
                })
            }
        }
    }

    #[inline]
    pub fn is_guided(&self) -> bool {
        matches!(self, Simulation::Guided(_))
    }
}

/// Plays random valid actions from `state` to the end of the game.
///
/// # Returns
/// The final result seen from the player to move at `state`: the terminal
/// value is negated when the player to move at the end differs.
pub fn rollout<G: Game>(state: &G, rng: &mut StdRng) -> f64 {
    let player = state.player();
    let mut current = state.clone();

    while !current.is_terminal() {
        match current.valid_actions().choose(rng) {
            Some(&action) => current = current.apply_action(action),
            None => break,
        }
    }

    if current.player() == player {
        current.terminal_value()
    } else {
        -current.terminal_value()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::{
        test_utils::{parse_board, FailingEvaluator, ScriptedEvaluator},
        GridRules, GridState, Player, UniformEvaluator,
    };

    #[test]
    fn test_rollout_terminal_state() {
        let mut rng = StdRng::seed_from_u64(1);
        let state = parse_board(GridRules::tic_tac_toe(), "XXX OO. ...", Player::O);

        assert_eq!(rollout(&state, &mut rng), -1.0);
    }

    #[test]
    fn test_rollout_forced_win_for_mover() {
        let mut rng = StdRng::seed_from_u64(7);
        // X to move, only cell 8 left and it completes the diagonal.
        let state = parse_board(GridRules::tic_tac_toe(), "XOX OXO OX.", Player::X);

        for _ in 0..10 {
            assert_eq!(rollout(&state, &mut rng), 1.0);
        }
    }

    #[test]
    fn test_rollout_mixed_outcomes() {
        let mut rng = StdRng::seed_from_u64(3);
        // X to move with cells 5 and 8 left: 8 wins, 5 leads to a draw.
        let state = parse_board(GridRules::tic_tac_toe(), "XOO .X. XO.", Player::O).apply_action(3);

        let value = rollout(&state, &mut rng);
        assert!(value == 1.0 || value == 0.0);
    }

    #[test]
    fn test_rollout_values_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let state = GridState::new(GridRules::four(6).unwrap(), Player::X);

        for _ in 0..20 {
            let value = rollout(&state, &mut rng);
            assert!(value == 1.0 || value == 0.0 || value == -1.0);
        }
    }

    #[test]
    fn test_rollout_simulation_has_no_priors() {
        let mut rng = StdRng::seed_from_u64(5);
        let state = GridState::new(GridRules::tic_tac_toe(), Player::X);

        let leaf = Simulation::Rollout.simulate(&state, &mut rng).unwrap();
        assert!(leaf.priors.is_none());
        assert!(!Simulation::Rollout.is_guided());
    }

    #[test]
    fn test_guided_simulation() {
        let mut rng = StdRng::seed_from_u64(5);
        let state = GridState::new(GridRules::tic_tac_toe(), Player::X);
        let mut policy = vec![0.0; 9];
        policy[0] = 0.5;
        policy[1] = 0.5;
        let simulation = Simulation::Guided(Box::new(ScriptedEvaluator::new(0.25, policy)));

        let leaf = simulation.simulate(&state, &mut rng).unwrap();
        assert_eq!(leaf.value, 0.25);
        assert_eq!(leaf.priors.unwrap()[0], 0.5);
        assert!(simulation.is_guided());
    }

    #[test]
    fn test_guided_simulation_uniform() {
        let mut rng = StdRng::seed_from_u64(5);
        let state = GridState::new(GridRules::tic_tac_toe(), Player::X).apply_action(4);
        let simulation = Simulation::Guided(Box::new(UniformEvaluator::new()));

        let leaf = simulation.simulate(&state, &mut rng).unwrap();
        let priors = leaf.priors.unwrap();
        assert_eq!(priors[4], 0.0);
        assert!((priors[0] - 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_guided_simulation_malformed_policy() {
        let mut rng = StdRng::seed_from_u64(5);
        let state = GridState::new(GridRules::tic_tac_toe(), Player::X);
        let simulation = Simulation::Guided(Box::new(ScriptedEvaluator::new(0.0, vec![1.0; 4])));

        match simulation.simulate(&state, &mut rng) {
            Err(SearchError::MalformedEvaluation { expected, got }) => {
                assert_eq!(expected, 9);
                assert_eq!(got, 4);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_guided_simulation_evaluator_failure() {
        let mut rng = StdRng::seed_from_u64(5);
        let state = GridState::new(GridRules::tic_tac_toe(), Player::X);
        let simulation = Simulation::Guided(Box::new(FailingEvaluator));

        assert!(matches!(simulation.simulate(&state, &mut rng), Err(SearchError::Evaluator(_))));
    }
}
