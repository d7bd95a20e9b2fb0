//! Evaluator errors and the uniform stand-in evaluator.
//!
//! Real evaluators wrap a policy/value model and live outside this crate.
//! The uniform evaluator lets guided search run without a model.

use thiserror::Error;

use crate::{Evaluation, Evaluator};

/// Errors an [`Evaluator`] may report.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("invalid input: expected a board of {expected} cells, got {got}")]
    InvalidInput { expected: usize, got: usize },
}

/// Evaluator that spreads the prior uniformly over empty cells and always
/// returns a neutral value.
#[derive(Debug, Clone, Default)]
pub struct UniformEvaluator {
    cells: Option<usize>,
}

impl UniformEvaluator {
    /// Accepts boards of any size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects boards that do not have exactly `cells` cells, like a model
    /// with a fixed input shape.
    pub fn with_cells(cells: usize) -> Self {
        UniformEvaluator { cells: Some(cells) }
    }
}

impl Evaluator for UniformEvaluator {
    fn evaluate(&self, canonical_board: &[f32]) -> Result<Evaluation, EvaluatorError> {
        if let Some(expected) = self.cells.filter(|&n| n != canonical_board.len()) {
            return Err(EvaluatorError::InvalidInput { expected, got: canonical_board.len() });
        }

        let empty = canonical_board.iter().filter(|&&cell| cell == 0.0).count();
        let mut policy = vec![0.0; canonical_board.len()];

        if empty > 0 {
            let prob = 1.0 / empty as f32;
            for (p, &cell) in policy.iter_mut().zip(canonical_board) {
                if cell == 0.0 {
                    *p = prob;
                }
            }
        }

        Ok(Evaluation { policy, value: 0.0 })
    }
}
