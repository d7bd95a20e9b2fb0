//! Edge selection rules used to descend the tree.

use crate::tree::Edge;

/// Rule choosing which edge to follow from an expanded node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Upper Confidence bound applied to Trees: every unvisited edge is tried
    /// once, in order, before `Q + c * sqrt(ln(N_total) / N)` is maximised.
    Uct,
    /// Prior-guided UCT: maximises `Q + c * P * sqrt(N_total) / (1 + N)`.
    /// Edges without a prior are treated as uniformly likely.
    Puct,
}

/// The UCT score of an edge with `n > 0` visits.
///
/// # Parameters
/// - `q`: mean value of the edge.
/// - `n`: visits of the edge.
/// - `total`: visits summed over all edges of the node.
/// - `exploration_coef`: the exploration coefficient.
#[inline]
pub fn uct_score(q: f64, n: f64, total: f64, exploration_coef: f64) -> f64 {
    q + exploration_coef * (total.ln() / n).sqrt()
}

/// The PUCT score of an edge.
///
/// # Parameters
/// - `q`: mean value of the edge.
/// - `prior`: prior probability of the edge's action.
/// - `n`: visits of the edge.
/// - `total`: visits summed over all edges of the node.
/// - `exploration_coef`: the exploration coefficient.
#[inline]
pub fn puct_score(q: f64, prior: f64, n: f64, total: f64, exploration_coef: f64) -> f64 {
    q + exploration_coef * prior * total.sqrt() / (1. + n)
}

impl Selection {
    /// Picks the index of the edge to follow.
    ///
    /// Ties go to the first maximum. When no edge has been visited yet the
    /// first edge is returned, so `ln(0)` is never evaluated.
    ///
    /// # Returns
    /// `None` only if `edges` is empty.
    pub fn select(self, edges: &[Edge], exploration_coef: f64) -> Option<usize> {
        let total: u32 = edges.iter().map(Edge::n).sum();
        if total == 0 {
            return if edges.is_empty() { None } else { Some(0) };
        }

        if self == Selection::Uct {
            if let Some(unvisited) = edges.iter().position(|e| e.n() == 0) {
                return Some(unvisited);
            }
        }

        let total = total as f64;
        let uniform = 1. / edges.len() as f64;
        let mut best: Option<(usize, f64)> = None;

        for (index, edge) in edges.iter().enumerate() {
            let n = edge.n() as f64;
            let score = match self {
                Selection::Uct => uct_score(edge.q(), n, total, exploration_coef),
                Selection::Puct => {
                    let prior = edge.prior().map_or(uniform, f64::from);
                    puct_score(edge.q(), prior, n, total, exploration_coef)
                }
            };

            if best.map_or(true, |(_, max)| score > max) {
                best = Some((index, score));
            }
        }

        best.map(|(index, _)| index)
    }

    /// Exploration score of one edge, as used by [`Selection::select`].
    ///
    /// Unvisited edges score `f64::INFINITY` under UCT.
    pub fn score(self, edge: &Edge, total: u32, edge_count: usize, exploration_coef: f64) -> f64 {
        let n = edge.n() as f64;
        match self {
            Selection::Uct if edge.n() == 0 => f64::INFINITY,
            Selection::Uct => uct_score(edge.q(), n, total as f64, exploration_coef),
            Selection::Puct => {
                let prior = edge.prior().map_or(1. / edge_count as f64, f64::from);
                puct_score(edge.q(), prior, n, total as f64, exploration_coef)
            }
        }
    }
}
