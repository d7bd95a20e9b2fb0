//! A Rust library providing a Monte Carlo Tree Search (MCTS) engine for
//! two-player grid games such as tic-tac-toe and "four in a row" on an
//! N×N board.
//!
//! The engine supports plain UCT with random rollouts and prior-guided PUCT
//! driven by an external evaluator. Its search tree merges transpositions,
//! survives between moves so that earlier statistics are reused, and is
//! searched under an iteration and/or time budget with progress reporting and
//! cooperative cancellation.
//!
//! # Modules
//! - `game`: Defines the `Game` and `Evaluator` traits consumed by the search.
//! - `grid`: Tic-tac-toe and N-in-a-row rules implementing `Game`.
//! - `evaluator`: Evaluator errors and a uniform stand-in evaluator.
//! - `tree`: Arena search tree with transposition merging and pruning.
//! - `selection`: UCT and PUCT edge selection.
//! - `simulation`: Random rollouts and evaluator calls at the frontier.
//! - `budget`: Iteration and time budgets.
//! - `mcts`: The search session and its budgeted loop.
//! - `distribution`: Visit distributions and move selection.
//! - `agent`: Players built on the search.
//! - `utils`: Contains general utility functions.
//! - `test_utils`: Provides helper implementations for testing the search.
//!
//! # Examples
//! ```rust
//! use grid_mcts::{
//!     Budget, Game, GridRules, GridState, Mcts, MctsConfig, MoveSelection, Player, SearchError,
//!     SearchOutcome,
//! };
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! fn main() -> Result<(), SearchError> {
//!     let mut mcts = Mcts::from_config(&MctsConfig::DEFAULT.with_seed(42));
//!     let mut rng = StdRng::seed_from_u64(42);
//!     let mut state = GridState::new(GridRules::tic_tac_toe(), Player::X);
//!
//!     while !state.is_terminal() {
//!         // The tree built for the previous move is reused here.
//!         let distribution = match mcts.search(&state, &Budget::iterations(1_000))? {
//!             SearchOutcome::Completed(distribution) => distribution,
//!             SearchOutcome::Aborted => break,
//!         };
//!
//!         match MoveSelection::MostVisited.select(&distribution, &mut rng) {
//!             Some(action) => state = state.apply_action(action),
//!             None => break,
//!         }
//!     }
//!
//!     println!("{state}");
//!     Ok(())
//! }
//! ```

mod agent;
mod budget;
mod distribution;
mod evaluator;
mod game;
mod grid;
mod mcts;
mod selection;
mod simulation;
mod tree;
pub mod utils;

#[doc(hidden)]
pub mod test_utils;

pub use agent::*;
pub use budget::Budget;
pub use distribution::*;
pub use evaluator::*;
pub use game::*;
pub use grid::*;
pub use mcts::*;
pub use selection::*;
pub use simulation::*;
pub use tree::*;
