//! Square-grid games: tic-tac-toe and "N in a row" with adjacency-gated moves.

use std::fmt;

use thiserror::Error;

use crate::{Game, Player};

/// Errors raised when building rules or positions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("board side must be at least 1")]
    EmptyBoard,

    #[error("win length {win_length} does not fit on a {side}x{side} board")]
    InvalidWinLength { win_length: usize, side: usize },

    #[error("expected {expected} cells, got {got}")]
    CellCount { expected: usize, got: usize },
}

/// Line directions scanned for a win: row, column, diagonal, anti-diagonal.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Rules of a grid game.
///
/// The board is `side × side`, a player wins by owning `win_length` cells in a
/// straight line, and when `adjacency_gated` is set a cell may only be played
/// if it lies on the border or touches an occupied cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridRules {
    side: usize,
    win_length: usize,
    adjacency_gated: bool,
}

impl GridRules {
    /// Creates rules, rejecting boards that cannot host a winning line.
    pub fn new(side: usize, win_length: usize, adjacency_gated: bool) -> Result<Self, GridError> {
        if side == 0 {
            return Err(GridError::EmptyBoard);
        }
        if win_length == 0 || win_length > side {
            return Err(GridError::InvalidWinLength { win_length, side });
        }

        Ok(GridRules { side, win_length, adjacency_gated })
    }

    /// Classical 3×3 tic-tac-toe.
    pub const fn tic_tac_toe() -> Self {
        GridRules { side: 3, win_length: 3, adjacency_gated: false }
    }

    /// Four in a row on a `side × side` board with adjacency-gated moves.
    pub fn four(side: usize) -> Result<Self, GridError> {
        Self::new(side, 4, true)
    }

    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    #[inline]
    pub fn win_length(&self) -> usize {
        self.win_length
    }

    #[inline]
    pub fn adjacency_gated(&self) -> bool {
        self.adjacency_gated
    }

    /// Number of cells, which is also the size of the action space.
    #[inline]
    pub fn cells(&self) -> usize {
        self.side * self.side
    }

    fn is_border(&self, cell: usize) -> bool {
        let (row, col) = (cell / self.side, cell % self.side);
        row == 0 || col == 0 || row == self.side - 1 || col == self.side - 1
    }

    fn offset(&self, cell: usize, dr: isize, dc: isize) -> Option<usize> {
        let row = (cell / self.side) as isize + dr;
        let col = (cell % self.side) as isize + dc;
        let side = self.side as isize;

        if row < 0 || col < 0 || row >= side || col >= side {
            None
        } else {
            Some((row * side + col) as usize)
        }
    }

    fn has_occupied_neighbor(&self, board: &[Option<Player>], cell: usize) -> bool {
        (-1..=1)
            .flat_map(|dr| (-1..=1).map(move |dc| (dr, dc)))
            .filter(|&(dr, dc)| dr != 0 || dc != 0)
            .filter_map(|(dr, dc)| self.offset(cell, dr, dc))
            .any(|neighbor| board[neighbor].is_some())
    }

    fn is_valid(&self, board: &[Option<Player>], cell: usize) -> bool {
        board[cell].is_none()
            && (!self.adjacency_gated
                || self.is_border(cell)
                || self.has_occupied_neighbor(board, cell))
    }

    fn valid_actions(&self, board: &[Option<Player>]) -> Vec<usize> {
        (0..self.cells()).filter(|&cell| self.is_valid(board, cell)).collect()
    }

    fn run_length(
        &self,
        board: &[Option<Player>],
        cell: usize,
        player: Player,
        dr: isize,
        dc: isize,
    ) -> usize {
        let mut length = 0;
        let mut current = cell;

        while let Some(next) = self.offset(current, dr, dc) {
            if board[next] != Some(player) {
                break;
            }
            length += 1;
            current = next;
        }

        length
    }

    /// Whether the stone of `player` on `cell` belongs to a winning line.
    fn completes_line(&self, board: &[Option<Player>], cell: usize, player: Player) -> bool {
        DIRECTIONS.iter().any(|&(dr, dc)| {
            let forward = self.run_length(board, cell, player, dr, dc);
            let backward = self.run_length(board, cell, player, -dr, -dc);
            1 + forward + backward >= self.win_length
        })
    }

    fn has_line(&self, board: &[Option<Player>], player: Player) -> bool {
        (0..self.cells())
            .any(|cell| board[cell] == Some(player) && self.completes_line(board, cell, player))
    }
}

/// Transposition identity of a grid position: the signed cell contents.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GridId(Vec<i8>);

/// An immutable position of a grid game.
#[derive(Clone, Debug, PartialEq)]
pub struct GridState {
    rules: GridRules,
    board: Vec<Option<Player>>,
    player: Player,
    valid: Vec<usize>,
    winner: Option<Player>,
}

impl GridState {
    /// Creates the empty board with `first` to move.
    pub fn new(rules: GridRules, first: Player) -> Self {
        let board = vec![None; rules.cells()];
        let valid = rules.valid_actions(&board);

        GridState { rules, board, player: first, valid, winner: None }
    }

    /// Creates an arbitrary position.
    ///
    /// A line already completed by either player makes the position terminal.
    pub fn from_board(
        rules: GridRules,
        board: Vec<Option<Player>>,
        to_move: Player,
    ) -> Result<Self, GridError> {
        if board.len() != rules.cells() {
            return Err(GridError::CellCount { expected: rules.cells(), got: board.len() });
        }

        let winner = [to_move.opponent(), to_move].into_iter().find(|&p| rules.has_line(&board, p));
        let valid = if winner.is_some() { Vec::new() } else { rules.valid_actions(&board) };

        Ok(GridState { rules, board, player: to_move, valid, winner })
    }

    #[inline]
    pub fn rules(&self) -> &GridRules {
        &self.rules
    }

    #[inline]
    pub fn board(&self) -> &[Option<Player>] {
        &self.board
    }

    /// The player who completed a line, if any.
    #[inline]
    pub fn winner(&self) -> Option<Player> {
        self.winner
    }
}

impl Game for GridState {
    type Id = GridId;

    #[inline]
    fn action_count(&self) -> usize {
        self.rules.cells()
    }

    #[inline]
    fn player(&self) -> Player {
        self.player
    }

    #[inline]
    fn valid_actions(&self) -> &[usize] {
        &self.valid
    }

    #[inline]
    fn is_terminal(&self) -> bool {
        self.winner.is_some() || self.valid.is_empty()
    }

    fn terminal_value(&self) -> f64 {
        match self.winner {
            Some(winner) if winner == self.player => 1.0,
            Some(_) => -1.0,
            None => 0.0,
        }
    }

    fn apply_action(&self, action: usize) -> Self {
        assert!(
            self.valid.contains(&action),
            "action {action} is not valid in this position"
        );

        let mut board = self.board.clone();
        board[action] = Some(self.player);

        let winner = self.rules.completes_line(&board, action, self.player).then_some(self.player);
        let valid = if winner.is_some() { Vec::new() } else { self.rules.valid_actions(&board) };

        GridState { rules: self.rules, board, player: self.player.opponent(), valid, winner }
    }

    fn canonical_id(&self) -> GridId {
        GridId(self.board.iter().map(|cell| cell.map_or(0, Player::sign)).collect())
    }

    fn canonical_board(&self) -> Vec<f32> {
        let own = self.player.sign();
        self.board
            .iter()
            .map(|cell| cell.map_or(0.0, |p| (p.sign() * own) as f32))
            .collect()
    }
}

impl fmt::Display for GridState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.board.chunks(self.rules.side) {
            for cell in row {
                let c = match cell {
                    Some(Player::X) => 'X',
                    Some(Player::O) => 'O',
                    None => '.',
                };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
