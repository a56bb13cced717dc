//! Tic-tac-toe on square grids of 3, 5, or 7.
//!
//! Win length is 3 on the classic board and 4 on the larger ones. Cells are
//! numbered row-major. The opening seat is drawn at construction.

use crate::{grid, to_view, EngineError, GameEngine, Outcome, Termination};
use rand::RngCore;
use serde::Serialize;
use serde_json::Value;
use stakemate_types::{opponent, GameAction, Seat};

pub struct TicTacToe {
    n: usize,
    win_len: usize,
    board: Vec<Option<Seat>>,
    current: Seat,
    move_count: usize,
    winner: Option<Seat>,
    winning_cells: Vec<usize>,
    over: bool,
}

impl TicTacToe {
    pub fn new(grid_size: u8, rng: &mut dyn RngCore) -> Self {
        let n = match grid_size {
            5 => 5,
            7 => 7,
            _ => 3,
        };
        let win_len = if n == 3 { 3 } else { 4 };
        Self {
            n,
            win_len,
            board: vec![None; n * n],
            current: (rng.next_u32() % 2) as Seat,
            move_count: 0,
            winner: None,
            winning_cells: Vec::new(),
            over: false,
        }
    }

    fn place(&mut self, seat: Seat, cell: usize) -> Result<Outcome, EngineError> {
        if cell >= self.board.len() {
            return Err(EngineError::InvalidAction);
        }
        if self.board[cell].is_some() {
            return Err(EngineError::IllegalMove);
        }

        self.board[cell] = Some(seat);
        self.move_count += 1;

        if let Some(run) = grid::winning_run(&self.board, self.n, cell, self.win_len) {
            self.winning_cells = run;
            self.winner = Some(seat);
            self.over = true;
            return Ok(Outcome::GameOver(Termination::Winner(seat)));
        }
        if self.move_count == self.board.len() {
            self.over = true;
            return Ok(Outcome::GameOver(Termination::Draw));
        }

        self.current = opponent(seat);
        Ok(Outcome::Applied)
    }
}

#[derive(Serialize)]
struct View {
    #[serde(rename = "gameType")]
    game_type: &'static str,
    #[serde(rename = "gridSize")]
    grid_size: usize,
    #[serde(rename = "winLength")]
    win_length: usize,
    /// `null` for empty, else the owning seat.
    board: Vec<Option<Seat>>,
    #[serde(rename = "currentPlayer")]
    current_player: Seat,
    #[serde(rename = "moveCount")]
    move_count: usize,
    #[serde(rename = "gameOver")]
    game_over: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    winner: Option<Seat>,
    #[serde(rename = "winningCells", skip_serializing_if = "Vec::is_empty")]
    winning_cells: Vec<usize>,
}

impl GameEngine for TicTacToe {
    fn apply(&mut self, seat: Seat, action: &GameAction) -> Result<Outcome, EngineError> {
        if self.over {
            return Err(EngineError::GameOver);
        }
        if let GameAction::Resign = action {
            self.over = true;
            self.winner = Some(opponent(seat));
            return Ok(Outcome::GameOver(Termination::Winner(opponent(seat))));
        }
        if seat != self.current {
            return Err(EngineError::NotYourTurn);
        }
        match action {
            GameAction::Place { cell } => self.place(seat, *cell as usize),
            _ => Err(EngineError::InvalidAction),
        }
    }

    fn view(&self, _seat: Seat) -> Value {
        to_view(View {
            game_type: "tictactoe",
            grid_size: self.n,
            win_length: self.win_len,
            board: self.board.clone(),
            current_player: self.current,
            move_count: self.move_count,
            game_over: self.over,
            winner: self.winner,
            winning_cells: self.winning_cells.clone(),
        })
    }

    fn auto_fallback(&self, _seat: Seat) -> Option<GameAction> {
        self.board
            .iter()
            .position(Option::is_none)
            .map(|cell| GameAction::Place { cell: cell as u16 })
    }

    fn current_seat(&self) -> Seat {
        self.current
    }

    fn is_over(&self) -> bool {
        self.over
    }
}
