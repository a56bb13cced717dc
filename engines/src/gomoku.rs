//! Gomoku ("morpion") on a fixed 15×15 board, win length 5.
//!
//! No swap rule, no opening restriction; seat 0 always opens. Termination
//! scans the four directions through the last placed cell.

use crate::{grid, to_view, EngineError, GameEngine, Outcome, Termination};
use serde::Serialize;
use serde_json::Value;
use stakemate_types::{opponent, GameAction, Seat};

pub const BOARD: usize = 15;
const WIN_LEN: usize = 5;

pub struct Gomoku {
    board: Vec<Option<Seat>>,
    current: Seat,
    move_count: usize,
    last_move: Option<usize>,
    winner: Option<Seat>,
    winning_cells: Vec<usize>,
    over: bool,
}

impl Gomoku {
    pub fn new() -> Self {
        Self {
            board: vec![None; BOARD * BOARD],
            current: 0,
            move_count: 0,
            last_move: None,
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
        self.last_move = Some(cell);

        if let Some(run) = grid::winning_run(&self.board, BOARD, cell, WIN_LEN) {
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

    /// Empty neighbours of `cell`, row-major order.
    fn empty_adjacent(&self, cell: usize) -> Option<usize> {
        let (row, col) = ((cell / BOARD) as isize, (cell % BOARD) as isize);
        for dr in -1isize..=1 {
            for dc in -1isize..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let (r, c) = (row + dr, col + dc);
                if r < 0 || c < 0 || r as usize >= BOARD || c as usize >= BOARD {
                    continue;
                }
                let idx = (r as usize) * BOARD + c as usize;
                if self.board[idx].is_none() {
                    return Some(idx);
                }
            }
        }
        None
    }
}

impl Default for Gomoku {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct View {
    #[serde(rename = "gameType")]
    game_type: &'static str,
    board: Vec<Option<Seat>>,
    #[serde(rename = "currentPlayer")]
    current_player: Seat,
    #[serde(rename = "moveCount")]
    move_count: usize,
    #[serde(rename = "lastMove", skip_serializing_if = "Option::is_none")]
    last_move: Option<usize>,
    #[serde(rename = "gameOver")]
    game_over: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    winner: Option<Seat>,
    #[serde(rename = "winningCells", skip_serializing_if = "Vec::is_empty")]
    winning_cells: Vec<usize>,
}

impl GameEngine for Gomoku {
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
            game_type: "morpion",
            board: self.board.clone(),
            current_player: self.current,
            move_count: self.move_count,
            last_move: self.last_move,
            game_over: self.over,
            winner: self.winner,
            winning_cells: self.winning_cells.clone(),
        })
    }

    fn auto_fallback(&self, _seat: Seat) -> Option<GameAction> {
        let center = (BOARD / 2) * BOARD + BOARD / 2;
        let cell = if self.board[center].is_none() {
            Some(center)
        } else {
            self.last_move
                .and_then(|last| self.empty_adjacent(last))
                .or_else(|| self.board.iter().position(Option::is_none))
        };
        cell.map(|cell| GameAction::Place { cell: cell as u16 })
    }

    fn current_seat(&self) -> Seat {
        self.current
    }

    fn is_over(&self) -> bool {
        self.over
    }
}
