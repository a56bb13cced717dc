//! Checkers, 8×8 American rules.
//!
//! Pieces live on dark squares ((row+col) odd). Seat 0 starts on rows 0-2
//! and moves toward row 7; seat 1 mirrors. Captures are mandatory, jumps
//! chain until exhausted, and promotion ends a jump chain immediately.
//! Squares travel the wire as row-major indices 0-63.

use crate::{to_view, EngineError, GameEngine, Outcome, Termination};
use serde::Serialize;
use serde_json::Value;
use stakemate_types::{opponent, GameAction, Seat};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Piece {
    owner: Seat,
    king: bool,
}

pub struct Checkers {
    board: [Option<Piece>; 64],
    current: Seat,
    must_continue_from: Option<usize>,
    winner: Option<Seat>,
    over: bool,
}

fn row(sq: usize) -> isize {
    (sq / 8) as isize
}

fn col(sq: usize) -> isize {
    (sq % 8) as isize
}

fn square(r: isize, c: isize) -> Option<usize> {
    if (0..8).contains(&r) && (0..8).contains(&c) {
        Some((r * 8 + c) as usize)
    } else {
        None
    }
}

/// Forward row direction for a seat's men.
fn forward(seat: Seat) -> isize {
    if seat == 0 {
        1
    } else {
        -1
    }
}

fn back_rank(seat: Seat) -> isize {
    if seat == 0 {
        7
    } else {
        0
    }
}

impl Checkers {
    pub fn new() -> Self {
        let mut board = [None; 64];
        for sq in 0..64 {
            if (row(sq) + col(sq)) % 2 != 1 {
                continue;
            }
            if row(sq) <= 2 {
                board[sq] = Some(Piece {
                    owner: 0,
                    king: false,
                });
            } else if row(sq) >= 5 {
                board[sq] = Some(Piece {
                    owner: 1,
                    king: false,
                });
            }
        }
        Self {
            board,
            current: 0,
            must_continue_from: None,
            winner: None,
            over: false,
        }
    }

    fn piece_dirs(piece: Piece) -> Vec<isize> {
        if piece.king {
            vec![1, -1]
        } else {
            vec![forward(piece.owner)]
        }
    }

    /// (to, captured) pairs for jumps available from `sq`.
    fn captures_from(&self, sq: usize) -> Vec<(usize, usize)> {
        let Some(piece) = self.board[sq] else {
            return Vec::new();
        };
        let mut jumps = Vec::new();
        for dr in Self::piece_dirs(piece) {
            for dc in [-1isize, 1] {
                let Some(mid) = square(row(sq) + dr, col(sq) + dc) else {
                    continue;
                };
                let Some(to) = square(row(sq) + 2 * dr, col(sq) + 2 * dc) else {
                    continue;
                };
                let enemy = self.board[mid].is_some_and(|p| p.owner != piece.owner);
                if enemy && self.board[to].is_none() {
                    jumps.push((to, mid));
                }
            }
        }
        jumps
    }

    fn quiet_from(&self, sq: usize) -> Vec<usize> {
        let Some(piece) = self.board[sq] else {
            return Vec::new();
        };
        let mut moves = Vec::new();
        for dr in Self::piece_dirs(piece) {
            for dc in [-1isize, 1] {
                if let Some(to) = square(row(sq) + dr, col(sq) + dc) {
                    if self.board[to].is_none() {
                        moves.push(to);
                    }
                }
            }
        }
        moves
    }

    fn squares_of(&self, seat: Seat) -> impl Iterator<Item = usize> + '_ {
        (0..64).filter(move |&sq| self.board[sq].is_some_and(|p| p.owner == seat))
    }

    fn any_capture(&self, seat: Seat) -> bool {
        self.squares_of(seat).any(|sq| !self.captures_from(sq).is_empty())
    }

    fn any_move(&self, seat: Seat) -> bool {
        self.squares_of(seat)
            .any(|sq| !self.captures_from(sq).is_empty() || !self.quiet_from(sq).is_empty())
    }

    fn do_move(&mut self, seat: Seat, from: usize, to: usize) -> Result<Outcome, EngineError> {
        let piece = self.board[from].ok_or(EngineError::IllegalMove)?;
        if piece.owner != seat {
            return Err(EngineError::WrongPiece);
        }
        if let Some(pending) = self.must_continue_from {
            if from != pending {
                return Err(EngineError::MustContinueJump);
            }
        }

        let is_jump = (row(to) - row(from)).abs() == 2;
        if is_jump {
            let Some((_, captured)) = self
                .captures_from(from)
                .into_iter()
                .find(|&(dest, _)| dest == to)
            else {
                return Err(EngineError::IllegalMove);
            };
            self.board[captured] = None;
            self.board[to] = Some(piece);
            self.board[from] = None;

            let promoted = !piece.king && row(to) == back_rank(seat);
            if promoted {
                self.board[to] = Some(Piece {
                    owner: seat,
                    king: true,
                });
            }

            // Promotion ends the chain; otherwise keep jumping while able.
            if !promoted && !self.captures_from(to).is_empty() {
                self.must_continue_from = Some(to);
                return Ok(Outcome::Applied);
            }
        } else {
            if self.any_capture(seat) {
                return Err(EngineError::MustCapture);
            }
            if !self.quiet_from(from).contains(&to) {
                return Err(EngineError::IllegalMove);
            }
            self.board[to] = Some(piece);
            self.board[from] = None;
            if !piece.king && row(to) == back_rank(seat) {
                self.board[to] = Some(Piece {
                    owner: seat,
                    king: true,
                });
            }
        }

        self.must_continue_from = None;
        let next = opponent(seat);
        if !self.any_move(next) {
            self.over = true;
            self.winner = Some(seat);
            return Ok(Outcome::GameOver(Termination::Winner(seat)));
        }
        self.current = next;
        Ok(Outcome::Applied)
    }

    fn parse_square(raw: &str) -> Result<usize, EngineError> {
        let sq: usize = raw.parse().map_err(|_| EngineError::InvalidAction)?;
        if sq < 64 {
            Ok(sq)
        } else {
            Err(EngineError::InvalidAction)
        }
    }
}

impl Default for Checkers {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct PieceView {
    player: Seat,
    king: bool,
}

#[derive(Serialize)]
struct View {
    #[serde(rename = "gameType")]
    game_type: &'static str,
    board: Vec<Option<PieceView>>,
    #[serde(rename = "currentPlayer")]
    current_player: Seat,
    #[serde(rename = "mustJumpFrom", skip_serializing_if = "Option::is_none")]
    must_jump_from: Option<usize>,
    #[serde(rename = "gameOver")]
    game_over: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    winner: Option<Seat>,
}

impl GameEngine for Checkers {
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
            GameAction::Move { from, to, .. } => {
                let from = Self::parse_square(from)?;
                let to = Self::parse_square(to)?;
                self.do_move(seat, from, to)
            }
            _ => Err(EngineError::InvalidAction),
        }
    }

    fn view(&self, _seat: Seat) -> Value {
        to_view(View {
            game_type: "checkers",
            board: self
                .board
                .iter()
                .map(|cell| {
                    cell.map(|p| PieceView {
                        player: p.owner,
                        king: p.king,
                    })
                })
                .collect(),
            current_player: self.current,
            must_jump_from: self.must_continue_from,
            game_over: self.over,
            winner: self.winner,
        })
    }

    fn auto_fallback(&self, seat: Seat) -> Option<GameAction> {
        let jump_move = |from: usize| {
            self.captures_from(from)
                .first()
                .map(|&(to, _)| GameAction::Move {
                    from: from.to_string(),
                    to: to.to_string(),
                    promotion: None,
                })
        };
        if let Some(pending) = self.must_continue_from {
            return jump_move(pending);
        }
        for sq in self.squares_of(seat) {
            if let Some(action) = jump_move(sq) {
                return Some(action);
            }
        }
        for sq in self.squares_of(seat) {
            if let Some(&to) = self.quiet_from(sq).first() {
                return Some(GameAction::Move {
                    from: sq.to_string(),
                    to: to.to_string(),
                    promotion: None,
                });
            }
        }
        None
    }

    fn current_seat(&self) -> Seat {
        self.current
    }

    fn is_over(&self) -> bool {
        self.over
    }
}
