//! Mancala (kalaha), 4 seeds per pit.
//!
//! Pit layout, counter-clockwise: 0-5 are seat 0's pits, 6 is seat 0's
//! store, 7-12 are seat 1's pits, 13 is seat 1's store. Sowing skips the
//! opponent's store. Landing in the own store grants an extra turn; landing
//! in an own empty pit captures the opposite pit. When one side empties,
//! the other side is swept to its owner's store; equal stores give the win
//! to the last mover.

use crate::{to_view, EngineError, GameEngine, Outcome, Termination};
use serde::Serialize;
use serde_json::Value;
use stakemate_types::{opponent, GameAction, Seat};

const PITS: usize = 14;
const STORE: [usize; 2] = [6, 13];
const SEEDS_PER_PIT: u32 = 4;

pub struct Mancala {
    pits: [u32; PITS],
    current: Seat,
    last_mover: Seat,
    extra_turn: bool,
    winner: Option<Seat>,
    over: bool,
}

impl Mancala {
    pub fn new() -> Self {
        let mut pits = [SEEDS_PER_PIT; PITS];
        pits[STORE[0]] = 0;
        pits[STORE[1]] = 0;
        Self {
            pits,
            current: 0,
            last_mover: 0,
            extra_turn: false,
            winner: None,
            over: false,
        }
    }

    fn own_pits(seat: Seat) -> std::ops::Range<usize> {
        if seat == 0 {
            0..6
        } else {
            7..13
        }
    }

    fn owns_pit(seat: Seat, pit: usize) -> bool {
        Self::own_pits(seat).contains(&pit)
    }

    fn side_empty(&self, seat: Seat) -> bool {
        Self::own_pits(seat).all(|pit| self.pits[pit] == 0)
    }

    fn sow(&mut self, seat: Seat, pit: usize) -> Result<Outcome, EngineError> {
        if pit >= PITS || STORE.contains(&pit) {
            return Err(EngineError::InvalidAction);
        }
        if !Self::owns_pit(seat, pit) {
            return Err(EngineError::WrongPiece);
        }
        if self.pits[pit] == 0 {
            return Err(EngineError::IllegalMove);
        }

        let mut seeds = self.pits[pit];
        self.pits[pit] = 0;
        let skip = STORE[opponent(seat) as usize];
        let mut pos = pit;
        while seeds > 0 {
            pos = (pos + 1) % PITS;
            if pos == skip {
                continue;
            }
            self.pits[pos] += 1;
            seeds -= 1;
        }

        self.last_mover = seat;
        let own_store = STORE[seat as usize];
        self.extra_turn = pos == own_store;

        // Capture: last seed into an own, previously empty pit whose
        // opposite holds seeds.
        if !self.extra_turn && Self::owns_pit(seat, pos) && self.pits[pos] == 1 {
            let opposite = 12 - pos;
            if self.pits[opposite] > 0 {
                self.pits[own_store] += self.pits[opposite] + 1;
                self.pits[opposite] = 0;
                self.pits[pos] = 0;
            }
        }

        if self.side_empty(0) || self.side_empty(1) {
            return Ok(self.finish());
        }

        if !self.extra_turn {
            self.current = opponent(seat);
        }
        Ok(Outcome::Applied)
    }

    /// Sweep the remaining seeds and decide the winner.
    fn finish(&mut self) -> Outcome {
        for seat in [0u8, 1] {
            let store = STORE[seat as usize];
            for pit in Self::own_pits(seat) {
                self.pits[store] += self.pits[pit];
                self.pits[pit] = 0;
            }
        }
        self.over = true;
        // Equal stores award the last mover.
        let winner = match self.pits[STORE[0]].cmp(&self.pits[STORE[1]]) {
            std::cmp::Ordering::Greater => 0,
            std::cmp::Ordering::Less => 1,
            std::cmp::Ordering::Equal => self.last_mover,
        };
        self.winner = Some(winner);
        Outcome::GameOver(Termination::Winner(winner))
    }
}

impl Default for Mancala {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct View {
    #[serde(rename = "gameType")]
    game_type: &'static str,
    pits: [u32; PITS],
    #[serde(rename = "currentPlayer")]
    current_player: Seat,
    #[serde(rename = "extraTurn")]
    extra_turn: bool,
    #[serde(rename = "gameOver")]
    game_over: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    winner: Option<Seat>,
}

impl GameEngine for Mancala {
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
            GameAction::Sow { pit } => self.sow(seat, *pit as usize),
            _ => Err(EngineError::InvalidAction),
        }
    }

    fn view(&self, _seat: Seat) -> Value {
        to_view(View {
            game_type: "mancala",
            pits: self.pits,
            current_player: self.current,
            extra_turn: self.extra_turn,
            game_over: self.over,
            winner: self.winner,
        })
    }

    fn auto_fallback(&self, seat: Seat) -> Option<GameAction> {
        Self::own_pits(seat)
            .find(|&pit| self.pits[pit] > 0)
            .map(|pit| GameAction::Sow { pit: pit as u8 })
    }

    fn current_seat(&self) -> Seat {
        self.current
    }

    fn is_over(&self) -> bool {
        self.over
    }
}
