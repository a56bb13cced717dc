//! Shared vocabulary for the stakemate match server.
//!
//! Defines the game identifiers, seat indices, match keys, and the JSON wire
//! events exchanged with clients. Pure data: no I/O, no runtime dependencies.

pub mod api;

pub use api::{
    ActiveGameSummary, ClientEvent, GameOverPayload, LobbyEntry, PlayerInfo, ServerEvent,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a player within a room. Always 0 or 1.
pub type Seat = u8;

/// The other seat of a two-player room.
pub const fn opponent(seat: Seat) -> Seat {
    1 - seat
}

/// Stake and payout amounts, in the smallest ledger unit.
pub type Amount = u64;

/// Supported games.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Tictactoe,
    Morpion,
    Mancala,
    Checkers,
    Chess,
    Dominoes,
}

impl GameType {
    pub fn all() -> &'static [GameType] {
        &[
            GameType::Tictactoe,
            GameType::Morpion,
            GameType::Mancala,
            GameType::Checkers,
            GameType::Chess,
            GameType::Dominoes,
        ]
    }

    /// Display name for lobby listings.
    pub fn name(&self) -> &'static str {
        match self {
            GameType::Tictactoe => "Tic-Tac-Toe",
            GameType::Morpion => "Morpion",
            GameType::Mancala => "Mancala",
            GameType::Checkers => "Checkers",
            GameType::Chess => "Chess",
            GameType::Dominoes => "Dominoes",
        }
    }

    /// Nominal per-turn budget in milliseconds. `None` means the game is
    /// played without a turn clock.
    pub fn turn_budget_ms(&self) -> Option<u64> {
        match self {
            GameType::Tictactoe => None,
            GameType::Dominoes => Some(15_000),
            GameType::Mancala => Some(20_000),
            GameType::Checkers => Some(30_000),
            GameType::Morpion => Some(30_000),
            GameType::Chess => Some(60_000),
        }
    }

    /// Whether `find_match` accepts a `gridSize` option for this game.
    pub fn has_grid_option(&self) -> bool {
        matches!(self, GameType::Tictactoe)
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            GameType::Tictactoe => "tictactoe",
            GameType::Morpion => "morpion",
            GameType::Mancala => "mancala",
            GameType::Checkers => "checkers",
            GameType::Chess => "chess",
            GameType::Dominoes => "dominoes",
        };
        f.write_str(tag)
    }
}

/// Matchmaking key: two seekers pair up only when all three parts agree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub game_type: GameType,
    pub stake: Amount,
    pub grid_size: Option<u8>,
}

impl MatchKey {
    pub fn new(game_type: GameType, stake: Amount, grid_size: Option<u8>) -> Self {
        // The option only differentiates games that actually use it.
        let grid_size = if game_type.has_grid_option() {
            grid_size
        } else {
            None
        };
        Self {
            game_type,
            stake,
            grid_size,
        }
    }
}

/// A game action as sent by a client. Engines reject shapes that do not
/// belong to their game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GameAction {
    /// Tic-tac-toe / morpion: claim a cell (row-major index).
    Place { cell: u16 },
    /// Mancala: sow from one of the mover's pits.
    Sow { pit: u8 },
    /// Chess (algebraic squares) and checkers (cell indices as strings).
    Move {
        from: String,
        to: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        promotion: Option<String>,
    },
    /// Dominoes: play a tile from the hand onto one end of the line.
    Play {
        #[serde(rename = "tileIndex")]
        tile_index: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        side: Option<PlaySide>,
    },
    /// Dominoes: draw one tile from the boneyard.
    Draw,
    /// Dominoes: pass (legal only with an empty boneyard).
    Pass,
    /// Dominoes: start the next round after a round ends.
    NextRound,
    /// Any game: concede the match.
    Resign,
}

/// Which end of the domino line to play against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaySide {
    Left,
    Right,
}
