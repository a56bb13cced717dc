//! Authoritative game state machines.
//!
//! Each game is an independent pure state machine behind the [`GameEngine`]
//! contract. Engines do no I/O and hold no timers; randomness enters only at
//! construction (seating, shuffling). All rejections are values, never
//! panics, so a hostile client can at worst earn itself an `error_msg`.
//!
//! ## Determinism requirements
//! - No wall-clock time inside engines.
//! - Randomness is seeded at construction; `apply` is a pure function of
//!   engine state.
//! - `auto_fallback` must return a legal action or `None`, and must not
//!   mutate state.

pub mod checkers;
pub mod chess;
pub mod dominoes;
pub mod gomoku;
pub mod mancala;
pub mod tictactoe;

mod grid;

use rand::RngCore;
use serde_json::Value;
use stakemate_types::{GameAction, MatchKey, Seat};
use thiserror::Error;

pub use stakemate_types::GameType;

/// Structured rejection kinds. The `Display` form is the wire error code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("game-over")]
    GameOver,
    #[error("not-your-turn")]
    NotYourTurn,
    /// The action shape does not belong to this game, or a field is out of
    /// range for the current position.
    #[error("invalid-action")]
    InvalidAction,
    #[error("illegal-move")]
    IllegalMove,
    /// The moved piece does not belong to the acting seat.
    #[error("wrong-piece")]
    WrongPiece,
    /// Checkers: a capture is available, so quiet moves are rejected.
    #[error("must-capture")]
    MustCapture,
    /// Checkers: a multi-jump is pending; only the jumping piece may move.
    #[error("must-continue-jump")]
    MustContinueJump,
    /// Chess: castling with the king in, through, or into check.
    #[error("king-moves-through-attacked")]
    CastleThroughCheck,
    /// Dominoes: passing while the boneyard still has tiles.
    #[error("draw-required")]
    DrawRequired,
}

/// How the match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    Winner(Seat),
    Draw,
}

/// Result of a successfully applied action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The game continues. The next mover is whatever `current_seat` now
    /// reports (extra-turn rules keep it on the actor).
    Applied,
    /// A dominoes round ended; the match continues after `next_round`.
    RoundOver,
    /// Terminal. No further actions will ever be accepted.
    GameOver(Termination),
}

/// Uniform contract every game implements.
///
/// The room layer drives engines exclusively through this trait; nothing
/// game-specific leaks past it except the shape of the per-seat view.
pub trait GameEngine: Send {
    /// Apply `action` for `seat`. Either mutates and reports an [`Outcome`],
    /// or leaves the state untouched and reports an [`EngineError`].
    fn apply(&mut self, seat: Seat, action: &GameAction) -> Result<Outcome, EngineError>;

    /// The projection of the state visible to `seat`.
    fn view(&self, seat: Seat) -> Value;

    /// The action to inject when `seat`'s turn clock expires. `None` means
    /// the position has no legal action for that seat.
    fn auto_fallback(&self, seat: Seat) -> Option<GameAction>;

    fn current_seat(&self) -> Seat;

    fn is_over(&self) -> bool;

    /// Dominoes only: a round ended but the match has not.
    fn is_round_over(&self) -> bool {
        false
    }
}

/// Construct the engine for a match key. Randomness is consumed here and
/// never again.
pub fn new_engine(key: &MatchKey, rng: &mut dyn RngCore) -> Box<dyn GameEngine> {
    match key.game_type {
        GameType::Tictactoe => Box::new(tictactoe::TicTacToe::new(
            key.grid_size.unwrap_or(3),
            rng,
        )),
        GameType::Morpion => Box::new(gomoku::Gomoku::new()),
        GameType::Mancala => Box::new(mancala::Mancala::new()),
        GameType::Checkers => Box::new(checkers::Checkers::new()),
        GameType::Chess => Box::new(chess::Chess::new()),
        GameType::Dominoes => Box::new(dominoes::Dominoes::new(rng)),
    }
}

/// Serialize a view struct, collapsing the (unreachable) failure case.
fn to_view(value: impl serde::Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use stakemate_types::MatchKey;

    #[test]
    fn test_factory_builds_every_game() {
        let mut rng = StdRng::seed_from_u64(7);
        for &game_type in GameType::all() {
            let key = MatchKey::new(game_type, 100, Some(3));
            let engine = new_engine(&key, &mut rng);
            assert!(!engine.is_over(), "{game_type} must start in progress");
            assert!(engine.current_seat() <= 1);
        }
    }

    #[test]
    fn test_resign_is_uniform() {
        let mut rng = StdRng::seed_from_u64(7);
        for &game_type in GameType::all() {
            let key = MatchKey::new(game_type, 100, None);
            let mut engine = new_engine(&key, &mut rng);
            let outcome = engine
                .apply(0, &GameAction::Resign)
                .unwrap_or_else(|err| panic!("{game_type} rejected resign: {err}"));
            assert_eq!(outcome, Outcome::GameOver(Termination::Winner(1)));
            assert!(engine.is_over());
            // Post-terminal actions are rejected everywhere.
            assert_eq!(
                engine.apply(1, &GameAction::Resign),
                Err(EngineError::GameOver)
            );
        }
    }

    #[test]
    fn test_error_codes_are_wire_stable() {
        assert_eq!(EngineError::NotYourTurn.to_string(), "not-your-turn");
        assert_eq!(EngineError::MustCapture.to_string(), "must-capture");
        assert_eq!(
            EngineError::CastleThroughCheck.to_string(),
            "king-moves-through-attacked"
        );
        assert_eq!(EngineError::DrawRequired.to_string(), "draw-required");
    }
}
