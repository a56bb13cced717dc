//! Static per-game metadata backing lobby listings and bet validation.

use stakemate_types::{Amount, GameType};

/// Metadata about a game for lobby display and stake validation.
#[derive(Clone, Debug)]
pub struct GameInfo {
    pub game_type: GameType,
    pub name: &'static str,
    pub min_stake: Amount,
    pub max_stake: Amount,
    /// Grid sizes accepted by `find_match`, when the game has the option.
    pub grid_sizes: &'static [u8],
}

impl GameInfo {
    const fn new(
        game_type: GameType,
        name: &'static str,
        min_stake: Amount,
        max_stake: Amount,
        grid_sizes: &'static [u8],
    ) -> Self {
        Self {
            game_type,
            name,
            min_stake,
            max_stake,
            grid_sizes,
        }
    }
}

pub fn get_info(game_type: GameType) -> GameInfo {
    match game_type {
        GameType::Tictactoe => GameInfo::new(
            GameType::Tictactoe,
            "Tic-Tac-Toe",
            1,
            100_000,
            &[3, 5, 7],
        ),
        GameType::Morpion => GameInfo::new(GameType::Morpion, "Morpion", 1, 100_000, &[]),
        GameType::Mancala => GameInfo::new(GameType::Mancala, "Mancala", 1, 100_000, &[]),
        GameType::Checkers => GameInfo::new(GameType::Checkers, "Checkers", 1, 500_000, &[]),
        GameType::Chess => GameInfo::new(GameType::Chess, "Chess", 1, 500_000, &[]),
        GameType::Dominoes => GameInfo::new(GameType::Dominoes, "Dominoes", 1, 100_000, &[]),
    }
}

/// Validate a `find_match` request against the registry.
pub fn validate_bet(
    game_type: GameType,
    stake: Amount,
    grid_size: Option<u8>,
) -> Result<(), &'static str> {
    let info = get_info(game_type);
    if stake < info.min_stake || stake > info.max_stake {
        return Err("Invalid bet amount");
    }
    if let Some(size) = grid_size {
        if !info.grid_sizes.is_empty() && !info.grid_sizes.contains(&size) {
            return Err("Invalid grid size");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_game_has_info() {
        for &game_type in GameType::all() {
            let info = get_info(game_type);
            assert_eq!(info.game_type, game_type);
            assert!(info.min_stake <= info.max_stake);
        }
    }

    #[test]
    fn test_validate_bet() {
        assert!(validate_bet(GameType::Chess, 100, None).is_ok());
        assert!(validate_bet(GameType::Chess, 0, None).is_err());
        assert!(validate_bet(GameType::Tictactoe, 10, Some(5)).is_ok());
        assert!(validate_bet(GameType::Tictactoe, 10, Some(4)).is_err());
        // Games without the option ignore the field.
        assert!(validate_bet(GameType::Chess, 10, Some(4)).is_ok());
    }
}
