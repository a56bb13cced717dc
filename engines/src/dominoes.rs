//! Draw-mode dominoes, double-six set, first to 50 points.
//!
//! Seven tiles each, remainder in the boneyard. The holder of the highest
//! double opens the first round (seat 0 when nobody holds one). A seat with
//! no playable tile must draw while the boneyard lasts; passing is only
//! legal on an empty boneyard. Two consecutive passes block the round:
//! the lighter hand scores the pip difference. Emptying a hand scores the
//! opponent's remaining pips. Rounds repeat until a score reaches 50.
//!
//! The shuffling RNG is seeded once at construction; every later deal is a
//! deterministic function of engine state.

use crate::{to_view, EngineError, GameEngine, Outcome, Termination};
use rand::{rngs::StdRng, seq::SliceRandom, RngCore, SeedableRng};
use serde::Serialize;
use serde_json::Value;
use stakemate_types::{opponent, GameAction, PlaySide, Seat};

const HAND_SIZE: usize = 7;
const TARGET_SCORE: u32 = 50;

/// One tile; `0` and `1` are pip counts, orientation-free in the hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Tile(pub u8, pub u8);

impl Tile {
    fn is_double(self) -> bool {
        self.0 == self.1
    }

    fn pips(self) -> u32 {
        (self.0 + self.1) as u32
    }

    fn has(self, pip: u8) -> bool {
        self.0 == pip || self.1 == pip
    }

    fn flipped(self) -> Tile {
        Tile(self.1, self.0)
    }
}

fn full_set() -> Vec<Tile> {
    let mut tiles = Vec::with_capacity(28);
    for a in 0..=6u8 {
        for b in a..=6 {
            tiles.push(Tile(a, b));
        }
    }
    tiles
}

pub struct Dominoes {
    hands: [Vec<Tile>; 2],
    boneyard: Vec<Tile>,
    /// Oriented left-to-right: `line[0].0` is the open left pip, the last
    /// tile's `.1` the open right pip.
    line: Vec<Tile>,
    scores: [u32; 2],
    current: Seat,
    round_starter: Seat,
    consecutive_passes: u8,
    round_over: bool,
    winner: Option<Seat>,
    over: bool,
    rng: StdRng,
}

impl Dominoes {
    pub fn new(rng: &mut dyn RngCore) -> Self {
        let mut engine = Self {
            hands: [Vec::new(), Vec::new()],
            boneyard: Vec::new(),
            line: Vec::new(),
            scores: [0, 0],
            current: 0,
            round_starter: 0,
            consecutive_passes: 0,
            round_over: false,
            winner: None,
            over: false,
            rng: StdRng::seed_from_u64(rng.next_u64()),
        };
        engine.deal();
        engine
    }

    fn deal(&mut self) {
        let mut tiles = full_set();
        tiles.shuffle(&mut self.rng);
        self.hands[0] = tiles[..HAND_SIZE].to_vec();
        self.hands[1] = tiles[HAND_SIZE..2 * HAND_SIZE].to_vec();
        self.boneyard = tiles[2 * HAND_SIZE..].to_vec();
        self.line.clear();
        self.consecutive_passes = 0;
        self.round_over = false;

        // Highest double opens; previous starter keeps the seat otherwise.
        let mut best: Option<(u8, Seat)> = None;
        for seat in [0u8, 1] {
            for tile in &self.hands[seat as usize] {
                if tile.is_double() && best.map_or(true, |(pip, _)| tile.0 > pip) {
                    best = Some((tile.0, seat));
                }
            }
        }
        if let Some((_, seat)) = best {
            self.round_starter = seat;
        }
        self.current = self.round_starter;
    }

    fn ends(&self) -> Option<(u8, u8)> {
        let first = self.line.first()?;
        let last = self.line.last()?;
        Some((first.0, last.1))
    }

    fn playable(&self, tile: Tile) -> bool {
        match self.ends() {
            None => true,
            Some((left, right)) => tile.has(left) || tile.has(right),
        }
    }

    fn has_playable(&self, seat: Seat) -> bool {
        self.hands[seat as usize]
            .iter()
            .any(|&tile| self.playable(tile))
    }

    fn hand_pips(&self, seat: Seat) -> u32 {
        self.hands[seat as usize].iter().map(|t| t.pips()).sum()
    }

    fn play(
        &mut self,
        seat: Seat,
        tile_index: usize,
        side: Option<PlaySide>,
    ) -> Result<Outcome, EngineError> {
        if self.round_over {
            return Err(EngineError::IllegalMove);
        }
        let hand = &self.hands[seat as usize];
        let Some(&tile) = hand.get(tile_index) else {
            return Err(EngineError::InvalidAction);
        };

        match self.ends() {
            None => {
                // Empty board accepts any tile; the side hint is moot.
                self.line.push(tile);
            }
            Some((left, right)) => {
                let fits_left = tile.has(left);
                let fits_right = tile.has(right);
                let side = match side {
                    Some(side) => side,
                    None => match (fits_left, fits_right) {
                        (true, false) => PlaySide::Left,
                        (false, true) => PlaySide::Right,
                        // Ambiguous or impossible without a side.
                        (true, true) => return Err(EngineError::InvalidAction),
                        (false, false) => return Err(EngineError::IllegalMove),
                    },
                };
                match side {
                    PlaySide::Left => {
                        if !fits_left {
                            return Err(EngineError::IllegalMove);
                        }
                        let oriented = if tile.1 == left { tile } else { tile.flipped() };
                        self.line.insert(0, oriented);
                    }
                    PlaySide::Right => {
                        if !fits_right {
                            return Err(EngineError::IllegalMove);
                        }
                        let oriented = if tile.0 == right { tile } else { tile.flipped() };
                        self.line.push(oriented);
                    }
                }
            }
        }

        self.hands[seat as usize].remove(tile_index);
        self.consecutive_passes = 0;

        if self.hands[seat as usize].is_empty() {
            let points = self.hand_pips(opponent(seat));
            return Ok(self.end_round(Some(seat), points));
        }

        self.current = opponent(seat);
        Ok(Outcome::Applied)
    }

    fn draw(&mut self, seat: Seat) -> Result<Outcome, EngineError> {
        if self.round_over {
            return Err(EngineError::IllegalMove);
        }
        if self.has_playable(seat) {
            return Err(EngineError::IllegalMove);
        }
        let Some(tile) = self.boneyard.pop() else {
            return Err(EngineError::IllegalMove);
        };
        self.hands[seat as usize].push(tile);
        self.consecutive_passes = 0;
        // Drawing keeps the turn: the seat plays or draws again.
        Ok(Outcome::Applied)
    }

    fn pass(&mut self, seat: Seat) -> Result<Outcome, EngineError> {
        if self.round_over {
            return Err(EngineError::IllegalMove);
        }
        if !self.boneyard.is_empty() {
            return Err(EngineError::DrawRequired);
        }
        if self.has_playable(seat) {
            return Err(EngineError::IllegalMove);
        }
        self.consecutive_passes += 1;
        if self.consecutive_passes >= 2 {
            // Blocked: the lighter hand scores the difference.
            let (own, other) = (self.hand_pips(seat), self.hand_pips(opponent(seat)));
            return Ok(match own.cmp(&other) {
                std::cmp::Ordering::Less => self.end_round(Some(seat), other - own),
                std::cmp::Ordering::Greater => {
                    self.end_round(Some(opponent(seat)), own - other)
                }
                std::cmp::Ordering::Equal => self.end_round(None, 0),
            });
        }
        self.current = opponent(seat);
        Ok(Outcome::Applied)
    }

    fn end_round(&mut self, round_winner: Option<Seat>, points: u32) -> Outcome {
        if let Some(seat) = round_winner {
            self.scores[seat as usize] += points;
            if self.scores[seat as usize] >= TARGET_SCORE {
                self.over = true;
                self.winner = Some(seat);
                return Outcome::GameOver(Termination::Winner(seat));
            }
            // Round winner opens the next round unless a double outranks.
            self.round_starter = seat;
        }
        self.round_over = true;
        Outcome::RoundOver
    }

    fn next_round(&mut self) -> Result<Outcome, EngineError> {
        if !self.round_over {
            return Err(EngineError::InvalidAction);
        }
        self.deal();
        Ok(Outcome::Applied)
    }
}

#[derive(Serialize)]
struct View {
    #[serde(rename = "gameType")]
    game_type: &'static str,
    hand: Vec<Tile>,
    #[serde(rename = "opponentTileCount")]
    opponent_tile_count: usize,
    #[serde(rename = "boneyardCount")]
    boneyard_count: usize,
    line: Vec<Tile>,
    #[serde(rename = "leftEnd", skip_serializing_if = "Option::is_none")]
    left_end: Option<u8>,
    #[serde(rename = "rightEnd", skip_serializing_if = "Option::is_none")]
    right_end: Option<u8>,
    #[serde(rename = "currentPlayer")]
    current_player: Seat,
    scores: [u32; 2],
    #[serde(rename = "roundOver")]
    round_over: bool,
    #[serde(rename = "gameOver")]
    game_over: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    winner: Option<Seat>,
}

impl GameEngine for Dominoes {
    fn apply(&mut self, seat: Seat, action: &GameAction) -> Result<Outcome, EngineError> {
        if self.over {
            return Err(EngineError::GameOver);
        }
        if let GameAction::Resign = action {
            self.over = true;
            self.winner = Some(opponent(seat));
            return Ok(Outcome::GameOver(Termination::Winner(opponent(seat))));
        }
        // Either seat may start the next round; everything else is
        // turn-gated.
        if let GameAction::NextRound = action {
            return self.next_round();
        }
        if seat != self.current {
            return Err(EngineError::NotYourTurn);
        }
        match action {
            GameAction::Play { tile_index, side } => {
                self.play(seat, *tile_index as usize, *side)
            }
            GameAction::Draw => self.draw(seat),
            GameAction::Pass => self.pass(seat),
            _ => Err(EngineError::InvalidAction),
        }
    }

    fn view(&self, seat: Seat) -> Value {
        let ends = self.ends();
        to_view(View {
            game_type: "dominoes",
            hand: self.hands[seat as usize].clone(),
            opponent_tile_count: self.hands[opponent(seat) as usize].len(),
            boneyard_count: self.boneyard.len(),
            line: self.line.clone(),
            left_end: ends.map(|(left, _)| left),
            right_end: ends.map(|(_, right)| right),
            current_player: self.current,
            scores: self.scores,
            round_over: self.round_over,
            game_over: self.over,
            winner: self.winner,
        })
    }

    fn auto_fallback(&self, seat: Seat) -> Option<GameAction> {
        if self.round_over {
            return Some(GameAction::NextRound);
        }
        let ends = self.ends();
        for (index, &tile) in self.hands[seat as usize].iter().enumerate() {
            if !self.playable(tile) {
                continue;
            }
            let side = ends.map(|(left, _)| {
                if tile.has(left) {
                    PlaySide::Left
                } else {
                    PlaySide::Right
                }
            });
            return Some(GameAction::Play {
                tile_index: index as u8,
                side,
            });
        }
        if !self.boneyard.is_empty() {
            return Some(GameAction::Draw);
        }
        Some(GameAction::Pass)
    }

    fn current_seat(&self) -> Seat {
        self.current
    }

    fn is_over(&self) -> bool {
        self.over
    }

    fn is_round_over(&self) -> bool {
        self.round_over && !self.over
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn new_engine() -> Dominoes {
        let mut rng = StdRng::seed_from_u64(99);
        Dominoes::new(&mut rng)
    }

    fn all_tiles(engine: &Dominoes) -> Vec<Tile> {
        let mut tiles: Vec<Tile> = engine.hands[0]
            .iter()
            .chain(engine.hands[1].iter())
            .chain(engine.boneyard.iter())
            .copied()
            .collect();
        // Board tiles may be flipped; normalise for comparison.
        tiles.extend(
            engine
                .line
                .iter()
                .map(|t| if t.0 <= t.1 { *t } else { t.flipped() }),
        );
        tiles.sort_by_key(|t| (t.0, t.1));
        tiles
    }

    #[test]
    fn test_deal_shapes() {
        let engine = new_engine();
        assert_eq!(engine.hands[0].len(), 7);
        assert_eq!(engine.hands[1].len(), 7);
        assert_eq!(engine.boneyard.len(), 14);
        let mut expected = full_set();
        expected.sort_by_key(|t| (t.0, t.1));
        assert_eq!(all_tiles(&engine), expected);
    }

    #[test]
    fn test_highest_double_opens() {
        let mut engine = new_engine();
        engine.hands[0] = vec![Tile(1, 2), Tile(3, 4)];
        engine.hands[1] = vec![Tile(5, 5), Tile(0, 1)];
        engine.round_starter = 0;
        engine.current = 0;
        // Re-run the starter rule the way deal() applies it.
        let mut best: Option<(u8, Seat)> = None;
        for seat in [0u8, 1] {
            for tile in &engine.hands[seat as usize] {
                if tile.is_double() && best.map_or(true, |(pip, _)| tile.0 > pip) {
                    best = Some((tile.0, seat));
                }
            }
        }
        assert_eq!(best, Some((5, 1)));
    }

    #[test]
    fn test_play_matches_ends_and_flips() {
        let mut engine = new_engine();
        engine.hands[0] = vec![Tile(3, 5), Tile(0, 0)];
        engine.hands[1] = vec![Tile(5, 2), Tile(6, 6)];
        engine.boneyard.clear();
        engine.line = vec![];
        engine.current = 0;

        engine
            .apply(0, &GameAction::Play { tile_index: 0, side: None })
            .expect("any tile on an empty board");
        assert_eq!(engine.ends(), Some((3, 5)));

        // (5,2) only fits the right end (pip 5); no side hint needed.
        engine
            .apply(1, &GameAction::Play { tile_index: 0, side: None })
            .expect("unambiguous side");
        assert_eq!(engine.ends(), Some((3, 2)));

        assert_eq!(
            engine.apply(0, &GameAction::Play { tile_index: 5, side: None }),
            Err(EngineError::InvalidAction),
            "out-of-range hand index is invalid"
        );
    }

    #[test]
    fn test_unmatched_tile_rejected() {
        let mut engine = new_engine();
        engine.hands[0] = vec![Tile(3, 3), Tile(6, 6)];
        engine.hands[1] = vec![Tile(1, 2)];
        engine.line = vec![Tile(4, 5)];
        engine.current = 0;
        assert_eq!(
            engine.apply(0, &GameAction::Play { tile_index: 1, side: None }),
            Err(EngineError::IllegalMove)
        );
    }

    #[test]
    fn test_pass_requires_empty_boneyard() {
        let mut engine = new_engine();
        engine.hands[0] = vec![Tile(1, 1)];
        engine.line = vec![Tile(4, 5)];
        engine.current = 0;
        assert!(!engine.boneyard.is_empty());
        assert_eq!(engine.apply(0, &GameAction::Pass), Err(EngineError::DrawRequired));
    }

    #[test]
    fn test_draw_rejected_with_playable_tile() {
        let mut engine = new_engine();
        engine.hands[0] = vec![Tile(4, 1)];
        engine.line = vec![Tile(4, 5)];
        engine.current = 0;
        assert_eq!(engine.apply(0, &GameAction::Draw), Err(EngineError::IllegalMove));
    }

    #[test]
    fn test_draw_keeps_turn() {
        let mut engine = new_engine();
        engine.hands[0] = vec![Tile(1, 1)];
        engine.line = vec![Tile(4, 5)];
        engine.boneyard = vec![Tile(0, 0), Tile(2, 2)];
        engine.current = 0;
        engine.apply(0, &GameAction::Draw).expect("draw is forced");
        assert_eq!(engine.current_seat(), 0);
        assert_eq!(engine.hands[0].len(), 2);
    }

    #[test]
    fn test_blocked_round_scores_difference() {
        let mut engine = new_engine();
        // Seat 0 holds 12 pips, seat 1 holds 20; nothing fits (1,1) ends.
        engine.hands[0] = vec![Tile(6, 6)];
        engine.hands[1] = vec![Tile(5, 5), Tile(4, 6)];
        engine.boneyard.clear();
        engine.line = vec![Tile(1, 1)];
        engine.current = 0;

        engine.apply(0, &GameAction::Pass).expect("first pass");
        let outcome = engine.apply(1, &GameAction::Pass).expect("second pass");
        assert_eq!(outcome, Outcome::RoundOver);
        assert!(engine.is_round_over());
        assert_eq!(engine.scores, [8, 0]);

        // next_round re-deals full hands.
        engine.apply(0, &GameAction::NextRound).expect("round restart");
        assert!(!engine.is_round_over());
        assert_eq!(engine.hands[0].len(), 7);
        assert_eq!(engine.hands[1].len(), 7);
    }

    #[test]
    fn test_blocked_tie_scores_nothing() {
        let mut engine = new_engine();
        engine.hands[0] = vec![Tile(6, 6)];
        engine.hands[1] = vec![Tile(6, 6)];
        engine.boneyard.clear();
        engine.line = vec![Tile(1, 1)];
        engine.current = 0;
        engine.apply(0, &GameAction::Pass).expect("first pass");
        let outcome = engine.apply(1, &GameAction::Pass).expect("second pass");
        assert_eq!(outcome, Outcome::RoundOver);
        assert_eq!(engine.scores, [0, 0]);
    }

    #[test]
    fn test_going_out_scores_opponent_pips_and_match_win() {
        let mut engine = new_engine();
        engine.scores = [45, 0];
        engine.hands[0] = vec![Tile(1, 4)];
        engine.hands[1] = vec![Tile(3, 3)];
        engine.boneyard.clear();
        engine.line = vec![Tile(4, 1)];
        engine.current = 0;
        let outcome = engine
            .apply(0, &GameAction::Play { tile_index: 0, side: Some(PlaySide::Left) })
            .expect("tile fits the left end");
        // 45 + 6 pips crosses 50.
        assert_eq!(outcome, Outcome::GameOver(Termination::Winner(0)));
        assert_eq!(engine.scores[0], 51);
    }

    #[test]
    fn test_next_round_only_when_round_over() {
        let mut engine = new_engine();
        assert_eq!(
            engine.apply(0, &GameAction::NextRound),
            Err(EngineError::InvalidAction)
        );
    }

    #[test]
    fn test_view_hides_opponent_hand() {
        let mut engine = new_engine();
        engine.hands[0] = vec![Tile(1, 2)];
        engine.hands[1] = vec![Tile(5, 6), Tile(0, 0)];
        engine.line = vec![Tile(2, 3)];
        engine.scores = [13, 17];

        let view = engine.view(0);
        assert_eq!(
            view.get("opponentTileCount").and_then(|v| v.as_u64()),
            Some(2)
        );
        let text = view.to_string();
        for fragment in ["[5,6]", "[6,5]", "[0,0]"] {
            assert!(
                !text.contains(fragment),
                "opponent tile {fragment} leaked into view"
            );
        }
        assert!(text.contains("[1,2]"), "own hand must be visible");
    }

    #[test]
    fn test_fallback_plays_then_draws_then_passes() {
        let mut engine = new_engine();
        engine.hands[0] = vec![Tile(2, 2), Tile(4, 0)];
        engine.line = vec![Tile(4, 5)];
        engine.boneyard = vec![Tile(0, 0)];
        engine.current = 0;
        assert_eq!(
            engine.auto_fallback(0),
            Some(GameAction::Play {
                tile_index: 1,
                side: Some(PlaySide::Left),
            })
        );

        engine.hands[0] = vec![Tile(2, 2)];
        assert_eq!(engine.auto_fallback(0), Some(GameAction::Draw));

        engine.boneyard.clear();
        assert_eq!(engine.auto_fallback(0), Some(GameAction::Pass));
    }
}
