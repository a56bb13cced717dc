//! Chess with the full rule set: castling, en passant, promotion,
//! checkmate and stalemate detection.
//!
//! Squares are indexed rank-major from a1 (0) to h8 (63); the wire uses
//! algebraic coordinates ("e2"). Seat 0 plays white. Legality is decided by
//! pseudo-legal generation followed by a speculative apply and a
//! king-safety test on the resulting position.
//!
//! The halfmove clock is tracked but neither the fifty-move rule nor
//! threefold repetition terminate a game here.

use crate::{to_view, EngineError, GameEngine, Outcome, Termination};
use serde::Serialize;
use serde_json::Value;
use stakemate_types::{opponent, GameAction, Seat};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Rook => 'R',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
        }
    }

    fn from_promotion(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "Q" => Some(PieceKind::Queen),
            "R" => Some(PieceKind::Rook),
            "B" => Some(PieceKind::Bishop),
            "N" => Some(PieceKind::Knight),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Piece {
    owner: Seat,
    kind: PieceKind,
}

const KNIGHT_STEPS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
];
const KING_STEPS: [(i8, i8); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];
const BISHOP_RAYS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ROOK_RAYS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

fn rank(sq: usize) -> i8 {
    (sq / 8) as i8
}

fn file(sq: usize) -> i8 {
    (sq % 8) as i8
}

fn at(r: i8, f: i8) -> Option<usize> {
    if (0..8).contains(&r) && (0..8).contains(&f) {
        Some((r as usize) * 8 + f as usize)
    } else {
        None
    }
}

fn pawn_dir(seat: Seat) -> i8 {
    if seat == 0 {
        1
    } else {
        -1
    }
}

fn home_rank(seat: Seat) -> i8 {
    if seat == 0 {
        0
    } else {
        7
    }
}

fn promotion_rank(seat: Seat) -> i8 {
    7 - home_rank(seat)
}

fn parse_square(raw: &str) -> Result<usize, EngineError> {
    let bytes = raw.as_bytes();
    if bytes.len() != 2 {
        return Err(EngineError::InvalidAction);
    }
    let f = (bytes[0] as i8) - b'a' as i8;
    let r = (bytes[1] as i8) - b'1' as i8;
    at(r, f).ok_or(EngineError::InvalidAction)
}

fn square_name(sq: usize) -> String {
    let f = (b'a' + (sq % 8) as u8) as char;
    let r = (b'1' + (sq / 8) as u8) as char;
    format!("{f}{r}")
}

/// Board, castling rights and en-passant window: everything a legality
/// probe needs to clone.
#[derive(Clone)]
struct Position {
    board: [Option<Piece>; 64],
    /// [seat][0 = kingside, 1 = queenside]
    rights: [[bool; 2]; 2],
    en_passant: Option<usize>,
}

impl Position {
    fn initial() -> Self {
        let mut board = [None; 64];
        let back = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        for f in 0..8 {
            board[f] = Some(Piece {
                owner: 0,
                kind: back[f],
            });
            board[8 + f] = Some(Piece {
                owner: 0,
                kind: PieceKind::Pawn,
            });
            board[48 + f] = Some(Piece {
                owner: 1,
                kind: PieceKind::Pawn,
            });
            board[56 + f] = Some(Piece {
                owner: 1,
                kind: back[f],
            });
        }
        Self {
            board,
            rights: [[true; 2]; 2],
            en_passant: None,
        }
    }

    fn king_square(&self, seat: Seat) -> Option<usize> {
        (0..64).find(|&sq| {
            self.board[sq]
                == Some(Piece {
                    owner: seat,
                    kind: PieceKind::King,
                })
        })
    }

    /// Is `sq` attacked by any piece of `by`?
    fn is_attacked(&self, sq: usize, by: Seat) -> bool {
        let (r, f) = (rank(sq), file(sq));

        // Pawns attack backwards relative to their own travel.
        let dir = pawn_dir(by);
        for df in [-1, 1] {
            if let Some(from) = at(r - dir, f + df) {
                if self.board[from]
                    == Some(Piece {
                        owner: by,
                        kind: PieceKind::Pawn,
                    })
                {
                    return true;
                }
            }
        }

        for (dr, df) in KNIGHT_STEPS {
            if let Some(from) = at(r + dr, f + df) {
                if self.board[from]
                    == Some(Piece {
                        owner: by,
                        kind: PieceKind::Knight,
                    })
                {
                    return true;
                }
            }
        }

        for (dr, df) in KING_STEPS {
            if let Some(from) = at(r + dr, f + df) {
                if self.board[from]
                    == Some(Piece {
                        owner: by,
                        kind: PieceKind::King,
                    })
                {
                    return true;
                }
            }
        }

        for (rays, kinds) in [
            (
                BISHOP_RAYS,
                [PieceKind::Bishop, PieceKind::Queen],
            ),
            (ROOK_RAYS, [PieceKind::Rook, PieceKind::Queen]),
        ] {
            for (dr, df) in rays {
                let (mut cr, mut cf) = (r + dr, f + df);
                while let Some(from) = at(cr, cf) {
                    if let Some(piece) = self.board[from] {
                        if piece.owner == by && kinds.contains(&piece.kind) {
                            return true;
                        }
                        break;
                    }
                    cr += dr;
                    cf += df;
                }
            }
        }
        false
    }

    fn in_check(&self, seat: Seat) -> bool {
        self.king_square(seat)
            .is_some_and(|sq| self.is_attacked(sq, opponent(seat)))
    }

    /// Pseudo-legal destination squares for the piece on `from` (castling
    /// excluded; it is validated separately).
    fn pseudo_targets(&self, from: usize) -> Vec<usize> {
        let Some(piece) = self.board[from] else {
            return Vec::new();
        };
        let (r, f) = (rank(from), file(from));
        let mut targets = Vec::new();

        match piece.kind {
            PieceKind::Pawn => {
                let dir = pawn_dir(piece.owner);
                if let Some(one) = at(r + dir, f) {
                    if self.board[one].is_none() {
                        targets.push(one);
                        if r == home_rank(piece.owner) + dir {
                            if let Some(two) = at(r + 2 * dir, f) {
                                if self.board[two].is_none() {
                                    targets.push(two);
                                }
                            }
                        }
                    }
                }
                for df in [-1, 1] {
                    if let Some(to) = at(r + dir, f + df) {
                        let enemy = self.board[to].is_some_and(|p| p.owner != piece.owner);
                        if enemy || self.en_passant == Some(to) {
                            targets.push(to);
                        }
                    }
                }
            }
            PieceKind::Knight | PieceKind::King => {
                let steps = if piece.kind == PieceKind::Knight {
                    &KNIGHT_STEPS
                } else {
                    &KING_STEPS
                };
                for &(dr, df) in steps {
                    if let Some(to) = at(r + dr, f + df) {
                        if !self.board[to].is_some_and(|p| p.owner == piece.owner) {
                            targets.push(to);
                        }
                    }
                }
            }
            PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen => {
                let rays: &[(i8, i8)] = match piece.kind {
                    PieceKind::Bishop => &BISHOP_RAYS,
                    PieceKind::Rook => &ROOK_RAYS,
                    _ => &[
                        (1, 1),
                        (1, -1),
                        (-1, 1),
                        (-1, -1),
                        (1, 0),
                        (-1, 0),
                        (0, 1),
                        (0, -1),
                    ],
                };
                for &(dr, df) in rays {
                    let (mut cr, mut cf) = (r + dr, f + df);
                    while let Some(to) = at(cr, cf) {
                        match self.board[to] {
                            Some(other) => {
                                if other.owner != piece.owner {
                                    targets.push(to);
                                }
                                break;
                            }
                            None => targets.push(to),
                        }
                        cr += dr;
                        cf += df;
                    }
                }
            }
        }
        targets
    }

    /// Apply a pseudo-legal move, returning whether it captured. The caller
    /// is responsible for the king-safety test.
    fn make(&mut self, from: usize, to: usize, promotion: Option<PieceKind>) -> bool {
        let Some(piece) = self.board[from].take() else {
            return false;
        };
        let mut captured = self.board[to].is_some();

        // En passant removes a pawn that is not on `to`.
        if piece.kind == PieceKind::Pawn && self.en_passant == Some(to) && !captured {
            let victim = at(rank(to) - pawn_dir(piece.owner), file(to));
            if let Some(victim) = victim {
                self.board[victim] = None;
                captured = true;
            }
        }

        // A fresh en-passant window opens only behind a double push.
        self.en_passant = if piece.kind == PieceKind::Pawn
            && (rank(to) - rank(from)).abs() == 2
        {
            at((rank(from) + rank(to)) / 2, file(from))
        } else {
            None
        };

        let final_piece = if piece.kind == PieceKind::Pawn && rank(to) == promotion_rank(piece.owner)
        {
            Piece {
                owner: piece.owner,
                kind: promotion.unwrap_or(PieceKind::Queen),
            }
        } else {
            piece
        };
        self.board[to] = Some(final_piece);

        self.update_rights(piece, from, to);
        captured
    }

    fn update_rights(&mut self, piece: Piece, from: usize, to: usize) {
        if piece.kind == PieceKind::King {
            self.rights[piece.owner as usize] = [false, false];
        }
        for seat in [0u8, 1] {
            let home = (home_rank(seat) as usize) * 8;
            let kingside_rook = home + 7;
            let queenside_rook = home;
            for moved in [from, to] {
                if moved == kingside_rook {
                    self.rights[seat as usize][0] = false;
                }
                if moved == queenside_rook {
                    self.rights[seat as usize][1] = false;
                }
            }
        }
    }

    /// Every fully legal move for `seat` as (from, to) pairs, castling
    /// excluded. Ascending square order, for the deterministic fallback.
    fn legal_moves(&self, seat: Seat) -> Vec<(usize, usize)> {
        let mut moves = Vec::new();
        for from in 0..64 {
            if !self.board[from].is_some_and(|p| p.owner == seat) {
                continue;
            }
            for to in self.pseudo_targets(from) {
                let mut probe = self.clone();
                probe.make(from, to, None);
                if !probe.in_check(seat) {
                    moves.push((from, to));
                }
            }
        }
        moves.sort_unstable();
        moves
    }
}

pub struct Chess {
    position: Position,
    current: Seat,
    halfmove_clock: u32,
    move_count: u32,
    winner: Option<Seat>,
    draw: bool,
    over: bool,
}

impl Chess {
    pub fn new() -> Self {
        Self {
            position: Position::initial(),
            current: 0,
            halfmove_clock: 0,
            move_count: 0,
            winner: None,
            draw: false,
            over: false,
        }
    }

    fn try_castle(&mut self, seat: Seat, from: usize, to: usize) -> Result<Outcome, EngineError> {
        let home = (home_rank(seat) as usize) * 8;
        let king_from = home + 4;
        if from != king_from {
            return Err(EngineError::IllegalMove);
        }
        let kingside = to == home + 6;
        let queenside = to == home + 2;
        if !kingside && !queenside {
            return Err(EngineError::IllegalMove);
        }
        let side = if kingside { 0 } else { 1 };
        if !self.position.rights[seat as usize][side] {
            return Err(EngineError::IllegalMove);
        }

        let (rook_from, rook_to, between, king_path) = if kingside {
            (home + 7, home + 5, vec![home + 5, home + 6], [home + 5, home + 6])
        } else {
            (
                home,
                home + 3,
                vec![home + 1, home + 2, home + 3],
                [home + 3, home + 2],
            )
        };
        if between.iter().any(|&sq| self.position.board[sq].is_some()) {
            return Err(EngineError::IllegalMove);
        }
        let enemy = opponent(seat);
        if self.position.is_attacked(king_from, enemy)
            || king_path
                .iter()
                .any(|&sq| self.position.is_attacked(sq, enemy))
        {
            return Err(EngineError::CastleThroughCheck);
        }

        let king = self.position.board[king_from].take();
        let rook = self.position.board[rook_from].take();
        self.position.board[to] = king;
        self.position.board[rook_to] = rook;
        self.position.rights[seat as usize] = [false, false];
        self.position.en_passant = None;
        self.halfmove_clock += 1;
        Ok(self.finish_move(seat))
    }

    fn try_move(
        &mut self,
        seat: Seat,
        from: usize,
        to: usize,
        promotion: Option<PieceKind>,
    ) -> Result<Outcome, EngineError> {
        let piece = self.position.board[from].ok_or(EngineError::IllegalMove)?;
        if piece.owner != seat {
            return Err(EngineError::WrongPiece);
        }

        // A king sliding two files is a castling attempt.
        if piece.kind == PieceKind::King && (file(to) - file(from)).abs() == 2 {
            return self.try_castle(seat, from, to);
        }

        if !self.position.pseudo_targets(from).contains(&to) {
            return Err(EngineError::IllegalMove);
        }

        let mut next = self.position.clone();
        let captured = next.make(from, to, promotion);
        if next.in_check(seat) {
            return Err(EngineError::IllegalMove);
        }

        self.position = next;
        if captured || piece.kind == PieceKind::Pawn {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        Ok(self.finish_move(seat))
    }

    /// Hand the turn over, or terminate on mate/stalemate.
    fn finish_move(&mut self, seat: Seat) -> Outcome {
        self.move_count += 1;
        let next = opponent(seat);
        if self.position.legal_moves(next).is_empty() {
            self.over = true;
            if self.position.in_check(next) {
                self.winner = Some(seat);
                return Outcome::GameOver(Termination::Winner(seat));
            }
            self.draw = true;
            return Outcome::GameOver(Termination::Draw);
        }
        self.current = next;
        Outcome::Applied
    }
}

impl Default for Chess {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct View {
    #[serde(rename = "gameType")]
    game_type: &'static str,
    /// 64 entries, "wP"/"bK" style, `null` when empty, a1 first.
    board: Vec<Option<String>>,
    #[serde(rename = "currentPlayer")]
    current_player: Seat,
    #[serde(rename = "inCheck")]
    in_check: bool,
    #[serde(rename = "castlingRights")]
    castling_rights: [[bool; 2]; 2],
    #[serde(rename = "enPassant", skip_serializing_if = "Option::is_none")]
    en_passant: Option<String>,
    #[serde(rename = "halfmoveClock")]
    halfmove_clock: u32,
    #[serde(rename = "moveCount")]
    move_count: u32,
    #[serde(rename = "gameOver")]
    game_over: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    winner: Option<Seat>,
    #[serde(rename = "isDraw")]
    is_draw: bool,
}

impl GameEngine for Chess {
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
            GameAction::Move {
                from,
                to,
                promotion,
            } => {
                let from = parse_square(from)?;
                let to = parse_square(to)?;
                let promotion = match promotion {
                    Some(raw) => {
                        Some(PieceKind::from_promotion(raw).ok_or(EngineError::InvalidAction)?)
                    }
                    None => None,
                };
                self.try_move(seat, from, to, promotion)
            }
            _ => Err(EngineError::InvalidAction),
        }
    }

    fn view(&self, _seat: Seat) -> Value {
        let board = self
            .position
            .board
            .iter()
            .map(|cell| {
                cell.map(|p| {
                    let side = if p.owner == 0 { 'w' } else { 'b' };
                    format!("{side}{}", p.kind.letter())
                })
            })
            .collect();
        to_view(View {
            game_type: "chess",
            board,
            current_player: self.current,
            in_check: self.position.in_check(self.current),
            castling_rights: self.position.rights,
            en_passant: self.position.en_passant.map(square_name),
            halfmove_clock: self.halfmove_clock,
            move_count: self.move_count,
            game_over: self.over,
            winner: self.winner,
            is_draw: self.draw,
        })
    }

    fn auto_fallback(&self, seat: Seat) -> Option<GameAction> {
        self.position
            .legal_moves(seat)
            .first()
            .map(|&(from, to)| GameAction::Move {
                from: square_name(from),
                to: square_name(to),
                promotion: None,
            })
    }

    fn current_seat(&self) -> Seat {
        self.current
    }

    fn is_over(&self) -> bool {
        self.over
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> usize {
        parse_square(name).expect("valid square")
    }

    fn mv(engine: &mut Chess, seat: Seat, from: &str, to: &str) -> Outcome {
        engine
            .apply(
                seat,
                &GameAction::Move {
                    from: from.to_string(),
                    to: to.to_string(),
                    promotion: None,
                },
            )
            .unwrap_or_else(|err| panic!("move {from}{to} by {seat} rejected: {err}"))
    }

    fn piece(owner: Seat, kind: PieceKind) -> Option<Piece> {
        Some(Piece { owner, kind })
    }

    /// Bare position with both kings placed out of each other's way.
    fn kings_at(white: &str, black: &str) -> Chess {
        let mut engine = Chess::new();
        engine.position.board = [None; 64];
        engine.position.rights = [[false; 2]; 2];
        engine.position.board[sq(white)] = piece(0, PieceKind::King);
        engine.position.board[sq(black)] = piece(1, PieceKind::King);
        engine
    }

    fn material(engine: &Chess) -> usize {
        engine.position.board.iter().filter(|c| c.is_some()).count()
    }

    #[test]
    fn test_opening_moves_and_alternation() {
        let mut engine = Chess::new();
        mv(&mut engine, 0, "e2", "e4");
        assert_eq!(engine.current_seat(), 1);
        mv(&mut engine, 1, "e7", "e5");
        mv(&mut engine, 0, "g1", "f3");
        assert_eq!(material(&engine), 32);
    }

    #[test]
    fn test_illegal_moves_rejected() {
        let mut engine = Chess::new();
        // Rook is blocked by its own pawn.
        assert_eq!(
            engine.apply(
                0,
                &GameAction::Move {
                    from: "a1".to_string(),
                    to: "a5".to_string(),
                    promotion: None,
                }
            ),
            Err(EngineError::IllegalMove)
        );
        // Moving the opponent's piece.
        assert_eq!(
            engine.apply(
                0,
                &GameAction::Move {
                    from: "e7".to_string(),
                    to: "e5".to_string(),
                    promotion: None,
                }
            ),
            Err(EngineError::WrongPiece)
        );
    }

    #[test]
    fn test_cannot_leave_king_in_check() {
        let mut engine = kings_at("e1", "e8");
        engine.position.board[sq("e4")] = piece(0, PieceKind::Rook);
        engine.position.board[sq("e6")] = piece(1, PieceKind::Rook);
        // The white rook on e4 is pinned to the king.
        assert_eq!(
            engine.apply(
                0,
                &GameAction::Move {
                    from: "e4".to_string(),
                    to: "d4".to_string(),
                    promotion: None,
                }
            ),
            Err(EngineError::IllegalMove)
        );
        mv(&mut engine, 0, "e4", "e6");
        assert_eq!(material(&engine), 3);
    }

    #[test]
    fn test_fools_mate() {
        let mut engine = Chess::new();
        mv(&mut engine, 0, "f2", "f3");
        mv(&mut engine, 1, "e7", "e5");
        mv(&mut engine, 0, "g2", "g4");
        let outcome = mv(&mut engine, 1, "d8", "h4");
        assert_eq!(outcome, Outcome::GameOver(Termination::Winner(1)));
        assert!(engine.is_over());
    }

    #[test]
    fn test_stalemate_detected_on_move() {
        // Kb6 + Qc7 versus a bare king on a8: after Qc1-c7 the king has no
        // square and is not in check.
        let mut engine = kings_at("b6", "a8");
        engine.position.board[sq("c1")] = piece(0, PieceKind::Queen);
        let outcome = mv(&mut engine, 0, "c1", "c7");
        assert_eq!(outcome, Outcome::GameOver(Termination::Draw));
        assert!(engine.draw);
    }

    #[test]
    fn test_kingside_castle_moves_rook() {
        let mut engine = Chess::new();
        mv(&mut engine, 0, "e2", "e4");
        mv(&mut engine, 1, "e7", "e5");
        mv(&mut engine, 0, "g1", "f3");
        mv(&mut engine, 1, "b8", "c6");
        mv(&mut engine, 0, "f1", "e2");
        mv(&mut engine, 1, "g8", "f6");
        mv(&mut engine, 0, "e1", "g1");
        assert_eq!(
            engine.position.board[sq("f1")],
            piece(0, PieceKind::Rook)
        );
        assert_eq!(
            engine.position.board[sq("g1")],
            piece(0, PieceKind::King)
        );
        assert_eq!(engine.position.rights[0], [false, false]);
    }

    #[test]
    fn test_castle_through_attacked_square_denied() {
        // White Ke1/Rh1 ready to castle; black rook on f8 covers f1.
        let mut engine = kings_at("e1", "e8");
        engine.position.board[sq("h1")] = piece(0, PieceKind::Rook);
        engine.position.board[sq("f8")] = piece(1, PieceKind::Rook);
        engine.position.rights[0] = [true, true];
        assert_eq!(
            engine.apply(
                0,
                &GameAction::Move {
                    from: "e1".to_string(),
                    to: "g1".to_string(),
                    promotion: None,
                }
            ),
            Err(EngineError::CastleThroughCheck)
        );
    }

    #[test]
    fn test_castle_while_in_check_denied() {
        let mut engine = kings_at("e1", "a8");
        engine.position.board[sq("h1")] = piece(0, PieceKind::Rook);
        engine.position.board[sq("e8")] = piece(1, PieceKind::Rook);
        engine.position.rights[0] = [true, true];
        assert_eq!(
            engine.apply(
                0,
                &GameAction::Move {
                    from: "e1".to_string(),
                    to: "g1".to_string(),
                    promotion: None,
                }
            ),
            Err(EngineError::CastleThroughCheck)
        );
    }

    #[test]
    fn test_castle_rights_lost_after_rook_move() {
        let mut engine = Chess::new();
        mv(&mut engine, 0, "h2", "h4");
        mv(&mut engine, 1, "a7", "a6");
        mv(&mut engine, 0, "h1", "h3");
        assert!(!engine.position.rights[0][0]);
        assert!(engine.position.rights[0][1]);
    }

    #[test]
    fn test_en_passant_window_and_capture() {
        let mut engine = Chess::new();
        mv(&mut engine, 0, "e2", "e4");
        mv(&mut engine, 1, "a7", "a6");
        mv(&mut engine, 0, "e4", "e5");
        mv(&mut engine, 1, "d7", "d5");
        assert_eq!(engine.position.en_passant, Some(sq("d6")));
        let before = material(&engine);
        mv(&mut engine, 0, "e5", "d6");
        assert_eq!(material(&engine), before - 1);
        assert!(engine.position.board[sq("d5")].is_none());
        // The window closed after one ply.
        assert_eq!(engine.position.en_passant, None);
    }

    #[test]
    fn test_en_passant_expires_after_one_move() {
        let mut engine = Chess::new();
        mv(&mut engine, 0, "e2", "e4");
        mv(&mut engine, 1, "a7", "a6");
        mv(&mut engine, 0, "e4", "e5");
        mv(&mut engine, 1, "d7", "d5");
        mv(&mut engine, 0, "b1", "c3");
        mv(&mut engine, 1, "a6", "a5");
        // The d6 window is long gone.
        assert_eq!(
            engine.apply(
                0,
                &GameAction::Move {
                    from: "e5".to_string(),
                    to: "d6".to_string(),
                    promotion: None,
                }
            ),
            Err(EngineError::IllegalMove)
        );
    }

    #[test]
    fn test_promotion_defaults_to_queen() {
        let mut engine = kings_at("e1", "h8");
        engine.position.board[sq("a7")] = piece(0, PieceKind::Pawn);
        mv(&mut engine, 0, "a7", "a8");
        assert_eq!(
            engine.position.board[sq("a8")],
            piece(0, PieceKind::Queen)
        );
    }

    #[test]
    fn test_promotion_choice_honoured() {
        let mut engine = kings_at("e1", "h8");
        engine.position.board[sq("a7")] = piece(0, PieceKind::Pawn);
        engine
            .apply(
                0,
                &GameAction::Move {
                    from: "a7".to_string(),
                    to: "a8".to_string(),
                    promotion: Some("N".to_string()),
                },
            )
            .expect("promotion to knight");
        assert_eq!(
            engine.position.board[sq("a8")],
            piece(0, PieceKind::Knight)
        );
    }

    #[test]
    fn test_fallback_is_lowest_piece_first_legal_move() {
        let engine = Chess::new();
        // Lowest-indexed white piece with a legal move is the knight on b1.
        assert_eq!(
            engine.auto_fallback(0),
            Some(GameAction::Move {
                from: "b1".to_string(),
                to: "a3".to_string(),
                promotion: None,
            })
        );
    }

    #[test]
    fn test_halfmove_clock_resets_on_pawn_move() {
        let mut engine = Chess::new();
        mv(&mut engine, 0, "g1", "f3");
        assert_eq!(engine.halfmove_clock, 1);
        mv(&mut engine, 1, "e7", "e5");
        assert_eq!(engine.halfmove_clock, 0);
    }
}
