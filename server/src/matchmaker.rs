//! Open-bet matchmaking.
//!
//! Entries are keyed by `(game, stake, variant)`. All operations run under
//! one lock owned by the server, so an entry is observed by at most one
//! winner: the loser of an accept race sees `Missing` and surfaces
//! `bet-taken`.

use rand::{distributions::Alphanumeric, Rng};
use stakemate_types::MatchKey;
use std::collections::HashMap;

pub type SessionId = u64;

/// One open bet waiting for an opponent.
#[derive(Clone, Debug, PartialEq)]
pub struct OpenBet {
    pub id: String,
    pub key: MatchKey,
    pub owner: SessionId,
    pub username: String,
    pub wallet: String,
    /// Payment proof held so a cancel can refund it.
    pub proof: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcceptError {
    /// Unknown or already taken.
    Missing,
    OwnBet,
}

/// What `seek` did with the request.
pub enum SeekOutcome {
    /// An opposing entry with the same key was consumed.
    Matched(OpenBet),
    /// The request became a new open entry.
    Queued(String),
}

#[derive(Default)]
pub struct Matchmaker {
    entries: HashMap<String, OpenBet>,
}

impl Matchmaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match against an existing entry with the same key, or queue a new
    /// one. A repeat seek from the same session replaces its old entry.
    pub fn seek(
        &mut self,
        owner: SessionId,
        key: MatchKey,
        username: String,
        wallet: String,
        proof: Option<String>,
    ) -> (SeekOutcome, Option<OpenBet>) {
        let replaced = self.cancel(owner);

        let existing = self
            .entries
            .values()
            .find(|bet| bet.key == key && bet.owner != owner)
            .map(|bet| bet.id.clone());
        if let Some(id) = existing {
            let matched = self.entries.remove(&id);
            if let Some(matched) = matched {
                return (SeekOutcome::Matched(matched), replaced);
            }
        }

        let id = new_bet_id();
        self.entries.insert(
            id.clone(),
            OpenBet {
                id: id.clone(),
                key,
                owner,
                username,
                wallet,
                proof,
            },
        );
        (SeekOutcome::Queued(id), replaced)
    }

    /// Remove `bet_id` atomically for `requester`. Exactly one of two
    /// concurrent accepts can succeed.
    pub fn accept(&mut self, bet_id: &str, requester: SessionId) -> Result<OpenBet, AcceptError> {
        match self.entries.get(bet_id) {
            None => Err(AcceptError::Missing),
            Some(bet) if bet.owner == requester => Err(AcceptError::OwnBet),
            Some(_) => self.entries.remove(bet_id).ok_or(AcceptError::Missing),
        }
    }

    /// Remove the session's entry, if any, returning it for refunds.
    pub fn cancel(&mut self, owner: SessionId) -> Option<OpenBet> {
        let id = self
            .entries
            .values()
            .find(|bet| bet.owner == owner)
            .map(|bet| bet.id.clone())?;
        self.entries.remove(&id)
    }

    pub fn open_bets(&self) -> Vec<OpenBet> {
        let mut bets: Vec<OpenBet> = self.entries.values().cloned().collect();
        bets.sort_by(|a, b| a.id.cmp(&b.id));
        bets
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Short random id, also used for rooms.
pub fn new_bet_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakemate_types::GameType;

    fn key(stake: u64) -> MatchKey {
        MatchKey::new(GameType::Chess, stake, None)
    }

    fn seek(mm: &mut Matchmaker, owner: SessionId, stake: u64) -> SeekOutcome {
        let (outcome, _) = mm.seek(
            owner,
            key(stake),
            format!("user-{owner}"),
            format!("wallet-{owner}"),
            Some(format!("proof-{owner}")),
        );
        outcome
    }

    #[test]
    fn test_first_seeker_queues() {
        let mut mm = Matchmaker::new();
        assert!(matches!(seek(&mut mm, 1, 100), SeekOutcome::Queued(_)));
        assert_eq!(mm.len(), 1);
    }

    #[test]
    fn test_same_key_matches() {
        let mut mm = Matchmaker::new();
        seek(&mut mm, 1, 100);
        match seek(&mut mm, 2, 100) {
            SeekOutcome::Matched(bet) => assert_eq!(bet.owner, 1),
            SeekOutcome::Queued(_) => panic!("expected a match"),
        }
        assert!(mm.is_empty());
    }

    #[test]
    fn test_different_stake_does_not_match() {
        let mut mm = Matchmaker::new();
        seek(&mut mm, 1, 100);
        assert!(matches!(seek(&mut mm, 2, 200), SeekOutcome::Queued(_)));
        assert_eq!(mm.len(), 2);
    }

    #[test]
    fn test_seek_does_not_match_self() {
        let mut mm = Matchmaker::new();
        seek(&mut mm, 1, 100);
        // Re-seek replaces the old entry instead of matching it.
        assert!(matches!(seek(&mut mm, 1, 100), SeekOutcome::Queued(_)));
        assert_eq!(mm.len(), 1);
    }

    #[test]
    fn test_accept_removes_exactly_once() {
        let mut mm = Matchmaker::new();
        let SeekOutcome::Queued(id) = seek(&mut mm, 1, 100) else {
            panic!("expected queue");
        };
        assert!(mm.accept(&id, 2).is_ok());
        // The second accept of the same entry loses the race.
        assert_eq!(mm.accept(&id, 3), Err(AcceptError::Missing));
    }

    #[test]
    fn test_accept_own_bet_rejected() {
        let mut mm = Matchmaker::new();
        let SeekOutcome::Queued(id) = seek(&mut mm, 1, 100) else {
            panic!("expected queue");
        };
        assert_eq!(mm.accept(&id, 1), Err(AcceptError::OwnBet));
        assert_eq!(mm.len(), 1, "a rejected accept has no side effects");
    }

    #[test]
    fn test_cancel_returns_proof_for_refund() {
        let mut mm = Matchmaker::new();
        seek(&mut mm, 1, 100);
        let bet = mm.cancel(1).expect("entry existed");
        assert_eq!(bet.proof.as_deref(), Some("proof-1"));
        assert!(mm.cancel(1).is_none());
    }
}
