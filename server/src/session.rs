//! Connection lifecycle: identity, event dispatch, disconnect handling.
//!
//! Each websocket connection owns one session. Events fan into the
//! matchmaker and rooms; errors come back to the offending connection
//! only, as `error_msg`.

use crate::matchmaker::{AcceptError, SeekOutcome, SessionId};
use crate::payments::refund_seeker;
use crate::{lobby, Identity, Server};
use stakemate_types::{ClientEvent, MatchKey, PlayerInfo, ServerEvent};
use std::sync::Arc;
use tracing::{debug, info};

impl Server {
    pub async fn handle_event(self: &Arc<Self>, session_id: SessionId, event: ClientEvent) {
        if let Err(msg) = self.dispatch(session_id, event).await {
            self.send_to(session_id, ServerEvent::ErrorMsg { msg });
        }
    }

    async fn dispatch(
        self: &Arc<Self>,
        session_id: SessionId,
        event: ClientEvent,
    ) -> Result<(), String> {
        match event {
            ClientEvent::Register {
                account,
                display_name,
            } => self.register(session_id, account, display_name),
            ClientEvent::FindMatch {
                game_type,
                bet_amount,
                grid_size,
                proof,
            } => {
                let key = MatchKey::new(game_type, bet_amount, grid_size);
                self.find_match(session_id, key, proof).await
            }
            ClientEvent::AcceptBet { bet_id, proof } => {
                self.accept_bet(session_id, &bet_id, proof).await
            }
            ClientEvent::CancelSearch {} => self.cancel_search(session_id),
            ClientEvent::GameAction { action } => self.process_action(session_id, &action),
            ClientEvent::GetLobby {} => {
                let snapshot = self.lobby_snapshot();
                self.send_to(session_id, snapshot);
                Ok(())
            }
        }
    }

    fn register(
        self: &Arc<Self>,
        session_id: SessionId,
        account: String,
        display_name: Option<String>,
    ) -> Result<(), String> {
        if !valid_account(&account) {
            return Err("Invalid account".to_string());
        }
        let display_name = display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| account.clone());

        {
            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions.get_mut(&session_id).ok_or("no such session")?;
            session.identity = Some(Identity {
                account: account.clone(),
                display_name: display_name.clone(),
            });
        }
        info!(session = session_id, account, "registered");

        self.send_to(
            session_id,
            ServerEvent::Registered {
                account,
                display_name,
                escrow_address: self.config.escrow_address.clone(),
                test_mode: self.config.test_mode,
            },
        );
        let snapshot = self.lobby_snapshot();
        self.send_to(session_id, snapshot);
        Ok(())
    }

    async fn find_match(
        self: &Arc<Self>,
        session_id: SessionId,
        key: MatchKey,
        proof: Option<String>,
    ) -> Result<(), String> {
        let me = self.identity_of(session_id)?;
        self.ensure_not_in_live_room(session_id)?;
        lobby::validate_bet(key.game_type, key.stake, key.grid_size)
            .map_err(str::to_string)?;
        let proof = self.collect_stake(&proof, key.stake).await?;

        let (outcome, replaced) = {
            let mut matchmaker = self.matchmaker.lock().unwrap();
            matchmaker.seek(
                session_id,
                key,
                me.username.clone(),
                me.wallet.clone(),
                proof,
            )
        };
        if let Some(old) = replaced {
            // The superseded entry's stake goes back before the new one
            // takes its place.
            let server = self.clone();
            tokio::spawn(async move {
                refund_seeker(
                    &server.oracle,
                    &old.wallet,
                    old.key.stake,
                    old.proof.as_deref(),
                )
                .await;
            });
        }

        match outcome {
            SeekOutcome::Matched(other) => {
                let opener = (other.owner, PlayerInfo {
                    username: other.username,
                    wallet: other.wallet,
                });
                self.create_room(key, [opener, (session_id, me)]);
            }
            SeekOutcome::Queued(_) => {
                self.send_to(
                    session_id,
                    ServerEvent::Waiting {
                        msg: format!("Waiting for a {} opponent...", key.game_type),
                        bet_amount: key.stake,
                        game_type: key.game_type,
                    },
                );
                self.broadcast_lobby();
            }
        }
        Ok(())
    }

    async fn accept_bet(
        self: &Arc<Self>,
        session_id: SessionId,
        bet_id: &str,
        proof: Option<String>,
    ) -> Result<(), String> {
        let me = self.identity_of(session_id)?;
        self.ensure_not_in_live_room(session_id)?;

        // Peek the stake before paying; the entry may already be gone.
        let key = {
            let matchmaker = self.matchmaker.lock().unwrap();
            matchmaker
                .open_bets()
                .into_iter()
                .find(|bet| bet.id == bet_id)
                .map(|bet| bet.key)
                .ok_or("bet-taken")?
        };
        self.collect_stake(&proof, key.stake).await?;

        let accepted = {
            let mut matchmaker = self.matchmaker.lock().unwrap();
            matchmaker.accept(bet_id, session_id)
        };
        let other = match accepted {
            Ok(bet) => bet,
            Err(AcceptError::OwnBet) => return Err("cannot-accept-own-bet".to_string()),
            Err(AcceptError::Missing) => {
                // Lost the race after paying; give the stake back.
                if let Some(proof) = proof {
                    let server = self.clone();
                    let wallet = me.wallet.clone();
                    let stake = key.stake;
                    tokio::spawn(async move {
                        refund_seeker(&server.oracle, &wallet, stake, Some(&proof)).await;
                    });
                }
                return Err("bet-taken".to_string());
            }
        };

        let opener = (other.owner, PlayerInfo {
            username: other.username,
            wallet: other.wallet,
        });
        self.create_room(other.key, [opener, (session_id, me)]);
        Ok(())
    }

    fn cancel_search(self: &Arc<Self>, session_id: SessionId) -> Result<(), String> {
        let removed = self.matchmaker.lock().unwrap().cancel(session_id);
        if let Some(bet) = removed {
            let server = self.clone();
            tokio::spawn(async move {
                refund_seeker(
                    &server.oracle,
                    &bet.wallet,
                    bet.key.stake,
                    bet.proof.as_deref(),
                )
                .await;
            });
            self.send_to(session_id, ServerEvent::SearchCancelled {});
            self.broadcast_lobby();
        } else {
            self.send_to(session_id, ServerEvent::SearchCancelled {});
        }
        Ok(())
    }

    /// Connection gone: drop any open bet (with refund), concede any live
    /// game, forget the session.
    pub async fn disconnect(self: &Arc<Self>, session_id: SessionId) {
        let room_id = {
            let mut sessions = self.sessions.lock().unwrap();
            sessions
                .remove(&session_id)
                .and_then(|session| session.room)
        };

        let removed = self.matchmaker.lock().unwrap().cancel(session_id);
        if let Some(bet) = removed {
            refund_seeker(
                &self.oracle,
                &bet.wallet,
                bet.key.stake,
                bet.proof.as_deref(),
            )
            .await;
        }

        if let Some(room_id) = room_id {
            self.handle_room_disconnect(&room_id, session_id);
        }

        debug!(session = session_id, "session closed");
        self.broadcast_lobby();
    }

    /// One room per session: seeking again while a game is live would
    /// orphan the running room.
    fn ensure_not_in_live_room(&self, session_id: SessionId) -> Result<(), String> {
        let room_id = {
            let sessions = self.sessions.lock().unwrap();
            sessions.get(&session_id).and_then(|s| s.room.clone())
        };
        let Some(room_id) = room_id else {
            return Ok(());
        };
        let room = self.rooms.lock().unwrap().get(&room_id).cloned();
        if let Some(room) = room {
            if room.lock().unwrap().is_playing() {
                return Err("Already in a game".to_string());
            }
        }
        Ok(())
    }

    /// Identity as room-facing player info, or `register-first`.
    fn identity_of(&self, session_id: SessionId) -> Result<PlayerInfo, String> {
        let sessions = self.sessions.lock().unwrap();
        let session = sessions.get(&session_id).ok_or("no such session")?;
        let identity = session
            .identity
            .as_ref()
            .ok_or("register-first")?;
        Ok(PlayerInfo {
            username: identity.display_name.clone(),
            wallet: identity.account.clone(),
        })
    }

    /// Verify the inbound stake payment. In live mode a proof is
    /// mandatory; the verified proof is returned for later refunds.
    async fn collect_stake(
        &self,
        proof: &Option<String>,
        stake: stakemate_types::Amount,
    ) -> Result<Option<String>, String> {
        if self.oracle.is_test_mode() {
            return Ok(proof.clone());
        }
        let proof = proof.as_deref().ok_or("Missing payment proof")?;
        self.oracle
            .verify_inbound(proof, stake)
            .await
            .map_err(|err| err.to_string())?;
        Ok(Some(proof.to_string()))
    }
}

/// Account identifiers come from an external wallet; this only screens
/// out garbage before it reaches logs and the lobby.
fn valid_account(account: &str) -> bool {
    (3..=64).contains(&account.len())
        && account
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_account() {
        assert!(valid_account("GABC123-xyz_7"));
        assert!(!valid_account("ab"));
        assert!(!valid_account("has space"));
        assert!(!valid_account(&"x".repeat(65)));
        assert!(!valid_account("emoji\u{1F3B2}"));
    }
}
