//! Rooms: one engine, two seats, one timer.
//!
//! Every mutation of a room happens under its own mutex, taken after any
//! table-level lock is released. The turn clock is a single aborted-on-
//! cancel tokio task; `timer_gen` invalidates stale firings that lost the
//! race against a real move. Settlement runs exactly once, gated by the
//! transition into `Finished`.

use crate::matchmaker::{new_bet_id, SessionId};
use crate::settlement::{self, SettlementPlan};
use crate::Server;
use stakemate_engines::{new_engine, GameEngine, Outcome, Termination};
use stakemate_types::{
    Amount, GameAction, GameOverPayload, GameType, MatchKey, PlayerInfo, Seat, ServerEvent,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Network slack added to every nominal turn budget.
const TIMER_SLACK_MS: u64 = 500;
/// How long a finished room lingers for late reads.
const FINISH_GRACE: Duration = Duration::from_secs(5);
/// Shorter teardown when the finish came from a disconnect.
const DISCONNECT_GRACE: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RoomState {
    Playing,
    Finished,
}

pub(crate) struct RoomPlayer {
    pub session_id: SessionId,
    pub info: PlayerInfo,
    pub outbound: mpsc::Sender<ServerEvent>,
}

pub(crate) struct Room {
    pub id: String,
    pub game_type: GameType,
    pub stake: Amount,
    pub players: [RoomPlayer; 2],
    pub state: RoomState,
    pub engine: Box<dyn GameEngine>,
    pub deadline_at: Option<Instant>,
    timer: Option<JoinHandle<()>>,
    timer_gen: u64,
}

impl Room {
    pub fn is_playing(&self) -> bool {
        self.state == RoomState::Playing
    }

    fn seat_of(&self, session_id: SessionId) -> Option<Seat> {
        self.players
            .iter()
            .position(|p| p.session_id == session_id)
            .map(|i| i as Seat)
    }

    fn send_to_seat(&self, seat: Seat, event: ServerEvent) {
        if let Err(mpsc::error::TrySendError::Full(_)) =
            self.players[seat as usize].outbound.try_send(event)
        {
            warn!(room = %self.id, seat, "outbound queue full, event dropped");
        }
    }

    fn broadcast_views(&self) {
        for seat in [0u8, 1] {
            self.send_to_seat(
                seat,
                ServerEvent::GameState {
                    view: self.engine.view(seat),
                },
            );
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
        self.timer_gen += 1;
        self.deadline_at = None;
    }
}

impl Server {
    /// Promote a matched pair into a playing room. Seat order follows the
    /// argument order: the earlier seeker sits at 0.
    pub(crate) fn create_room(
        self: &Arc<Self>,
        key: MatchKey,
        seats: [(SessionId, PlayerInfo); 2],
    ) -> String {
        let room_id = new_bet_id();
        let engine = new_engine(&key, &mut rand::thread_rng());
        let participant_ids = [seats[0].0, seats[1].0];

        let players = seats.map(|(session_id, info)| {
            let outbound = {
                let sessions = self.sessions.lock().unwrap();
                sessions
                    .get(&session_id)
                    .map(|s| s.outbound.clone())
                    // A closed channel; sends to the ghost vanish.
                    .unwrap_or_else(|| mpsc::channel(1).0)
            };
            RoomPlayer {
                session_id,
                info,
                outbound,
            }
        });

        {
            let mut sessions = self.sessions.lock().unwrap();
            for player in &players {
                if let Some(session) = sessions.get_mut(&player.session_id) {
                    session.room = Some(room_id.clone());
                }
            }
        }

        let room = Arc::new(Mutex::new(Room {
            id: room_id.clone(),
            game_type: key.game_type,
            stake: key.stake,
            players,
            state: RoomState::Playing,
            engine,
            deadline_at: None,
            timer: None,
            timer_gen: 0,
        }));
        self.rooms
            .lock()
            .unwrap()
            .insert(room_id.clone(), room.clone());

        {
            let mut room = room.lock().unwrap();
            for seat in [0u8, 1] {
                room.send_to_seat(
                    seat,
                    ServerEvent::GameStart {
                        room_id: room_id.clone(),
                        game_type: key.game_type,
                        bet_amount: key.stake,
                        player_index: seat,
                        players: [room.players[0].info.clone(), room.players[1].info.clone()],
                    },
                );
            }
            room.broadcast_views();
            self.arm_timer(&mut room);
        }

        info!(room = %room_id, game = %key.game_type, stake = key.stake, "room started");
        self.broadcast_lobby();

        // A seat that disconnected between matching and binding would
        // otherwise leave the room playing against nobody.
        let ghosts: Vec<SessionId> = {
            let sessions = self.sessions.lock().unwrap();
            participant_ids
                .into_iter()
                .filter(|id| !sessions.contains_key(id))
                .collect()
        };
        for ghost in ghosts {
            self.handle_room_disconnect(&room_id, ghost);
        }
        room_id
    }

    /// The move pipeline for a client action. Engine rejections come back
    /// to the caller; accepted moves fan out as fresh views.
    pub(crate) fn process_action(
        self: &Arc<Self>,
        session_id: SessionId,
        action: &GameAction,
    ) -> Result<(), String> {
        let room_id = {
            let sessions = self.sessions.lock().unwrap();
            sessions
                .get(&session_id)
                .and_then(|s| s.room.clone())
                .ok_or("no-room")?
        };
        let room = self
            .rooms
            .lock()
            .unwrap()
            .get(&room_id)
            .cloned()
            .ok_or("no-room")?;

        let mut room = room.lock().unwrap();
        if !room.is_playing() {
            return Err("game-over".to_string());
        }
        let seat = room.seat_of(session_id).ok_or("no-room")?;

        let outcome = room
            .engine
            .apply(seat, action)
            .map_err(|err| err.to_string())?;
        let resigned = matches!(action, GameAction::Resign);
        self.post_apply(&mut room, outcome, resigned);
        Ok(())
    }

    /// Shared tail of every accepted state change: cancel the clock,
    /// publish views, then settle or re-arm.
    fn post_apply(self: &Arc<Self>, room: &mut Room, outcome: Outcome, resigned: bool) {
        room.cancel_timer();
        room.broadcast_views();
        match outcome {
            Outcome::GameOver(termination) => {
                let winner = match termination {
                    Termination::Winner(seat) => Some(seat),
                    Termination::Draw => None,
                };
                let reason = resigned.then(|| "Opponent resigned".to_string());
                self.finish_room(room, winner, resigned, reason, FINISH_GRACE);
            }
            Outcome::RoundOver => {
                // The clock stays off until next_round restarts play.
                debug!(room = %room.id, "round over, clock suppressed");
            }
            Outcome::Applied => self.arm_timer(room),
        }
    }

    /// Arm the single-shot turn clock for the seat now to move. Must run
    /// with the room locked; `cancel_timer` has already bumped the
    /// generation for any stale task in flight.
    fn arm_timer(self: &Arc<Self>, room: &mut Room) {
        if !room.is_playing() || room.engine.is_over() || room.engine.is_round_over() {
            return;
        }
        let Some(budget_ms) = room.game_type.turn_budget_ms() else {
            return;
        };
        let deadline = Instant::now() + Duration::from_millis(budget_ms + TIMER_SLACK_MS);
        room.deadline_at = Some(deadline);
        let generation = room.timer_gen;
        let server = self.clone();
        let room_id = room.id.clone();
        room.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            server.timer_fired(&room_id, generation);
        }));
    }

    /// Turn clock expiry: inject the engine's fallback through the same
    /// pipeline as a real move, unless the room moved on without us.
    fn timer_fired(self: &Arc<Self>, room_id: &str, generation: u64) {
        let Some(room) = self.rooms.lock().unwrap().get(room_id).cloned() else {
            return;
        };
        let mut room = room.lock().unwrap();
        if !room.is_playing() || room.engine.is_over() || room.timer_gen != generation {
            return;
        }

        let seat = room.engine.current_seat();
        let Some(action) = room.engine.auto_fallback(seat) else {
            // No legal action to inject; the position resolves elsewhere.
            debug!(room = %room.id, seat, "turn expired with no fallback");
            return;
        };
        info!(room = %room.id, seat, deadline = ?room.deadline_at, "turn expired, playing fallback");
        match room.engine.apply(seat, &action) {
            Ok(outcome) => self.post_apply(&mut room, outcome, false),
            Err(err) => warn!(room = %room.id, seat, %err, "fallback rejected"),
        }
    }

    /// A seat vanished mid-game: the other seat wins on the spot.
    pub(crate) fn handle_room_disconnect(self: &Arc<Self>, room_id: &str, session_id: SessionId) {
        let Some(room) = self.rooms.lock().unwrap().get(room_id).cloned() else {
            return;
        };
        let mut room = room.lock().unwrap();
        if !room.is_playing() {
            return;
        }
        let Some(seat) = room.seat_of(session_id) else {
            return;
        };
        let winner = stakemate_types::opponent(seat);
        info!(room = %room.id, leaver = seat, "player disconnected mid-game");
        room.cancel_timer();
        self.finish_room(
            &mut room,
            Some(winner),
            false,
            Some("Opponent disconnected".to_string()),
            DISCONNECT_GRACE,
        );
    }

    /// The one-shot terminal transition. Idempotent: the first caller
    /// flips the state and everything else is a no-op.
    fn finish_room(
        self: &Arc<Self>,
        room: &mut Room,
        winner: Option<Seat>,
        resigned: bool,
        reason: Option<String>,
        grace: Duration,
    ) {
        if room.state == RoomState::Finished {
            return;
        }
        room.state = RoomState::Finished;
        room.cancel_timer();

        let payouts = settlement::compute(room.stake);
        let (winner_name, winner_wallet, payout, plan) = match winner {
            Some(seat) => {
                let info = &room.players[seat as usize].info;
                (
                    Some(info.username.clone()),
                    Some(info.wallet.clone()),
                    payouts.payout,
                    SettlementPlan::Winner {
                        wallet: info.wallet.clone(),
                        stake: room.stake,
                    },
                )
            }
            None => (
                None,
                None,
                room.stake,
                SettlementPlan::Refund {
                    wallets: [
                        room.players[0].info.wallet.clone(),
                        room.players[1].info.wallet.clone(),
                    ],
                    stake: room.stake,
                },
            ),
        };

        let payload = GameOverPayload {
            winner: winner_name,
            winner_wallet,
            payout,
            is_draw: winner.is_none(),
            resigned: resigned.then_some(true),
            reason,
        };
        for seat in [0u8, 1] {
            room.send_to_seat(
                seat,
                ServerEvent::GameOver {
                    payload: payload.clone(),
                },
            );
        }
        info!(
            room = %room.id,
            winner = ?winner,
            payout,
            is_draw = winner.is_none(),
            "room finished"
        );

        // Transfers and teardown happen outside the room lock.
        let server = self.clone();
        let senders: Vec<(String, mpsc::Sender<ServerEvent>)> = room
            .players
            .iter()
            .map(|p| (p.info.wallet.clone(), p.outbound.clone()))
            .collect();
        tokio::spawn(async move {
            let house = server.config.house_account.clone();
            let completed = settlement::execute(&server.oracle, house.as_deref(), plan).await;
            for transfer in completed {
                for (wallet, sender) in &senders {
                    if *wallet == transfer.wallet {
                        let _ = sender.try_send(ServerEvent::BalanceUpdate {
                            wallet: transfer.wallet.clone(),
                            amount: transfer.amount,
                            memo: transfer.memo.clone(),
                        });
                    }
                }
            }
        });

        let server = self.clone();
        let room_id = room.id.clone();
        let participant_ids: Vec<SessionId> =
            room.players.iter().map(|p| p.session_id).collect();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            server.teardown_room(&room_id, &participant_ids);
        });
    }

    fn teardown_room(self: &Arc<Self>, room_id: &str, participants: &[SessionId]) {
        self.rooms.lock().unwrap().remove(room_id);
        {
            let mut sessions = self.sessions.lock().unwrap();
            for id in participants {
                if let Some(session) = sessions.get_mut(id) {
                    if session.room.as_deref() == Some(room_id) {
                        session.room = None;
                    }
                }
            }
        }
        debug!(room = %room_id, "room torn down");
        self.broadcast_lobby();
    }
}
