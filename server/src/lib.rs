//! Stakemate match server.
//!
//! Two connected clients stake the same amount on a board game, get paired
//! by the matchmaker, and play through a websocket event channel. The
//! server owns the authoritative engines, a per-room turn clock that
//! auto-plays on expiry, and the settlement that pays the winner through
//! the external payment oracle.
//!
//! ## Locking
//! Sessions, the matchmaker, and the room table each sit behind their own
//! mutex; every live room adds one more guarding its engine, timer handle
//! and lifecycle together. A room lock is always the innermost lock, and
//! nothing awaits while holding one: oracle calls happen before
//! matchmaking or in spawned settlement tasks, and broadcasts are
//! non-blocking enqueues onto per-connection writer queues.

pub mod api;
pub mod config;
pub mod lobby;
pub mod matchmaker;
pub mod payments;
pub mod room;
pub mod session;
pub mod settlement;


use crate::config::Config;
use crate::matchmaker::{Matchmaker, SessionId};
use crate::payments::PaymentOracle;
use crate::room::Room;
use stakemate_types::{ActiveGameSummary, LobbyEntry, ServerEvent};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

/// Per-connection outbound queue depth; a slower consumer is dropped.
pub(crate) const OUTBOUND_CAPACITY: usize = 64;

pub(crate) struct Identity {
    pub account: String,
    pub display_name: String,
}

pub(crate) struct Session {
    pub identity: Option<Identity>,
    pub room: Option<String>,
    pub outbound: mpsc::Sender<ServerEvent>,
}

pub struct Server {
    pub config: Config,
    pub(crate) oracle: PaymentOracle,
    pub(crate) sessions: Mutex<HashMap<SessionId, Session>>,
    pub(crate) matchmaker: Mutex<Matchmaker>,
    pub(crate) rooms: Mutex<HashMap<String, Arc<Mutex<Room>>>>,
    next_session_id: AtomicU64,
}

impl Server {
    pub fn new(config: Config) -> Arc<Self> {
        let oracle = PaymentOracle::from_config(&config);
        Arc::new(Self {
            config,
            oracle,
            sessions: Mutex::new(HashMap::new()),
            matchmaker: Mutex::new(Matchmaker::new()),
            rooms: Mutex::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
        })
    }

    /// Register a fresh connection and hand back its id and outbound queue.
    pub fn open_session(&self) -> (SessionId, mpsc::Receiver<ServerEvent>) {
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        self.sessions.lock().unwrap().insert(
            id,
            Session {
                identity: None,
                room: None,
                outbound: tx,
            },
        );
        debug!(session = id, "session opened");
        (id, rx)
    }

    /// Non-blocking send. A closed queue is a gone client; a full one is a
    /// lagging client that can resync through `get_lobby`.
    pub(crate) fn send_to(&self, session_id: SessionId, event: ServerEvent) {
        let sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.get(&session_id) {
            if let Err(mpsc::error::TrySendError::Full(_)) = session.outbound.try_send(event) {
                tracing::warn!(session = session_id, "outbound queue full, event dropped");
            }
        }
    }

    /// Current lobby as one event.
    pub(crate) fn lobby_snapshot(&self) -> ServerEvent {
        let waiting: Vec<LobbyEntry> = self
            .matchmaker
            .lock()
            .unwrap()
            .open_bets()
            .into_iter()
            .map(|bet| LobbyEntry {
                id: bet.id,
                game_type: bet.key.game_type,
                bet_amount: bet.key.stake,
                username: bet.username,
                wallet: bet.wallet,
                grid_size: bet.key.grid_size,
            })
            .collect();

        let active_games: Vec<ActiveGameSummary> = {
            let rooms = self.rooms.lock().unwrap();
            rooms
                .values()
                .filter_map(|room| {
                    let room = room.lock().unwrap();
                    room.is_playing().then(|| ActiveGameSummary {
                        game_type: room.game_type,
                        bet_amount: room.stake,
                        players: [
                            room.players[0].info.username.clone(),
                            room.players[1].info.username.clone(),
                        ],
                    })
                })
                .collect()
        };

        let online_count = self.sessions.lock().unwrap().len();
        ServerEvent::LobbyUpdate {
            waiting,
            active_games,
            online_count,
        }
    }

    /// Push the lobby to every registered connection.
    pub(crate) fn broadcast_lobby(&self) {
        let snapshot = self.lobby_snapshot();
        let sessions = self.sessions.lock().unwrap();
        for session in sessions.values() {
            if session.identity.is_some() {
                let _ = session.outbound.try_send(snapshot.clone());
            }
        }
    }
}
