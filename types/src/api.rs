//! JSON wire events for the client/server channel.
//!
//! Every message is a single JSON object tagged by `type`. Payload keys are
//! camelCase. `game_state` is special-cased: its payload is whatever the
//! room's engine produced for the receiving seat.

use crate::{Amount, GameAction, GameType, Seat};
use serde::{Deserialize, Serialize};

/// Client → server events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Register {
        account: String,
        #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
        display_name: Option<String>,
    },
    FindMatch {
        #[serde(rename = "gameType")]
        game_type: GameType,
        #[serde(rename = "betAmount")]
        bet_amount: Amount,
        #[serde(rename = "gridSize", skip_serializing_if = "Option::is_none")]
        grid_size: Option<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        proof: Option<String>,
    },
    AcceptBet {
        #[serde(rename = "betId")]
        bet_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        proof: Option<String>,
    },
    CancelSearch {},
    GameAction {
        #[serde(flatten)]
        action: GameAction,
    },
    GetLobby {},
}

/// Server → client events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Registered {
        account: String,
        #[serde(rename = "displayName")]
        display_name: String,
        #[serde(rename = "escrowAddress")]
        escrow_address: String,
        #[serde(rename = "testMode")]
        test_mode: bool,
    },
    Waiting {
        msg: String,
        #[serde(rename = "betAmount")]
        bet_amount: Amount,
        #[serde(rename = "gameType")]
        game_type: GameType,
    },
    SearchCancelled {},
    LobbyUpdate {
        waiting: Vec<LobbyEntry>,
        #[serde(rename = "activeGames")]
        active_games: Vec<ActiveGameSummary>,
        #[serde(rename = "onlineCount")]
        online_count: usize,
    },
    GameStart {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "gameType")]
        game_type: GameType,
        #[serde(rename = "betAmount")]
        bet_amount: Amount,
        #[serde(rename = "playerIndex")]
        player_index: Seat,
        players: [PlayerInfo; 2],
    },
    GameState {
        #[serde(flatten)]
        view: serde_json::Value,
    },
    GameOver {
        #[serde(flatten)]
        payload: GameOverPayload,
    },
    ErrorMsg {
        msg: String,
    },
    BalanceUpdate {
        wallet: String,
        amount: Amount,
        memo: String,
    },
}

/// One open bet in the lobby listing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LobbyEntry {
    pub id: String,
    #[serde(rename = "gameType")]
    pub game_type: GameType,
    #[serde(rename = "betAmount")]
    pub bet_amount: Amount,
    pub username: String,
    pub wallet: String,
    #[serde(rename = "gridSize", skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<u8>,
}

/// One in-progress room in the lobby listing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActiveGameSummary {
    #[serde(rename = "gameType")]
    pub game_type: GameType,
    #[serde(rename = "betAmount")]
    pub bet_amount: Amount,
    pub players: [String; 2],
}

/// Identity of a seated player as shown to the room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub username: String,
    pub wallet: String,
}

/// Terminal broadcast for a room.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameOverPayload {
    /// Winner's display name, or `None` on a draw.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    #[serde(rename = "winnerWallet", skip_serializing_if = "Option::is_none")]
    pub winner_wallet: Option<String>,
    pub payout: Amount,
    #[serde(rename = "isDraw")]
    pub is_draw: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resigned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_tags() {
        let find: ClientEvent = serde_json::from_str(
            r#"{"type":"find_match","gameType":"chess","betAmount":500,"proof":"tx-1"}"#,
        )
        .unwrap();
        match find {
            ClientEvent::FindMatch {
                game_type,
                bet_amount,
                grid_size,
                proof,
            } => {
                assert_eq!(game_type, GameType::Chess);
                assert_eq!(bet_amount, 500);
                assert_eq!(grid_size, None);
                assert_eq!(proof.as_deref(), Some("tx-1"));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let cancel: ClientEvent = serde_json::from_str(r#"{"type":"cancel_search"}"#).unwrap();
        assert_eq!(cancel, ClientEvent::CancelSearch {});
    }

    #[test]
    fn test_game_action_flattens_into_event() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"game_action","action":"place","cell":7}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::GameAction {
                action: GameAction::Place { cell: 7 },
            }
        );
    }

    #[test]
    fn test_server_event_encoding() {
        let event = ServerEvent::GameStart {
            room_id: "ab12cd".to_string(),
            game_type: GameType::Mancala,
            bet_amount: 250,
            player_index: 1,
            players: [
                PlayerInfo {
                    username: "ana".to_string(),
                    wallet: "GA..ANA".to_string(),
                },
                PlayerInfo {
                    username: "bo".to_string(),
                    wallet: "GB..BO".to_string(),
                },
            ],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"game_start""#));
        assert!(json.contains(r#""roomId":"ab12cd""#));
        assert!(json.contains(r#""playerIndex":1"#));
    }

    #[test]
    fn test_game_state_flattens_view() {
        let view = serde_json::json!({"board": [0, 1], "currentPlayer": 0});
        let event = ServerEvent::GameState { view };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"game_state""#));
        assert!(json.contains(r#""currentPlayer":0"#));
    }

    #[test]
    fn test_game_over_omits_absent_fields() {
        let event = ServerEvent::GameOver {
            payload: GameOverPayload {
                winner: Some("ana".to_string()),
                winner_wallet: Some("GA..ANA".to_string()),
                payout: 950,
                is_draw: false,
                resigned: None,
                reason: None,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""winner":"ana""#));
        assert!(!json.contains("resigned"));
        assert!(!json.contains("reason"));
    }
}
