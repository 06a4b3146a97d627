use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::LobbyEntity,
    dto::common::{GameSettingsDto, LeaderboardEntry, SongDto, lobby_status_str},
};

/// Messages accepted from WebSocket clients.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Handshake message; must be the first frame on every connection.
    #[serde(rename = "authenticate")]
    Authenticate {
        /// Signed session token.
        token: String,
    },
    /// Join a lobby by its six-character shareable code.
    #[serde(rename = "join-by-code")]
    JoinByCode {
        /// Join code, case-insensitive.
        code: String,
    },
    /// Leave a lobby the caller is a member of.
    #[serde(rename = "leave-lobby")]
    LeaveLobby {
        /// Target lobby.
        lobby_id: Uuid,
    },
    /// Flip the caller's ready flag.
    #[serde(rename = "toggle-ready")]
    ToggleReady {
        /// Target lobby.
        lobby_id: Uuid,
    },
    /// Connection health probe, answered with `pong`.
    #[serde(rename = "ping")]
    Ping,
    /// Any message type this server does not understand.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse a client frame from its JSON text form.
    pub fn from_json_str(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

/// Acknowledgement sent to a client after successful authentication.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthenticatedEvent {
    /// Identity bound to the connection.
    pub user_id: Uuid,
    /// Email bound to the connection.
    pub email: String,
}

/// Acknowledgement sent to the caller of `join-by-code`.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinedLobbyEvent {
    /// Resolved lobby.
    pub lobby_id: Uuid,
    /// Canonical join code of the resolved lobby.
    pub lobby_code: String,
}

/// Confirmation sent to the caller after leaving a lobby.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeftLobbyEvent {
    /// Human-readable confirmation.
    pub message: String,
}

/// Error frame sent to a single connection.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorEvent {
    /// Human-readable failure description.
    pub message: String,
}

/// Answer to a `ping` probe.
#[derive(Debug, Serialize, ToSchema)]
pub struct PongEvent {
    /// Server clock, milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// One roster entry inside a `lobby-update` broadcast.
#[derive(Debug, Serialize, ToSchema)]
pub struct LobbyMemberDto {
    /// Player identity.
    pub user_id: Uuid,
    /// Display email.
    pub email: String,
    /// Ready flag.
    pub ready: bool,
    /// Carried score.
    pub score: u32,
}

/// Broadcast to a lobby room after any roster or status mutation.
#[derive(Debug, Serialize, ToSchema)]
pub struct LobbyUpdateEvent {
    /// Current roster, in join order.
    pub players: Vec<LobbyMemberDto>,
    /// Lifecycle phase.
    pub status: &'static str,
    /// Current owner.
    pub owner_id: Uuid,
    /// Parameters for the game launched from this lobby.
    pub game_settings: GameSettingsDto,
    /// Shareable join code.
    pub lobby_code: String,
}

impl From<&LobbyEntity> for LobbyUpdateEvent {
    fn from(lobby: &LobbyEntity) -> Self {
        Self {
            players: lobby
                .players
                .iter()
                .map(|player| LobbyMemberDto {
                    user_id: player.user_id,
                    email: player.email.clone(),
                    ready: player.ready,
                    score: player.score,
                })
                .collect(),
            status: lobby_status_str(lobby.status),
            owner_id: lobby.owner_id,
            game_settings: lobby.game_settings.into(),
            lobby_code: lobby.join_code(),
        }
    }
}

/// Broadcast after every ready toggle so clients can show or hide the
/// launch control.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayersReadyStatusEvent {
    /// True when every rostered player is ready.
    pub all_ready: bool,
}

/// Broadcast to the lobby room when the owner launches the game.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameStartedEvent {
    /// Primary key of the new game.
    pub game_id: Uuid,
    /// Shared target sequence.
    pub songs: Vec<SongDto>,
    /// Length of the target sequence.
    pub total_songs: usize,
    /// Preview URL of song 0, where every player starts.
    pub first_preview: Option<String>,
    /// Initial leaderboard (all scores zero).
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Broadcast whenever any player's index advances.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardUpdateEvent {
    /// Scores sorted descending, ties in roster order.
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Broadcast exactly once, when the last outstanding player finishes.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameOverEvent {
    /// Final leaderboard.
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_client_messages() {
        let msg = ClientMessage::from_json_str(r#"{"type":"authenticate","token":"abc"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Authenticate { token } if token == "abc"));

        let msg = ClientMessage::from_json_str(r#"{"type":"join-by-code","code":"AB12CD"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::JoinByCode { code } if code == "AB12CD"));

        let msg = ClientMessage::from_json_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn unknown_message_types_do_not_fail_parsing() {
        let msg = ClientMessage::from_json_str(r#"{"type":"dance"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Unknown));
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(ClientMessage::from_json_str("not json").is_err());
        assert!(ClientMessage::from_json_str(r#"{"type":"authenticate"}"#).is_err());
    }
}
