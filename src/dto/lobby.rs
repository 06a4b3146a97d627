use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::LobbyEntity,
    dto::{
        common::{GameSettingsDto, lobby_status_str},
        format_system_time,
    },
};

/// Body of `POST /multiplayer/lobby`; unset fields fall back to the
/// configured defaults.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLobbyRequest {
    /// Roster capacity bound.
    #[validate(range(min = 2, max = 16))]
    pub max_players: Option<usize>,
    /// Number of target songs per game.
    #[validate(range(min = 1, max = 20))]
    pub song_count: Option<usize>,
    /// Guess/skip budget per song.
    #[validate(range(min = 1, max = 10))]
    pub max_attempts: Option<u32>,
}

/// One roster entry in a lobby detail response.
#[derive(Debug, Serialize, ToSchema)]
pub struct LobbyPlayerDto {
    /// Player identity.
    pub id: Uuid,
    /// Display email.
    pub email: String,
    /// Ready flag.
    pub ready: bool,
    /// Carried score.
    pub score: u32,
    /// Whether this player currently owns the lobby.
    pub is_owner: bool,
}

/// Response of `POST /multiplayer/lobby`.
#[derive(Debug, Serialize, ToSchema)]
pub struct LobbyCreatedResponse {
    /// Primary key of the new lobby.
    pub lobby_id: Uuid,
    /// Shareable join code.
    pub lobby_code: String,
    /// Owning user.
    pub owner_id: Uuid,
    /// Initial roster (just the owner).
    pub players: Vec<LobbyPlayerDto>,
    /// Roster capacity bound.
    pub max_players: usize,
    /// Parameters for the game launched from this lobby.
    pub game_settings: GameSettingsDto,
}

/// Response of `GET /multiplayer/lobby/{lobby_id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct LobbyDetailResponse {
    /// Primary key of the lobby.
    pub id: Uuid,
    /// Shareable join code.
    pub lobby_code: String,
    /// Lifecycle phase (`waiting`, `in-game`, `completed`).
    pub status: &'static str,
    /// Roster annotated with ownership.
    pub players: Vec<LobbyPlayerDto>,
    /// Roster capacity bound.
    pub max_players: usize,
    /// Owning user.
    pub owner_id: Uuid,
    /// Parameters for the game launched from this lobby.
    pub game_settings: GameSettingsDto,
    /// Set once a game has been launched.
    pub active_game_id: Option<Uuid>,
    /// Creation timestamp, RFC 3339.
    pub created_at: String,
}

fn players_of(lobby: &LobbyEntity) -> Vec<LobbyPlayerDto> {
    lobby
        .players
        .iter()
        .map(|player| LobbyPlayerDto {
            id: player.user_id,
            email: player.email.clone(),
            ready: player.ready,
            score: player.score,
            is_owner: lobby.owner_id == player.user_id,
        })
        .collect()
}

impl From<&LobbyEntity> for LobbyCreatedResponse {
    fn from(lobby: &LobbyEntity) -> Self {
        Self {
            lobby_id: lobby.id,
            lobby_code: lobby.join_code(),
            owner_id: lobby.owner_id,
            players: players_of(lobby),
            max_players: lobby.max_players,
            game_settings: lobby.game_settings.into(),
        }
    }
}

impl From<&LobbyEntity> for LobbyDetailResponse {
    fn from(lobby: &LobbyEntity) -> Self {
        Self {
            id: lobby.id,
            lobby_code: lobby.join_code(),
            status: lobby_status_str(lobby.status),
            players: players_of(lobby),
            max_players: lobby.max_players,
            owner_id: lobby.owner_id,
            game_settings: lobby.game_settings.into(),
            active_game_id: lobby.active_game_id,
            created_at: format_system_time(lobby.created_at),
        }
    }
}
