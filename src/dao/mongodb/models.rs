use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    GameEntity, GameSettingsEntity, GameStatus, LobbyEntity, LobbyPlayerEntity, LobbyStatus,
    PlayerStateEntity, TargetSongEntity,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoLobbyDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    /// Denormalized join code so code lookups hit an index instead of
    /// scanning every lobby document.
    join_code: String,
    owner_id: Uuid,
    players: Vec<LobbyPlayerEntity>,
    status: LobbyStatus,
    max_players: usize,
    game_settings: GameSettingsEntity,
    active_game_id: Option<Uuid>,
    created_at: DateTime,
}

impl From<LobbyEntity> for MongoLobbyDocument {
    fn from(value: LobbyEntity) -> Self {
        Self {
            id: value.id,
            join_code: value.join_code(),
            owner_id: value.owner_id,
            players: value.players,
            status: value.status,
            max_players: value.max_players,
            game_settings: value.game_settings,
            active_game_id: value.active_game_id,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoLobbyDocument> for LobbyEntity {
    fn from(value: MongoLobbyDocument) -> Self {
        Self {
            id: value.id,
            owner_id: value.owner_id,
            players: value.players,
            status: value.status,
            max_players: value.max_players,
            game_settings: value.game_settings,
            active_game_id: value.active_game_id,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    lobby_id: Uuid,
    status: GameStatus,
    target_songs: Vec<TargetSongEntity>,
    player_states: Vec<PlayerStateEntity>,
    max_attempts: u32,
    created_at: DateTime,
    completed_at: Option<DateTime>,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id,
            lobby_id: value.lobby_id,
            status: value.status,
            target_songs: value.target_songs,
            player_states: value.player_states,
            max_attempts: value.max_attempts,
            created_at: DateTime::from_system_time(value.created_at),
            completed_at: value.completed_at.map(DateTime::from_system_time),
        }
    }
}

impl From<MongoGameDocument> for GameEntity {
    fn from(value: MongoGameDocument) -> Self {
        Self {
            id: value.id,
            lobby_id: value.lobby_id,
            status: value.status,
            target_songs: value.target_songs,
            player_states: value.player_states,
            max_attempts: value.max_attempts,
            created_at: value.created_at.to_system_time(),
            completed_at: value.completed_at.map(|at| at.to_system_time()),
        }
    }
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
