use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::{
    GameEntity, GameSettingsEntity, GameStatus, LobbyEntity, LobbyStatus, TargetSongEntity,
};

/// One row of a score ranking, ordered by descending score with ties kept
/// in roster order (stable sort).
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// Player identity.
    pub user_id: Uuid,
    /// Display email.
    pub email: String,
    /// Current score.
    pub score: u32,
}

/// Compute the leaderboard snapshot for a game.
pub fn game_leaderboard(game: &GameEntity) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = game
        .player_states
        .iter()
        .map(|player| LeaderboardEntry {
            user_id: player.user_id,
            email: player.user_email.clone(),
            score: player.score,
        })
        .collect();
    // Stable sort keeps roster order for equal scores.
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries
}

/// Game parameters as exposed over the wire.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct GameSettingsDto {
    /// Number of target songs per game.
    pub song_count: usize,
    /// Guess/skip budget per song.
    pub max_attempts: u32,
}

impl From<GameSettingsEntity> for GameSettingsDto {
    fn from(value: GameSettingsEntity) -> Self {
        Self {
            song_count: value.song_count,
            max_attempts: value.max_attempts,
        }
    }
}

/// A target song as revealed to clients.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct SongDto {
    /// Song title.
    pub name: String,
    /// Performing artist.
    pub artist: String,
    /// Album artwork URL.
    pub album_cover: Option<String>,
    /// Audio snippet URL.
    pub preview_url: String,
}

impl From<&TargetSongEntity> for SongDto {
    fn from(value: &TargetSongEntity) -> Self {
        Self {
            name: value.name.clone(),
            artist: value.artist.clone(),
            album_cover: value.album_cover.clone(),
            preview_url: value.preview_url.clone(),
        }
    }
}

/// Wire form of a lobby status.
pub fn lobby_status_str(status: LobbyStatus) -> &'static str {
    match status {
        LobbyStatus::Waiting => "waiting",
        LobbyStatus::InGame => "in-game",
        LobbyStatus::Completed => "completed",
    }
}

/// Wire form of a game status.
pub fn game_status_str(status: GameStatus) -> &'static str {
    match status {
        GameStatus::InProgress => "in-progress",
        GameStatus::Completed => "completed",
    }
}

/// Compute the lobby-phase leaderboard (scores carried on the roster).
pub fn lobby_leaderboard(lobby: &LobbyEntity) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = lobby
        .players
        .iter()
        .map(|player| LeaderboardEntry {
            user_id: player.user_id,
            email: player.email.clone(),
            score: player.score,
        })
        .collect();
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries
}
