use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::common::{LeaderboardEntry, SongDto};

/// Response of `POST /multiplayer/game/{lobby_id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StartGameResponse {
    /// Primary key of the freshly launched game.
    pub game_id: Uuid,
    /// Number of target songs actually drawn (may be fewer than requested
    /// when the candidate pool runs out of previewable tracks).
    pub total_songs: usize,
}

/// Body of `POST /multiplayer/game/{game_id}/guess`.
///
/// Exactly one of `guess` or `skip` is expected; a skip consumes an
/// attempt just like a wrong guess.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GuessRequest {
    /// The guessed song title.
    pub guess: Option<String>,
    /// Forfeit the current attempt instead of guessing.
    #[serde(default)]
    pub skip: bool,
}

/// Result of a guess/skip action, also carried to the caller of record.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GuessResponse {
    /// Whether the guess matched the current target song.
    pub correct: bool,
    /// Points awarded by this action (zero unless `correct`).
    pub points_earned: u32,
    /// Attempts left on the current song after this action; `None` once
    /// the song has been consumed.
    pub attempts_remaining: Option<u32>,
    /// The target song, revealed only on a correct guess or once the
    /// attempt budget is exhausted.
    pub song: Option<SongDto>,
    /// Whether this player has now consumed the whole target sequence.
    pub player_finished: bool,
    /// Set when the action arrived after the player had already finished;
    /// such calls never mutate state.
    pub already_completed: bool,
    /// Whether this action completed the game for everyone.
    pub game_completed: bool,
    /// Leaderboard snapshot after the action.
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Response of `GET /multiplayer/game/{game_id}/next`.
#[derive(Debug, Serialize, ToSchema)]
pub struct NextSongResponse {
    /// True once the calling player has consumed the whole sequence.
    pub completed: bool,
    /// The song at the player's current index, absent when `completed`.
    pub song: Option<SongDto>,
    /// The player's current index, absent when `completed`.
    pub index: Option<usize>,
    /// Length of the shared target sequence.
    pub total: usize,
    /// Current leaderboard snapshot.
    pub leaderboard: Vec<LeaderboardEntry>,
}
