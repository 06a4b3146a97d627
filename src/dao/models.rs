use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Number of identifier characters used for a shareable lobby join code.
pub const JOIN_CODE_LENGTH: usize = 6;

/// Derive the human-shareable join code for a lobby identifier.
///
/// The code is the last six characters of the simple (dashless) UUID form,
/// uppercased. Distinct identifiers can in principle collide on the same
/// code; at expected scale this is astronomically unlikely.
pub fn join_code_of(id: Uuid) -> String {
    let simple = id.simple().to_string();
    simple[simple.len() - JOIN_CODE_LENGTH..].to_uppercase()
}

/// Phase of a lobby's lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LobbyStatus {
    /// Accepting players and ready toggles.
    #[serde(rename = "waiting")]
    Waiting,
    /// A game has been launched from this lobby.
    #[serde(rename = "in-game")]
    InGame,
    /// The launched game has finished.
    #[serde(rename = "completed")]
    Completed,
}

/// One player's membership entry inside a lobby roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LobbyPlayerEntity {
    /// Identity of the player as resolved by the user directory.
    pub user_id: Uuid,
    /// Email captured at join time for display purposes.
    pub email: String,
    /// Whether the player has toggled themselves ready.
    pub ready: bool,
    /// Carried score, zeroed on lobby creation.
    pub score: u32,
}

/// Game parameters chosen at lobby creation and copied into the game at launch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSettingsEntity {
    /// Number of target songs to draw for the game.
    pub song_count: usize,
    /// Guess/skip budget per song.
    pub max_attempts: u32,
}

/// Aggregate lobby entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LobbyEntity {
    /// Primary key of the lobby.
    pub id: Uuid,
    /// Current owner; transferred to `players[0]` if the owner leaves.
    pub owner_id: Uuid,
    /// Ordered roster; `user_id` is unique within the list.
    pub players: Vec<LobbyPlayerEntity>,
    /// Lifecycle phase.
    pub status: LobbyStatus,
    /// Roster capacity bound.
    pub max_players: usize,
    /// Parameters for the game launched from this lobby.
    pub game_settings: GameSettingsEntity,
    /// Set once a game has been launched from this lobby.
    pub active_game_id: Option<Uuid>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

impl LobbyEntity {
    /// Shareable join code derived from the lobby identifier.
    pub fn join_code(&self) -> String {
        join_code_of(self.id)
    }

    /// Look up a roster entry by user identifier.
    pub fn player(&self, user_id: Uuid) -> Option<&LobbyPlayerEntity> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    /// Whether the given user is currently in the roster.
    pub fn contains_player(&self, user_id: Uuid) -> bool {
        self.player(user_id).is_some()
    }

    /// True when every rostered player has toggled ready.
    pub fn all_ready(&self) -> bool {
        self.players.iter().all(|p| p.ready)
    }
}

/// Phase of a game's lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GameStatus {
    /// At least one player still has songs left.
    #[serde(rename = "in-progress")]
    InProgress,
    /// Every player has consumed every target song.
    #[serde(rename = "completed")]
    Completed,
}

/// A song drawn into the shared target sequence, preview included.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetSongEntity {
    /// Song title; guesses are matched against this, case-folded and trimmed.
    pub name: String,
    /// Performing artist.
    pub artist: String,
    /// Album artwork URL, when the source supplies one.
    pub album_cover: Option<String>,
    /// Audio snippet URL; only previewable tracks enter the sequence.
    pub preview_url: String,
}

/// Outcome record for one consumed song index of one player.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletedSongEntity {
    /// Index into the shared target sequence.
    pub song_index: usize,
    /// Whether the song was identified before the attempt budget ran out.
    pub correct: bool,
    /// Attempts consumed on this song (guesses and skips alike).
    pub attempts: u32,
}

/// Per-player progression track within a shared game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerStateEntity {
    /// Identity of the player.
    pub user_id: Uuid,
    /// Email captured at launch time.
    pub user_email: String,
    /// Index of the song the player is currently guessing; equals the
    /// target count once the player is done. Only ever increases.
    pub current_song_index: usize,
    /// Attempts already consumed on the current song.
    pub current_song_attempts: u32,
    /// Accumulated score.
    pub score: u32,
    /// One entry per consumed song index, in order.
    pub completed_songs: Vec<CompletedSongEntity>,
}

impl PlayerStateEntity {
    /// Fresh zeroed progression track for a player entering a game.
    pub fn new(user_id: Uuid, user_email: String) -> Self {
        Self {
            user_id,
            user_email,
            current_song_index: 0,
            current_song_attempts: 0,
            score: 0,
            completed_songs: Vec::new(),
        }
    }

    /// Whether this player has consumed the whole target sequence.
    pub fn is_finished(&self, total_songs: usize) -> bool {
        self.current_song_index >= total_songs
    }
}

/// Aggregate game entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Lobby this game was launched from (back-reference only).
    pub lobby_id: Uuid,
    /// Lifecycle phase.
    pub status: GameStatus,
    /// Shared target sequence; index `i` is "song i" for every player.
    pub target_songs: Vec<TargetSongEntity>,
    /// One progression track per player present at launch.
    pub player_states: Vec<PlayerStateEntity>,
    /// Attempt budget per song, copied from the lobby settings at launch.
    pub max_attempts: u32,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Stamped exactly once, by the action that finishes the last player.
    pub completed_at: Option<SystemTime>,
}

impl GameEntity {
    /// Look up a player's progression track.
    pub fn player_state(&self, user_id: Uuid) -> Option<&PlayerStateEntity> {
        self.player_states.iter().find(|p| p.user_id == user_id)
    }

    /// Mutable access to a player's progression track.
    pub fn player_state_mut(&mut self, user_id: Uuid) -> Option<&mut PlayerStateEntity> {
        self.player_states.iter_mut().find(|p| p.user_id == user_id)
    }

    /// True once every player has consumed the whole target sequence.
    pub fn all_finished(&self) -> bool {
        let total = self.target_songs.len();
        self.player_states.iter().all(|p| p.is_finished(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_code_is_last_six_uppercased() {
        let id = Uuid::parse_str("4a1f0c2e-9b7d-4e3a-8c5f-1d2e3f4a5bcd").unwrap();
        assert_eq!(join_code_of(id), "4A5BCD");
        assert_eq!(join_code_of(id).len(), JOIN_CODE_LENGTH);
    }

    #[test]
    fn player_state_finishes_at_target_count() {
        let mut state = PlayerStateEntity::new(Uuid::new_v4(), "a@example.com".into());
        assert!(!state.is_finished(3));
        state.current_song_index = 3;
        assert!(state.is_finished(3));
    }
}
