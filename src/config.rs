//! Application-level configuration loading, including lobby defaults and seed data.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRACKDLE_BACK_CONFIG_PATH";
/// Environment variable holding the session token secret; overrides the file.
const TOKEN_SECRET_ENV: &str = "TOKEN_SECRET";
/// Fallback secret for local development only.
const DEV_TOKEN_SECRET: &str = "dev-secret-change-me";

const DEFAULT_MAX_PLAYERS: usize = 4;
const DEFAULT_SONG_COUNT: usize = 5;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_PREVIEW_TIMEOUT_MS: u64 = 3_000;

/// Lobby parameters applied when a create request leaves them unset.
#[derive(Debug, Clone, Copy)]
pub struct LobbyDefaults {
    /// Roster capacity bound.
    pub max_players: usize,
    /// Number of target songs per game.
    pub song_count: usize,
    /// Guess/skip budget per song.
    pub max_attempts: u32,
}

/// A user known to the static directory backing the standalone binary.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    /// Stable identifier, matching the `sub` claim of issued tokens.
    pub id: Uuid,
    /// Display email.
    pub email: String,
}

/// A track available to the static candidate pool.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedTrack {
    /// Song title.
    pub name: String,
    /// Performing artist.
    pub artist: String,
    /// Album artwork URL.
    #[serde(default)]
    pub album_cover: Option<String>,
    /// Audio snippet URL; tracks without one are drawn but never accepted.
    #[serde(default)]
    pub preview_url: Option<String>,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    token_secret: String,
    lobby_defaults: LobbyDefaults,
    preview_timeout: Duration,
    users: Vec<SeedUser>,
    tracks: Vec<SeedTrack>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        users = config.users.len(),
                        tracks = config.tracks.len(),
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        if let Ok(secret) = env::var(TOKEN_SECRET_ENV) {
            config.token_secret = secret;
        } else if config.token_secret == DEV_TOKEN_SECRET {
            warn!("no token secret configured; using the development fallback");
        }

        config
    }

    /// Construct a configuration with explicit values, used by tests.
    pub fn with_secret(token_secret: impl Into<String>) -> Self {
        Self {
            token_secret: token_secret.into(),
            ..Self::default()
        }
    }

    /// Secret used to verify HS256 session tokens.
    pub fn token_secret(&self) -> &str {
        &self.token_secret
    }

    /// Defaults applied to unset lobby creation parameters.
    pub fn lobby_defaults(&self) -> LobbyDefaults {
        self.lobby_defaults
    }

    /// Upper bound for a single preview lookup during game launch.
    pub fn preview_timeout(&self) -> Duration {
        self.preview_timeout
    }

    /// Users seeded into the static directory.
    pub fn seed_users(&self) -> &[SeedUser] {
        &self.users
    }

    /// Tracks seeded into the static candidate pool.
    pub fn seed_tracks(&self) -> &[SeedTrack] {
        &self.tracks
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            token_secret: DEV_TOKEN_SECRET.to_owned(),
            lobby_defaults: LobbyDefaults {
                max_players: DEFAULT_MAX_PLAYERS,
                song_count: DEFAULT_SONG_COUNT,
                max_attempts: DEFAULT_MAX_ATTEMPTS,
            },
            preview_timeout: Duration::from_millis(DEFAULT_PREVIEW_TIMEOUT_MS),
            users: Vec::new(),
            tracks: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    token_secret: Option<String>,
    #[serde(default)]
    max_players: Option<usize>,
    #[serde(default)]
    song_count: Option<usize>,
    #[serde(default)]
    max_attempts: Option<u32>,
    #[serde(default)]
    preview_timeout_ms: Option<u64>,
    #[serde(default)]
    users: Vec<SeedUser>,
    #[serde(default)]
    tracks: Vec<SeedTrack>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            token_secret: value
                .token_secret
                .unwrap_or_else(|| DEV_TOKEN_SECRET.to_owned()),
            lobby_defaults: LobbyDefaults {
                max_players: value.max_players.unwrap_or(defaults.lobby_defaults.max_players),
                song_count: value.song_count.unwrap_or(defaults.lobby_defaults.song_count),
                max_attempts: value
                    .max_attempts
                    .unwrap_or(defaults.lobby_defaults.max_attempts),
            },
            preview_timeout: value
                .preview_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.preview_timeout),
            users: value.users,
            tracks: value.tracks,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
