//! Game launch and per-player progression.
//!
//! A game shares one target song sequence between all players, but each
//! player walks it at their own pace: guesses and skips consume attempts
//! on the player's current song only. Mutations run under the per-game
//! lock so concurrent actions serialize, which also guarantees the
//! completion transition happens exactly once.

use std::time::SystemTime;

use rand::{rng, seq::SliceRandom};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{
        CompletedSongEntity, GameEntity, GameStatus, LobbyStatus, PlayerStateEntity,
        TargetSongEntity,
    },
    dto::{
        common::{SongDto, game_leaderboard},
        game::{GuessRequest, GuessResponse, NextSongResponse},
    },
    error::ServiceError,
    services::ws_events,
    state::SharedState,
};

/// Launch a game from a lobby.
///
/// Only the owner may launch, only from the waiting phase, and only once
/// every rostered player is ready. The target sequence is drawn from the
/// track source, keeping previewable tracks only; drawing nothing at all
/// fails the launch.
pub async fn start_game(
    state: &SharedState,
    lobby_id: Uuid,
    requester: Uuid,
) -> Result<GameEntity, ServiceError> {
    let _guard = state.lobby_locks().acquire(lobby_id).await;

    let store = state.require_store().await?;
    let mut lobby = store
        .find_lobby(lobby_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("lobby {lobby_id} not found")))?;

    if lobby.owner_id != requester {
        return Err(ServiceError::Forbidden(
            "only the lobby owner can start the game".into(),
        ));
    }
    if lobby.status != LobbyStatus::Waiting {
        return Err(ServiceError::InvalidState(
            "a game was already started from this lobby".into(),
        ));
    }
    if !lobby.all_ready() {
        return Err(ServiceError::Precondition(
            "all players must be ready before the game can start".into(),
        ));
    }

    let target_songs = draw_target_songs(state, lobby.game_settings.song_count).await?;

    let game = GameEntity {
        id: Uuid::new_v4(),
        lobby_id,
        status: GameStatus::InProgress,
        player_states: lobby
            .players
            .iter()
            .map(|player| PlayerStateEntity::new(player.user_id, player.email.clone()))
            .collect(),
        max_attempts: lobby.game_settings.max_attempts,
        target_songs,
        created_at: SystemTime::now(),
        completed_at: None,
    };
    store.save_game(game.clone()).await?;

    lobby.status = LobbyStatus::InGame;
    lobby.active_game_id = Some(game.id);
    store.save_lobby(lobby).await?;

    info!(
        game = %game.id,
        lobby = %lobby_id,
        songs = game.target_songs.len(),
        players = game.player_states.len(),
        "game started"
    );
    ws_events::broadcast_game_started(state, lobby_id, &game);
    Ok(game)
}

/// Draw up to `song_count` previewable tracks from the shuffled candidate
/// pool. Candidates without a preview, and lookups that fail or exceed
/// the configured timeout, are skipped.
async fn draw_target_songs(
    state: &SharedState,
    song_count: usize,
) -> Result<Vec<TargetSongEntity>, ServiceError> {
    let mut pool = state
        .tracks()
        .draw_candidates()
        .await
        .map_err(|err| ServiceError::ExternalUnavailable(err.to_string()))?;
    pool.shuffle(&mut rng());

    let budget = state.config().preview_timeout();
    let mut songs = Vec::with_capacity(song_count);
    for candidate in pool {
        if songs.len() == song_count {
            break;
        }
        match timeout(
            budget,
            state.tracks().preview_url(&candidate.name, &candidate.artist),
        )
        .await
        {
            Ok(Ok(Some(preview_url))) => songs.push(TargetSongEntity {
                name: candidate.name,
                artist: candidate.artist,
                album_cover: candidate.album_cover,
                preview_url,
            }),
            Ok(Ok(None)) => {
                debug!(track = %candidate.name, "candidate has no preview, skipping");
            }
            Ok(Err(err)) => {
                warn!(track = %candidate.name, error = %err, "preview lookup failed, skipping");
            }
            Err(_) => {
                warn!(track = %candidate.name, "preview lookup timed out, skipping");
            }
        }
    }

    if songs.is_empty() {
        return Err(ServiceError::ExternalUnavailable(
            "no previewable tracks available".into(),
        ));
    }
    Ok(songs)
}

fn normalize_guess(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Apply a guess or skip to the caller's progression track.
///
/// A skip consumes an attempt exactly like a wrong guess. A correct guess
/// awards `max_attempts - attempts_already_used` points. Exhausting the
/// budget reveals the song and advances without points. Actions arriving
/// after the player has finished are acknowledged without mutating
/// anything.
pub async fn process_action(
    state: &SharedState,
    game_id: Uuid,
    user_id: Uuid,
    request: &GuessRequest,
) -> Result<GuessResponse, ServiceError> {
    if request.guess.is_none() && !request.skip {
        return Err(ServiceError::InvalidInput(
            "provide a guess or set skip".into(),
        ));
    }

    let _guard = state.game_locks().acquire(game_id).await;

    let store = state.require_store().await?;
    let mut game = store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game {game_id} not found")))?;
    let total = game.target_songs.len();
    let max_attempts = game.max_attempts;

    let player = game
        .player_state(user_id)
        .ok_or_else(|| ServiceError::NotFound("player is not part of this game".into()))?;
    if player.is_finished(total) {
        return Ok(GuessResponse {
            correct: false,
            points_earned: 0,
            attempts_remaining: None,
            song: None,
            player_finished: true,
            already_completed: true,
            game_completed: game.status == GameStatus::Completed,
            leaderboard: game_leaderboard(&game),
        });
    }

    let index = player.current_song_index;
    let target = game.target_songs[index].clone();
    let correct = !request.skip
        && request
            .guess
            .as_deref()
            .is_some_and(|guess| normalize_guess(guess) == normalize_guess(&target.name));

    let player = game
        .player_state_mut(user_id)
        .ok_or_else(|| ServiceError::NotFound("player is not part of this game".into()))?;

    let mut points_earned = 0;
    let mut attempts_remaining = None;
    let mut song = None;
    let advanced;
    if correct {
        points_earned = max_attempts - player.current_song_attempts;
        player.completed_songs.push(CompletedSongEntity {
            song_index: index,
            correct: true,
            attempts: player.current_song_attempts + 1,
        });
        player.score += points_earned;
        player.current_song_index += 1;
        player.current_song_attempts = 0;
        song = Some(SongDto::from(&target));
        advanced = true;
    } else {
        let used = player.current_song_attempts + 1;
        if used >= max_attempts {
            player.completed_songs.push(CompletedSongEntity {
                song_index: index,
                correct: false,
                attempts: max_attempts,
            });
            player.current_song_index += 1;
            player.current_song_attempts = 0;
            song = Some(SongDto::from(&target));
            advanced = true;
        } else {
            player.current_song_attempts = used;
            attempts_remaining = Some(max_attempts - used);
            advanced = false;
        }
    }
    let player_finished = player.is_finished(total);

    let mut game_completed = false;
    if advanced && game.status == GameStatus::InProgress && game.all_finished() {
        game.status = GameStatus::Completed;
        game.completed_at = Some(SystemTime::now());
        game_completed = true;
    }

    store.save_game(game.clone()).await?;

    let leaderboard = game_leaderboard(&game);
    if advanced {
        ws_events::broadcast_leaderboard_update(state, game.lobby_id, &leaderboard);
    }
    if game_completed {
        info!(game = %game_id, "game completed");
        ws_events::broadcast_game_over(state, game.lobby_id, &leaderboard);
        finalize_lobby(state, &game).await;
    }

    Ok(GuessResponse {
        correct,
        points_earned,
        attempts_remaining,
        song,
        player_finished,
        already_completed: false,
        game_completed,
        leaderboard,
    })
}

/// Carry final scores back onto the lobby roster and close the lobby.
/// Best effort; a vanished lobby or storage hiccup is logged, the game
/// result itself is already saved.
async fn finalize_lobby(state: &SharedState, game: &GameEntity) {
    let _guard = state.lobby_locks().acquire(game.lobby_id).await;

    let store = match state.require_store().await {
        Ok(store) => store,
        Err(err) => {
            warn!(lobby = %game.lobby_id, error = %err, "cannot finalize lobby");
            return;
        }
    };
    let lobby = match store.find_lobby(game.lobby_id).await {
        Ok(Some(lobby)) => lobby,
        Ok(None) => return,
        Err(err) => {
            warn!(lobby = %game.lobby_id, error = %err, "cannot finalize lobby");
            return;
        }
    };

    let mut lobby = lobby;
    lobby.status = LobbyStatus::Completed;
    for player in &mut lobby.players {
        if let Some(progress) = game.player_state(player.user_id) {
            player.score = progress.score;
        }
    }
    if let Err(err) = store.save_lobby(lobby.clone()).await {
        warn!(lobby = %lobby.id, error = %err, "failed to save finalized lobby");
        return;
    }
    ws_events::broadcast_lobby_update(state, &lobby);
}

/// The caller's current position in the game: the song to guess next, or
/// a completion marker once the sequence is consumed.
pub async fn next_song(
    state: &SharedState,
    game_id: Uuid,
    user_id: Uuid,
) -> Result<NextSongResponse, ServiceError> {
    let store = state.require_store().await?;
    let game = store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game {game_id} not found")))?;

    let player = game
        .player_state(user_id)
        .ok_or_else(|| ServiceError::NotFound("player is not part of this game".into()))?;
    let total = game.target_songs.len();
    let leaderboard = game_leaderboard(&game);

    if player.is_finished(total) {
        return Ok(NextSongResponse {
            completed: true,
            song: None,
            index: None,
            total,
            leaderboard,
        });
    }

    let index = player.current_song_index;
    Ok(NextSongResponse {
        completed: false,
        song: Some(SongDto::from(&game.target_songs[index])),
        index: Some(index),
        total,
        leaderboard,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        config::{AppConfig, SeedTrack},
        dao::memory::MemoryStore,
        dto::lobby::CreateLobbyRequest,
        external::{StaticTrackSource, StaticUserDirectory, UserRecord},
        services::lobby_service,
        state::{AppState, ClientConnection},
    };

    fn seed_tracks(previewable: usize, silent: usize) -> Vec<SeedTrack> {
        let mut tracks = Vec::new();
        for i in 0..previewable {
            tracks.push(SeedTrack {
                name: format!("Song {i}"),
                artist: format!("Artist {i}"),
                album_cover: Some(format!("https://covers.example/{i}.jpg")),
                preview_url: Some(format!("https://previews.example/{i}.mp3")),
            });
        }
        for i in 0..silent {
            tracks.push(SeedTrack {
                name: format!("Silent {i}"),
                artist: format!("Artist {i}"),
                album_cover: None,
                preview_url: None,
            });
        }
        tracks
    }

    async fn test_state(users: &[Uuid], tracks: Vec<SeedTrack>) -> SharedState {
        let directory = StaticUserDirectory::default();
        for &id in users {
            directory.insert(UserRecord {
                id,
                email: format!("{id}@example.com"),
            });
        }
        let state = AppState::new(
            AppConfig::with_secret("test-secret"),
            Arc::new(directory),
            Arc::new(StaticTrackSource::from_seed(&tracks)),
        );
        state.install_store(Arc::new(MemoryStore::new())).await;
        state
    }

    /// Create a lobby with the given users, everyone ready, owner first.
    async fn ready_lobby(state: &SharedState, users: &[Uuid], song_count: usize) -> Uuid {
        let request = CreateLobbyRequest {
            max_players: Some(users.len().max(2)),
            song_count: Some(song_count),
            max_attempts: None,
        };
        let lobby = lobby_service::create_lobby(state, users[0], &request)
            .await
            .unwrap();
        for &user in &users[1..] {
            lobby_service::join_lobby(state, lobby.id, user).await.unwrap();
        }
        for &user in users {
            lobby_service::toggle_ready(state, lobby.id, user).await.unwrap();
        }
        lobby.id
    }

    fn guess(text: &str) -> GuessRequest {
        GuessRequest {
            guess: Some(text.to_owned()),
            skip: false,
        }
    }

    fn skip() -> GuessRequest {
        GuessRequest {
            guess: None,
            skip: true,
        }
    }

    #[tokio::test]
    async fn start_requires_the_owner() {
        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let state = test_state(&users, seed_tracks(5, 0)).await;
        let lobby_id = ready_lobby(&state, &users, 3).await;

        let err = start_game(&state, lobby_id, users[1]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn start_requires_everyone_ready() {
        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let state = test_state(&users, seed_tracks(5, 0)).await;
        let lobby_id = ready_lobby(&state, &users, 3).await;
        // Un-ready one player again.
        lobby_service::toggle_ready(&state, lobby_id, users[1])
            .await
            .unwrap();

        let err = start_game(&state, lobby_id, users[0]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Precondition(_)));
    }

    #[tokio::test]
    async fn start_draws_previewable_songs_and_moves_the_lobby_in_game() {
        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let state = test_state(&users, seed_tracks(4, 4)).await;
        let lobby_id = ready_lobby(&state, &users, 3).await;

        let game = start_game(&state, lobby_id, users[0]).await.unwrap();
        assert_eq!(game.target_songs.len(), 3);
        assert!(game.target_songs.iter().all(|s| !s.preview_url.is_empty()));
        assert_eq!(game.player_states.len(), 2);
        assert_eq!(game.status, GameStatus::InProgress);

        let lobby = lobby_service::get_lobby(&state, lobby_id).await.unwrap();
        assert_eq!(lobby.status, LobbyStatus::InGame);
        assert_eq!(lobby.active_game_id, Some(game.id));

        // A second launch from the same lobby is rejected.
        let err = start_game(&state, lobby_id, users[0]).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn start_accepts_a_short_draw_but_not_an_empty_one() {
        let users: Vec<Uuid> = (0..1).map(|_| Uuid::new_v4()).collect();
        let state = test_state(&users, seed_tracks(2, 3)).await;
        let lobby_id = ready_lobby(&state, &users, 5).await;
        let game = start_game(&state, lobby_id, users[0]).await.unwrap();
        assert_eq!(game.target_songs.len(), 2);

        let state = test_state(&users, seed_tracks(0, 3)).await;
        let lobby_id = ready_lobby(&state, &users, 5).await;
        let err = start_game(&state, lobby_id, users[0]).await.unwrap_err();
        assert!(matches!(err, ServiceError::ExternalUnavailable(_)));
    }

    #[tokio::test]
    async fn correct_guess_scores_by_remaining_attempts_and_advances() {
        let user = Uuid::new_v4();
        let state = test_state(&[user], seed_tracks(5, 0)).await;
        let lobby_id = ready_lobby(&state, &[user], 2).await;
        let game = start_game(&state, lobby_id, user).await.unwrap();
        let title = game.target_songs[0].name.clone();

        // First attempt, padded and cased differently.
        let response = process_action(&state, game.id, user, &guess(&format!("  {}  ", title.to_uppercase())))
            .await
            .unwrap();
        assert!(response.correct);
        assert_eq!(response.points_earned, 5);
        assert_eq!(response.attempts_remaining, None);
        assert_eq!(response.song.as_ref().unwrap().name, title);
        assert!(!response.player_finished);
        assert_eq!(response.leaderboard[0].score, 5);

        let position = next_song(&state, game.id, user).await.unwrap();
        assert_eq!(position.index, Some(1));
        assert!(!position.completed);
    }

    #[tokio::test]
    async fn wrong_guesses_and_skips_burn_attempts_until_the_song_is_revealed() {
        let user = Uuid::new_v4();
        let state = test_state(&[user], seed_tracks(5, 0)).await;
        let lobby_id = ready_lobby(&state, &[user], 1).await;
        let game = start_game(&state, lobby_id, user).await.unwrap();
        let title = game.target_songs[0].name.clone();

        let response = process_action(&state, game.id, user, &guess("wrong")).await.unwrap();
        assert!(!response.correct);
        assert_eq!(response.attempts_remaining, Some(4));
        assert!(response.song.is_none());

        // A skip consumes an attempt exactly like a wrong guess.
        let response = process_action(&state, game.id, user, &skip()).await.unwrap();
        assert_eq!(response.attempts_remaining, Some(3));

        for expected in [2, 1] {
            let response = process_action(&state, game.id, user, &guess("still wrong"))
                .await
                .unwrap();
            assert_eq!(response.attempts_remaining, Some(expected));
        }

        // Fifth failure exhausts the budget: reveal, no points, advance.
        let response = process_action(&state, game.id, user, &skip()).await.unwrap();
        assert!(!response.correct);
        assert_eq!(response.points_earned, 0);
        assert_eq!(response.attempts_remaining, None);
        assert_eq!(response.song.as_ref().unwrap().name, title);
        assert!(response.player_finished);
        assert!(response.game_completed);
        assert_eq!(response.leaderboard[0].score, 0);
    }

    #[tokio::test]
    async fn a_late_correct_guess_scores_the_remaining_budget() {
        let user = Uuid::new_v4();
        let state = test_state(&[user], seed_tracks(5, 0)).await;
        let lobby_id = ready_lobby(&state, &[user], 1).await;
        let game = start_game(&state, lobby_id, user).await.unwrap();
        let title = game.target_songs[0].name.clone();

        process_action(&state, game.id, user, &skip()).await.unwrap();
        process_action(&state, game.id, user, &guess("nope")).await.unwrap();
        let response = process_action(&state, game.id, user, &guess(&title)).await.unwrap();
        assert!(response.correct);
        // Two attempts burned, three left: three points.
        assert_eq!(response.points_earned, 3);

        let stored = state
            .require_store()
            .await
            .unwrap()
            .find_game(game.id)
            .await
            .unwrap()
            .unwrap();
        let progress = stored.player_state(user).unwrap();
        assert_eq!(progress.completed_songs.len(), 1);
        assert!(progress.completed_songs[0].correct);
        assert_eq!(progress.completed_songs[0].attempts, 3);
    }

    #[tokio::test]
    async fn actions_after_finishing_are_acknowledged_without_mutation() {
        let user = Uuid::new_v4();
        let state = test_state(&[user], seed_tracks(5, 0)).await;
        let lobby_id = ready_lobby(&state, &[user], 1).await;
        let game = start_game(&state, lobby_id, user).await.unwrap();
        let title = game.target_songs[0].name.clone();

        process_action(&state, game.id, user, &guess(&title)).await.unwrap();
        let response = process_action(&state, game.id, user, &guess(&title)).await.unwrap();
        assert!(response.already_completed);
        assert!(response.player_finished);
        assert!(!response.correct);
        assert_eq!(response.points_earned, 0);
        assert_eq!(response.leaderboard[0].score, 5);
    }

    #[tokio::test]
    async fn rejects_outsiders_and_empty_actions() {
        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let state = test_state(&users, seed_tracks(5, 0)).await;
        let lobby_id = ready_lobby(&state, &users[..1], 1).await;
        let game = start_game(&state, lobby_id, users[0]).await.unwrap();

        let err = process_action(&state, game.id, users[1], &skip()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let empty = GuessRequest {
            guess: None,
            skip: false,
        };
        let err = process_action(&state, game.id, users[0], &empty).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn players_progress_independently_and_completion_fires_once() {
        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let state = test_state(&users, seed_tracks(6, 0)).await;
        let lobby_id = ready_lobby(&state, &users, 2).await;
        let game = start_game(&state, lobby_id, users[0]).await.unwrap();
        let titles: Vec<String> = game.target_songs.iter().map(|s| s.name.clone()).collect();

        // A spectator connection in the lobby room counts broadcasts.
        let (tx, mut rx) = mpsc::unbounded_channel();
        let spectator = Uuid::new_v4();
        state.connections().insert(
            spectator,
            ClientConnection {
                id: spectator,
                user_id: users[0],
                email: "spectator@example.com".into(),
                tx,
            },
        );
        state.rooms().join(lobby_id, spectator);

        // Player 0 aces both songs; player 1 is still on song 0.
        process_action(&state, game.id, users[0], &guess(&titles[0])).await.unwrap();
        let response = process_action(&state, game.id, users[0], &guess(&titles[1]))
            .await
            .unwrap();
        assert!(response.player_finished);
        assert!(!response.game_completed);

        let position = next_song(&state, game.id, users[1]).await.unwrap();
        assert_eq!(position.index, Some(0));

        // Player 1 fumbles the first song and aces the second.
        for _ in 0..5 {
            process_action(&state, game.id, users[1], &skip()).await.unwrap();
        }
        let response = process_action(&state, game.id, users[1], &guess(&titles[1]))
            .await
            .unwrap();
        assert!(response.player_finished);
        assert!(response.game_completed);

        let stored = state
            .require_store()
            .await
            .unwrap()
            .find_game(game.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, GameStatus::Completed);
        assert!(stored.completed_at.is_some());
        assert_eq!(stored.player_state(users[0]).unwrap().score, 10);
        assert_eq!(stored.player_state(users[1]).unwrap().score, 5);

        // Scores are carried back onto the closed lobby.
        let lobby = lobby_service::get_lobby(&state, lobby_id).await.unwrap();
        assert_eq!(lobby.status, LobbyStatus::Completed);
        assert_eq!(lobby.player(users[0]).unwrap().score, 10);
        assert_eq!(lobby.player(users[1]).unwrap().score, 5);

        // Exactly one game-over broadcast reached the room.
        let mut game_over_frames = 0;
        while let Ok(frame) = rx.try_recv() {
            if let axum::extract::ws::Message::Text(text) = frame {
                let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
                if value["event"] == ws_events::EVENT_GAME_OVER {
                    game_over_frames += 1;
                    assert_eq!(value["data"]["leaderboard"][0]["score"], 10);
                }
            }
        }
        assert_eq!(game_over_frames, 1);
    }

    #[tokio::test]
    async fn concurrent_finishers_produce_a_single_completion() {
        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let state = test_state(&users, seed_tracks(4, 0)).await;
        let lobby_id = ready_lobby(&state, &users, 1).await;
        let game = start_game(&state, lobby_id, users[0]).await.unwrap();
        let title = game.target_songs[0].name.clone();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let spectator = Uuid::new_v4();
        state.connections().insert(
            spectator,
            ClientConnection {
                id: spectator,
                user_id: users[0],
                email: "spectator@example.com".into(),
                tx,
            },
        );
        state.rooms().join(lobby_id, spectator);

        // Both players fire their final (correct) guess at the same time.
        let mut handles = Vec::new();
        for &user in &users {
            let state = state.clone();
            let title = title.clone();
            let game_id = game.id;
            handles.push(tokio::spawn(async move {
                process_action(&state, game_id, user, &guess(&title))
                    .await
                    .unwrap()
            }));
        }
        let mut completions = 0;
        for handle in handles {
            let response = handle.await.unwrap();
            assert!(response.player_finished);
            if response.game_completed {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);

        let stored = state
            .require_store()
            .await
            .unwrap()
            .find_game(game.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, GameStatus::Completed);
        assert!(stored.completed_at.is_some());

        let mut game_over_frames = 0;
        while let Ok(frame) = rx.try_recv() {
            if let axum::extract::ws::Message::Text(text) = frame {
                let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
                if value["event"] == ws_events::EVENT_GAME_OVER {
                    game_over_frames += 1;
                }
            }
        }
        assert_eq!(game_over_frames, 1);
    }

    #[tokio::test]
    async fn next_song_reports_completion() {
        let user = Uuid::new_v4();
        let state = test_state(&[user], seed_tracks(5, 0)).await;
        let lobby_id = ready_lobby(&state, &[user], 1).await;
        let game = start_game(&state, lobby_id, user).await.unwrap();
        let title = game.target_songs[0].name.clone();

        process_action(&state, game.id, user, &guess(&title)).await.unwrap();
        let position = next_song(&state, game.id, user).await.unwrap();
        assert!(position.completed);
        assert!(position.song.is_none());
        assert_eq!(position.total, 1);
    }

    #[test]
    fn guess_normalization_trims_and_folds_case() {
        assert_eq!(normalize_guess("  Bohemian Rhapsody  "), "bohemian rhapsody");
        assert_eq!(normalize_guess("HELLO"), "hello");
    }
}
