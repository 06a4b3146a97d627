//! Fan-out of server events to WebSocket connections.
//!
//! Every frame is a JSON envelope `{"event": ..., "data": ...}`. Delivery
//! is best effort: a closed or lagging connection is logged and skipped,
//! never allowed to fail the mutation that triggered the broadcast.

use axum::extract::ws::Message;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dao::models::{GameEntity, LobbyEntity},
    dto::{
        common::{LeaderboardEntry, SongDto, game_leaderboard},
        ws::{
            ErrorEvent, GameOverEvent, GameStartedEvent, LeaderboardUpdateEvent, LobbyUpdateEvent,
            PlayersReadyStatusEvent,
        },
    },
    state::SharedState,
};

/// Event emitted after a successful connection handshake.
pub const EVENT_AUTHENTICATED: &str = "authenticated";
/// Event acknowledging a `join-by-code` request.
pub const EVENT_JOINED_LOBBY: &str = "joined-lobby";
/// Event acknowledging a `leave-lobby` request.
pub const EVENT_LEFT_LOBBY: &str = "left-lobby";
/// Event carrying a roster/status snapshot to a lobby room.
pub const EVENT_LOBBY_UPDATE: &str = "lobby-update";
/// Event carrying the aggregate ready flag to a lobby room.
pub const EVENT_PLAYERS_READY_STATUS: &str = "players-ready-status";
/// Event announcing a freshly launched game to a lobby room.
pub const EVENT_GAME_STARTED: &str = "game-started";
/// Event carrying a scoreboard snapshot after a player advances.
pub const EVENT_LEADERBOARD_UPDATE: &str = "leaderboard-update";
/// Event announcing that every player has finished.
pub const EVENT_GAME_OVER: &str = "game-over";
/// Event reporting a per-connection failure.
pub const EVENT_ERROR: &str = "error";
/// Event answering a `ping` probe.
pub const EVENT_PONG: &str = "pong";

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    event: &'a str,
    data: &'a T,
}

fn encode<T: Serialize>(event: &str, data: &T) -> Option<String> {
    match serde_json::to_string(&Envelope { event, data }) {
        Ok(frame) => Some(frame),
        Err(err) => {
            warn!(event, error = %err, "failed to encode event payload");
            None
        }
    }
}

/// Push an event frame onto a connection's writer queue.
pub fn send_event_to_tx<T: Serialize>(tx: &UnboundedSender<Message>, event: &str, data: &T) {
    let Some(frame) = encode(event, data) else {
        return;
    };
    if tx.send(Message::Text(frame.into())).is_err() {
        debug!(event, "writer task gone, dropping event");
    }
}

/// Send an event to a single registered connection.
pub fn send_to_connection<T: Serialize>(
    state: &SharedState,
    connection_id: Uuid,
    event: &str,
    data: &T,
) {
    let Some(connection) = state.connections().get(&connection_id) else {
        debug!(connection = %connection_id, event, "connection no longer registered");
        return;
    };
    send_event_to_tx(&connection.tx, event, data);
}

/// Send an event to every connection subscribed to a room.
pub fn send_room_event<T: Serialize>(state: &SharedState, room_id: Uuid, event: &str, data: &T) {
    let Some(frame) = encode(event, data) else {
        return;
    };
    for connection_id in state.rooms().members(room_id) {
        let Some(connection) = state.connections().get(&connection_id) else {
            continue;
        };
        if connection.tx.send(Message::Text(frame.clone().into())).is_err() {
            warn!(
                connection = %connection_id,
                room = %room_id,
                event,
                "failed to deliver event, writer closed"
            );
        }
    }
}

/// Report a failure on a single connection.
pub fn send_error(state: &SharedState, connection_id: Uuid, message: impl Into<String>) {
    send_to_connection(
        state,
        connection_id,
        EVENT_ERROR,
        &ErrorEvent {
            message: message.into(),
        },
    );
}

/// Broadcast the current roster and status of a lobby to its room.
pub fn broadcast_lobby_update(state: &SharedState, lobby: &LobbyEntity) {
    send_room_event(
        state,
        lobby.id,
        EVENT_LOBBY_UPDATE,
        &LobbyUpdateEvent::from(lobby),
    );
}

/// Broadcast whether every rostered player is ready.
pub fn broadcast_ready_status(state: &SharedState, lobby: &LobbyEntity) {
    send_room_event(
        state,
        lobby.id,
        EVENT_PLAYERS_READY_STATUS,
        &PlayersReadyStatusEvent {
            all_ready: lobby.all_ready(),
        },
    );
}

/// Announce a freshly launched game to the lobby room.
pub fn broadcast_game_started(state: &SharedState, lobby_id: Uuid, game: &GameEntity) {
    let songs: Vec<SongDto> = game.target_songs.iter().map(SongDto::from).collect();
    let first_preview = game
        .target_songs
        .first()
        .map(|song| song.preview_url.clone());
    send_room_event(
        state,
        lobby_id,
        EVENT_GAME_STARTED,
        &GameStartedEvent {
            game_id: game.id,
            total_songs: songs.len(),
            songs,
            first_preview,
            leaderboard: game_leaderboard(game),
        },
    );
}

/// Broadcast a scoreboard snapshot to the lobby room.
pub fn broadcast_leaderboard_update(
    state: &SharedState,
    lobby_id: Uuid,
    leaderboard: &[LeaderboardEntry],
) {
    send_room_event(
        state,
        lobby_id,
        EVENT_LEADERBOARD_UPDATE,
        &LeaderboardUpdateEvent {
            leaderboard: leaderboard.to_vec(),
        },
    );
}

/// Announce the end of a game to the lobby room.
pub fn broadcast_game_over(
    state: &SharedState,
    lobby_id: Uuid,
    leaderboard: &[LeaderboardEntry],
) {
    send_room_event(
        state,
        lobby_id,
        EVENT_GAME_OVER,
        &GameOverEvent {
            leaderboard: leaderboard.to_vec(),
        },
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        config::AppConfig,
        external::{StaticTrackSource, StaticUserDirectory},
        state::{AppState, ClientConnection},
    };

    fn test_state() -> SharedState {
        AppState::new(
            AppConfig::with_secret("test-secret"),
            Arc::new(StaticUserDirectory::default()),
            Arc::new(StaticTrackSource::default()),
        )
    }

    fn register_connection(
        state: &SharedState,
        user_id: Uuid,
    ) -> (Uuid, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = Uuid::new_v4();
        state.connections().insert(
            connection_id,
            ClientConnection {
                id: connection_id,
                user_id,
                email: format!("{user_id}@example.com"),
                tx,
            },
        );
        (connection_id, rx)
    }

    #[tokio::test]
    async fn room_events_reach_every_member_and_nobody_else() {
        let state = test_state();
        let room = Uuid::new_v4();

        let (member_a, mut rx_a) = register_connection(&state, Uuid::new_v4());
        let (member_b, mut rx_b) = register_connection(&state, Uuid::new_v4());
        let (_outsider, mut rx_c) = register_connection(&state, Uuid::new_v4());
        state.rooms().join(room, member_a);
        state.rooms().join(room, member_b);

        send_room_event(
            &state,
            room,
            EVENT_PLAYERS_READY_STATUS,
            &PlayersReadyStatusEvent { all_ready: true },
        );

        for rx in [&mut rx_a, &mut rx_b] {
            let Some(Message::Text(frame)) = rx.recv().await else {
                panic!("expected a text frame");
            };
            let value: serde_json::Value = serde_json::from_str(frame.as_str()).unwrap();
            assert_eq!(value["event"], EVENT_PLAYERS_READY_STATUS);
            assert_eq!(value["data"]["all_ready"], true);
        }
        assert!(rx_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_writers_do_not_fail_the_broadcast() {
        let state = test_state();
        let room = Uuid::new_v4();

        let (dead, rx) = register_connection(&state, Uuid::new_v4());
        drop(rx);
        let (live, mut live_rx) = register_connection(&state, Uuid::new_v4());
        state.rooms().join(room, dead);
        state.rooms().join(room, live);

        send_error(&state, dead, "nobody is listening");
        send_room_event(
            &state,
            room,
            EVENT_PLAYERS_READY_STATUS,
            &PlayersReadyStatusEvent { all_ready: false },
        );

        assert!(live_rx.recv().await.is_some());
    }
}
