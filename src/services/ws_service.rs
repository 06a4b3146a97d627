use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{
        AuthenticatedEvent, ClientMessage, ErrorEvent, JoinedLobbyEvent, LeftLobbyEvent, PongEvent,
    },
    error::ServiceError,
    services::{auth_service, lobby_service, ws_events},
    state::{ClientConnection, SharedState},
};

const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle the full lifecycle of one client WebSocket connection.
///
/// The first frame must be an `authenticate` message; anything else, or
/// ten seconds of silence, closes the socket. After the handshake the
/// connection is registered for event delivery and inbound frames are
/// dispatched until the peer disconnects, at which point the user is
/// swept out of their lobbies.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(IDENT_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket authentication timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let token = match ClientMessage::from_json_str(&initial_message) {
        Ok(ClientMessage::Authenticate { token }) => token,
        Ok(_) => {
            warn!("first frame was not an authenticate message");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Err(err) => {
            warn!(error = %err, "failed to parse handshake frame");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let user = match auth_service::authenticate(&state, &token).await {
        Ok(user) => user,
        Err(err) => {
            warn!(error = %err, "websocket authentication rejected");
            ws_events::send_event_to_tx(
                &outbound_tx,
                ws_events::EVENT_ERROR,
                &ErrorEvent {
                    message: err.to_string(),
                },
            );
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let connection_id = Uuid::new_v4();
    state.connections().insert(
        connection_id,
        ClientConnection {
            id: connection_id,
            user_id: user.id,
            email: user.email.clone(),
            tx: outbound_tx.clone(),
        },
    );
    info!(connection = %connection_id, user = %user.id, "client connected");

    ws_events::send_event_to_tx(
        &outbound_tx,
        ws_events::EVENT_AUTHENTICATED,
        &AuthenticatedEvent {
            user_id: user.id,
            email: user.email.clone(),
        },
    );

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match ClientMessage::from_json_str(&text) {
                Ok(msg) => {
                    if let Err(err) = dispatch(&state, connection_id, user.id, msg).await {
                        warn!(connection = %connection_id, error = %err, "request failed");
                        ws_events::send_error(&state, connection_id, err.to_string());
                    }
                }
                Err(err) => {
                    warn!(connection = %connection_id, error = %err, "unparseable frame");
                    ws_events::send_error(&state, connection_id, "malformed message");
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(connection = %connection_id, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(connection = %connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    state.connections().remove(&connection_id);
    state.rooms().leave_all(connection_id);
    lobby_service::handle_disconnect(&state, user.id).await;
    info!(connection = %connection_id, user = %user.id, "client disconnected");

    finalize(writer_task, outbound_tx).await;
}

async fn dispatch(
    state: &SharedState,
    connection_id: Uuid,
    user_id: Uuid,
    message: ClientMessage,
) -> Result<(), ServiceError> {
    match message {
        ClientMessage::JoinByCode { code } => {
            handle_join_by_code(state, connection_id, user_id, &code).await
        }
        ClientMessage::LeaveLobby { lobby_id } => {
            state.rooms().leave(lobby_id, connection_id);
            lobby_service::leave_lobby(state, lobby_id, user_id).await?;
            ws_events::send_to_connection(
                state,
                connection_id,
                ws_events::EVENT_LEFT_LOBBY,
                &LeftLobbyEvent {
                    message: "left lobby".into(),
                },
            );
            Ok(())
        }
        ClientMessage::ToggleReady { lobby_id } => {
            lobby_service::toggle_ready(state, lobby_id, user_id).await?;
            Ok(())
        }
        ClientMessage::Ping => {
            let timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default();
            ws_events::send_to_connection(
                state,
                connection_id,
                ws_events::EVENT_PONG,
                &PongEvent { timestamp },
            );
            Ok(())
        }
        ClientMessage::Authenticate { .. } => {
            warn!(connection = %connection_id, "ignoring duplicate authenticate message");
            Ok(())
        }
        ClientMessage::Unknown => {
            warn!(connection = %connection_id, "ignoring unknown message type");
            Ok(())
        }
    }
}

/// Resolve a join code, subscribe the connection to the lobby room, and
/// add the user to the roster. Room membership is rolled back when the
/// join itself is rejected.
async fn handle_join_by_code(
    state: &SharedState,
    connection_id: Uuid,
    user_id: Uuid,
    code: &str,
) -> Result<(), ServiceError> {
    let lobby = lobby_service::resolve_lobby(state, code).await?;

    // One lobby room per connection.
    state.rooms().leave_all(connection_id);
    state.rooms().join(lobby.id, connection_id);

    match lobby_service::join_lobby(state, lobby.id, user_id).await {
        Ok(joined) => {
            ws_events::send_to_connection(
                state,
                connection_id,
                ws_events::EVENT_JOINED_LOBBY,
                &JoinedLobbyEvent {
                    lobby_id: joined.id,
                    lobby_code: joined.join_code(),
                },
            );
            Ok(())
        }
        Err(err) => {
            state.rooms().leave(lobby.id, connection_id);
            Err(err)
        }
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
