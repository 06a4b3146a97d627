//! Lobby lifecycle: creation, membership, ready state, and cleanup.
//!
//! Every mutation runs under the per-lobby lock so concurrent joins,
//! toggles, and leaves serialize into a consistent roster. Successful
//! mutations broadcast a fresh snapshot to the lobby room before
//! returning.

use std::time::SystemTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{
        GameSettingsEntity, JOIN_CODE_LENGTH, LobbyEntity, LobbyPlayerEntity, LobbyStatus,
    },
    dto::lobby::CreateLobbyRequest,
    error::ServiceError,
    external::UserRecord,
    services::ws_events,
    state::SharedState,
};

async fn resolve_user(state: &SharedState, user_id: Uuid) -> Result<UserRecord, ServiceError> {
    state
        .directory()
        .find_user(user_id)
        .await
        .map_err(|err| ServiceError::ExternalUnavailable(err.to_string()))?
        .ok_or_else(|| ServiceError::NotFound(format!("user {user_id} not found")))
}

/// Create a lobby owned by `owner_id`, seeding the roster with the owner.
pub async fn create_lobby(
    state: &SharedState,
    owner_id: Uuid,
    request: &CreateLobbyRequest,
) -> Result<LobbyEntity, ServiceError> {
    let store = state.require_store().await?;
    let owner = resolve_user(state, owner_id).await?;
    let defaults = state.config().lobby_defaults();

    let lobby = LobbyEntity {
        id: Uuid::new_v4(),
        owner_id,
        players: vec![LobbyPlayerEntity {
            user_id: owner.id,
            email: owner.email,
            ready: false,
            score: 0,
        }],
        status: LobbyStatus::Waiting,
        max_players: request.max_players.unwrap_or(defaults.max_players),
        game_settings: GameSettingsEntity {
            song_count: request.song_count.unwrap_or(defaults.song_count),
            max_attempts: request.max_attempts.unwrap_or(defaults.max_attempts),
        },
        active_game_id: None,
        created_at: SystemTime::now(),
    };

    store.save_lobby(lobby.clone()).await?;
    info!(lobby = %lobby.id, code = %lobby.join_code(), owner = %owner_id, "lobby created");
    Ok(lobby)
}

/// Fetch a lobby by identifier.
pub async fn get_lobby(state: &SharedState, lobby_id: Uuid) -> Result<LobbyEntity, ServiceError> {
    let store = state.require_store().await?;
    store
        .find_lobby(lobby_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("lobby {lobby_id} not found")))
}

/// Resolve a lobby reference: a full identifier or a six-character join code.
pub async fn resolve_lobby(
    state: &SharedState,
    reference: &str,
) -> Result<LobbyEntity, ServiceError> {
    let store = state.require_store().await?;
    let found = match Uuid::parse_str(reference) {
        Ok(id) => store.find_lobby(id).await?,
        Err(_) if reference.len() == JOIN_CODE_LENGTH => {
            store.find_lobby_by_code(reference.to_owned()).await?
        }
        Err(_) => {
            return Err(ServiceError::InvalidInput(format!(
                "'{reference}' is neither a lobby id nor a join code"
            )));
        }
    };
    found.ok_or_else(|| ServiceError::NotFound(format!("no lobby matches '{reference}'")))
}

/// Add a player to a lobby. Joining a lobby the player is already in is a
/// no-op returning the unchanged lobby.
pub async fn join_lobby(
    state: &SharedState,
    lobby_id: Uuid,
    user_id: Uuid,
) -> Result<LobbyEntity, ServiceError> {
    let _guard = state.lobby_locks().acquire(lobby_id).await;

    let store = state.require_store().await?;
    let mut lobby = store
        .find_lobby(lobby_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("lobby {lobby_id} not found")))?;

    if lobby.contains_player(user_id) {
        return Ok(lobby);
    }
    if lobby.status != LobbyStatus::Waiting {
        return Err(ServiceError::InvalidState(
            "lobby is no longer accepting players".into(),
        ));
    }
    if lobby.players.len() >= lobby.max_players {
        return Err(ServiceError::Full(format!(
            "lobby {lobby_id} is at capacity ({})",
            lobby.max_players
        )));
    }

    let user = resolve_user(state, user_id).await?;
    lobby.players.push(LobbyPlayerEntity {
        user_id: user.id,
        email: user.email,
        ready: false,
        score: 0,
    });
    store.save_lobby(lobby.clone()).await?;

    info!(lobby = %lobby_id, user = %user_id, "player joined lobby");
    ws_events::broadcast_lobby_update(state, &lobby);
    Ok(lobby)
}

/// Flip a player's ready flag and broadcast the new roster plus the
/// aggregate ready status.
pub async fn toggle_ready(
    state: &SharedState,
    lobby_id: Uuid,
    user_id: Uuid,
) -> Result<LobbyEntity, ServiceError> {
    let _guard = state.lobby_locks().acquire(lobby_id).await;

    let store = state.require_store().await?;
    let mut lobby = store
        .find_lobby(lobby_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("lobby {lobby_id} not found")))?;

    let player = lobby
        .players
        .iter_mut()
        .find(|p| p.user_id == user_id)
        .ok_or_else(|| ServiceError::NotFound("player is not in this lobby".into()))?;
    player.ready = !player.ready;
    store.save_lobby(lobby.clone()).await?;

    ws_events::broadcast_lobby_update(state, &lobby);
    ws_events::broadcast_ready_status(state, &lobby);
    Ok(lobby)
}

/// Remove a player from a lobby.
///
/// Ownership transfers to the earliest remaining player when the owner
/// leaves; an emptied lobby is deleted. Returns `None` when the lobby no
/// longer exists after the call. Leaving a lobby one is not in, or a
/// lobby that is already gone, is a no-op.
pub async fn leave_lobby(
    state: &SharedState,
    lobby_id: Uuid,
    user_id: Uuid,
) -> Result<Option<LobbyEntity>, ServiceError> {
    let _guard = state.lobby_locks().acquire(lobby_id).await;

    let store = state.require_store().await?;
    let Some(mut lobby) = store.find_lobby(lobby_id).await? else {
        return Ok(None);
    };
    if !lobby.contains_player(user_id) {
        return Ok(Some(lobby));
    }

    lobby.players.retain(|p| p.user_id != user_id);

    if lobby.players.is_empty() {
        store.delete_lobby(lobby_id).await?;
        state.lobby_locks().discard(lobby_id);
        info!(lobby = %lobby_id, "last player left, lobby deleted");
        return Ok(None);
    }

    if lobby.owner_id == user_id {
        lobby.owner_id = lobby.players[0].user_id;
        info!(lobby = %lobby_id, new_owner = %lobby.owner_id, "ownership transferred");
    }
    store.save_lobby(lobby.clone()).await?;

    info!(lobby = %lobby_id, user = %user_id, "player left lobby");
    ws_events::broadcast_lobby_update(state, &lobby);
    Ok(Some(lobby))
}

/// Sweep a disconnected user out of every lobby they were rostered in.
///
/// Failures on individual lobbies are logged and do not stop the sweep.
pub async fn handle_disconnect(state: &SharedState, user_id: Uuid) {
    let Some(store) = state.store().await else {
        warn!(user = %user_id, "skipping disconnect sweep, storage degraded");
        return;
    };

    let lobbies = match store.lobbies_with_player(user_id).await {
        Ok(lobbies) => lobbies,
        Err(err) => {
            warn!(user = %user_id, error = %err, "failed to enumerate lobbies on disconnect");
            return;
        }
    };

    for lobby in lobbies {
        if let Err(err) = leave_lobby(state, lobby.id, user_id).await {
            warn!(
                lobby = %lobby.id,
                user = %user_id,
                error = %err,
                "disconnect cleanup failed for lobby"
            );
        }
    }
}
