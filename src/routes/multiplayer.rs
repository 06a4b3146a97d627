use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        game::{GuessRequest, GuessResponse, NextSongResponse, StartGameResponse},
        lobby::{CreateLobbyRequest, LobbyCreatedResponse, LobbyDetailResponse},
    },
    error::AppError,
    services::{
        auth_service::{self, AuthenticatedUser},
        game_service, lobby_service,
    },
    state::SharedState,
};

/// Authenticated lobby and game progression endpoints.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/multiplayer/lobby", post(create_lobby))
        .route("/multiplayer/lobby/{lobby_id}", get(get_lobby))
        .route("/multiplayer/game/{lobby_id}", post(start_game))
        .route("/multiplayer/game/{game_id}/guess", post(post_guess))
        .route("/multiplayer/game/{game_id}/next", get(get_next_song))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth_service::require_user,
        ))
}

/// Create a lobby owned by the caller.
#[utoipa::path(
    post,
    path = "/multiplayer/lobby",
    tag = "multiplayer",
    request_body = CreateLobbyRequest,
    responses(
        (status = 201, description = "Lobby created", body = LobbyCreatedResponse),
        (status = 400, description = "Invalid lobby parameters"),
        (status = 401, description = "Missing or invalid session token"),
    )
)]
pub async fn create_lobby(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateLobbyRequest>,
) -> Result<(StatusCode, Json<LobbyCreatedResponse>), AppError> {
    payload.validate()?;
    let lobby = lobby_service::create_lobby(&state, user.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(LobbyCreatedResponse::from(&lobby))))
}

/// Retrieve a lobby by its identifier.
#[utoipa::path(
    get,
    path = "/multiplayer/lobby/{lobby_id}",
    tag = "multiplayer",
    params(("lobby_id" = Uuid, Path, description = "Identifier of the lobby to retrieve")),
    responses(
        (status = 200, description = "Lobby detail", body = LobbyDetailResponse),
        (status = 404, description = "No such lobby"),
    )
)]
pub async fn get_lobby(
    State(state): State<SharedState>,
    Path(lobby_id): Path<Uuid>,
) -> Result<Json<LobbyDetailResponse>, AppError> {
    let lobby = lobby_service::get_lobby(&state, lobby_id).await?;
    Ok(Json(LobbyDetailResponse::from(&lobby)))
}

/// Launch a game from a lobby. Owner only; every player must be ready.
#[utoipa::path(
    post,
    path = "/multiplayer/game/{lobby_id}",
    tag = "multiplayer",
    params(("lobby_id" = Uuid, Path, description = "Lobby to launch the game from")),
    responses(
        (status = 201, description = "Game started", body = StartGameResponse),
        (status = 403, description = "Caller does not own the lobby"),
        (status = 409, description = "A game was already started"),
        (status = 412, description = "Not every player is ready"),
        (status = 503, description = "No previewable tracks available"),
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(lobby_id): Path<Uuid>,
) -> Result<(StatusCode, Json<StartGameResponse>), AppError> {
    let game = game_service::start_game(&state, lobby_id, user.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(StartGameResponse {
            game_id: game.id,
            total_songs: game.target_songs.len(),
        }),
    ))
}

/// Submit a guess or a skip for the caller's current song.
#[utoipa::path(
    post,
    path = "/multiplayer/game/{game_id}/guess",
    tag = "multiplayer",
    params(("game_id" = Uuid, Path, description = "Game to act in")),
    request_body = GuessRequest,
    responses(
        (status = 200, description = "Action applied", body = GuessResponse),
        (status = 400, description = "Neither a guess nor a skip was provided"),
        (status = 404, description = "No such game, or caller is not a player"),
    )
)]
pub async fn post_guess(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(game_id): Path<Uuid>,
    Json(payload): Json<GuessRequest>,
) -> Result<Json<GuessResponse>, AppError> {
    let response = game_service::process_action(&state, game_id, user.id, &payload).await?;
    Ok(Json(response))
}

/// The caller's current song, or a completion marker once they finish.
#[utoipa::path(
    get,
    path = "/multiplayer/game/{game_id}/next",
    tag = "multiplayer",
    params(("game_id" = Uuid, Path, description = "Game to inspect")),
    responses(
        (status = 200, description = "Current position", body = NextSongResponse),
        (status = 404, description = "No such game, or caller is not a player"),
    )
)]
pub async fn get_next_song(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<NextSongResponse>, AppError> {
    let response = game_service::next_song(&state, game_id, user.id).await?;
    Ok(Json(response))
}
