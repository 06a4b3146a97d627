use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Trackdle Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
        crate::routes::multiplayer::create_lobby,
        crate::routes::multiplayer::get_lobby,
        crate::routes::multiplayer::start_game,
        crate::routes::multiplayer::post_guess,
        crate::routes::multiplayer::get_next_song,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::ClientMessage,
            crate::dto::lobby::CreateLobbyRequest,
            crate::dto::lobby::LobbyCreatedResponse,
            crate::dto::lobby::LobbyDetailResponse,
            crate::dto::lobby::LobbyPlayerDto,
            crate::dto::game::StartGameResponse,
            crate::dto::game::GuessRequest,
            crate::dto::game::GuessResponse,
            crate::dto::game::NextSongResponse,
            crate::dto::common::GameSettingsDto,
            crate::dto::common::LeaderboardEntry,
            crate::dto::common::SongDto,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "multiplayer", description = "Lobby and game progression endpoints"),
        (name = "ws", description = "WebSocket operations for game clients"),
    )
)]
pub struct ApiDoc;
