/// Session token verification and request identity middleware.
pub mod auth_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Game launch and per-player progression.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Lobby lifecycle and membership management.
pub mod lobby_service;
/// Storage connection supervisor with reconnect backoff.
pub mod storage_supervisor;
/// WebSocket event fan-out to lobby rooms.
pub mod ws_events;
/// WebSocket connection and message handling service.
pub mod ws_service;
