use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Shared leaderboard and settings DTOs.
pub mod common;
/// Game launch and progression DTOs.
pub mod game;
/// Health check DTOs.
pub mod health;
/// Lobby REST DTOs.
pub mod lobby;
/// WebSocket message and event payload DTOs.
pub mod ws;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
