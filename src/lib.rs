//! Library crate for trackdle-back, exposing modules for binaries and integration tests.

pub mod config;
pub mod dao;
pub mod dto;
mod error;
pub mod external;
pub mod routes;
pub mod services;
pub mod state;
