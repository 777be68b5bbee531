//! Library crate for clocktower-back, exposing modules for binaries and integration tests.

/// Server configuration loaded at startup.
pub mod config;
/// Persistence layer.
pub mod dao;
mod dto;
mod error;
/// HTTP, SSE and WebSocket routes.
pub mod routes;
/// Application services behind the routes.
pub mod services;
/// Game engine and shared application state.
pub mod state;
