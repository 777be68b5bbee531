/// Action log listing and undo.
pub mod action_service;
/// Role lookups and custom script management.
pub mod catalog_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Gameplay: phases, nominations, votes and storyteller tools.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Audit log queries and finished game summaries.
pub mod history_service;
/// Game creation, seating and lobby settings.
pub mod lobby_service;
/// Saved game states.
pub mod snapshot_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// User registration.
pub mod user_service;
/// WebSocket fan-out of game events.
pub mod websocket_service;
