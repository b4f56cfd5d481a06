/// OpenAPI documentation generation.
pub mod documentation;
/// Client event dispatch table.
pub mod events;
/// Trivia round operations.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Room membership operations and inspection.
pub mod room_service;
/// Opaque WebRTC signaling relay.
pub mod signaling;
/// WebSocket connection and message handling service.
pub mod websocket_service;
