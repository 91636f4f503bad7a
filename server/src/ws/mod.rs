//! Realtime connection hub: registries of live WebSocket connections, the
//! broadcast machinery that fans frames out to them, and the authenticate-
//! then-upgrade handshake that admits sockets.

pub mod connection;
pub mod handshake;
pub mod hub;
pub mod protocol;
pub mod registry;

pub use registry::{ConnectionId, ConnectionRegistry, ConnectionSender, RegistryError};
