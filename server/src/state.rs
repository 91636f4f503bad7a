use std::sync::Arc;

use crate::auth::tokens::TokenService;
use crate::ws::hub::{ChatHub, NotificationHub};

/// Shared application state passed to all handlers via axum's State
/// extractor. The hubs are constructed once at startup and shared by
/// reference with every collaborator that pushes messages.
#[derive(Clone)]
pub struct AppState {
    /// Issues and validates access/refresh token pairs.
    pub tokens: Arc<TokenService>,
    /// Live WebSocket connections bucketed by chat id.
    pub chats: Arc<ChatHub>,
    /// Live notification connections bucketed by user id.
    pub notifications: Arc<NotificationHub>,
}

impl AppState {
    pub fn new(tokens: TokenService) -> Self {
        Self {
            tokens: Arc::new(tokens),
            chats: Arc::new(ChatHub::new()),
            notifications: Arc::new(NotificationHub::new()),
        }
    }
}
