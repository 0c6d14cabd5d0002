use std::sync::Arc;

use easyweb_db::Stores;

use crate::config::ServerConfig;
use crate::engine::{ChatService, LifecycleEngine};
use crate::notifications::Notifier;
use crate::ws::{Gateway, RoomHub};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Project, chat, and user-directory stores.
    pub stores: Stores,
    /// Server configuration (JWT settings are read by the auth extractors).
    pub config: Arc<ServerConfig>,
    /// Room directory shared by the gateway and the notifier.
    pub hub: Arc<RoomHub>,
    pub lifecycle: Arc<LifecycleEngine>,
    pub chat: Arc<ChatService>,
    pub gateway: Arc<Gateway>,
}

impl AppState {
    /// Wire the services around one room hub.
    pub fn new(stores: Stores, config: ServerConfig) -> Self {
        let hub = Arc::new(RoomHub::new());
        let notifier = Notifier::new(Arc::clone(&hub));
        let lifecycle = Arc::new(LifecycleEngine::new(stores.clone(), notifier));
        let chat = Arc::new(ChatService::new(stores.clone(), Arc::clone(&hub)));
        let gateway = Arc::new(Gateway::new(
            stores.clone(),
            Arc::clone(&hub),
            Arc::clone(&chat),
        ));

        Self {
            stores,
            config: Arc::new(config),
            hub,
            lifecycle,
            chat,
            gateway,
        }
    }
}
