/// Per-entity mutation serialization.
pub mod locks;
/// Room membership registry for event fan-out.
pub mod rooms;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::store::DocumentStore,
    error::ServiceError,
    external::{TrackSource, UserDirectory},
};

pub use self::locks::EntityLocks;
pub use self::rooms::RoomRegistry;

/// Cheaply cloneable handle to the application state.
pub type SharedState = Arc<AppState>;

#[derive(Clone)]
/// Handle used to push messages to an authenticated client connection.
pub struct ClientConnection {
    /// Connection identifier (distinct from the user: one user may hold
    /// several connections over its lifetime).
    pub id: Uuid,
    /// Identity bound at handshake time; protocol messages trust this,
    /// never payload-supplied identity.
    pub user_id: Uuid,
    /// Email resolved at handshake time.
    pub email: String,
    /// Outbound channel drained by the connection's writer task.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Central application state storing live connections, per-entity locks,
/// collaborator handles, and the storage backend slot.
pub struct AppState {
    config: AppConfig,
    store: RwLock<Option<Arc<dyn DocumentStore>>>,
    degraded: watch::Sender<bool>,
    connections: DashMap<Uuid, ClientConnection>,
    rooms: RoomRegistry,
    lobby_locks: EntityLocks,
    game_locks: EntityLocks,
    directory: Arc<dyn UserDirectory>,
    tracks: Arc<dyn TrackSource>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(
        config: AppConfig,
        directory: Arc<dyn UserDirectory>,
        tracks: Arc<dyn TrackSource>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            store: RwLock::new(None),
            degraded: degraded_tx,
            connections: DashMap::new(),
            rooms: RoomRegistry::new(),
            lobby_locks: EntityLocks::new(),
            game_locks: EntityLocks::new(),
            directory,
            tracks,
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current document store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn DocumentStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the document store or fail with [`ServiceError::Degraded`].
    pub async fn require_store(&self) -> Result<Arc<dyn DocumentStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new document store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn DocumentStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current document store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Registry of authenticated connections keyed by connection identifier.
    pub fn connections(&self) -> &DashMap<Uuid, ClientConnection> {
        &self.connections
    }

    /// Room membership registry used for event fan-out.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Per-lobby mutation locks.
    pub fn lobby_locks(&self) -> &EntityLocks {
        &self.lobby_locks
    }

    /// Per-game mutation locks.
    pub fn game_locks(&self) -> &EntityLocks {
        &self.game_locks
    }

    /// Identity resolution collaborator.
    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.directory
    }

    /// Track catalog collaborator.
    pub fn tracks(&self) -> &Arc<dyn TrackSource> {
        &self.tracks
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        if self.is_degraded().await == value {
            return;
        }

        let _ = self.degraded.send(value);
    }
}
