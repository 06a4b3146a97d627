use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{GameEntity, LobbyEntity};
use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer for lobby and game documents.
///
/// Lobbies and games are independently addressable documents; callers are
/// responsible for serializing read-modify-write cycles per entity (see
/// `state::locks`), the store only guarantees that individual upserts are
/// atomic.
pub trait DocumentStore: Send + Sync {
    fn save_lobby(&self, lobby: LobbyEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_lobby(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<LobbyEntity>>>;
    /// Resolve a six-character join code to a lobby. Codes are not
    /// guaranteed collision-free; the first match wins.
    fn find_lobby_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<LobbyEntity>>>;
    fn delete_lobby(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Every lobby whose roster contains the given user. Needed for
    /// disconnect-driven cleanup.
    fn lobbies_with_player(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<LobbyEntity>>>;
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
