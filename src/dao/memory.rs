use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{GameEntity, LobbyEntity},
    storage::StorageResult,
    store::DocumentStore,
};

/// In-process [`DocumentStore`] backed by concurrent maps.
///
/// Used by the test suite and by deployments that run without a database;
/// documents do not survive a restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    lobbies: DashMap<Uuid, LobbyEntity>,
    games: DashMap<Uuid, GameEntity>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn save_lobby(&self, lobby: LobbyEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            inner.lobbies.insert(lobby.id, lobby);
            Ok(())
        })
    }

    fn find_lobby(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<LobbyEntity>>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move { Ok(inner.lobbies.get(&id).map(|entry| entry.value().clone())) })
    }

    fn find_lobby_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<LobbyEntity>>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let code = code.to_uppercase();
            Ok(inner
                .lobbies
                .iter()
                .find(|entry| entry.value().join_code() == code)
                .map(|entry| entry.value().clone()))
        })
    }

    fn delete_lobby(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move { Ok(inner.lobbies.remove(&id).is_some()) })
    }

    fn lobbies_with_player(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<LobbyEntity>>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            Ok(inner
                .lobbies
                .iter()
                .filter(|entry| entry.value().contains_player(user_id))
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            inner.games.insert(game.id, game);
            Ok(())
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move { Ok(inner.games.get(&id).map(|entry| entry.value().clone())) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::models::{GameSettingsEntity, LobbyPlayerEntity, LobbyStatus};

    fn lobby_with_player(user_id: Uuid) -> LobbyEntity {
        LobbyEntity {
            id: Uuid::new_v4(),
            owner_id: user_id,
            players: vec![LobbyPlayerEntity {
                user_id,
                email: "owner@example.com".into(),
                ready: false,
                score: 0,
            }],
            status: LobbyStatus::Waiting,
            max_players: 4,
            game_settings: GameSettingsEntity {
                song_count: 5,
                max_attempts: 5,
            },
            active_game_id: None,
            created_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn lobby_roundtrip_and_code_lookup() {
        let store = MemoryStore::new();
        let lobby = lobby_with_player(Uuid::new_v4());
        let code = lobby.join_code();

        store.save_lobby(lobby.clone()).await.unwrap();
        assert_eq!(store.find_lobby(lobby.id).await.unwrap(), Some(lobby.clone()));
        assert_eq!(
            store
                .find_lobby_by_code(code.to_lowercase())
                .await
                .unwrap(),
            Some(lobby.clone())
        );

        assert!(store.delete_lobby(lobby.id).await.unwrap());
        assert_eq!(store.find_lobby(lobby.id).await.unwrap(), None);
        assert!(!store.delete_lobby(lobby.id).await.unwrap());
    }

    #[tokio::test]
    async fn lobbies_with_player_filters_rosters() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let one = lobby_with_player(user);
        let two = lobby_with_player(user);
        let other = lobby_with_player(Uuid::new_v4());

        for lobby in [&one, &two, &other] {
            store.save_lobby(lobby.clone()).await.unwrap();
        }

        let mut found: Vec<Uuid> = store
            .lobbies_with_player(user)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        found.sort();
        let mut expected = vec![one.id, two.id];
        expected.sort();
        assert_eq!(found, expected);
    }
}
