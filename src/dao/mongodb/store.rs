use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Client, Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoGameDocument, MongoLobbyDocument, doc_id, uuid_as_binary},
};
use crate::dao::{
    models::{GameEntity, LobbyEntity},
    storage::StorageResult,
    store::DocumentStore,
};

const LOBBY_COLLECTION_NAME: &str = "lobbies";
const GAME_COLLECTION_NAME: &str = "games";

#[derive(Clone)]
pub struct MongoDocumentStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoDocumentStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;
        let collection = database.collection::<mongodb::bson::Document>(LOBBY_COLLECTION_NAME);

        let code_index = mongodb::IndexModel::builder()
            .keys(doc! {"join_code": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("lobby_join_code_idx".to_owned()))
                    .build(),
            )
            .build();
        collection
            .create_index(code_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: LOBBY_COLLECTION_NAME,
                index: "join_code",
                source,
            })?;

        // Disconnect cleanup queries lobbies by roster membership.
        let member_index = mongodb::IndexModel::builder()
            .keys(doc! {"players.user_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("lobby_member_idx".to_owned()))
                    .build(),
            )
            .build();
        collection
            .create_index(member_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: LOBBY_COLLECTION_NAME,
                index: "players.user_id",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn lobby_collection(&self) -> Collection<MongoLobbyDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoLobbyDocument>(LOBBY_COLLECTION_NAME)
    }

    async fn game_collection(&self) -> Collection<MongoGameDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoGameDocument>(GAME_COLLECTION_NAME)
    }

    async fn save_lobby(&self, lobby: LobbyEntity) -> MongoResult<()> {
        let id = lobby.id;
        let document: MongoLobbyDocument = lobby.into();
        let collection = self.lobby_collection().await;
        collection
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveLobby { id, source })?;
        Ok(())
    }

    async fn find_lobby(&self, id: Uuid) -> MongoResult<Option<LobbyEntity>> {
        let collection = self.lobby_collection().await;
        let document = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadLobby { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn find_lobby_by_code(&self, code: String) -> MongoResult<Option<LobbyEntity>> {
        let collection = self.lobby_collection().await;
        let document = collection
            .find_one(doc! {"join_code": code.to_uppercase()})
            .await
            .map_err(|source| MongoDaoError::LoadLobbyByCode { code, source })?;
        Ok(document.map(Into::into))
    }

    async fn delete_lobby(&self, id: Uuid) -> MongoResult<bool> {
        let collection = self.lobby_collection().await;
        let result = collection
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeleteLobby { id, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn lobbies_with_player(&self, user_id: Uuid) -> MongoResult<Vec<LobbyEntity>> {
        let collection = self.lobby_collection().await;
        let documents: Vec<MongoLobbyDocument> = collection
            .find(doc! {"players.user_id": uuid_as_binary(user_id)})
            .await
            .map_err(|source| MongoDaoError::ListLobbiesForUser { user_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListLobbiesForUser { user_id, source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn save_game(&self, game: GameEntity) -> MongoResult<()> {
        let id = game.id;
        let document: MongoGameDocument = game.into();
        let collection = self.game_collection().await;
        collection
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveGame { id, source })?;
        Ok(())
    }

    async fn find_game(&self, id: Uuid) -> MongoResult<Option<GameEntity>> {
        let collection = self.game_collection().await;
        let document = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadGame { id, source })?;
        Ok(document.map(Into::into))
    }
}

impl DocumentStore for MongoDocumentStore {
    fn save_lobby(&self, lobby: LobbyEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_lobby(lobby).await.map_err(Into::into) })
    }

    fn find_lobby(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<LobbyEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_lobby(id).await.map_err(Into::into) })
    }

    fn find_lobby_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<LobbyEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_lobby_by_code(code).await.map_err(Into::into) })
    }

    fn delete_lobby(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_lobby(id).await.map_err(Into::into) })
    }

    fn lobbies_with_player(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<LobbyEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.lobbies_with_player(user_id).await.map_err(Into::into) })
    }

    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
