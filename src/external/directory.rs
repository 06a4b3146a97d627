use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use thiserror::Error;
use uuid::Uuid;

use crate::config::SeedUser;

/// A user identity as resolved by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Stable identifier, matching the `sub` claim of session tokens.
    pub id: Uuid,
    /// Display email.
    pub email: String,
}

/// Error raised when the directory backend itself fails.
///
/// "User not found" is not an error; it is the `Ok(None)` case.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

/// Identity lookup contract.
///
/// Every authenticated surface (REST bearer tokens and the WebSocket
/// handshake) re-resolves the token subject here so tokens for deleted
/// accounts are rejected.
pub trait UserDirectory: Send + Sync {
    fn find_user(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, Result<Option<UserRecord>, DirectoryError>>;
}

/// In-process directory seeded from configuration.
#[derive(Clone, Default)]
pub struct StaticUserDirectory {
    users: Arc<DashMap<Uuid, UserRecord>>,
}

impl StaticUserDirectory {
    /// Build a directory from config seed entries.
    pub fn from_seed(seed: &[SeedUser]) -> Self {
        let users = DashMap::new();
        for user in seed {
            users.insert(
                user.id,
                UserRecord {
                    id: user.id,
                    email: user.email.clone(),
                },
            );
        }
        Self {
            users: Arc::new(users),
        }
    }

    /// Register a user, used by tests to provision identities.
    pub fn insert(&self, record: UserRecord) {
        self.users.insert(record.id, record);
    }

    /// Remove a user, used by tests to simulate deleted accounts.
    pub fn remove(&self, id: Uuid) {
        self.users.remove(&id);
    }
}

impl UserDirectory for StaticUserDirectory {
    fn find_user(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, Result<Option<UserRecord>, DirectoryError>> {
        let users = Arc::clone(&self.users);
        Box::pin(async move { Ok(users.get(&id).map(|entry| entry.value().clone())) })
    }
}
