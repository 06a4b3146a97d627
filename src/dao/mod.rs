/// In-process document store used by tests and database-less deployments.
pub mod memory;
/// Database model definitions.
pub mod models;
/// MongoDB-backed document store.
#[cfg(feature = "mongo-store")]
pub mod mongodb;
/// Storage abstraction layer for database operations.
pub mod storage;
/// Lobby and game persistence trait.
pub mod store;
