mod connection;
mod error;
mod models;
/// MongoDB-backed [`crate::dao::store::DocumentStore`] implementation.
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoDocumentStore;

mod config;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
