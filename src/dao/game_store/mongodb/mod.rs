mod config;
mod connection;
mod error;
mod models;
/// MongoDB implementation of the game store.
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoGameStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        if err.is_duplicate_key() {
            return StorageError::Conflict(err.to_string());
        }
        StorageError::unavailable(err.to_string(), err)
    }
}
