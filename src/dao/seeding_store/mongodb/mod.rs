mod error;
mod manager;
mod models;
mod store;

pub use error::MongoDaoError;
pub use manager::{MongoManager, connect, ensure_indexes, hello_supports_transactions};
pub use store::MongoSeedingStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
