use std::{sync::Arc, time::Duration};

use mongodb::{
    Client, Database, IndexModel,
    bson::{Document, doc},
    options::{ClientOptions, IndexOptions},
};
use tokio::{
    sync::RwLock,
    time::{MissedTickBehavior, interval, sleep},
};
use tracing::{info, warn};

use super::{
    error::{MongoDaoError, Result},
    models::{LEDGER_COLLECTION_NAME, PLAYER_COLLECTION_NAME},
};

const DEFAULT_DB: &str = "club_seeding";
const MAX_CONNECT_ATTEMPTS: u32 = 10;
const BASE_RETRY_DELAY_MS: u64 = 250;
const HEALTH_CHECK_INTERVAL_SECS: u64 = 30;

/// Shared MongoDB handle that transparently swaps its client after a reconnect.
#[derive(Clone)]
pub struct MongoManager {
    inner: Arc<MongoManagerInner>,
}

struct MongoManagerInner {
    state: RwLock<MongoState>,
    options: ClientOptions,
    database_name: String,
}

struct MongoState {
    client: Client,
    database: Database,
}

/// Connect to MongoDB and start a watcher that keeps the connection healthy.
pub async fn connect(uri: &str, db_name: Option<&str>) -> Result<MongoManager> {
    let database_name = db_name.unwrap_or(DEFAULT_DB).to_owned();
    let options = ClientOptions::parse(uri)
        .await
        .map_err(|source| MongoDaoError::InvalidUri {
            uri: uri.to_owned(),
            source,
        })?;

    let (client, database) = establish_connection(&options, &database_name).await?;

    let state = MongoState { client, database };
    let inner = Arc::new(MongoManagerInner {
        state: RwLock::new(state),
        options,
        database_name,
    });

    MongoManagerInner::spawn_health_task(&inner);

    Ok(MongoManager { inner })
}

/// Ensure the indexes required by the ledger and the player aggregates are present.
///
/// The ledger key index is unique only among active entries that carry a tournament
/// and a match index, so manual adjustments and reversed history never collide.
pub async fn ensure_indexes(database: &Database) -> Result<()> {
    let ledger = database.collection::<Document>(LEDGER_COLLECTION_NAME);
    let key_model = IndexModel::builder()
        .keys(doc! {"tournament_id": 1, "match_index": 1, "player_id": 1})
        .options(
            IndexOptions::builder()
                .name(Some("active_ledger_key_idx".to_string()))
                .unique(Some(true))
                .partial_filter_expression(Some(doc! {
                    "status": "active",
                    "tournament_id": {"$exists": true},
                    "match_index": {"$exists": true},
                }))
                .build(),
        )
        .build();
    ledger
        .create_index(key_model)
        .await
        .map_err(|source| MongoDaoError::EnsureIndex {
            collection: LEDGER_COLLECTION_NAME,
            index: "active_ledger_key_idx",
            source,
        })?;

    let player_model = IndexModel::builder()
        .keys(doc! {"player_id": 1, "status": 1})
        .options(
            IndexOptions::builder()
                .name(Some("ledger_player_idx".to_string()))
                .build(),
        )
        .build();
    ledger
        .create_index(player_model)
        .await
        .map_err(|source| MongoDaoError::EnsureIndex {
            collection: LEDGER_COLLECTION_NAME,
            index: "ledger_player_idx",
            source,
        })?;

    let players = database.collection::<Document>(PLAYER_COLLECTION_NAME);
    let name_model = IndexModel::builder()
        .keys(doc! {"name": 1})
        .options(
            IndexOptions::builder()
                .name(Some("player_name_idx".to_string()))
                .build(),
        )
        .build();
    players
        .create_index(name_model)
        .await
        .map_err(|source| MongoDaoError::EnsureIndex {
            collection: PLAYER_COLLECTION_NAME,
            index: "player_name_idx",
            source,
        })?;

    Ok(())
}

impl MongoManager {
    /// Clone the current database handle.
    pub async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    /// Clone the current client, needed to open transaction sessions.
    pub async fn client(&self) -> Client {
        let guard = self.inner.state.read().await;
        guard.client.clone()
    }

    /// Issue a ping against the current MongoDB connection.
    pub async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }

    /// Ask the server whether it can run multi-document transactions.
    pub async fn supports_transactions(&self) -> Result<bool> {
        let reply = self
            .database()
            .await
            .run_command(doc! { "hello": 1 })
            .await
            .map_err(|source| MongoDaoError::Topology { source })?;
        Ok(hello_supports_transactions(&reply))
    }

    /// Replace the client with a fresh connection.
    pub async fn reconnect(&self) -> Result<()> {
        self.inner.reconnect_once().await
    }
}

/// Replica set members report `setName`; mongos routers answer with `msg: "isdbgrid"`.
/// Standalone servers have neither and reject transactions.
pub fn hello_supports_transactions(reply: &Document) -> bool {
    reply.contains_key("setName") || reply.get_str("msg").is_ok_and(|msg| msg == "isdbgrid")
}

impl MongoManagerInner {
    fn spawn_health_task(inner: &Arc<Self>) {
        let weak = Arc::downgrade(inner);
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(HEALTH_CHECK_INTERVAL_SECS));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let Some(inner) = weak.upgrade() else {
                    break;
                };

                if let Err(err) = inner.ping().await {
                    warn!(error = %err, "MongoDB health ping failed; attempting reconnect");
                    if let Err(err) = inner.reconnect_once().await {
                        warn!(error = %err, "MongoDB reconnect failed");
                    }
                }
            }
        });
    }

    async fn ping(&self) -> Result<()> {
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

    async fn reconnect_once(&self) -> Result<()> {
        let (client, database) = establish_connection(&self.options, &self.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        info!("MongoDB connection re-established");
        Ok(())
    }
}

async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
) -> Result<(Client, Database)> {
    let client = Client::with_options(options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);

    let mut attempts = 0;
    let mut delay = Duration::from_millis(BASE_RETRY_DELAY_MS);

    loop {
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => break,
            Err(err) => {
                attempts += 1;
                if attempts >= MAX_CONNECT_ATTEMPTS {
                    return Err(MongoDaoError::InitialPing {
                        attempts,
                        source: err,
                    });
                }
                warn!(
                    attempts,
                    wait_ms = delay.as_millis(),
                    error = %err,
                    "MongoDB ping failed during connection; retrying"
                );
                sleep(delay).await;
                delay = (delay * 2).min(Duration::from_secs(5));
            }
        }
    }

    Ok((client, database))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replica_set_members_support_transactions() {
        let reply = doc! {"isWritablePrimary": true, "setName": "rs0", "ok": 1.0};
        assert!(hello_supports_transactions(&reply));
    }

    #[test]
    fn mongos_routers_support_transactions() {
        let reply = doc! {"isWritablePrimary": true, "msg": "isdbgrid", "ok": 1.0};
        assert!(hello_supports_transactions(&reply));
    }

    #[test]
    fn standalone_servers_do_not() {
        let reply = doc! {"isWritablePrimary": true, "maxWireVersion": 21, "ok": 1.0};
        assert!(!hello_supports_transactions(&reply));
        assert!(!hello_supports_transactions(&doc! {"msg": "other", "ok": 1.0}));
    }
}
