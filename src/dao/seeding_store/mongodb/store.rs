use std::time::SystemTime;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    ClientSession, Collection,
    bson::{DateTime, doc},
    error::{
        Error as MongoError, ErrorKind, TRANSIENT_TRANSACTION_ERROR,
        UNKNOWN_TRANSACTION_COMMIT_RESULT, WriteFailure,
    },
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::dao::{
    models::{PlayerEntity, PlayerStats, SeedingPointEntity, TournamentEntity},
    seeding_store::SeedingStore,
    storage::{StorageError, StorageResult},
};

use super::{
    MongoDaoError, MongoManager,
    models::{
        LEDGER_COLLECTION_NAME, MongoPlayerDocument, MongoSeedingPointDocument,
        MongoTournamentDocument, PLAYER_COLLECTION_NAME, STATUS_ACTIVE, STATUS_REVERSED,
        TOURNAMENT_COLLECTION_NAME, bson_uuid, stats_increment,
    },
};

const MAX_TRANSACTION_ATTEMPTS: u32 = 3;
const DUPLICATE_KEY_CODE: i32 = 11000;

/// MongoDB-backed [`SeedingStore`] implementation.
///
/// Awards and reversals run inside multi-document transactions when the deployment
/// supports them (replica set or sharded cluster). On a standalone server they fall
/// back to an ordered pair of single-document writes with a compensating undo.
#[derive(Clone)]
pub struct MongoSeedingStore {
    mongo: MongoManager,
    transactions: bool,
}

impl MongoSeedingStore {
    /// Wrap a connection whose transaction support is already known.
    pub fn new(mongo: MongoManager, transactions: bool) -> Self {
        Self {
            mongo,
            transactions,
        }
    }

    /// Build a store after asking the server whether transactions are available.
    pub async fn open(mongo: MongoManager) -> Result<Self, MongoDaoError> {
        let transactions = mongo.supports_transactions().await?;
        if transactions {
            info!("MongoDB deployment supports transactions");
        } else {
            warn!(
                "MongoDB deployment is standalone; ledger writes run without transactions"
            );
        }
        Ok(Self::new(mongo, transactions))
    }

    async fn tournaments(&self) -> Collection<MongoTournamentDocument> {
        self.mongo
            .database()
            .await
            .collection::<MongoTournamentDocument>(TOURNAMENT_COLLECTION_NAME)
    }

    async fn ledger(&self) -> Collection<MongoSeedingPointDocument> {
        self.mongo
            .database()
            .await
            .collection::<MongoSeedingPointDocument>(LEDGER_COLLECTION_NAME)
    }

    async fn players(&self) -> Collection<MongoPlayerDocument> {
        self.mongo
            .database()
            .await
            .collection::<MongoPlayerDocument>(PLAYER_COLLECTION_NAME)
    }

    async fn save_tournament_document(&self, tournament: TournamentEntity) -> Result<(), MongoDaoError> {
        let id = tournament.id;
        let document: MongoTournamentDocument = tournament.into();
        self.tournaments()
            .await
            .replace_one(doc! {"_id": bson_uuid(id)}, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveTournament { id, source })?;
        Ok(())
    }

    async fn find_tournament_document(
        &self,
        id: Uuid,
    ) -> Result<Option<TournamentEntity>, MongoDaoError> {
        let document = self
            .tournaments()
            .await
            .find_one(doc! {"_id": bson_uuid(id)})
            .await
            .map_err(|source| MongoDaoError::LoadTournament { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn delete_tournament_document(&self, id: Uuid) -> Result<bool, MongoDaoError> {
        let result = self
            .tournaments()
            .await
            .delete_one(doc! {"_id": bson_uuid(id)})
            .await
            .map_err(|source| MongoDaoError::DeleteTournament { id, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn set_match_flag(
        &self,
        id: Uuid,
        index: u32,
        processed: bool,
    ) -> Result<bool, MongoDaoError> {
        let slot = format!("matches.{index}");
        let flag = format!("matches.{index}.points_processed");
        let result = self
            .tournaments()
            .await
            .update_one(
                doc! {"_id": bson_uuid(id), slot: {"$exists": true}},
                doc! {"$set": {flag: processed, "updated_at": DateTime::now()}},
            )
            .await
            .map_err(|source| MongoDaoError::UpdateMatch { id, index, source })?;
        Ok(result.matched_count > 0)
    }

    async fn replace_result(
        &self,
        id: Uuid,
        index: u32,
        score: String,
        winner: String,
    ) -> Result<bool, MongoDaoError> {
        let slot = format!("matches.{index}");
        let result = self
            .tournaments()
            .await
            .update_one(
                doc! {"_id": bson_uuid(id), slot.clone(): {"$exists": true}},
                doc! {"$set": {
                    format!("{slot}.score"): score,
                    format!("{slot}.winner"): winner,
                    format!("{slot}.points_processed"): false,
                    "updated_at": DateTime::now(),
                }},
            )
            .await
            .map_err(|source| MongoDaoError::UpdateMatch { id, index, source })?;
        Ok(result.matched_count > 0)
    }

    async fn save_player_document(&self, player: PlayerEntity) -> Result<(), MongoDaoError> {
        let id = player.id;
        let document: MongoPlayerDocument = player.into();
        self.players()
            .await
            .replace_one(doc! {"_id": bson_uuid(id)}, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SavePlayer { id, source })?;
        Ok(())
    }

    async fn find_player_document(&self, id: Uuid) -> Result<Option<PlayerEntity>, MongoDaoError> {
        let document = self
            .players()
            .await
            .find_one(doc! {"_id": bson_uuid(id)})
            .await
            .map_err(|source| MongoDaoError::LoadPlayer { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn list_player_documents(&self) -> Result<Vec<PlayerEntity>, MongoDaoError> {
        let docs: Vec<MongoPlayerDocument> = self
            .players()
            .await
            .find(doc! {})
            .sort(doc! {"name": 1, "_id": 1})
            .await
            .map_err(|source| MongoDaoError::ListPlayers { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListPlayers { source })?;
        Ok(docs.into_iter().map(Into::into).collect())
    }

    async fn overwrite_stats(&self, id: Uuid, stats: PlayerStats) -> Result<bool, MongoDaoError> {
        let result = self
            .players()
            .await
            .update_one(
                doc! {"_id": bson_uuid(id)},
                doc! {"$set": {
                    "seed_points": i64::from(stats.seed_points),
                    "matches_won": i64::from(stats.matches_won),
                    "matches_played": i64::from(stats.matches_played),
                    "updated_at": DateTime::now(),
                }},
            )
            .await
            .map_err(|source| MongoDaoError::UpdatePlayer { id, source })?;
        Ok(result.matched_count > 0)
    }

    async fn find_active_entries(
        &self,
        filter: mongodb::bson::Document,
    ) -> Result<Vec<SeedingPointEntity>, MongoDaoError> {
        let docs: Vec<MongoSeedingPointDocument> = self
            .ledger()
            .await
            .find(filter)
            .sort(doc! {"created_at": 1})
            .await
            .map_err(|source| MongoDaoError::LoadLedger { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadLedger { source })?;
        Ok(docs.into_iter().map(Into::into).collect())
    }

    async fn start_session(&self, operation: &'static str) -> StorageResult<ClientSession> {
        let session = self
            .mongo
            .client()
            .await
            .start_session()
            .await
            .map_err(|source| MongoDaoError::Transaction { operation, source })?;
        Ok(session)
    }

    async fn award(&self, entry: SeedingPointEntity) -> StorageResult<()> {
        if self.transactions {
            self.award_in_transaction(entry).await
        } else {
            self.award_unsessioned(entry).await
        }
    }

    async fn reverse(&self, entry_id: Uuid, at: SystemTime) -> StorageResult<Option<SeedingPointEntity>> {
        if self.transactions {
            self.reverse_in_transaction(entry_id, at).await
        } else {
            self.reverse_unsessioned(entry_id, at).await
        }
    }

    /// Insert the entry and bump the aggregate in one transaction, retrying transient failures.
    async fn award_in_transaction(&self, entry: SeedingPointEntity) -> StorageResult<()> {
        let key = entry.key();
        let player_id = entry.player_id;
        let increment = stats_increment(entry.stat_delta(), 1);
        let document: MongoSeedingPointDocument = entry.into();
        let ledger = self.ledger().await;
        let players = self.players().await;
        let mut session = self.start_session("award").await?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            session
                .start_transaction()
                .await
                .map_err(|source| MongoDaoError::Transaction {
                    operation: "award",
                    source,
                })?;

            let step: Result<bool, MongoError> = async {
                ledger.insert_one(&document).session(&mut session).await?;
                let updated = players
                    .update_one(
                        doc! {"_id": bson_uuid(player_id)},
                        doc! {"$inc": increment.clone(), "$set": {"updated_at": DateTime::now()}},
                    )
                    .session(&mut session)
                    .await?;
                Ok(updated.matched_count > 0)
            }
            .await;

            match step {
                Ok(true) => match commit(&mut session).await {
                    Ok(()) => return Ok(()),
                    Err(err) if is_transient(&err) && attempt < MAX_TRANSACTION_ATTEMPTS => {
                        debug!(attempt, error = %err, "retrying award commit");
                    }
                    Err(source) => {
                        return Err(MongoDaoError::Transaction {
                            operation: "award",
                            source,
                        }
                        .into());
                    }
                },
                Ok(false) => {
                    abort(&mut session).await;
                    return Err(StorageError::Missing {
                        entity: "player",
                        id: player_id,
                    });
                }
                Err(err) => {
                    abort(&mut session).await;
                    if let Some(key) = key.filter(|_| is_duplicate_key(&err)) {
                        return Err(StorageError::Duplicate { key });
                    }
                    if !(is_transient(&err) && attempt < MAX_TRANSACTION_ATTEMPTS) {
                        return Err(MongoDaoError::Transaction {
                            operation: "award",
                            source: err,
                        }
                        .into());
                    }
                    debug!(attempt, error = %err, "retrying award transaction");
                }
            }
        }
    }

    /// Flip an active entry to reversed and undo its aggregate delta in one transaction.
    async fn reverse_in_transaction(
        &self,
        entry_id: Uuid,
        at: SystemTime,
    ) -> StorageResult<Option<SeedingPointEntity>> {
        let ledger = self.ledger().await;
        let players = self.players().await;
        let mut session = self.start_session("reverse").await?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            session
                .start_transaction()
                .await
                .map_err(|source| MongoDaoError::Transaction {
                    operation: "reverse",
                    source,
                })?;

            let step: Result<Option<SeedingPointEntity>, MongoError> = async {
                let before = ledger
                    .find_one_and_update(
                        doc! {"_id": bson_uuid(entry_id), "status": STATUS_ACTIVE},
                        doc! {"$set": {
                            "status": STATUS_REVERSED,
                            "reversed_at": DateTime::from_system_time(at),
                        }},
                    )
                    .session(&mut session)
                    .await?;
                let Some(before) = before else {
                    return Ok(None);
                };
                let entry: SeedingPointEntity = before.into();
                players
                    .update_one(
                        doc! {"_id": bson_uuid(entry.player_id)},
                        doc! {
                            "$inc": stats_increment(entry.stat_delta(), -1),
                            "$set": {"updated_at": DateTime::from_system_time(at)},
                        },
                    )
                    .session(&mut session)
                    .await?;
                Ok(Some(entry))
            }
            .await;

            match step {
                Ok(None) => {
                    abort(&mut session).await;
                    return Ok(None);
                }
                Ok(Some(entry)) => match commit(&mut session).await {
                    Ok(()) => return Ok(Some(entry)),
                    Err(err) if is_transient(&err) && attempt < MAX_TRANSACTION_ATTEMPTS => {
                        debug!(attempt, error = %err, "retrying reverse commit");
                    }
                    Err(source) => {
                        return Err(MongoDaoError::Transaction {
                            operation: "reverse",
                            source,
                        }
                        .into());
                    }
                },
                Err(err) => {
                    abort(&mut session).await;
                    if !(is_transient(&err) && attempt < MAX_TRANSACTION_ATTEMPTS) {
                        return Err(MongoDaoError::Transaction {
                            operation: "reverse",
                            source: err,
                        }
                        .into());
                    }
                    debug!(attempt, error = %err, "retrying reverse transaction");
                }
            }
        }
    }

    /// Insert the entry, then bump the aggregate. The entry is removed again when the
    /// aggregate cannot be updated, so the ledger never holds points nobody received.
    async fn award_unsessioned(&self, entry: SeedingPointEntity) -> StorageResult<()> {
        let key = entry.key();
        let entry_id = entry.id;
        let player_id = entry.player_id;
        let increment = stats_increment(entry.stat_delta(), 1);
        let document: MongoSeedingPointDocument = entry.into();
        let ledger = self.ledger().await;

        if let Err(err) = ledger.insert_one(&document).await {
            if let Some(key) = key.filter(|_| is_duplicate_key(&err)) {
                return Err(StorageError::Duplicate { key });
            }
            return Err(MongoDaoError::Transaction {
                operation: "award",
                source: err,
            }
            .into());
        }

        let updated = self
            .players()
            .await
            .update_one(
                doc! {"_id": bson_uuid(player_id)},
                doc! {"$inc": increment, "$set": {"updated_at": DateTime::now()}},
            )
            .await;

        let failure = match updated {
            Ok(result) if result.matched_count > 0 => return Ok(()),
            Ok(_) => StorageError::Missing {
                entity: "player",
                id: player_id,
            },
            Err(source) => MongoDaoError::Transaction {
                operation: "award",
                source,
            }
            .into(),
        };

        if let Err(err) = ledger.delete_one(doc! {"_id": bson_uuid(entry_id)}).await {
            error!(%entry_id, error = %err, "failed to remove ledger entry after award failure");
        }
        Err(failure)
    }

    /// Flip the entry to reversed, then undo its aggregate delta. The status flip is a
    /// single conditional update, so concurrent reversals cannot both succeed. The
    /// entry goes back to active when the aggregate cannot be updated.
    async fn reverse_unsessioned(
        &self,
        entry_id: Uuid,
        at: SystemTime,
    ) -> StorageResult<Option<SeedingPointEntity>> {
        let ledger = self.ledger().await;
        let before = ledger
            .find_one_and_update(
                doc! {"_id": bson_uuid(entry_id), "status": STATUS_ACTIVE},
                doc! {"$set": {
                    "status": STATUS_REVERSED,
                    "reversed_at": DateTime::from_system_time(at),
                }},
            )
            .await
            .map_err(|source| MongoDaoError::Transaction {
                operation: "reverse",
                source,
            })?;
        let Some(before) = before else {
            return Ok(None);
        };
        let entry: SeedingPointEntity = before.into();

        let updated = self
            .players()
            .await
            .update_one(
                doc! {"_id": bson_uuid(entry.player_id)},
                doc! {
                    "$inc": stats_increment(entry.stat_delta(), -1),
                    "$set": {"updated_at": DateTime::from_system_time(at)},
                },
            )
            .await;

        match updated {
            Ok(_) => Ok(Some(entry)),
            Err(source) => {
                if let Err(err) = ledger
                    .update_one(
                        doc! {"_id": bson_uuid(entry_id)},
                        doc! {
                            "$set": {"status": STATUS_ACTIVE},
                            "$unset": {"reversed_at": ""},
                        },
                    )
                    .await
                {
                    error!(%entry_id, error = %err, "failed to restore ledger entry after reversal failure");
                }
                Err(MongoDaoError::Transaction {
                    operation: "reverse",
                    source,
                }
                .into())
            }
        }
    }
}

async fn commit(session: &mut ClientSession) -> Result<(), MongoError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match session.commit_transaction().await {
            Err(err)
                if err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
                    && attempt < MAX_TRANSACTION_ATTEMPTS =>
            {
                continue;
            }
            other => return other,
        }
    }
}

async fn abort(session: &mut ClientSession) {
    if let Err(err) = session.abort_transaction().await {
        warn!(error = %err, "failed to abort ledger transaction");
    }
}

fn is_transient(err: &MongoError) -> bool {
    err.contains_label(TRANSIENT_TRANSACTION_ERROR)
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY_CODE
    )
}

impl SeedingStore for MongoSeedingStore {
    fn save_tournament(&self, tournament: TournamentEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_tournament_document(tournament).await.map_err(Into::into) })
    }

    fn find_tournament(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_tournament_document(id).await.map_err(Into::into) })
    }

    fn delete_tournament(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_tournament_document(id).await.map_err(Into::into) })
    }

    fn set_points_processed(
        &self,
        tournament_id: Uuid,
        match_index: u32,
        processed: bool,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .set_match_flag(tournament_id, match_index, processed)
                .await
                .map_err(Into::into)
        })
    }

    fn replace_match_result(
        &self,
        tournament_id: Uuid,
        match_index: u32,
        score: String,
        winner: String,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_result(tournament_id, match_index, score, winner)
                .await
                .map_err(Into::into)
        })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_player_document(player).await.map_err(Into::into) })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_player_document(id).await.map_err(Into::into) })
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_player_documents().await.map_err(Into::into) })
    }

    fn overwrite_player_stats(
        &self,
        id: Uuid,
        stats: PlayerStats,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.overwrite_stats(id, stats).await.map_err(Into::into) })
    }

    fn award_entry(&self, entry: SeedingPointEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.award(entry).await })
    }

    fn reverse_entry(
        &self,
        entry_id: Uuid,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<SeedingPointEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.reverse(entry_id, at).await })
    }

    fn active_entries_for_match(
        &self,
        tournament_id: Uuid,
        match_index: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<SeedingPointEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_active_entries(doc! {
                    "tournament_id": bson_uuid(tournament_id),
                    "match_index": i64::from(match_index),
                    "status": STATUS_ACTIVE,
                })
                .await
                .map_err(Into::into)
        })
    }

    fn active_entries_for_player(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SeedingPointEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_active_entries(doc! {
                    "player_id": bson_uuid(player_id),
                    "status": STATUS_ACTIVE,
                })
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let mongo = self.mongo.clone();
        Box::pin(async move { mongo.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let mongo = self.mongo.clone();
        Box::pin(async move { mongo.reconnect().await.map_err(Into::into) })
    }
}
