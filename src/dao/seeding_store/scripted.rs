//! Test double wrapping [`MemorySeedingStore`] with scripted failures and interleavings.

use std::{io, sync::Mutex, time::SystemTime};

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{PlayerEntity, PlayerStats, SeedingPointEntity, TournamentEntity},
    seeding_store::{SeedingStore, memory::MemorySeedingStore},
    storage::{StorageError, StorageResult},
};

type Interleaving = BoxFuture<'static, ()>;

/// Delegates to a memory store, failing or pausing chosen calls.
pub(crate) struct ScriptedStore {
    inner: MemorySeedingStore,
    failing_match: Option<u32>,
    failing_player_lookup: Option<Uuid>,
    failing_player_overwrite: Option<Uuid>,
    before_match_lookup: Mutex<Option<(u32, Interleaving)>>,
}

fn scripted_failure(what: String) -> StorageError {
    StorageError::unavailable(what.clone(), io::Error::other(what))
}

impl ScriptedStore {
    pub(crate) fn new(inner: MemorySeedingStore) -> Self {
        Self {
            inner,
            failing_match: None,
            failing_player_lookup: None,
            failing_player_overwrite: None,
            before_match_lookup: Mutex::new(None),
        }
    }

    /// Fail every ledger lookup for this match index.
    pub(crate) fn fail_match_lookup(mut self, match_index: u32) -> Self {
        self.failing_match = Some(match_index);
        self
    }

    /// Fail every ledger lookup for this player.
    pub(crate) fn fail_player_lookup(mut self, player_id: Uuid) -> Self {
        self.failing_player_lookup = Some(player_id);
        self
    }

    /// Fail stats overwrites for this player.
    pub(crate) fn fail_player_overwrite(mut self, player_id: Uuid) -> Self {
        self.failing_player_overwrite = Some(player_id);
        self
    }

    /// Run `step` to completion right before the first ledger lookup for `match_index`.
    pub(crate) fn before_match_lookup(self, match_index: u32, step: Interleaving) -> Self {
        *self.before_match_lookup.lock().unwrap() = Some((match_index, step));
        self
    }
}

impl SeedingStore for ScriptedStore {
    fn save_tournament(&self, tournament: TournamentEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.save_tournament(tournament)
    }

    fn find_tournament(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        self.inner.find_tournament(id)
    }

    fn delete_tournament(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        self.inner.delete_tournament(id)
    }

    fn set_points_processed(
        &self,
        tournament_id: Uuid,
        match_index: u32,
        processed: bool,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        self.inner
            .set_points_processed(tournament_id, match_index, processed)
    }

    fn replace_match_result(
        &self,
        tournament_id: Uuid,
        match_index: u32,
        score: String,
        winner: String,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        self.inner
            .replace_match_result(tournament_id, match_index, score, winner)
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.save_player(player)
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        self.inner.find_player(id)
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        self.inner.list_players()
    }

    fn overwrite_player_stats(
        &self,
        id: Uuid,
        stats: PlayerStats,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        if self.failing_player_overwrite == Some(id) {
            let err = scripted_failure(format!("stats write for player {id} failed"));
            return Box::pin(async move { Err(err) });
        }
        self.inner.overwrite_player_stats(id, stats)
    }

    fn award_entry(&self, entry: SeedingPointEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.award_entry(entry)
    }

    fn reverse_entry(
        &self,
        entry_id: Uuid,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<SeedingPointEntity>>> {
        self.inner.reverse_entry(entry_id, at)
    }

    fn active_entries_for_match(
        &self,
        tournament_id: Uuid,
        match_index: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<SeedingPointEntity>>> {
        if self.failing_match == Some(match_index) {
            let err = scripted_failure(format!("ledger lookup for match #{match_index} failed"));
            return Box::pin(async move { Err(err) });
        }

        let step = {
            let mut pending = self.before_match_lookup.lock().unwrap();
            match pending.take() {
                Some((index, step)) if index == match_index => Some(step),
                other => {
                    *pending = other;
                    None
                }
            }
        };
        let lookup = self.inner.active_entries_for_match(tournament_id, match_index);
        Box::pin(async move {
            if let Some(step) = step {
                step.await;
            }
            lookup.await
        })
    }

    fn active_entries_for_player(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SeedingPointEntity>>> {
        if self.failing_player_lookup == Some(player_id) {
            let err = scripted_failure(format!("ledger lookup for player {player_id} failed"));
            return Box::pin(async move { Err(err) });
        }
        self.inner.active_entries_for_player(player_id)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}
