use std::{collections::HashMap, sync::Arc, time::SystemTime};

use dashmap::DashMap;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::dao::{
    models::{EntryState, PlayerEntity, PlayerStats, SeedingPointEntity, TournamentEntity},
    seeding_store::SeedingStore,
    storage::{StorageError, StorageResult},
};

/// In-process [`SeedingStore`] used for local runs and tests.
///
/// Ledger entries and player aggregates share one lock so an award or a reversal is
/// observed either completely or not at all.
#[derive(Clone, Default)]
pub struct MemorySeedingStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    tournaments: DashMap<Uuid, TournamentEntity>,
    ledger: Mutex<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    entries: IndexMap<Uuid, SeedingPointEntity>,
    players: HashMap<Uuid, PlayerEntity>,
}

impl MemorySeedingStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every ledger entry ever written, reversed ones included, in insertion order.
    pub async fn all_entries(&self) -> Vec<SeedingPointEntity> {
        let ledger = self.inner.ledger.lock().await;
        ledger.entries.values().cloned().collect()
    }
}

impl LedgerState {
    fn award(&mut self, entry: SeedingPointEntity) -> StorageResult<()> {
        if let Some(key) = entry.key() {
            let taken = self
                .entries
                .values()
                .any(|existing| existing.state.is_active() && existing.key() == Some(key));
            if taken {
                return Err(StorageError::Duplicate { key });
            }
        }

        let player = self
            .players
            .get_mut(&entry.player_id)
            .ok_or(StorageError::Missing {
                entity: "player",
                id: entry.player_id,
            })?;
        player.stats.add(entry.stat_delta());
        player.updated_at = SystemTime::now();

        self.entries.insert(entry.id, entry);
        Ok(())
    }

    fn reverse(&mut self, entry_id: Uuid, at: SystemTime) -> Option<SeedingPointEntity> {
        let entry = self.entries.get_mut(&entry_id)?;
        if !entry.state.is_active() {
            return None;
        }

        let before = entry.clone();
        entry.state = EntryState::Reversed { at };

        if let Some(player) = self.players.get_mut(&before.player_id) {
            player.stats.subtract(before.stat_delta());
            player.updated_at = at;
        }

        Some(before)
    }

    fn active_where(&self, predicate: impl Fn(&SeedingPointEntity) -> bool) -> Vec<SeedingPointEntity> {
        self.entries
            .values()
            .filter(|entry| entry.state.is_active() && predicate(entry))
            .cloned()
            .collect()
    }
}

impl SeedingStore for MemorySeedingStore {
    fn save_tournament(&self, tournament: TournamentEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.tournaments.insert(tournament.id, tournament);
            Ok(())
        })
    }

    fn find_tournament(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.tournaments.get(&id).map(|entry| entry.clone())) })
    }

    fn delete_tournament(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.tournaments.remove(&id).is_some()) })
    }

    fn set_points_processed(
        &self,
        tournament_id: Uuid,
        match_index: u32,
        processed: bool,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let Some(mut tournament) = inner.tournaments.get_mut(&tournament_id) else {
                return Ok(false);
            };
            let Some(game) = tournament.matches.get_mut(match_index as usize) else {
                return Ok(false);
            };
            game.points_processed = processed;
            tournament.updated_at = SystemTime::now();
            Ok(true)
        })
    }

    fn replace_match_result(
        &self,
        tournament_id: Uuid,
        match_index: u32,
        score: String,
        winner: String,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let Some(mut tournament) = inner.tournaments.get_mut(&tournament_id) else {
                return Ok(false);
            };
            let Some(game) = tournament.matches.get_mut(match_index as usize) else {
                return Ok(false);
            };
            game.score = score;
            game.winner = winner;
            game.points_processed = false;
            tournament.updated_at = SystemTime::now();
            Ok(true)
        })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut ledger = inner.ledger.lock().await;
            ledger.players.insert(player.id, player);
            Ok(())
        })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let ledger = inner.ledger.lock().await;
            Ok(ledger.players.get(&id).cloned())
        })
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let ledger = inner.ledger.lock().await;
            let mut players: Vec<_> = ledger.players.values().cloned().collect();
            players.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
            Ok(players)
        })
    }

    fn overwrite_player_stats(
        &self,
        id: Uuid,
        stats: PlayerStats,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut ledger = inner.ledger.lock().await;
            let Some(player) = ledger.players.get_mut(&id) else {
                return Ok(false);
            };
            player.stats = stats;
            player.updated_at = SystemTime::now();
            Ok(true)
        })
    }

    fn award_entry(&self, entry: SeedingPointEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut ledger = inner.ledger.lock().await;
            ledger.award(entry)
        })
    }

    fn reverse_entry(
        &self,
        entry_id: Uuid,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<SeedingPointEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut ledger = inner.ledger.lock().await;
            Ok(ledger.reverse(entry_id, at))
        })
    }

    fn active_entries_for_match(
        &self,
        tournament_id: Uuid,
        match_index: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<SeedingPointEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let ledger = inner.ledger.lock().await;
            Ok(ledger.active_where(|entry| {
                entry.tournament_id == Some(tournament_id) && entry.match_index == Some(match_index)
            }))
        })
    }

    fn active_entries_for_player(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SeedingPointEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let ledger = inner.ledger.lock().await;
            Ok(ledger.active_where(|entry| entry.player_id == player_id))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
