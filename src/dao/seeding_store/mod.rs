pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;
#[cfg(test)]
pub(crate) mod scripted;

use std::time::SystemTime;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{PlayerEntity, PlayerStats, SeedingPointEntity, TournamentEntity};
use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer for tournaments, the point ledger, and player aggregates.
///
/// `award_entry` and `reverse_entry` are the only ledger writes; each one updates the
/// ledger and the owning player's aggregate as a single atomic unit.
pub trait SeedingStore: Send + Sync {
    /// Insert or replace a whole tournament record.
    fn save_tournament(&self, tournament: TournamentEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a tournament by id.
    fn find_tournament(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>>;
    /// Remove a tournament; `false` when it did not exist.
    fn delete_tournament(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Flip the `points_processed` flag of one match without touching the rest of the record.
    fn set_points_processed(
        &self,
        tournament_id: Uuid,
        match_index: u32,
        processed: bool,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Replace the score and winner of one match and clear its processed flag.
    ///
    /// Only that match is written, so flags of sibling matches updated concurrently
    /// survive. `false` when the tournament or the match does not exist.
    fn replace_match_result(
        &self,
        tournament_id: Uuid,
        match_index: u32,
        score: String,
        winner: String,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Insert or replace a player record.
    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a player by id.
    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    /// Every player, ordered by name then id.
    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Replace the stored aggregate of a player; `false` when the player does not exist.
    fn overwrite_player_stats(
        &self,
        id: Uuid,
        stats: PlayerStats,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Insert an active entry and add its delta to the player's aggregate.
    ///
    /// Fails with [`StorageError::Duplicate`](crate::dao::storage::StorageError::Duplicate)
    /// when an active entry already holds the same key, leaving both stores untouched.
    fn award_entry(&self, entry: SeedingPointEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Mark an active entry as reversed and subtract its delta from the aggregate.
    ///
    /// Returns the entry as it was before reversal, or `None` when it was not active.
    fn reverse_entry(
        &self,
        entry_id: Uuid,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<SeedingPointEntity>>>;
    /// Active entries recorded for one match of a tournament.
    fn active_entries_for_match(
        &self,
        tournament_id: Uuid,
        match_index: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<SeedingPointEntity>>>;
    /// Active entries of one player, manual adjustments included.
    fn active_entries_for_player(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SeedingPointEntity>>>;

    /// Cheap round trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection in place.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
