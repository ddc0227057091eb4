use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::PlayerStats;

/// Signed per-field difference, expected minus stored.
#[derive(Debug, Clone, Copy, Default, Serialize, ToSchema, PartialEq, Eq)]
pub struct StatsDifference {
    pub seed_points: i64,
    pub matches_won: i64,
    pub matches_played: i64,
}

impl StatsDifference {
    pub fn between(stored: PlayerStats, expected: PlayerStats) -> Self {
        Self {
            seed_points: i64::from(expected.seed_points) - i64::from(stored.seed_points),
            matches_won: i64::from(expected.matches_won) - i64::from(stored.matches_won),
            matches_played: i64::from(expected.matches_played) - i64::from(stored.matches_played),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Comparison of a player's stored aggregate with the one derived from the ledger.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct PlayerValidation {
    pub player_id: Uuid,
    pub name: String,
    pub stored: PlayerStats,
    pub expected: PlayerStats,
    pub difference: StatsDifference,
    pub mismatch: bool,
}

/// Error raised while checking or repairing one player during a batch.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct PlayerFailure {
    pub player_id: Uuid,
    pub message: String,
}

/// Validation of every player.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct ValidationReport {
    pub total_players: usize,
    pub valid: usize,
    pub mismatched: usize,
    pub errors: usize,
    pub details: Vec<PlayerValidation>,
    pub failures: Vec<PlayerFailure>,
}

/// Outcome of repairing one player.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct RepairResult {
    pub player_id: Uuid,
    /// Whether stored stats were overwritten.
    pub repaired: bool,
    pub before: PlayerStats,
    pub after: PlayerStats,
    pub delta: StatsDifference,
}

/// Outcome of repairing every mismatched player.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct RepairAllResult {
    pub checked: usize,
    pub mismatched: usize,
    pub repaired: usize,
    pub errors: usize,
    pub details: Vec<RepairResult>,
    pub failures: Vec<PlayerFailure>,
}

/// Overall consistency between the ledger and the player aggregates.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Error,
}

/// Reconciliation health summary.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct SeedingHealth {
    pub status: HealthStatus,
    pub total_players: usize,
    pub mismatch_count: usize,
    pub mismatch_percentage: f64,
}
