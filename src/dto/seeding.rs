use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{EntryState, SeedingPointEntity},
    dto::format_system_time,
};

/// Participant that could not be awarded points.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct SkippedParticipant {
    pub player_id: Uuid,
    pub reason: String,
}

/// Result of awarding points for one match.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct MatchProcessReport {
    pub tournament_id: Uuid,
    pub match_index: u32,
    /// Ledger entries written by this call.
    pub awarded: usize,
    /// Participants that already held an active entry for the match.
    pub duplicates: usize,
    /// Participants left out; when non-empty the match stays unprocessed.
    pub skipped: Vec<SkippedParticipant>,
    /// Whether the match is now flagged as processed.
    pub processed: bool,
}

impl MatchProcessReport {
    pub(crate) fn new(tournament_id: Uuid, match_index: u32) -> Self {
        Self {
            tournament_id,
            match_index,
            awarded: 0,
            duplicates: 0,
            skipped: Vec::new(),
            processed: false,
        }
    }
}

/// Result of reversing the active entries of one match.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct MatchReverseReport {
    pub tournament_id: Uuid,
    pub match_index: u32,
    /// Entries switched from active to reversed.
    pub reversed: usize,
}

/// Error attached to a single match during a batch operation.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct MatchFailure {
    pub match_index: u32,
    pub message: String,
}

/// Summary of processing every pending match of a tournament.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct TournamentProcessReport {
    pub tournament_id: Uuid,
    /// Matches flagged as processed by this call.
    pub processed: usize,
    /// Matches skipped because they were processed earlier.
    pub already_processed: usize,
    /// Matches that failed or were only partially awarded.
    pub errors: usize,
    pub matches: Vec<MatchProcessReport>,
    pub failures: Vec<MatchFailure>,
}

/// Summary of reversing every match of a tournament.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct TournamentReverseReport {
    pub tournament_id: Uuid,
    /// Matches visited.
    pub matches: usize,
    /// Ledger entries reversed across all matches.
    pub reversed: usize,
    pub errors: usize,
    pub failures: Vec<MatchFailure>,
}

/// Manual seed point adjustment outside any tournament.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ManualAdjustmentRequest {
    #[validate(range(min = 1, max = 1000))]
    pub points: u32,
    #[validate(length(min = 1, max = 200))]
    pub reason: String,
}

/// Ledger entry as exposed to API clients.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct LedgerEntrySummary {
    pub id: Uuid,
    pub tournament_id: Option<Uuid>,
    pub match_index: Option<u32>,
    pub player_id: Uuid,
    pub points: u32,
    pub is_winner: bool,
    pub active: bool,
    /// RFC 3339 reversal timestamp, absent while the entry is active.
    pub reversed_at: Option<String>,
    pub reason: Option<String>,
    pub created_at: String,
}

impl From<SeedingPointEntity> for LedgerEntrySummary {
    fn from(entry: SeedingPointEntity) -> Self {
        let reversed_at = match entry.state {
            EntryState::Active => None,
            EntryState::Reversed { at } => Some(format_system_time(at)),
        };
        Self {
            id: entry.id,
            tournament_id: entry.tournament_id,
            match_index: entry.match_index,
            player_id: entry.player_id,
            points: entry.points,
            is_winner: entry.is_winner,
            active: entry.state.is_active(),
            reversed_at,
            reason: entry.reason,
            created_at: format_system_time(entry.created_at),
        }
    }
}
