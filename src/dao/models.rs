use serde::{Deserialize, Serialize};
use std::{fmt, time::SystemTime};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle of a tournament record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Results are still being entered.
    Draft,
    /// All results are final.
    Completed,
}

/// Format of a match, which fixes the number of participants per side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// One player per side.
    Singles,
    /// Two players per side.
    Doubles,
}

impl MatchType {
    /// Number of players expected on each side of the net.
    pub fn players_per_side(self) -> usize {
        match self {
            MatchType::Singles => 1,
            MatchType::Doubles => 2,
        }
    }
}

/// Rule used to turn a match result into seeding points, chosen once per tournament.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoringPolicy {
    /// Flat amounts depending on the side's role.
    Fixed {
        /// Points for each player of the winning side.
        winner_points: u32,
        /// Points for each player of the losing side.
        loser_points: u32,
    },
    /// Each side earns as many points as the games it won.
    GamesWon,
}

/// A single match embedded in a tournament. Its position in the list is part of the ledger key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Singles or doubles.
    pub match_type: MatchType,
    /// Players on the first side (one for singles, two for doubles).
    pub team1: Vec<Uuid>,
    /// Players on the second side.
    pub team2: Vec<Uuid>,
    /// Games won, formatted as `games1-games2`.
    pub score: String,
    /// `team1`, `team2`, or for singles the winning player's id.
    pub winner: String,
    /// Set once seeding points have been awarded for this match.
    pub points_processed: bool,
}

impl MatchEntity {
    /// Every participant of the match, first side first.
    pub fn participants(&self) -> impl Iterator<Item = &Uuid> {
        self.team1.iter().chain(self.team2.iter())
    }
}

/// Tournament record owning its ordered match list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TournamentEntity {
    /// Tournament identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Calendar date of the tournament (`YYYY-MM-DD`).
    pub date: String,
    /// Draft or completed.
    pub status: TournamentStatus,
    /// Rule applied to every match of this tournament.
    pub scoring: ScoringPolicy,
    /// Matches in play order; the index is part of each ledger key.
    pub matches: Vec<MatchEntity>,
    /// When the record was created.
    pub created_at: SystemTime,
    /// Last write to the record or one of its matches.
    pub updated_at: SystemTime,
}

/// Idempotency key of a tournament ledger entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LedgerKey {
    /// Tournament the match belongs to.
    pub tournament_id: Uuid,
    /// Position of the match in the tournament.
    pub match_index: u32,
    /// Player the points went to.
    pub player_id: Uuid,
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tournament {} match #{} player {}",
            self.tournament_id, self.match_index, self.player_id
        )
    }
}

/// Whether a ledger entry still counts towards the player's aggregate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryState {
    /// Counts towards the aggregate.
    Active,
    /// Kept as history only.
    Reversed {
        /// When the entry was reversed.
        at: SystemTime,
    },
}

impl EntryState {
    /// Whether the entry still counts.
    pub fn is_active(&self) -> bool {
        matches!(self, EntryState::Active)
    }
}

/// Ledger entry recording points awarded to one player.
///
/// Tournament entries carry both `tournament_id` and `match_index`; manual
/// adjustments carry neither and only contribute seed points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedingPointEntity {
    /// Entry identifier.
    pub id: Uuid,
    /// Source tournament; `None` for manual adjustments.
    pub tournament_id: Option<Uuid>,
    /// Source match index; `None` for manual adjustments.
    pub match_index: Option<u32>,
    /// Player credited with the points.
    pub player_id: Uuid,
    /// Seed points awarded.
    pub points: u32,
    /// Whether the player was on the winning side.
    pub is_winner: bool,
    /// Active or reversed.
    pub state: EntryState,
    /// Free-form explanation, used by manual adjustments.
    pub reason: Option<String>,
    /// When the points were awarded.
    pub created_at: SystemTime,
}

impl SeedingPointEntity {
    /// Idempotency key when the entry belongs to a tournament match.
    pub fn key(&self) -> Option<LedgerKey> {
        match (self.tournament_id, self.match_index) {
            (Some(tournament_id), Some(match_index)) => Some(LedgerKey {
                tournament_id,
                match_index,
                player_id: self.player_id,
            }),
            _ => None,
        }
    }

    /// Amounts this entry adds to the owning player's aggregate while active.
    pub fn stat_delta(&self) -> PlayerStats {
        let counts_match = self.key().is_some();
        PlayerStats {
            seed_points: self.points,
            matches_won: u32::from(counts_match && self.is_winner),
            matches_played: u32::from(counts_match),
        }
    }
}

/// Running totals of a player, derived from the active ledger entries.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct PlayerStats {
    /// Sum of points over active entries.
    pub seed_points: u32,
    /// Distinct matches won.
    pub matches_won: u32,
    /// Distinct matches played.
    pub matches_played: u32,
}

impl PlayerStats {
    /// Add another set of stats, as done when an entry is awarded.
    pub fn add(&mut self, delta: PlayerStats) {
        self.seed_points = self.seed_points.saturating_add(delta.seed_points);
        self.matches_won = self.matches_won.saturating_add(delta.matches_won);
        self.matches_played = self.matches_played.saturating_add(delta.matches_played);
    }

    /// Remove another set of stats, as done when an entry is reversed.
    pub fn subtract(&mut self, delta: PlayerStats) {
        self.seed_points = self.seed_points.saturating_sub(delta.seed_points);
        self.matches_won = self.matches_won.saturating_sub(delta.matches_won);
        self.matches_played = self.matches_played.saturating_sub(delta.matches_played);
    }
}

/// Player record holding the aggregate maintained by the seeding engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Player identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Stored aggregate, kept in step with the ledger.
    pub stats: PlayerStats,
    /// Last write to the aggregate.
    pub updated_at: SystemTime,
}

impl PlayerEntity {
    /// Create a player with zeroed stats.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            stats: PlayerStats::default(),
            updated_at: SystemTime::now(),
        }
    }
}
