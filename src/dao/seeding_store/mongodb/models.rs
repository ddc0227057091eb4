use mongodb::bson::{self, DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    EntryState, MatchEntity, MatchType, PlayerEntity, PlayerStats, ScoringPolicy,
    SeedingPointEntity, TournamentEntity, TournamentStatus,
};

pub const TOURNAMENT_COLLECTION_NAME: &str = "tournaments";
pub const LEDGER_COLLECTION_NAME: &str = "seeding_points";
pub const PLAYER_COLLECTION_NAME: &str = "players";

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_REVERSED: &str = "reversed";

pub fn bson_uuid(id: Uuid) -> bson::Uuid {
    bson::Uuid::from_bytes(id.into_bytes())
}

fn from_bson_uuid(id: bson::Uuid) -> Uuid {
    Uuid::from_bytes(id.bytes())
}

fn clamp_stat(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// `$inc` payload applying `delta` once (`sign = 1`) or undoing it (`sign = -1`).
pub fn stats_increment(delta: PlayerStats, sign: i64) -> Document {
    doc! {
        "seed_points": i64::from(delta.seed_points) * sign,
        "matches_won": i64::from(delta.matches_won) * sign,
        "matches_played": i64::from(delta.matches_played) * sign,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    match_type: MatchType,
    team1: Vec<bson::Uuid>,
    team2: Vec<bson::Uuid>,
    score: String,
    winner: String,
    #[serde(default)]
    points_processed: bool,
}

impl From<MatchEntity> for MongoMatchDocument {
    fn from(value: MatchEntity) -> Self {
        Self {
            match_type: value.match_type,
            team1: value.team1.into_iter().map(bson_uuid).collect(),
            team2: value.team2.into_iter().map(bson_uuid).collect(),
            score: value.score,
            winner: value.winner,
            points_processed: value.points_processed,
        }
    }
}

impl From<MongoMatchDocument> for MatchEntity {
    fn from(value: MongoMatchDocument) -> Self {
        Self {
            match_type: value.match_type,
            team1: value.team1.into_iter().map(from_bson_uuid).collect(),
            team2: value.team2.into_iter().map(from_bson_uuid).collect(),
            score: value.score,
            winner: value.winner,
            points_processed: value.points_processed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTournamentDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    name: String,
    date: String,
    status: TournamentStatus,
    scoring: ScoringPolicy,
    matches: Vec<MongoMatchDocument>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<TournamentEntity> for MongoTournamentDocument {
    fn from(value: TournamentEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            name: value.name,
            date: value.date,
            status: value.status,
            scoring: value.scoring,
            matches: value.matches.into_iter().map(Into::into).collect(),
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoTournamentDocument> for TournamentEntity {
    fn from(value: MongoTournamentDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            name: value.name,
            date: value.date,
            status: value.status,
            scoring: value.scoring,
            matches: value.matches.into_iter().map(Into::into).collect(),
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

/// Ledger document. The key fields are omitted entirely for manual adjustments so the
/// partial unique index ignores them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSeedingPointDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tournament_id: Option<bson::Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    match_index: Option<i64>,
    player_id: bson::Uuid,
    points: i64,
    is_winner: bool,
    status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reversed_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    created_at: DateTime,
}

impl From<SeedingPointEntity> for MongoSeedingPointDocument {
    fn from(value: SeedingPointEntity) -> Self {
        let (status, reversed_at) = match value.state {
            EntryState::Active => (STATUS_ACTIVE, None),
            EntryState::Reversed { at } => (STATUS_REVERSED, Some(DateTime::from_system_time(at))),
        };
        Self {
            id: bson_uuid(value.id),
            tournament_id: value.tournament_id.map(bson_uuid),
            match_index: value.match_index.map(i64::from),
            player_id: bson_uuid(value.player_id),
            points: i64::from(value.points),
            is_winner: value.is_winner,
            status: status.to_owned(),
            reversed_at,
            reason: value.reason,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoSeedingPointDocument> for SeedingPointEntity {
    fn from(value: MongoSeedingPointDocument) -> Self {
        let state = match (value.status.as_str(), value.reversed_at) {
            (STATUS_ACTIVE, _) => EntryState::Active,
            (_, Some(at)) => EntryState::Reversed {
                at: at.to_system_time(),
            },
            (_, None) => EntryState::Reversed {
                at: value.created_at.to_system_time(),
            },
        };
        Self {
            id: from_bson_uuid(value.id),
            tournament_id: value.tournament_id.map(from_bson_uuid),
            match_index: value.match_index.map(clamp_stat),
            player_id: from_bson_uuid(value.player_id),
            points: clamp_stat(value.points),
            is_winner: value.is_winner,
            state,
            reason: value.reason,
            created_at: value.created_at.to_system_time(),
        }
    }
}

/// Player document; counters are signed so `$inc` can never fail on decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    name: String,
    #[serde(default)]
    seed_points: i64,
    #[serde(default)]
    matches_won: i64,
    #[serde(default)]
    matches_played: i64,
    updated_at: DateTime,
}

impl From<PlayerEntity> for MongoPlayerDocument {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            name: value.name,
            seed_points: i64::from(value.stats.seed_points),
            matches_won: i64::from(value.stats.matches_won),
            matches_played: i64::from(value.stats.matches_played),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoPlayerDocument> for PlayerEntity {
    fn from(value: MongoPlayerDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            name: value.name,
            stats: PlayerStats {
                seed_points: clamp_stat(value.seed_points),
                matches_won: clamp_stat(value.matches_won),
                matches_played: clamp_stat(value.matches_played),
            },
            updated_at: value.updated_at.to_system_time(),
        }
    }
}
