use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{MatchEntity, MatchType, ScoringPolicy, TournamentEntity, TournamentStatus},
    dto::{
        format_system_time,
        validation::{validate_score, validate_tournament_date},
    },
};

/// Payload used to create a tournament together with its results.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateTournamentRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    /// Calendar date, `YYYY-MM-DD`.
    #[validate(custom(function = "validate_tournament_date"))]
    pub date: String,
    /// Defaults to `draft`.
    #[serde(default)]
    pub status: Option<TournamentStatus>,
    /// Defaults to the server-wide scoring policy.
    #[serde(default)]
    pub scoring: Option<ScoringPolicy>,
    #[serde(default)]
    #[validate(nested)]
    pub matches: Vec<MatchInput>,
}

/// Match definition supplied on creation. Its position in the list becomes its index.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct MatchInput {
    pub match_type: MatchType,
    pub team1: Vec<Uuid>,
    pub team2: Vec<Uuid>,
    #[validate(custom(function = "validate_score"))]
    pub score: String,
    #[validate(length(min = 1, max = 64))]
    pub winner: String,
}

impl From<MatchInput> for MatchEntity {
    fn from(input: MatchInput) -> Self {
        Self {
            match_type: input.match_type,
            team1: input.team1,
            team2: input.team2,
            score: input.score.trim().to_owned(),
            winner: input.winner.trim().to_owned(),
            points_processed: false,
        }
    }
}

/// New result for an existing match.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateMatchRequest {
    #[validate(custom(function = "validate_score"))]
    pub score: String,
    #[validate(length(min = 1, max = 64))]
    pub winner: String,
}

/// Match as exposed to API clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchSummary {
    pub index: u32,
    pub match_type: MatchType,
    pub team1: Vec<Uuid>,
    pub team2: Vec<Uuid>,
    pub score: String,
    pub winner: String,
    pub points_processed: bool,
}

/// Tournament as exposed to API clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TournamentSummary {
    pub id: Uuid,
    pub name: String,
    pub date: String,
    pub status: TournamentStatus,
    pub scoring: ScoringPolicy,
    pub matches: Vec<MatchSummary>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<TournamentEntity> for TournamentSummary {
    fn from(entity: TournamentEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            date: entity.date,
            status: entity.status,
            scoring: entity.scoring,
            matches: entity
                .matches
                .into_iter()
                .enumerate()
                .map(|(index, game)| MatchSummary {
                    index: index as u32,
                    match_type: game.match_type,
                    team1: game.team1,
                    team2: game.team2,
                    score: game.score,
                    winner: game.winner,
                    points_processed: game.points_processed,
                })
                .collect(),
            created_at: format_system_time(entity.created_at),
            updated_at: format_system_time(entity.updated_at),
        }
    }
}
