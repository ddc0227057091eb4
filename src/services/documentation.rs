use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the club seeding backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::players::list_players,
        crate::routes::players::register_player,
        crate::routes::players::get_player,
        crate::routes::tournaments::create_tournament,
        crate::routes::tournaments::get_tournament,
        crate::routes::tournaments::update_match,
        crate::routes::tournaments::delete_tournament,
        crate::routes::seeding::process_match,
        crate::routes::seeding::reverse_match,
        crate::routes::seeding::process_tournament,
        crate::routes::seeding::reverse_tournament,
        crate::routes::seeding::award_manual_points,
        crate::routes::maintenance::validate_player_stats,
        crate::routes::maintenance::validate_all_players,
        crate::routes::maintenance::repair_player_stats,
        crate::routes::maintenance::repair_all_mismatches,
        crate::routes::maintenance::health_status,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::player::RegisterPlayerRequest,
            crate::dto::player::PlayerSummary,
            crate::dto::tournament::CreateTournamentRequest,
            crate::dto::tournament::MatchInput,
            crate::dto::tournament::UpdateMatchRequest,
            crate::dto::tournament::MatchSummary,
            crate::dto::tournament::TournamentSummary,
            crate::dto::seeding::SkippedParticipant,
            crate::dto::seeding::MatchProcessReport,
            crate::dto::seeding::MatchReverseReport,
            crate::dto::seeding::MatchFailure,
            crate::dto::seeding::TournamentProcessReport,
            crate::dto::seeding::TournamentReverseReport,
            crate::dto::seeding::ManualAdjustmentRequest,
            crate::dto::seeding::LedgerEntrySummary,
            crate::dto::reconciliation::StatsDifference,
            crate::dto::reconciliation::PlayerValidation,
            crate::dto::reconciliation::PlayerFailure,
            crate::dto::reconciliation::ValidationReport,
            crate::dto::reconciliation::RepairResult,
            crate::dto::reconciliation::RepairAllResult,
            crate::dto::reconciliation::HealthStatus,
            crate::dto::reconciliation::SeedingHealth,
            crate::dao::models::PlayerStats,
            crate::dao::models::ScoringPolicy,
            crate::dao::models::MatchType,
            crate::dao::models::TournamentStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "players", description = "Player roster"),
        (name = "tournaments", description = "Tournament records and match results"),
        (name = "seeding", description = "Awarding and reversing seeding points"),
        (name = "maintenance", description = "Ledger and player stats reconciliation"),
    )
)]
pub struct ApiDoc;
