use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::reconciliation::{PlayerValidation, RepairAllResult, RepairResult, SeedingHealth, ValidationReport},
    error::AppError,
    services::reconciliation_service,
    state::SharedState,
};

/// Ledger reconciliation endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/maintenance/players", get(validate_all_players))
        .route("/maintenance/players/{id}", get(validate_player_stats))
        .route("/maintenance/players/{id}/repair", post(repair_player_stats))
        .route("/maintenance/repair", post(repair_all_mismatches))
        .route("/maintenance/health", get(health_status))
}

/// Compare one player's stored stats with the ledger.
#[utoipa::path(
    get,
    path = "/maintenance/players/{id}",
    tag = "maintenance",
    params(("id" = Uuid, Path, description = "Player identifier")),
    responses(
        (status = 200, description = "Comparison", body = PlayerValidation),
        (status = 404, description = "Unknown player"),
    )
)]
pub async fn validate_player_stats(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlayerValidation>, AppError> {
    Ok(Json(
        reconciliation_service::validate_player_stats(&state, id).await?,
    ))
}

/// Compare every player's stored stats with the ledger.
#[utoipa::path(
    get,
    path = "/maintenance/players",
    tag = "maintenance",
    responses((status = 200, description = "Validation report", body = ValidationReport))
)]
pub async fn validate_all_players(
    State(state): State<SharedState>,
) -> Result<Json<ValidationReport>, AppError> {
    Ok(Json(reconciliation_service::validate_all_players(&state).await?))
}

/// Rewrite one player's stats from the ledger.
#[utoipa::path(
    post,
    path = "/maintenance/players/{id}/repair",
    tag = "maintenance",
    params(("id" = Uuid, Path, description = "Player identifier")),
    responses(
        (status = 200, description = "Repair outcome", body = RepairResult),
        (status = 404, description = "Unknown player"),
    )
)]
pub async fn repair_player_stats(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RepairResult>, AppError> {
    Ok(Json(
        reconciliation_service::repair_player_stats(&state, id).await?,
    ))
}

/// Rewrite the stats of every mismatched player.
#[utoipa::path(
    post,
    path = "/maintenance/repair",
    tag = "maintenance",
    responses((status = 200, description = "Repair summary", body = RepairAllResult))
)]
pub async fn repair_all_mismatches(
    State(state): State<SharedState>,
) -> Result<Json<RepairAllResult>, AppError> {
    Ok(Json(reconciliation_service::repair_all_mismatches(&state).await?))
}

/// Classify how far player stats have drifted from the ledger.
#[utoipa::path(
    get,
    path = "/maintenance/health",
    tag = "maintenance",
    responses((status = 200, description = "Reconciliation health", body = SeedingHealth))
)]
pub async fn health_status(
    State(state): State<SharedState>,
) -> Result<Json<SeedingHealth>, AppError> {
    Ok(Json(reconciliation_service::health_status(&state).await?))
}
