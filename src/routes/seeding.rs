use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::seeding::{
        LedgerEntrySummary, ManualAdjustmentRequest, MatchProcessReport, MatchReverseReport,
        TournamentProcessReport, TournamentReverseReport,
    },
    error::AppError,
    services::seeding_service,
    state::SharedState,
};

/// Seeding engine operations.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/tournaments/{id}/process", post(process_tournament))
        .route("/tournaments/{id}/reverse", post(reverse_tournament))
        .route(
            "/tournaments/{id}/matches/{index}/process",
            post(process_match),
        )
        .route(
            "/tournaments/{id}/matches/{index}/reverse",
            post(reverse_match),
        )
        .route("/players/{id}/adjustments", post(award_manual_points))
}

/// Award seeding points for one match.
#[utoipa::path(
    post,
    path = "/tournaments/{id}/matches/{index}/process",
    tag = "seeding",
    params(
        ("id" = Uuid, Path, description = "Tournament identifier"),
        ("index" = u32, Path, description = "Position of the match in the tournament"),
    ),
    responses(
        (status = 200, description = "Points awarded", body = MatchProcessReport),
        (status = 404, description = "Unknown tournament or match"),
        (status = 409, description = "Match already processed"),
    )
)]
pub async fn process_match(
    State(state): State<SharedState>,
    Path((id, index)): Path<(Uuid, u32)>,
) -> Result<Json<MatchProcessReport>, AppError> {
    Ok(Json(seeding_service::process_match(&state, id, index).await?))
}

/// Reverse the points awarded for one match.
#[utoipa::path(
    post,
    path = "/tournaments/{id}/matches/{index}/reverse",
    tag = "seeding",
    params(
        ("id" = Uuid, Path, description = "Tournament identifier"),
        ("index" = u32, Path, description = "Position of the match in the tournament"),
    ),
    responses(
        (status = 200, description = "Points reversed", body = MatchReverseReport),
        (status = 404, description = "Unknown tournament or match"),
    )
)]
pub async fn reverse_match(
    State(state): State<SharedState>,
    Path((id, index)): Path<(Uuid, u32)>,
) -> Result<Json<MatchReverseReport>, AppError> {
    Ok(Json(seeding_service::reverse_match(&state, id, index).await?))
}

/// Award points for every unprocessed match of a tournament.
#[utoipa::path(
    post,
    path = "/tournaments/{id}/process",
    tag = "seeding",
    params(("id" = Uuid, Path, description = "Tournament identifier")),
    responses(
        (status = 200, description = "Processing summary", body = TournamentProcessReport),
        (status = 404, description = "Unknown tournament"),
    )
)]
pub async fn process_tournament(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TournamentProcessReport>, AppError> {
    Ok(Json(seeding_service::process_tournament(&state, id).await?))
}

/// Reverse every match of a tournament.
#[utoipa::path(
    post,
    path = "/tournaments/{id}/reverse",
    tag = "seeding",
    params(("id" = Uuid, Path, description = "Tournament identifier")),
    responses(
        (status = 200, description = "Reversal summary", body = TournamentReverseReport),
        (status = 404, description = "Unknown tournament"),
    )
)]
pub async fn reverse_tournament(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TournamentReverseReport>, AppError> {
    Ok(Json(seeding_service::reverse_tournament(&state, id).await?))
}

/// Credit a player with seed points outside of any tournament.
#[utoipa::path(
    post,
    path = "/players/{id}/adjustments",
    tag = "seeding",
    params(("id" = Uuid, Path, description = "Player identifier")),
    request_body = ManualAdjustmentRequest,
    responses(
        (status = 200, description = "Ledger entry recorded", body = LedgerEntrySummary),
        (status = 404, description = "Unknown player"),
    )
)]
pub async fn award_manual_points(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ManualAdjustmentRequest>>,
) -> Result<Json<LedgerEntrySummary>, AppError> {
    Ok(Json(
        seeding_service::award_manual_points(&state, id, payload).await?,
    ))
}
