use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::tournament::{CreateTournamentRequest, TournamentSummary, UpdateMatchRequest},
    error::AppError,
    services::tournament_service,
    state::SharedState,
};

/// Tournament record management.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/tournaments", post(create_tournament))
        .route(
            "/tournaments/{id}",
            get(get_tournament).delete(delete_tournament),
        )
        .route("/tournaments/{id}/matches/{index}", put(update_match))
}

/// Create a tournament with its match results. No points are awarded.
#[utoipa::path(
    post,
    path = "/tournaments",
    tag = "tournaments",
    request_body = CreateTournamentRequest,
    responses(
        (status = 201, description = "Tournament created", body = TournamentSummary),
        (status = 400, description = "Malformed tournament or match"),
    )
)]
pub async fn create_tournament(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateTournamentRequest>>,
) -> Result<(StatusCode, Json<TournamentSummary>), AppError> {
    let summary = tournament_service::create_tournament(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Retrieve a tournament and the processing state of its matches.
#[utoipa::path(
    get,
    path = "/tournaments/{id}",
    tag = "tournaments",
    params(("id" = Uuid, Path, description = "Tournament identifier")),
    responses(
        (status = 200, description = "Tournament", body = TournamentSummary),
        (status = 404, description = "Unknown tournament"),
    )
)]
pub async fn get_tournament(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TournamentSummary>, AppError> {
    Ok(Json(tournament_service::get_tournament(&state, id).await?))
}

/// Replace a match result, reversing the points awarded for the previous one.
#[utoipa::path(
    put,
    path = "/tournaments/{id}/matches/{index}",
    tag = "tournaments",
    params(
        ("id" = Uuid, Path, description = "Tournament identifier"),
        ("index" = u32, Path, description = "Position of the match in the tournament"),
    ),
    request_body = UpdateMatchRequest,
    responses(
        (status = 200, description = "Match updated and left unprocessed", body = TournamentSummary),
        (status = 400, description = "Malformed result"),
        (status = 404, description = "Unknown tournament or match"),
    )
)]
pub async fn update_match(
    State(state): State<SharedState>,
    Path((id, index)): Path<(Uuid, u32)>,
    Valid(Json(payload)): Valid<Json<UpdateMatchRequest>>,
) -> Result<Json<TournamentSummary>, AppError> {
    Ok(Json(
        tournament_service::update_match(&state, id, index, payload).await?,
    ))
}

/// Reverse every point awarded by a tournament, then delete it.
#[utoipa::path(
    delete,
    path = "/tournaments/{id}",
    tag = "tournaments",
    params(("id" = Uuid, Path, description = "Tournament identifier")),
    responses(
        (status = 204, description = "Tournament deleted"),
        (status = 404, description = "Unknown tournament"),
        (status = 409, description = "Some matches could not be reversed"),
    )
)]
pub async fn delete_tournament(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    tournament_service::delete_tournament(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
