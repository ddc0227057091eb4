use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::player::{PlayerSummary, RegisterPlayerRequest},
    error::AppError,
    services::player_service,
    state::SharedState,
};

/// Player roster.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/players", get(list_players).post(register_player))
        .route("/players/{id}", get(get_player))
}

/// List players ordered by name.
#[utoipa::path(
    get,
    path = "/players",
    tag = "players",
    responses((status = 200, description = "Players", body = [PlayerSummary]))
)]
pub async fn list_players(
    State(state): State<SharedState>,
) -> Result<Json<Vec<PlayerSummary>>, AppError> {
    Ok(Json(player_service::list_players(&state).await?))
}

/// Register a player with zeroed stats.
#[utoipa::path(
    post,
    path = "/players",
    tag = "players",
    request_body = RegisterPlayerRequest,
    responses((status = 201, description = "Player registered", body = PlayerSummary))
)]
pub async fn register_player(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RegisterPlayerRequest>>,
) -> Result<(StatusCode, Json<PlayerSummary>), AppError> {
    let player = player_service::register_player(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(player)))
}

/// Retrieve a player and its aggregate.
#[utoipa::path(
    get,
    path = "/players/{id}",
    tag = "players",
    params(("id" = Uuid, Path, description = "Player identifier")),
    responses(
        (status = 200, description = "Player", body = PlayerSummary),
        (status = 404, description = "Unknown player"),
    )
)]
pub async fn get_player(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlayerSummary>, AppError> {
    Ok(Json(player_service::get_player(&state, id).await?))
}
