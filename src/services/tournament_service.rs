//! Tournament record management. Creating or editing a tournament never awards points;
//! edits and deletions reverse whatever the affected matches had awarded.

use std::{sync::Arc, time::SystemTime};

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{MatchEntity, TournamentEntity, TournamentStatus},
        seeding_store::SeedingStore,
    },
    dto::tournament::{CreateTournamentRequest, TournamentSummary, UpdateMatchRequest},
    error::ServiceError,
    services::{scoring::MatchOutcome, seeding_service},
    state::SharedState,
};

fn check_match(match_index: usize, game: &MatchEntity) -> Result<(), ServiceError> {
    MatchOutcome::from_match(game)
        .map(|_| ())
        .map_err(|err| ServiceError::InvalidInput(format!("match #{match_index}: {err}")))
}

async fn load_tournament(
    store: &Arc<dyn SeedingStore>,
    tournament_id: Uuid,
) -> Result<TournamentEntity, ServiceError> {
    store
        .find_tournament(tournament_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("tournament `{tournament_id}` not found")))
}

fn match_not_found(tournament_id: Uuid, match_index: u32) -> ServiceError {
    ServiceError::NotFound(format!(
        "match #{match_index} not found in tournament `{tournament_id}`"
    ))
}

/// Persist a new tournament with its ordered matches, all left unprocessed.
pub async fn create_tournament(
    state: &SharedState,
    request: CreateTournamentRequest,
) -> Result<TournamentSummary, ServiceError> {
    let store = state.require_store().await?;

    let name = request.name.trim().to_owned();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "tournament name must not be blank".into(),
        ));
    }

    let matches: Vec<MatchEntity> = request.matches.into_iter().map(Into::into).collect();
    for (index, game) in matches.iter().enumerate() {
        check_match(index, game)?;
    }

    let now = SystemTime::now();
    let tournament = TournamentEntity {
        id: Uuid::new_v4(),
        name,
        date: request.date,
        status: request.status.unwrap_or(TournamentStatus::Draft),
        scoring: request
            .scoring
            .unwrap_or_else(|| state.config().default_scoring()),
        matches,
        created_at: now,
        updated_at: now,
    };

    store.save_tournament(tournament.clone()).await?;
    info!(
        tournament_id = %tournament.id,
        matches = tournament.matches.len(),
        "tournament created"
    );
    Ok(tournament.into())
}

/// Fetch a tournament by id.
pub async fn get_tournament(
    state: &SharedState,
    tournament_id: Uuid,
) -> Result<TournamentSummary, ServiceError> {
    let store = state.require_store().await?;
    Ok(load_tournament(&store, tournament_id).await?.into())
}

/// Replace the result of one match.
///
/// Points awarded for the previous result are reversed first and the match is left
/// unprocessed; awarding the new result is a separate call.
pub async fn update_match(
    state: &SharedState,
    tournament_id: Uuid,
    match_index: u32,
    request: UpdateMatchRequest,
) -> Result<TournamentSummary, ServiceError> {
    let store = state.require_store().await?;
    let tournament = load_tournament(&store, tournament_id).await?;

    let Some(existing) = tournament.matches.get(match_index as usize) else {
        return Err(match_not_found(tournament_id, match_index));
    };

    let edited = MatchEntity {
        score: request.score.trim().to_owned(),
        winner: request.winner.trim().to_owned(),
        points_processed: false,
        ..existing.clone()
    };
    check_match(match_index as usize, &edited)?;

    let reversed =
        seeding_service::reverse_match_entries(&store, tournament_id, match_index).await?;

    // Only this match is rewritten; sibling flags may have moved since the load above.
    if !store
        .replace_match_result(tournament_id, match_index, edited.score, edited.winner)
        .await?
    {
        return Err(match_not_found(tournament_id, match_index));
    }

    info!(%tournament_id, match_index, reversed, "match result updated");
    Ok(load_tournament(&store, tournament_id).await?.into())
}

/// Delete a tournament after reversing every point it awarded.
///
/// Refuses to delete when any match could not be reversed, so the ledger never keeps
/// active entries for a tournament that no longer exists.
pub async fn delete_tournament(state: &SharedState, tournament_id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    let tournament = load_tournament(&store, tournament_id).await?;

    let report = seeding_service::reverse_all_matches(&store, &tournament).await;
    if report.errors > 0 {
        warn!(%tournament_id, errors = report.errors, "tournament kept; reversal incomplete");
        return Err(ServiceError::InvalidState(format!(
            "{} match(es) of tournament `{tournament_id}` could not be reversed",
            report.errors
        )));
    }

    if !store.delete_tournament(tournament_id).await? {
        return Err(ServiceError::NotFound(format!(
            "tournament `{tournament_id}` not found"
        )));
    }
    info!(%tournament_id, reversed = report.reversed, "tournament deleted");
    Ok(())
}
