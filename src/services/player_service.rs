use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::PlayerEntity,
    dto::player::{PlayerSummary, RegisterPlayerRequest},
    error::ServiceError,
    state::SharedState,
};

/// Register a player with zeroed stats.
pub async fn register_player(
    state: &SharedState,
    request: RegisterPlayerRequest,
) -> Result<PlayerSummary, ServiceError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("player name must not be blank".into()));
    }

    let store = state.require_store().await?;
    let player = PlayerEntity::new(name);
    store.save_player(player.clone()).await?;
    info!(player_id = %player.id, "player registered");
    Ok(player.into())
}

/// Fetch a player and its current aggregate.
pub async fn get_player(state: &SharedState, player_id: Uuid) -> Result<PlayerSummary, ServiceError> {
    let store = state.require_store().await?;
    store
        .find_player(player_id)
        .await?
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("player `{player_id}` not found")))
}

/// List every player, ordered by name.
pub async fn list_players(state: &SharedState) -> Result<Vec<PlayerSummary>, ServiceError> {
    let store = state.require_store().await?;
    Ok(store
        .list_players()
        .await?
        .into_iter()
        .map(Into::into)
        .collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::seeding_store::memory::MemorySeedingStore, state::AppState,
    };

    fn state() -> SharedState {
        AppState::with_store(AppConfig::default(), Arc::new(MemorySeedingStore::new()))
    }

    #[tokio::test]
    async fn registered_player_starts_at_zero() {
        let state = state();
        let created = register_player(
            &state,
            RegisterPlayerRequest {
                name: "  Maya  ".into(),
            },
        )
        .await
        .unwrap();

        let fetched = get_player(&state, created.id).await.unwrap();
        assert_eq!(fetched.name, "Maya");
        assert_eq!(fetched.stats.seed_points, 0);
        assert_eq!(fetched.stats.matches_played, 0);
    }

    #[tokio::test]
    async fn players_are_listed_by_name() {
        let state = state();
        for name in ["Zoe", "Ada", "Mia"] {
            register_player(&state, RegisterPlayerRequest { name: name.into() })
                .await
                .unwrap();
        }

        let names: Vec<_> = list_players(&state)
            .await
            .unwrap()
            .into_iter()
            .map(|player| player.name)
            .collect();
        assert_eq!(names, ["Ada", "Mia", "Zoe"]);
    }

    #[tokio::test]
    async fn blank_name_and_unknown_id_are_rejected() {
        let state = state();
        assert!(matches!(
            register_player(&state, RegisterPlayerRequest { name: "   ".into() }).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            get_player(&state, Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
