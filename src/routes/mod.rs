use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod maintenance;
pub mod players;
pub mod seeding;
pub mod tournaments;

/// Compose all route trees and attach the shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(players::router())
        .merge(tournaments::router())
        .merge(seeding::router())
        .merge(maintenance::router())
        .merge(docs::router())
        .with_state(state)
}
