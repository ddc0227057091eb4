use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{PlayerEntity, PlayerStats},
    dto::format_system_time,
};

/// Payload registering a player in the seeding roster.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterPlayerRequest {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
}

/// Player with its current aggregate.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    pub id: Uuid,
    pub name: String,
    pub stats: PlayerStats,
    pub updated_at: String,
}

impl From<PlayerEntity> for PlayerSummary {
    fn from(entity: PlayerEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            stats: entity.stats,
            updated_at: format_system_time(entity.updated_at),
        }
    }
}
