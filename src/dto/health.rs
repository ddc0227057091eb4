use serde::Serialize;
use utoipa::ToSchema;

/// Liveness payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while no usable storage backend is available.
    pub status: String,
    /// Result of the last storage ping made for this request.
    pub storage_reachable: bool,
}

impl HealthResponse {
    pub fn new(degraded: bool, storage_reachable: bool) -> Self {
        Self {
            status: if degraded { "degraded" } else { "ok" }.to_string(),
            storage_reachable,
        }
    }
}
