use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::errors::AppResult;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Roles with at least one entry in the registry
    pub roles: usize,
    pub routes: usize,
    pub data_types: usize,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, description = "Health check", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let registry = state.authorizer.registry();

    Ok(Json(HealthResponse {
        status: "ok",
        roles: registry.roles().count(),
        routes: registry.routes().len(),
        data_types: registry.data_types().len(),
    }))
}
