use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::Authorizer;
use crate::routes::{authz, health};

#[derive(Clone)]
pub struct AppState {
    pub authorizer: Authorizer,
}

impl AppState {
    pub fn new(authorizer: Authorizer) -> Self {
        Self { authorizer }
    }
}

pub fn create_app(authorizer: Authorizer) -> Router {
    let state = AppState::new(authorizer);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/authz", authz::routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
