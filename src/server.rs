use axum::{http::StatusCode, response::IntoResponse, Json, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api::ErrorResponse;
use crate::db::Repository;
use crate::service::{FilmService, UserService};

#[derive(Clone)]
pub struct AppState {
    pub films: FilmService,
    pub users: UserService,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self {
            films: FilmService::new(repo.clone()),
            users: UserService::new(repo),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(crate::api::build_api_router())
        .fallback(fallback_handler)
        .layer(axum::middleware::from_fn(crate::middleware::log_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn fallback_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "No such endpoint".to_string(),
        }),
    )
}
