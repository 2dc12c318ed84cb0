use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::error::ApiError;
use crate::db::{Film, FilmId, UserId};
use crate::server::AppState;

const DEFAULT_POPULAR_COUNT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct PopularParams {
    pub count: Option<i64>,
}

pub async fn create_film(
    State(state): State<AppState>,
    body: Result<Json<Film>, JsonRejection>,
) -> Result<(StatusCode, Json<Film>), ApiError> {
    let Json(film) = body?;
    let created = state.films.add(film).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_film(
    State(state): State<AppState>,
    body: Result<Json<Film>, JsonRejection>,
) -> Result<Json<Film>, ApiError> {
    let Json(film) = body?;
    Ok(Json(state.films.update(film).await?))
}

pub async fn list_films(State(state): State<AppState>) -> Result<Json<Vec<Film>>, ApiError> {
    Ok(Json(state.films.list().await?))
}

pub async fn clear_films(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.films.clear().await?;
    Ok(StatusCode::OK)
}

pub async fn get_film(
    State(state): State<AppState>,
    path: Result<Path<FilmId>, PathRejection>,
) -> Result<Json<Film>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.films.get(id).await?))
}

pub async fn add_like(
    State(state): State<AppState>,
    path: Result<Path<(FilmId, UserId)>, PathRejection>,
) -> Result<Json<Film>, ApiError> {
    let Path((film_id, user_id)) = path?;
    Ok(Json(state.films.add_like(film_id, user_id).await?))
}

pub async fn delete_like(
    State(state): State<AppState>,
    path: Result<Path<(FilmId, UserId)>, PathRejection>,
) -> Result<Json<Film>, ApiError> {
    let Path((film_id, user_id)) = path?;
    Ok(Json(state.films.delete_like(film_id, user_id).await?))
}

pub async fn popular_films(
    State(state): State<AppState>,
    query: Result<Query<PopularParams>, QueryRejection>,
) -> Result<Json<Vec<Film>>, ApiError> {
    let Query(params) = query?;
    let count = params.count.unwrap_or(DEFAULT_POPULAR_COUNT);
    Ok(Json(state.films.popular(count).await?))
}
