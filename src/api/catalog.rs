use axum::{
    extract::{rejection::PathRejection, Path, State},
    Json,
};

use super::error::ApiError;
use crate::db::{Genre, RatingMpa};
use crate::server::AppState;

pub async fn list_genres(State(state): State<AppState>) -> Result<Json<Vec<Genre>>, ApiError> {
    Ok(Json(state.films.genres().await?))
}

pub async fn get_genre(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Genre>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.films.genre(id).await?))
}

pub async fn list_ratings(
    State(state): State<AppState>,
) -> Result<Json<Vec<RatingMpa>>, ApiError> {
    Ok(Json(state.films.ratings().await?))
}

pub async fn get_rating(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<RatingMpa>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.films.rating(id).await?))
}
