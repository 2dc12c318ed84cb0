use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};

use super::error::ApiError;
use crate::db::{User, UserId};
use crate::server::AppState;

pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<User>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let Json(user) = body?;
    let created = state.users.add(user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_user(
    State(state): State<AppState>,
    body: Result<Json<User>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let Json(user) = body?;
    Ok(Json(state.users.update(user).await?))
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.users.list().await?))
}

pub async fn clear_users(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.users.clear().await?;
    Ok(StatusCode::OK)
}

pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<UserId>, PathRejection>,
) -> Result<Json<User>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.users.get(id).await?))
}

pub async fn add_friend(
    State(state): State<AppState>,
    path: Result<Path<(UserId, UserId)>, PathRejection>,
) -> Result<Json<User>, ApiError> {
    let Path((id, friend_id)) = path?;
    Ok(Json(state.users.add_friend(id, friend_id).await?))
}

pub async fn delete_friend(
    State(state): State<AppState>,
    path: Result<Path<(UserId, UserId)>, PathRejection>,
) -> Result<Json<User>, ApiError> {
    let Path((id, friend_id)) = path?;
    Ok(Json(state.users.delete_friend(id, friend_id).await?))
}

pub async fn list_friends(
    State(state): State<AppState>,
    path: Result<Path<UserId>, PathRejection>,
) -> Result<Json<Vec<User>>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.users.friends(id).await?))
}

pub async fn common_friends(
    State(state): State<AppState>,
    path: Result<Path<(UserId, UserId)>, PathRejection>,
) -> Result<Json<Vec<User>>, ApiError> {
    let Path((id, other_id)) = path?;
    Ok(Json(state.users.common_friends(id, other_id).await?))
}
