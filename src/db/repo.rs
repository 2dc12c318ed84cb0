use std::cmp::Reverse;

use async_trait::async_trait;

use super::model::*;

#[async_trait]
pub trait FilmRepo: Send + Sync {
    async fn add_film(&self, film: &Film) -> DbResult<Film>;
    async fn update_film(&self, film: &Film) -> DbResult<Film>;
    async fn list_films(&self) -> DbResult<Vec<Film>>;
    async fn get_film(&self, id: FilmId) -> DbResult<Film>;
    async fn clear_films(&self) -> DbResult<()>;
    async fn add_like(&self, film_id: FilmId, user_id: UserId) -> DbResult<Film>;
    async fn delete_like(&self, film_id: FilmId, user_id: UserId) -> DbResult<Film>;
    async fn popular_films(&self, count: usize) -> DbResult<Vec<Film>>;
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn add_user(&self, user: &User) -> DbResult<User>;
    async fn update_user(&self, user: &User) -> DbResult<User>;
    async fn list_users(&self) -> DbResult<Vec<User>>;
    async fn get_user(&self, id: UserId) -> DbResult<User>;
    async fn clear_users(&self) -> DbResult<()>;
    async fn add_friend(&self, user_id: UserId, friend_id: UserId) -> DbResult<User>;
    async fn delete_friend(&self, user_id: UserId, friend_id: UserId) -> DbResult<User>;
    async fn list_friends(&self, user_id: UserId) -> DbResult<Vec<User>>;
    async fn common_friends(&self, user_id: UserId, other_id: UserId) -> DbResult<Vec<User>>;
}

#[async_trait]
pub trait CatalogRepo: Send + Sync {
    async fn list_genres(&self) -> DbResult<Vec<Genre>>;
    async fn get_genre(&self, id: i64) -> DbResult<Genre>;
    async fn list_ratings(&self) -> DbResult<Vec<RatingMpa>>;
    async fn get_rating(&self, id: i64) -> DbResult<RatingMpa>;
}

pub trait Repository: FilmRepo + UserRepo + CatalogRepo + Send + Sync {}

impl<T> Repository for T where T: FilmRepo + UserRepo + CatalogRepo + Send + Sync {}

/// Orders films by like count, most liked first, and keeps the first `count`.
///
/// Films with equal counts keep ascending id order, so films without any
/// likes fill the tail of the ranking in id order.
pub fn rank_by_likes(mut films: Vec<Film>, count: usize) -> Vec<Film> {
    films.sort_by_key(|f| (Reverse(f.like_count()), f.id));
    films.truncate(count);
    films
}
