use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::model::*;
use super::repo::*;

#[derive(Default)]
struct Tables {
    films: BTreeMap<FilmId, Film>,
    users: BTreeMap<UserId, User>,
    next_film_id: FilmId,
    next_user_id: UserId,
}

impl Tables {
    fn film(&self, id: FilmId) -> DbResult<&Film> {
        self.films.get(&id).ok_or(DbError::NotFound(Entity::Film, id))
    }

    fn film_mut(&mut self, id: FilmId) -> DbResult<&mut Film> {
        self.films.get_mut(&id).ok_or(DbError::NotFound(Entity::Film, id))
    }

    fn user(&self, id: UserId) -> DbResult<&User> {
        self.users.get(&id).ok_or(DbError::NotFound(Entity::User, id))
    }

    fn user_mut(&mut self, id: UserId) -> DbResult<&mut User> {
        self.users.get_mut(&id).ok_or(DbError::NotFound(Entity::User, id))
    }

    /// Ids the user recorded, plus users that recorded this one as confirmed.
    fn friend_ids(&self, id: UserId) -> DbResult<BTreeSet<UserId>> {
        let mut ids: BTreeSet<UserId> = self.user(id)?.friends.keys().copied().collect();
        for other in self.users.values() {
            if other.friends.get(&id) == Some(&FriendshipStatus::Confirmed) {
                ids.insert(other.id);
            }
        }
        Ok(ids)
    }

    fn users_by_id(&self, ids: impl IntoIterator<Item = UserId>) -> Vec<User> {
        ids.into_iter()
            .filter_map(|id| self.users.get(&id).cloned())
            .collect()
    }
}

/// Storage backed by plain maps, lost on restart.
pub struct MemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
        }
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FilmRepo for MemoryRepository {
    async fn add_film(&self, film: &Film) -> DbResult<Film> {
        let mut tables = self.tables.write().await;
        tables.next_film_id += 1;

        let mut film = film.clone();
        film.id = tables.next_film_id;
        film.likes.clear();
        tables.films.insert(film.id, film.clone());

        debug!("Added film {}: {}", film.id, film.name);
        Ok(film)
    }

    async fn update_film(&self, film: &Film) -> DbResult<Film> {
        let mut tables = self.tables.write().await;
        let stored = tables.film_mut(film.id)?;

        let likes = std::mem::take(&mut stored.likes);
        *stored = film.clone();
        stored.likes = likes;

        debug!("Updated film {}: {}", film.id, film.name);
        Ok(stored.clone())
    }

    async fn list_films(&self) -> DbResult<Vec<Film>> {
        let tables = self.tables.read().await;
        Ok(tables.films.values().cloned().collect())
    }

    async fn get_film(&self, id: FilmId) -> DbResult<Film> {
        let tables = self.tables.read().await;
        tables.film(id).cloned()
    }

    async fn clear_films(&self) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        tables.films.clear();
        tables.next_film_id = 0;
        debug!("Removed all films");
        Ok(())
    }

    async fn add_like(&self, film_id: FilmId, user_id: UserId) -> DbResult<Film> {
        let mut tables = self.tables.write().await;
        tables.user(user_id)?;
        let film = tables.film_mut(film_id)?;
        film.likes.insert(user_id);
        debug!("User {} likes film {}", user_id, film_id);
        Ok(film.clone())
    }

    async fn delete_like(&self, film_id: FilmId, user_id: UserId) -> DbResult<Film> {
        let mut tables = self.tables.write().await;
        tables.user(user_id)?;
        let film = tables.film_mut(film_id)?;
        film.likes.remove(&user_id);
        debug!("User {} no longer likes film {}", user_id, film_id);
        Ok(film.clone())
    }

    async fn popular_films(&self, count: usize) -> DbResult<Vec<Film>> {
        let tables = self.tables.read().await;
        let films = tables.films.values().cloned().collect();
        Ok(rank_by_likes(films, count))
    }
}

#[async_trait]
impl UserRepo for MemoryRepository {
    async fn add_user(&self, user: &User) -> DbResult<User> {
        let mut tables = self.tables.write().await;
        tables.next_user_id += 1;

        let mut user = user.clone();
        user.id = tables.next_user_id;
        user.friends.clear();
        tables.users.insert(user.id, user.clone());

        debug!("Added user {}: {}", user.id, user.login);
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> DbResult<User> {
        let mut tables = self.tables.write().await;
        let stored = tables.user_mut(user.id)?;

        let friends = std::mem::take(&mut stored.friends);
        *stored = user.clone();
        stored.friends = friends;

        debug!("Updated user {}: {}", user.id, user.login);
        Ok(stored.clone())
    }

    async fn list_users(&self) -> DbResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().cloned().collect())
    }

    async fn get_user(&self, id: UserId) -> DbResult<User> {
        let tables = self.tables.read().await;
        tables.user(id).cloned()
    }

    async fn clear_users(&self) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        tables.users.clear();
        tables.next_user_id = 0;
        for film in tables.films.values_mut() {
            film.likes.clear();
        }
        debug!("Removed all users");
        Ok(())
    }

    async fn add_friend(&self, user_id: UserId, friend_id: UserId) -> DbResult<User> {
        let mut tables = self.tables.write().await;
        tables.user(user_id)?;
        let friend = tables.user_mut(friend_id)?;

        if friend.friends.contains_key(&user_id) {
            friend.friends.insert(user_id, FriendshipStatus::Confirmed);
            tables
                .user_mut(user_id)?
                .friends
                .insert(friend_id, FriendshipStatus::Confirmed);
            debug!("Friendship {} <-> {} confirmed", user_id, friend_id);
        } else {
            tables
                .user_mut(user_id)?
                .friends
                .entry(friend_id)
                .or_insert(FriendshipStatus::Unconfirmed);
            debug!("Friend request {} -> {}", user_id, friend_id);
        }

        tables.user(user_id).cloned()
    }

    async fn delete_friend(&self, user_id: UserId, friend_id: UserId) -> DbResult<User> {
        let mut tables = self.tables.write().await;
        tables.user(user_id)?;
        tables.user_mut(friend_id)?.friends.remove(&user_id);

        let user = tables.user_mut(user_id)?;
        user.friends.remove(&friend_id);
        debug!("Friendship {} <-> {} removed", user_id, friend_id);
        Ok(user.clone())
    }

    async fn list_friends(&self, user_id: UserId) -> DbResult<Vec<User>> {
        let tables = self.tables.read().await;
        let ids = tables.friend_ids(user_id)?;
        Ok(tables.users_by_id(ids))
    }

    async fn common_friends(&self, user_id: UserId, other_id: UserId) -> DbResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mine = tables.friend_ids(user_id)?;
        let theirs = tables.friend_ids(other_id)?;
        Ok(tables.users_by_id(mine.intersection(&theirs).copied()))
    }
}

#[async_trait]
impl CatalogRepo for MemoryRepository {
    async fn list_genres(&self) -> DbResult<Vec<Genre>> {
        Ok(GENRES
            .iter()
            .map(|&(id, name)| Genre { id, name: name.to_string() })
            .collect())
    }

    async fn get_genre(&self, id: i64) -> DbResult<Genre> {
        GENRES
            .iter()
            .find(|&&(gid, _)| gid == id)
            .map(|&(id, name)| Genre { id, name: name.to_string() })
            .ok_or(DbError::NotFound(Entity::Genre, id))
    }

    async fn list_ratings(&self) -> DbResult<Vec<RatingMpa>> {
        Ok(RATINGS
            .iter()
            .map(|&(id, name)| RatingMpa { id, name: name.to_string() })
            .collect())
    }

    async fn get_rating(&self, id: i64) -> DbResult<RatingMpa> {
        RATINGS
            .iter()
            .find(|&&(rid, _)| rid == id)
            .map(|&(id, name)| RatingMpa { id, name: name.to_string() })
            .ok_or(DbError::NotFound(Entity::Rating, id))
    }
}
