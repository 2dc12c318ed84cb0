use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info, warn};

use super::model::*;
use super::repo::*;

const FILM_COLUMNS: &str = "SELECT f.film_id, f.name, f.description, f.release_date, f.duration,
        f.rating_id, r.name AS rating_name
    FROM film f JOIN rating r ON r.rating_id = f.rating_id";

/// Ids a user counts as friends: everyone they recorded, plus everyone who
/// recorded them as confirmed. Binds the user id twice, then the status.
const FRIEND_IDS: &str = "SELECT friend_id FROM friends WHERE user_id = ?
    UNION
    SELECT user_id FROM friends WHERE friend_id = ? AND status_id = ?";

#[derive(sqlx::FromRow)]
struct FilmRow {
    film_id: i64,
    name: String,
    description: String,
    release_date: NaiveDate,
    duration: i64,
    rating_id: i64,
    rating_name: String,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: i64,
    login: String,
    name: String,
    email: String,
    birthday: NaiveDate,
}

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(db_path)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to an in-memory database sees its own database,
        // so keep exactly one connection alive for the lifetime of the pool.
        let pool_options = if db_path.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;

        let repo = Self { pool };

        repo.init_schema().await?;

        info!("Database initialized at {}", db_path);

        Ok(repo)
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::raw_sql(schema).execute(&self.pool).await?;
        Ok(())
    }

    async fn ensure_film(&self, id: FilmId) -> DbResult<()> {
        let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM film WHERE film_id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if found == 0 {
            return Err(DbError::NotFound(Entity::Film, id));
        }
        Ok(())
    }

    async fn ensure_user(&self, id: UserId) -> DbResult<()> {
        let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE user_id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if found == 0 {
            return Err(DbError::NotFound(Entity::User, id));
        }
        Ok(())
    }

    /// Loads all films, or just one when `only` is set, with genres and likes.
    async fn load_films(&self, only: Option<FilmId>) -> DbResult<Vec<Film>> {
        let rows = sqlx::query_as::<_, FilmRow>(&format!(
            "{} WHERE ? IS NULL OR f.film_id = ? ORDER BY f.film_id",
            FILM_COLUMNS
        ))
        .bind(only)
        .bind(only)
        .fetch_all(&self.pool)
        .await?;

        let genre_rows = sqlx::query_as::<_, (i64, i64, String)>(
            "SELECT gf.film_id, g.genre_id, g.name
             FROM genre_of_film gf JOIN genre g ON g.genre_id = gf.genre_id
             WHERE ? IS NULL OR gf.film_id = ?
             ORDER BY gf.film_id, gf.position",
        )
        .bind(only)
        .bind(only)
        .fetch_all(&self.pool)
        .await?;

        let like_rows = sqlx::query_as::<_, (i64, i64)>(
            "SELECT film_id, user_id FROM likes WHERE ? IS NULL OR film_id = ?",
        )
        .bind(only)
        .bind(only)
        .fetch_all(&self.pool)
        .await?;

        let mut genres: HashMap<FilmId, Vec<Genre>> = HashMap::new();
        for (film_id, id, name) in genre_rows {
            genres.entry(film_id).or_default().push(Genre { id, name });
        }

        let mut likes: HashMap<FilmId, BTreeSet<UserId>> = HashMap::new();
        for (film_id, user_id) in like_rows {
            likes.entry(film_id).or_default().insert(user_id);
        }

        let films = rows
            .into_iter()
            .map(|r| Film {
                id: r.film_id,
                name: r.name,
                description: r.description,
                release_date: r.release_date,
                duration: r.duration,
                mpa: RatingMpa {
                    id: r.rating_id,
                    name: r.rating_name,
                },
                genres: genres.remove(&r.film_id).unwrap_or_default(),
                likes: likes.remove(&r.film_id).unwrap_or_default(),
            })
            .collect();

        Ok(films)
    }

    async fn write_genres(
        tx: &mut Transaction<'_, Sqlite>,
        film_id: FilmId,
        genres: &[Genre],
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM genre_of_film WHERE film_id = ?")
            .bind(film_id)
            .execute(&mut **tx)
            .await?;

        for (position, genre) in genres.iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO genre_of_film (film_id, genre_id, position) VALUES (?, ?, ?)",
            )
            .bind(film_id)
            .bind(genre.id)
            .bind(position as i64)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn load_users(&self, only: Option<UserId>) -> DbResult<Vec<User>> {
        match only {
            Some(id) => self.load_users_where("user_id = ?", &[id]).await,
            None => self.load_users_where("1", &[]).await,
        }
    }

    /// Loads the users matching `filter`, a condition on `user_id` whose
    /// placeholders are bound from `args`. The same condition selects the
    /// friend rows, so only the requested users are read.
    async fn load_users_where(&self, filter: &str, args: &[i64]) -> DbResult<Vec<User>> {
        let sql = format!(
            "SELECT user_id, login, name, email, birthday FROM users WHERE {} ORDER BY user_id",
            filter
        );
        let mut query = sqlx::query_as::<_, UserRow>(&sql);
        for arg in args {
            query = query.bind(*arg);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let sql = format!(
            "SELECT user_id, friend_id, status_id FROM friends WHERE {}",
            filter
        );
        let mut query = sqlx::query_as::<_, (i64, i64, i64)>(&sql);
        for arg in args {
            query = query.bind(*arg);
        }
        let friend_rows = query.fetch_all(&self.pool).await?;

        let mut users: Vec<User> = rows
            .into_iter()
            .map(|r| User {
                id: r.user_id,
                login: r.login,
                name: r.name,
                email: r.email,
                birthday: r.birthday,
                friends: Default::default(),
            })
            .collect();

        let mut index: HashMap<UserId, usize> = HashMap::new();
        for (i, user) in users.iter().enumerate() {
            index.insert(user.id, i);
        }

        for (user_id, friend_id, status_id) in friend_rows {
            let Some(status) = FriendshipStatus::from_db_id(status_id) else {
                warn!("Unknown friendship status {} for {} -> {}", status_id, user_id, friend_id);
                continue;
            };
            if let Some(&i) = index.get(&user_id) {
                users[i].friends.insert(friend_id, status);
            }
        }

        Ok(users)
    }

}

#[async_trait]
impl FilmRepo for SqliteRepository {
    async fn add_film(&self, film: &Film) -> DbResult<Film> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            "INSERT INTO film (name, description, release_date, duration, rating_id)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&film.name)
        .bind(&film.description)
        .bind(film.release_date)
        .bind(film.duration)
        .bind(film.mpa.id)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        Self::write_genres(&mut tx, id, &film.genres).await?;
        tx.commit().await?;

        debug!("Added film {}: {}", id, film.name);
        self.get_film(id).await
    }

    async fn update_film(&self, film: &Film) -> DbResult<Film> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE film SET name = ?, description = ?, release_date = ?, duration = ?, rating_id = ?
             WHERE film_id = ?",
        )
        .bind(&film.name)
        .bind(&film.description)
        .bind(film.release_date)
        .bind(film.duration)
        .bind(film.mpa.id)
        .bind(film.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(DbError::NotFound(Entity::Film, film.id));
        }

        Self::write_genres(&mut tx, film.id, &film.genres).await?;
        tx.commit().await?;

        debug!("Updated film {}: {}", film.id, film.name);
        self.get_film(film.id).await
    }

    async fn list_films(&self) -> DbResult<Vec<Film>> {
        self.load_films(None).await
    }

    async fn get_film(&self, id: FilmId) -> DbResult<Film> {
        self.load_films(Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or(DbError::NotFound(Entity::Film, id))
    }

    async fn clear_films(&self) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        for sql in [
            "DELETE FROM likes",
            "DELETE FROM genre_of_film",
            "DELETE FROM film",
        ] {
            sqlx::query(sql).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        debug!("Removed all films");
        Ok(())
    }

    async fn add_like(&self, film_id: FilmId, user_id: UserId) -> DbResult<Film> {
        self.ensure_film(film_id).await?;
        self.ensure_user(user_id).await?;

        sqlx::query("INSERT OR IGNORE INTO likes (film_id, user_id) VALUES (?, ?)")
            .bind(film_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        debug!("User {} likes film {}", user_id, film_id);
        self.get_film(film_id).await
    }

    async fn delete_like(&self, film_id: FilmId, user_id: UserId) -> DbResult<Film> {
        self.ensure_film(film_id).await?;
        self.ensure_user(user_id).await?;

        sqlx::query("DELETE FROM likes WHERE film_id = ? AND user_id = ?")
            .bind(film_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        debug!("User {} no longer likes film {}", user_id, film_id);
        self.get_film(film_id).await
    }

    async fn popular_films(&self, count: usize) -> DbResult<Vec<Film>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT f.film_id FROM film f
             LEFT JOIN likes l ON l.film_id = f.film_id
             GROUP BY f.film_id
             ORDER BY COUNT(l.user_id) DESC, f.film_id
             LIMIT ?",
        )
        .bind(i64::try_from(count).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let mut films: HashMap<FilmId, Film> = self
            .load_films(None)
            .await?
            .into_iter()
            .map(|f| (f.id, f))
            .collect();

        Ok(ids.into_iter().filter_map(|id| films.remove(&id)).collect())
    }
}

#[async_trait]
impl UserRepo for SqliteRepository {
    async fn add_user(&self, user: &User) -> DbResult<User> {
        let id = sqlx::query("INSERT INTO users (login, name, email, birthday) VALUES (?, ?, ?, ?)")
            .bind(&user.login)
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.birthday)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        debug!("Added user {}: {}", id, user.login);
        self.get_user(id).await
    }

    async fn update_user(&self, user: &User) -> DbResult<User> {
        let updated = sqlx::query(
            "UPDATE users SET login = ?, name = ?, email = ?, birthday = ? WHERE user_id = ?",
        )
        .bind(&user.login)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.birthday)
        .bind(user.id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(DbError::NotFound(Entity::User, user.id));
        }

        debug!("Updated user {}: {}", user.id, user.login);
        self.get_user(user.id).await
    }

    async fn list_users(&self) -> DbResult<Vec<User>> {
        self.load_users(None).await
    }

    async fn get_user(&self, id: UserId) -> DbResult<User> {
        self.load_users(Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or(DbError::NotFound(Entity::User, id))
    }

    async fn clear_users(&self) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        for sql in ["DELETE FROM friends", "DELETE FROM likes", "DELETE FROM users"] {
            sqlx::query(sql).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        debug!("Removed all users");
        Ok(())
    }

    async fn add_friend(&self, user_id: UserId, friend_id: UserId) -> DbResult<User> {
        self.ensure_user(user_id).await?;
        self.ensure_user(friend_id).await?;

        let mut tx = self.pool.begin().await?;

        let reverse = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM friends WHERE user_id = ? AND friend_id = ?",
        )
        .bind(friend_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let confirmed = FriendshipStatus::Confirmed.as_db_id();
        if reverse > 0 {
            sqlx::query("UPDATE friends SET status_id = ? WHERE user_id = ? AND friend_id = ?")
                .bind(confirmed)
                .bind(friend_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "INSERT OR REPLACE INTO friends (user_id, friend_id, status_id) VALUES (?, ?, ?)",
            )
            .bind(user_id)
            .bind(friend_id)
            .bind(confirmed)
            .execute(&mut *tx)
            .await?;
            debug!("Friendship {} <-> {} confirmed", user_id, friend_id);
        } else {
            sqlx::query(
                "INSERT OR IGNORE INTO friends (user_id, friend_id, status_id) VALUES (?, ?, ?)",
            )
            .bind(user_id)
            .bind(friend_id)
            .bind(FriendshipStatus::Unconfirmed.as_db_id())
            .execute(&mut *tx)
            .await?;
            debug!("Friend request {} -> {}", user_id, friend_id);
        }

        tx.commit().await?;
        self.get_user(user_id).await
    }

    async fn delete_friend(&self, user_id: UserId, friend_id: UserId) -> DbResult<User> {
        self.ensure_user(user_id).await?;
        self.ensure_user(friend_id).await?;

        sqlx::query(
            "DELETE FROM friends
             WHERE (user_id = ? AND friend_id = ?) OR (user_id = ? AND friend_id = ?)",
        )
        .bind(user_id)
        .bind(friend_id)
        .bind(friend_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        debug!("Friendship {} <-> {} removed", user_id, friend_id);
        self.get_user(user_id).await
    }

    async fn list_friends(&self, user_id: UserId) -> DbResult<Vec<User>> {
        self.ensure_user(user_id).await?;
        let filter = format!("user_id IN ({})", FRIEND_IDS);
        let confirmed = FriendshipStatus::Confirmed.as_db_id();
        self.load_users_where(&filter, &[user_id, user_id, confirmed])
            .await
    }

    async fn common_friends(&self, user_id: UserId, other_id: UserId) -> DbResult<Vec<User>> {
        self.ensure_user(user_id).await?;
        self.ensure_user(other_id).await?;

        let filter = format!("user_id IN ({0}) AND user_id IN ({0})", FRIEND_IDS);
        let confirmed = FriendshipStatus::Confirmed.as_db_id();
        self.load_users_where(
            &filter,
            &[user_id, user_id, confirmed, other_id, other_id, confirmed],
        )
        .await
    }
}

#[async_trait]
impl CatalogRepo for SqliteRepository {
    async fn list_genres(&self) -> DbResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>(
            "SELECT genre_id AS id, name FROM genre ORDER BY genre_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(genres)
    }

    async fn get_genre(&self, id: i64) -> DbResult<Genre> {
        sqlx::query_as::<_, Genre>("SELECT genre_id AS id, name FROM genre WHERE genre_id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => DbError::NotFound(Entity::Genre, id),
                _ => DbError::Sqlx(e),
            })
    }

    async fn list_ratings(&self) -> DbResult<Vec<RatingMpa>> {
        let ratings = sqlx::query_as::<_, RatingMpa>(
            "SELECT rating_id AS id, name FROM rating ORDER BY rating_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }

    async fn get_rating(&self, id: i64) -> DbResult<RatingMpa> {
        sqlx::query_as::<_, RatingMpa>(
            "SELECT rating_id AS id, name FROM rating WHERE rating_id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::NotFound(Entity::Rating, id),
            _ => DbError::Sqlx(e),
        })
    }
}
