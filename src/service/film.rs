use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::db::validate::validate_film;
use crate::db::{DbError, DbResult, Film, FilmId, Genre, RatingMpa, Repository, UserId};

#[derive(Clone)]
pub struct FilmService {
    repo: Arc<dyn Repository>,
}

impl FilmService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn add(&self, film: Film) -> DbResult<Film> {
        let film = self.prepare(film).await?;
        let created = self.repo.add_film(&film).await?;
        info!("Created film {} ({})", created.id, created.name);
        Ok(created)
    }

    pub async fn update(&self, film: Film) -> DbResult<Film> {
        let film = self.prepare(film).await?;
        self.repo.update_film(&film).await
    }

    pub async fn list(&self) -> DbResult<Vec<Film>> {
        self.repo.list_films().await
    }

    pub async fn get(&self, id: FilmId) -> DbResult<Film> {
        self.repo.get_film(id).await
    }

    pub async fn clear(&self) -> DbResult<()> {
        info!("Removing all films");
        self.repo.clear_films().await
    }

    pub async fn add_like(&self, film_id: FilmId, user_id: UserId) -> DbResult<Film> {
        self.repo.add_like(film_id, user_id).await
    }

    pub async fn delete_like(&self, film_id: FilmId, user_id: UserId) -> DbResult<Film> {
        self.repo.delete_like(film_id, user_id).await
    }

    pub async fn popular(&self, count: i64) -> DbResult<Vec<Film>> {
        let count = usize::try_from(count)
            .map_err(|_| DbError::validation("count must not be negative"))?;
        self.repo.popular_films(count).await
    }

    pub async fn genres(&self) -> DbResult<Vec<Genre>> {
        self.repo.list_genres().await
    }

    pub async fn genre(&self, id: i64) -> DbResult<Genre> {
        self.repo.get_genre(id).await
    }

    pub async fn ratings(&self) -> DbResult<Vec<RatingMpa>> {
        self.repo.list_ratings().await
    }

    pub async fn rating(&self, id: i64) -> DbResult<RatingMpa> {
        self.repo.get_rating(id).await
    }

    /// Validates the film and replaces its rating and genres with the
    /// reference entries, dropping repeated genres.
    async fn prepare(&self, mut film: Film) -> DbResult<Film> {
        validate_film(&film, super::today())?;

        film.mpa = self.repo.get_rating(film.mpa.id).await?;

        let mut seen = HashSet::new();
        let mut genres = Vec::with_capacity(film.genres.len());
        for genre in &film.genres {
            if seen.insert(genre.id) {
                genres.push(self.repo.get_genre(genre.id).await?);
            }
        }
        film.genres = genres;

        Ok(film)
    }
}
