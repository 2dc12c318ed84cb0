use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

pub type FilmId = i64;
pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    #[serde(default)]
    pub id: FilmId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub release_date: NaiveDate,
    /// Running time in seconds.
    pub duration: i64,
    pub mpa: RatingMpa,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub likes: BTreeSet<UserId>,
}

impl Film {
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: UserId,
    pub login: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    pub email: String,
    pub birthday: NaiveDate,
    #[serde(default)]
    pub friends: BTreeMap<UserId, FriendshipStatus>,
}

/// Reads an optional string field, treating `null` like an absent value.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FriendshipStatus {
    Unconfirmed,
    Confirmed,
}

impl FriendshipStatus {
    /// Value stored in the `friends.status_id` column.
    pub fn as_db_id(self) -> i64 {
        match self {
            FriendshipStatus::Confirmed => 1,
            FriendshipStatus::Unconfirmed => 2,
        }
    }

    pub fn from_db_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(FriendshipStatus::Confirmed),
            2 => Some(FriendshipStatus::Unconfirmed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Genre {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RatingMpa {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

pub const GENRES: [(i64, &str); 6] = [
    (1, "Комедия"),
    (2, "Драма"),
    (3, "Мультфильм"),
    (4, "Триллер"),
    (5, "Документальный"),
    (6, "Боевик"),
];

pub const RATINGS: [(i64, &str); 5] = [
    (1, "G"),
    (2, "PG"),
    (3, "PG-13"),
    (4, "R"),
    (5, "NC-17"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Film,
    User,
    Genre,
    Rating,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Film => "Film",
            Entity::User => "User",
            Entity::Genre => "Genre",
            Entity::Rating => "MPA rating",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("{0} with id = {1} not found")]
    NotFound(Entity, i64),
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl DbError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DbError::Validation(msg.into())
    }
}

pub type DbResult<T> = Result<T, DbError>;
