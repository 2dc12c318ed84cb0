use std::sync::Arc;

use tracing::info;

use crate::db::validate::normalize_user;
use crate::db::{DbError, DbResult, Repository, User, UserId};

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn Repository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn add(&self, mut user: User) -> DbResult<User> {
        normalize_user(&mut user, super::today())?;
        let created = self.repo.add_user(&user).await?;
        info!("Created user {} ({})", created.id, created.login);
        Ok(created)
    }

    pub async fn update(&self, mut user: User) -> DbResult<User> {
        normalize_user(&mut user, super::today())?;
        self.repo.update_user(&user).await
    }

    pub async fn list(&self) -> DbResult<Vec<User>> {
        self.repo.list_users().await
    }

    pub async fn get(&self, id: UserId) -> DbResult<User> {
        self.repo.get_user(id).await
    }

    pub async fn clear(&self) -> DbResult<()> {
        info!("Removing all users");
        self.repo.clear_users().await
    }

    pub async fn add_friend(&self, user_id: UserId, friend_id: UserId) -> DbResult<User> {
        if user_id == friend_id {
            return Err(DbError::validation("a user cannot befriend themselves"));
        }
        self.repo.add_friend(user_id, friend_id).await
    }

    pub async fn delete_friend(&self, user_id: UserId, friend_id: UserId) -> DbResult<User> {
        self.repo.delete_friend(user_id, friend_id).await
    }

    pub async fn friends(&self, user_id: UserId) -> DbResult<Vec<User>> {
        self.repo.list_friends(user_id).await
    }

    pub async fn common_friends(&self, user_id: UserId, other_id: UserId) -> DbResult<Vec<User>> {
        self.repo.common_friends(user_id, other_id).await
    }
}
