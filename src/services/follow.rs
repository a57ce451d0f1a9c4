//! Follow service
//!
//! Subscriptions use the same toggle rules as favorites, plus a user can
//! never follow themselves.

use crate::db::repositories::{FollowRepository, UserRepository};
use crate::models::{User, UserProfile};
use crate::services::toggle::ToggleError;
use anyhow::Context;
use std::sync::Arc;

pub struct FollowService {
    follow_repo: Arc<dyn FollowRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl FollowService {
    pub fn new(follow_repo: Arc<dyn FollowRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self {
            follow_repo,
            user_repo,
        }
    }

    /// Subscribe `user` to `author_id`, returning the author's summary
    pub async fn follow(&self, user: &User, author_id: i64) -> Result<UserProfile, ToggleError> {
        let author = self.find_author(author_id).await?;
        if author.id == user.id {
            return Err(ToggleError::SelfFollow);
        }

        if !self.follow_repo.add(user.id, author.id).await? {
            return Err(ToggleError::AlreadyPresent(format!(
                "You are already subscribed to {}",
                author.username
            )));
        }

        Ok(author.profile(true))
    }

    /// Unsubscribe `user` from `author_id`
    pub async fn unfollow(&self, user: &User, author_id: i64) -> Result<(), ToggleError> {
        let author = self.find_author(author_id).await?;
        if author.id == user.id {
            return Err(ToggleError::SelfFollow);
        }

        if !self.follow_repo.remove(user.id, author.id).await? {
            return Err(ToggleError::NotPresent(format!(
                "You are not subscribed to {}",
                author.username
            )));
        }

        Ok(())
    }

    async fn find_author(&self, author_id: i64) -> Result<User, ToggleError> {
        self.user_repo
            .get_by_id(author_id)
            .await
            .context("Failed to get author")?
            .ok_or_else(|| ToggleError::NotFound(format!("User {} not found", author_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxFollowRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::UserRole;

    async fn setup() -> (FollowService, User, User) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let mut created = Vec::new();
        for name in ["reader", "writer"] {
            let user = User::new(
                format!("{}@example.com", name),
                name.to_string(),
                "F".to_string(),
                "L".to_string(),
                "hash".to_string(),
                UserRole::User,
            );
            created.push(users.create(&user).await.unwrap());
        }
        let writer = created.pop().unwrap();
        let reader = created.pop().unwrap();

        let service = FollowService::new(
            SqlxFollowRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool),
        );
        (service, reader, writer)
    }

    #[tokio::test]
    async fn test_follow_returns_subscribed_author() {
        let (service, reader, writer) = setup().await;
        let profile = service.follow(&reader, writer.id).await.unwrap();
        assert_eq!(profile.id, writer.id);
        assert_eq!(profile.username, "writer");
        assert!(profile.is_subscribed);
    }

    #[tokio::test]
    async fn test_follow_toggle() {
        let (service, reader, writer) = setup().await;

        service.follow(&reader, writer.id).await.unwrap();
        assert!(matches!(
            service.follow(&reader, writer.id).await,
            Err(ToggleError::AlreadyPresent(_))
        ));

        service.unfollow(&reader, writer.id).await.unwrap();
        assert!(matches!(
            service.unfollow(&reader, writer.id).await,
            Err(ToggleError::NotPresent(_))
        ));
    }

    #[tokio::test]
    async fn test_self_follow_rejected_regardless_of_state() {
        let (service, reader, _writer) = setup().await;
        assert!(matches!(service.follow(&reader, reader.id).await, Err(ToggleError::SelfFollow)));
        assert!(matches!(service.unfollow(&reader, reader.id).await, Err(ToggleError::SelfFollow)));
    }

    #[tokio::test]
    async fn test_unknown_author() {
        let (service, reader, _writer) = setup().await;
        assert!(matches!(service.follow(&reader, 999).await, Err(ToggleError::NotFound(_))));
    }
}
