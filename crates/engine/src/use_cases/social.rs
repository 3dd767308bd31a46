//! Friendship registry.

use std::sync::Arc;

use overman_domain::{Friendship, UserId};

use crate::entities::QuestError;
use crate::infrastructure::ports::{ClockPort, QuestStore};

pub struct Social {
    store: Arc<dyn QuestStore>,
    clock: Arc<dyn ClockPort>,
}

impl Social {
    pub fn new(store: Arc<dyn QuestStore>, clock: Arc<dyn ClockPort>) -> Self {
        Self { store, clock }
    }

    /// Record an accepted friendship between two existing users.
    pub async fn add_friend(
        &self,
        user_id: UserId,
        friend_id: UserId,
    ) -> Result<Friendship, QuestError> {
        let friendship = Friendship::accepted(user_id, friend_id, self.clock.now())?;

        let mut tx = self.store.begin().await?;
        for id in [user_id, friend_id] {
            if tx.get_wallet(id).await?.is_none() {
                return Err(QuestError::not_found("User", id));
            }
        }
        if tx.get_friendship(user_id, friend_id).await?.is_some() {
            return Err(QuestError::AlreadyExists(format!(
                "Users {} and {} are already friends",
                user_id, friend_id
            )));
        }
        tx.insert_friendship(&friendship).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user_id, friend_id = %friend_id, "Friendship added");
        Ok(friendship)
    }

    pub async fn list_friends(&self, user_id: UserId) -> Result<Vec<Friendship>, QuestError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_friendships(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::TestEngine;

    #[tokio::test]
    async fn friendship_is_visible_from_both_sides() {
        let engine = TestEngine::new().await;
        let ana = engine.seed_user("ana", 0).await;
        let bo = engine.seed_user("bo", 0).await;

        engine.app.social.add_friend(ana, bo).await.expect("add");

        let err = engine
            .app
            .social
            .add_friend(bo, ana)
            .await
            .expect_err("reverse duplicate");
        assert!(matches!(err, QuestError::AlreadyExists(_)));

        let friends = engine.app.social.list_friends(bo).await.expect("list");
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].other(bo), ana);
    }

    #[tokio::test]
    async fn when_friend_missing_returns_not_found() {
        let engine = TestEngine::new().await;
        let ana = engine.seed_user("ana", 0).await;

        let err = engine
            .app
            .social
            .add_friend(ana, UserId::new(404))
            .await
            .expect_err("missing");
        assert!(matches!(err, QuestError::NotFound { .. }));

        let err = engine
            .app
            .social
            .add_friend(ana, ana)
            .await
            .expect_err("self");
        assert!(matches!(err, QuestError::InvalidInput(_)));
    }
}
