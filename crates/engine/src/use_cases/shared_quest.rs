//! Shared quests between two friends.

use std::sync::Arc;

use overman_domain::{QuestId, SharedQuest, UserId};

use super::post_commit::PostCommit;
use super::quest::quest_set;
use crate::entities::{Progression, QuestError};
use crate::infrastructure::ports::QuestStore;

pub struct SharedQuests {
    store: Arc<dyn QuestStore>,
    progression: Progression,
    post_commit: PostCommit,
}

impl SharedQuests {
    pub fn new(store: Arc<dyn QuestStore>, progression: Progression, post_commit: PostCommit) -> Self {
        Self {
            store,
            progression,
            post_commit,
        }
    }

    /// Start `quest_id` jointly for two accepted friends.
    ///
    /// Both users buy and start the quest in the same transaction, so either
    /// both runs exist afterwards or neither does.
    pub async fn create(
        &self,
        user_id: UserId,
        friend_id: UserId,
        quest_id: QuestId,
    ) -> Result<SharedQuest, QuestError> {
        if user_id == friend_id {
            return Err(QuestError::invalid_input(
                "A shared quest needs two different users",
            ));
        }

        let mut tx = self.store.begin().await?;
        let friendship = tx.get_friendship(user_id, friend_id).await?;
        if !friendship.is_some_and(|f| f.is_accepted()) {
            return Err(QuestError::invalid_input(format!(
                "Users {} and {} are not friends",
                user_id, friend_id
            )));
        }
        self.progression.load_quest(tx.as_mut(), quest_id).await?;

        let id = tx.insert_shared_quest(quest_id, user_id, friend_id).await?;
        let mut changes = Vec::with_capacity(2);
        for participant in [user_id, friend_id] {
            self.progression
                .purchase(tx.as_mut(), participant, quest_id)
                .await?;
            self.progression
                .start(tx.as_mut(), participant, quest_id)
                .await?;
            changes.push(quest_set(tx.as_mut(), participant).await?);
        }
        tx.commit().await?;

        tracing::info!(
            shared_quest_id = %id,
            quest_id = %quest_id,
            user1_id = %user_id,
            user2_id = %friend_id,
            "Shared quest created"
        );
        self.post_commit.quest_set_changed(changes);
        Ok(SharedQuest::active(id, quest_id, user_id, friend_id))
    }

    pub async fn list(&self, user_id: UserId) -> Result<Vec<SharedQuest>, QuestError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_shared_quests(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::TestEngine;
    use overman_domain::{QuestCategory, Reward, SharedQuestStatus, UserQuestStatus};

    #[tokio::test]
    async fn second_finisher_rewards_both_participants() {
        let engine = TestEngine::new().await;
        let ana = engine.seed_user("ana", 100).await;
        let bo = engine.seed_user("bo", 100).await;
        engine.befriend(ana, bo).await;
        let (quest, tasks) = engine
            .seed_quest("Run together", QuestCategory::Health, 3, 20, Reward::new(60, 30))
            .await;

        let shared = engine
            .app
            .shared_quests
            .create(ana, bo, quest)
            .await
            .expect("create");
        assert_eq!(shared.status, SharedQuestStatus::Active);
        assert_eq!(engine.wallet(ana).await.coins, 80);
        assert_eq!(engine.wallet(bo).await.coins, 80);

        let quests = &engine.app.quests;
        for task in &tasks {
            quests.complete_task(ana, quest, *task).await.expect("ana task");
        }
        let err = quests
            .complete_quest(ana, quest)
            .await
            .expect_err("bo not done");
        assert!(matches!(err, QuestError::PartnerIncomplete));
        assert_eq!(
            quests.status(ana, quest).await.expect("status").user_quest.status(),
            UserQuestStatus::Started
        );

        for task in &tasks {
            quests.complete_task(bo, quest, *task).await.expect("bo task");
        }
        let completion = quests.complete_quest(bo, quest).await.expect("complete");
        assert_eq!(completion.shared_quest_id, Some(shared.id));
        assert_eq!(completion.rewards.len(), 2);

        for user in [ana, bo] {
            let view = quests.status(user, quest).await.expect("status");
            assert_eq!(view.user_quest.status(), UserQuestStatus::Completed);
            let wallet = engine.wallet(user).await;
            assert_eq!((wallet.xp, wallet.coins), (60, 110));
        }

        let listed = engine.app.shared_quests.list(ana).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, SharedQuestStatus::Completed);
    }

    #[tokio::test]
    async fn strangers_cannot_share_a_quest() {
        let engine = TestEngine::new().await;
        let ana = engine.seed_user("ana", 100).await;
        let bo = engine.seed_user("bo", 100).await;
        let (quest, _) = engine
            .seed_quest("Chess club", QuestCategory::Intelligence, 1, 0, Reward::ZERO)
            .await;

        let err = engine
            .app
            .shared_quests
            .create(ana, bo, quest)
            .await
            .expect_err("not friends");
        assert!(matches!(err, QuestError::InvalidInput(_)));

        let err = engine
            .app
            .shared_quests
            .create(ana, ana, quest)
            .await
            .expect_err("self");
        assert!(matches!(err, QuestError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn one_poor_participant_aborts_the_whole_share() {
        let engine = TestEngine::new().await;
        let ana = engine.seed_user("ana", 100).await;
        let bo = engine.seed_user("bo", 10).await;
        engine.befriend(bo, ana).await;
        let (quest, _) = engine
            .seed_quest("Climb", QuestCategory::Health, 1, 50, Reward::ZERO)
            .await;

        let err = engine
            .app
            .shared_quests
            .create(ana, bo, quest)
            .await
            .expect_err("bo is short");
        assert!(matches!(err, QuestError::InsufficientFunds { .. }));
        assert_eq!(engine.wallet(ana).await.coins, 100);
        assert!(engine
            .app
            .shared_quests
            .list(ana)
            .await
            .expect("list")
            .is_empty());
    }
}
