//! Quest lifecycle use cases.
//!
//! Each operation is one transaction: purchase, start, task completion,
//! quest completion (solo or shared) and continuing a quest chain.

use std::sync::Arc;

use overman_domain::{Quest, QuestId, SharedQuestId, TaskId, UserId, UserQuest, UserQuestStatus};

use super::post_commit::PostCommit;
use crate::entities::{Progression, QuestError, SharedCompletion, UserReward};
use crate::infrastructure::ports::{ClockPort, QuestSetChange, QuestStore, QuestTx};

/// Result of a successful completion.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestCompletion {
    pub quest_id: QuestId,
    /// Set when the quest was completed jointly.
    pub shared_quest_id: Option<SharedQuestId>,
    /// One entry per rewarded user.
    pub rewards: Vec<UserReward>,
}

/// A user's run together with its quest and the advisory expiry flag.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestStatusView {
    pub quest: Quest,
    pub user_quest: UserQuest,
    pub expired: bool,
}

/// Snapshot of the quests a user holds, for the recommendation signal.
pub(crate) async fn quest_set(
    tx: &mut dyn QuestTx,
    user_id: UserId,
) -> Result<QuestSetChange, QuestError> {
    let quest_ids = tx
        .list_user_quests(user_id, None)
        .await?
        .iter()
        .map(UserQuest::quest_id)
        .collect();
    Ok(QuestSetChange { user_id, quest_ids })
}

pub struct QuestLifecycle {
    store: Arc<dyn QuestStore>,
    progression: Progression,
    shared: SharedCompletion,
    post_commit: PostCommit,
    clock: Arc<dyn ClockPort>,
}

impl QuestLifecycle {
    pub fn new(
        store: Arc<dyn QuestStore>,
        progression: Progression,
        shared: SharedCompletion,
        post_commit: PostCommit,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            store,
            progression,
            shared,
            post_commit,
            clock,
        }
    }

    pub async fn purchase(
        &self,
        user_id: UserId,
        quest_id: QuestId,
    ) -> Result<UserQuest, QuestError> {
        let mut tx = self.store.begin().await?;
        let user_quest = self
            .progression
            .purchase(tx.as_mut(), user_id, quest_id)
            .await?;
        let change = quest_set(tx.as_mut(), user_id).await?;
        tx.commit().await?;

        self.post_commit.quest_set_changed(vec![change]);
        Ok(user_quest)
    }

    pub async fn start(&self, user_id: UserId, quest_id: QuestId) -> Result<UserQuest, QuestError> {
        let mut tx = self.store.begin().await?;
        let user_quest = self
            .progression
            .start(tx.as_mut(), user_id, quest_id)
            .await?;
        tx.commit().await?;
        Ok(user_quest)
    }

    pub async fn complete_task(
        &self,
        user_id: UserId,
        quest_id: QuestId,
        task_id: TaskId,
    ) -> Result<UserQuest, QuestError> {
        let mut tx = self.store.begin().await?;
        let user_quest = self
            .progression
            .complete_task(tx.as_mut(), user_id, quest_id, task_id)
            .await?;
        tx.commit().await?;
        Ok(user_quest)
    }

    /// Complete a finished run. Shared quests pay out only once both
    /// participants are done; until then the caller gets `PartnerIncomplete`.
    pub async fn complete_quest(
        &self,
        user_id: UserId,
        quest_id: QuestId,
    ) -> Result<QuestCompletion, QuestError> {
        let mut tx = self.store.begin().await?;
        tx.lock_user_quests(quest_id, &[user_id]).await?;
        let quest = self.progression.load_quest(tx.as_mut(), quest_id).await?;

        let completion = match tx.get_active_shared_quest(quest_id, user_id).await? {
            Some(shared) => QuestCompletion {
                quest_id,
                shared_quest_id: Some(shared.id),
                rewards: self
                    .shared
                    .complete(tx.as_mut(), &shared, user_id, &quest)
                    .await?,
            },
            None => QuestCompletion {
                quest_id,
                shared_quest_id: None,
                rewards: vec![
                    self.progression
                        .complete_quest(tx.as_mut(), user_id, &quest)
                        .await?,
                ],
            },
        };

        tx.commit().await?;
        Ok(completion)
    }

    /// Buy and start the next quest of a completed quest's chain.
    pub async fn continue_quest(
        &self,
        user_id: UserId,
        completed_quest_id: QuestId,
    ) -> Result<UserQuest, QuestError> {
        let mut tx = self.store.begin().await?;
        let completed = self
            .progression
            .load_user_quest(tx.as_mut(), user_id, completed_quest_id)
            .await?;
        if completed.status() != UserQuestStatus::Completed {
            return Err(QuestError::invariant(format!(
                "Quest {} must be completed before continuing",
                completed_quest_id
            )));
        }
        let quest = self
            .progression
            .load_quest(tx.as_mut(), completed_quest_id)
            .await?;
        let next_quest_id = quest.next_quest_id().ok_or_else(|| {
            QuestError::invariant(format!("Quest {} has no next level", completed_quest_id))
        })?;

        self.progression
            .purchase(tx.as_mut(), user_id, next_quest_id)
            .await?;
        let user_quest = self
            .progression
            .start(tx.as_mut(), user_id, next_quest_id)
            .await?;
        let change = quest_set(tx.as_mut(), user_id).await?;
        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            from_quest_id = %completed_quest_id,
            quest_id = %next_quest_id,
            "Continued to next quest level"
        );
        self.post_commit.quest_set_changed(vec![change]);
        Ok(user_quest)
    }

    pub async fn status(
        &self,
        user_id: UserId,
        quest_id: QuestId,
    ) -> Result<QuestStatusView, QuestError> {
        let mut tx = self.store.begin().await?;
        let quest = self.progression.load_quest(tx.as_mut(), quest_id).await?;
        let user_quest = self
            .progression
            .load_user_quest(tx.as_mut(), user_id, quest_id)
            .await?;
        let expired = user_quest.is_expired(self.clock.now());
        Ok(QuestStatusView {
            quest,
            user_quest,
            expired,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{MockQuestStore, MockQuestTx, RepoError};
    use crate::test_fixtures::TestEngine;
    use chrono::Duration;
    use overman_domain::{QuestCategory, Reward};

    #[tokio::test]
    async fn purchase_debits_exact_balance_and_rejects_repurchase() {
        let engine = TestEngine::new().await;
        let user = engine.seed_user("ada", 100).await;
        let (quest, _) = engine
            .seed_quest("Meditate", QuestCategory::Willpower, 2, 100, Reward::new(50, 30))
            .await;

        let run = engine
            .app
            .quests
            .purchase(user, quest)
            .await
            .expect("purchase");
        assert_eq!(run.status(), UserQuestStatus::Purchased);
        assert_eq!(engine.wallet(user).await.coins, 0);

        let err = engine
            .app
            .quests
            .purchase(user, quest)
            .await
            .expect_err("repurchase");
        assert!(matches!(err, QuestError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn purchase_without_funds_leaves_no_trace() {
        let engine = TestEngine::new().await;
        let user = engine.seed_user("ada", 99).await;
        let (quest, _) = engine
            .seed_quest("Meditate", QuestCategory::Willpower, 1, 100, Reward::ZERO)
            .await;

        let err = engine
            .app
            .quests
            .purchase(user, quest)
            .await
            .expect_err("short");
        assert!(matches!(
            err,
            QuestError::InsufficientFunds {
                needed: 100,
                available: 99
            }
        ));
        assert_eq!(engine.wallet(user).await.coins, 99);
        assert!(engine.app.quests.status(user, quest).await.is_err());
    }

    #[tokio::test]
    async fn purchase_notifies_recommendations_after_commit() {
        let mut engine = TestEngine::new().await;
        let user = engine.seed_user("ada", 10).await;
        let (quest, _) = engine
            .seed_quest("Walk", QuestCategory::Health, 1, 0, Reward::ZERO)
            .await;

        engine
            .app
            .quests
            .purchase(user, quest)
            .await
            .expect("purchase");

        let changes = engine.next_notification().await;
        assert_eq!(
            changes,
            vec![QuestSetChange {
                user_id: user,
                quest_ids: vec![quest],
            }]
        );
    }

    #[tokio::test]
    async fn locked_quest_cannot_be_purchased() {
        let engine = TestEngine::new().await;
        let user = engine.seed_user("ada", 500).await;
        let (basic, _) = engine
            .seed_quest("Basics", QuestCategory::Intelligence, 1, 0, Reward::ZERO)
            .await;
        let (advanced, _) = engine
            .seed_quest("Advanced", QuestCategory::Intelligence, 1, 0, Reward::ZERO)
            .await;
        engine
            .app
            .catalog
            .add_prerequisite(advanced, basic, 1)
            .await
            .expect("prerequisite");

        let err = engine
            .app
            .quests
            .purchase(user, advanced)
            .await
            .expect_err("locked");
        assert!(matches!(
            err,
            QuestError::Locked {
                satisfied: 0,
                required: 1
            }
        ));
    }

    #[tokio::test]
    async fn full_lifecycle_applies_buff_multiplier_to_reward() {
        let engine = TestEngine::new().await;
        let user = engine.seed_user("ada", 0).await;
        let (quest, tasks) = engine
            .seed_quest("Gym", QuestCategory::Health, 2, 0, Reward::new(25, 15))
            .await;
        engine
            .app
            .buffs
            .grant(
                user,
                quest,
                overman_domain::BuffEffect::reward_multiplier(QuestCategory::Health, 1.1),
            )
            .await
            .expect("buff");

        let quests = &engine.app.quests;
        quests.purchase(user, quest).await.expect("purchase");
        quests.start(user, quest).await.expect("start");

        let err = quests.complete_quest(user, quest).await.expect_err("early");
        assert!(matches!(err, QuestError::InvariantViolation(_)));

        for task in &tasks {
            quests.complete_task(user, quest, *task).await.expect("task");
        }
        let err = quests
            .complete_task(user, quest, tasks[0])
            .await
            .expect_err("task twice");
        assert!(matches!(err, QuestError::InvariantViolation(_)));

        let completion = quests.complete_quest(user, quest).await.expect("complete");
        assert_eq!(completion.rewards.len(), 1);
        assert_eq!(completion.rewards[0].reward, Reward::new(28, 17));

        let wallet = engine.wallet(user).await;
        assert_eq!((wallet.xp, wallet.coins), (28, 17));

        let view = quests.status(user, quest).await.expect("status");
        assert_eq!(view.user_quest.status(), UserQuestStatus::Completed);

        let err = quests
            .complete_quest(user, quest)
            .await
            .expect_err("already completed");
        assert!(matches!(err, QuestError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn start_requires_purchase() {
        let engine = TestEngine::new().await;
        let user = engine.seed_user("ada", 0).await;
        let (quest, _) = engine
            .seed_quest("Journal", QuestCategory::Charisma, 1, 0, Reward::ZERO)
            .await;

        let err = engine
            .app
            .quests
            .start(user, quest)
            .await
            .expect_err("not purchased");
        assert!(matches!(err, QuestError::NotFound { .. }));

        engine.app.quests.purchase(user, quest).await.expect("buy");
        engine.app.quests.start(user, quest).await.expect("start");
        let err = engine
            .app
            .quests
            .start(user, quest)
            .await
            .expect_err("restart");
        assert!(matches!(err, QuestError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn completing_task_twice_is_invariant_violation() {
        let engine = TestEngine::new().await;
        let user = engine.seed_user("ada", 0).await;
        let (quest, tasks) = engine
            .seed_quest("Read", QuestCategory::Intelligence, 2, 0, Reward::ZERO)
            .await;
        let quests = &engine.app.quests;
        quests.purchase(user, quest).await.expect("buy");
        quests.start(user, quest).await.expect("start");
        quests
            .complete_task(user, quest, tasks[0])
            .await
            .expect("first");

        let err = quests
            .complete_task(user, quest, tasks[0])
            .await
            .expect_err("second");
        assert!(matches!(err, QuestError::InvariantViolation(_)));

        let status = quests.status(user, quest).await.expect("status");
        assert_eq!(status.user_quest.tasks_done(), 1);
    }

    #[tokio::test]
    async fn expiry_is_reported_but_completion_still_allowed() {
        let engine = TestEngine::new().await;
        let user = engine.seed_user("ada", 0).await;
        let (quest, tasks) = engine
            .seed_quest("Sprint", QuestCategory::Health, 1, 0, Reward::new(10, 10))
            .await;
        let quests = &engine.app.quests;
        quests.purchase(user, quest).await.expect("buy");
        quests.start(user, quest).await.expect("start");

        engine.clock.advance(Duration::hours(25));
        let view = quests.status(user, quest).await.expect("status");
        assert!(view.expired);

        quests
            .complete_task(user, quest, tasks[0])
            .await
            .expect("late task");
        quests
            .complete_quest(user, quest)
            .await
            .expect("late completion");
    }

    #[tokio::test]
    async fn continue_quest_buys_and_starts_next_level() {
        let engine = TestEngine::new().await;
        let user = engine.seed_user("ada", 100).await;
        let (level_two, _) = engine
            .seed_quest("Reading II", QuestCategory::Intelligence, 1, 40, Reward::ZERO)
            .await;
        let (level_one, tasks) = engine
            .seed_chained_quest("Reading I", level_two)
            .await;

        let quests = &engine.app.quests;
        let err = quests
            .continue_quest(user, level_one)
            .await
            .expect_err("not completed yet");
        assert!(matches!(err, QuestError::NotFound { .. }));

        quests.purchase(user, level_one).await.expect("buy");
        quests.start(user, level_one).await.expect("start");
        quests
            .complete_task(user, level_one, tasks[0])
            .await
            .expect("task");
        quests.complete_quest(user, level_one).await.expect("done");

        let next = quests
            .continue_quest(user, level_one)
            .await
            .expect("continue");
        assert_eq!(next.quest_id(), level_two);
        assert_eq!(next.status(), UserQuestStatus::Started);
        assert_eq!(engine.wallet(user).await.coins, 60);
    }

    #[tokio::test]
    async fn when_commit_fails_no_notification_is_sent() {
        let mut store = MockQuestStore::new();
        store.expect_begin().returning(|| {
            let mut tx = MockQuestTx::new();
            tx.expect_get_quest().returning(|id| {
                Ok(Some(crate::test_fixtures::sample_quest(id, 0)))
            });
            tx.expect_get_wallet().returning(|user| {
                Ok(Some(overman_domain::Wallet {
                    user_id: user,
                    coins: 10,
                    xp: 0,
                }))
            });
            tx.expect_get_user_quest().returning(|_, _| Ok(None));
            tx.expect_list_prerequisites().returning(|_| Ok(vec![]));
            tx.expect_adjust_wallet().returning(|_, _| Ok(()));
            tx.expect_record_ledger_entry().returning(|_| Ok(()));
            tx.expect_insert_user_quest().returning(|_| Ok(()));
            tx.expect_list_user_quests().returning(|_, _| Ok(vec![]));
            tx.expect_commit()
                .times(1)
                .returning(|| Err(RepoError::database("commit", "database is locked")));
            Ok(Box::new(tx) as Box<dyn QuestTx>)
        });

        let mut notifier = crate::infrastructure::ports::MockQuestSetNotifier::new();
        notifier.expect_quest_set_changed().never();

        let lifecycle = crate::test_fixtures::lifecycle_with(Arc::new(store), Arc::new(notifier));
        let err = lifecycle
            .purchase(UserId::new(1), QuestId::new(1))
            .await
            .expect_err("commit failure");
        assert!(matches!(err, QuestError::Repo(_)));
    }
}
