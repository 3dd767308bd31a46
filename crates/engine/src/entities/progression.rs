//! Quest lifecycle state machine for a single user.
//!
//! Every method runs inside the caller's transaction. Nothing here commits.

use std::sync::Arc;

use overman_domain::{
    CompletedTask, LedgerEntry, Quest, QuestId, Reward, TaskId, UserId, UserQuest,
};

use super::buffs::PassiveBuffs;
use super::error::QuestError;
use super::ledger::RewardLedger;
use super::prerequisites::PrerequisiteResolver;
use crate::infrastructure::ports::{ClockPort, QuestTx};

/// Reward paid to one user when a quest completes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserReward {
    pub user_id: UserId,
    pub reward: Reward,
    pub multiplier: f64,
}

#[derive(Clone)]
pub struct Progression {
    clock: Arc<dyn ClockPort>,
    prerequisites: PrerequisiteResolver,
    buffs: PassiveBuffs,
    ledger: RewardLedger,
}

impl Progression {
    pub fn new(
        clock: Arc<dyn ClockPort>,
        prerequisites: PrerequisiteResolver,
        buffs: PassiveBuffs,
        ledger: RewardLedger,
    ) -> Self {
        Self {
            clock,
            prerequisites,
            buffs,
            ledger,
        }
    }

    pub async fn load_quest(
        &self,
        tx: &mut dyn QuestTx,
        quest_id: QuestId,
    ) -> Result<Quest, QuestError> {
        tx.get_quest(quest_id)
            .await?
            .ok_or_else(|| QuestError::not_found("Quest", quest_id))
    }

    pub async fn load_user_quest(
        &self,
        tx: &mut dyn QuestTx,
        user_id: UserId,
        quest_id: QuestId,
    ) -> Result<UserQuest, QuestError> {
        tx.get_user_quest(user_id, quest_id)
            .await?
            .ok_or_else(|| QuestError::not_found("UserQuest", format!("{}/{}", user_id, quest_id)))
    }

    /// Buy a quest: existence, duplicate, unlock and balance checks in that order.
    pub async fn purchase(
        &self,
        tx: &mut dyn QuestTx,
        user_id: UserId,
        quest_id: QuestId,
    ) -> Result<UserQuest, QuestError> {
        let quest = self.load_quest(tx, quest_id).await?;
        if tx.get_wallet(user_id).await?.is_none() {
            return Err(QuestError::not_found("User", user_id));
        }
        if tx.get_user_quest(user_id, quest_id).await?.is_some() {
            return Err(QuestError::AlreadyExists(format!(
                "User {} already holds quest {}",
                user_id, quest_id
            )));
        }
        self.prerequisites
            .ensure_unlocked(tx, user_id, quest_id)
            .await?;

        let now = self.clock.now();
        self.ledger
            .apply(tx, &LedgerEntry::purchase(user_id, quest_id, quest.price(), now))
            .await?;

        let user_quest = UserQuest::purchased(user_id, quest_id, now);
        tx.insert_user_quest(&user_quest).await?;

        tracing::info!(user_id = %user_id, quest_id = %quest_id, price = quest.price(), "Quest purchased");
        Ok(user_quest)
    }

    pub async fn start(
        &self,
        tx: &mut dyn QuestTx,
        user_id: UserId,
        quest_id: QuestId,
    ) -> Result<UserQuest, QuestError> {
        let quest = self.load_quest(tx, quest_id).await?;
        let mut user_quest = self.load_user_quest(tx, user_id, quest_id).await?;
        user_quest.start(&quest, self.clock.now())?;
        tx.update_user_quest(&user_quest).await?;

        tracing::info!(
            user_id = %user_id,
            quest_id = %quest_id,
            expires_at = ?user_quest.expires_at(),
            "Quest started"
        );
        Ok(user_quest)
    }

    /// Mark one task done. Rewards stay unconfirmed until the quest completes.
    pub async fn complete_task(
        &self,
        tx: &mut dyn QuestTx,
        user_id: UserId,
        quest_id: QuestId,
        task_id: TaskId,
    ) -> Result<UserQuest, QuestError> {
        tx.lock_user_quests(quest_id, &[user_id]).await?;

        let quest = self.load_quest(tx, quest_id).await?;
        let mut user_quest = self.load_user_quest(tx, user_id, quest_id).await?;
        let task = tx.get_quest_task(quest_id, task_id).await?.ok_or_else(|| {
            QuestError::invalid_input(format!(
                "Task {} does not belong to quest {}",
                task_id, quest_id
            ))
        })?;
        if tx.is_task_completed(user_id, quest_id, task_id).await? {
            return Err(QuestError::invariant(format!(
                "Task {} already completed",
                task_id
            )));
        }

        user_quest.record_task(&quest)?;
        tx.update_user_quest(&user_quest).await?;
        tx.insert_completed_task(&CompletedTask::pending(user_id, &task, self.clock.now()))
            .await?;

        tracing::info!(
            user_id = %user_id,
            quest_id = %quest_id,
            task_id = %task_id,
            tasks_done = user_quest.tasks_done(),
            tasks_count = quest.tasks_count(),
            "Task completed"
        );
        Ok(user_quest)
    }

    /// Pay out a finished run and mark it completed.
    ///
    /// The caller must hold the lock on the user's row and have checked that
    /// the run is completable.
    pub async fn reward_user(
        &self,
        tx: &mut dyn QuestTx,
        quest: &Quest,
        mut user_quest: UserQuest,
    ) -> Result<UserReward, QuestError> {
        let user_id = user_quest.user_id();
        let multiplier = self
            .buffs
            .reward_multiplier(tx, user_id, quest.category())
            .await?;
        let reward = quest.reward().scaled(multiplier);
        let now = self.clock.now();

        user_quest.complete(quest, reward, now)?;
        tx.update_user_quest(&user_quest).await?;
        self.ledger
            .apply(tx, &LedgerEntry::reward(user_id, quest.id(), reward, now))
            .await?;
        tx.confirm_completed_tasks(user_id, quest.id()).await?;

        if let Some(effect) = quest.bonus_buff() {
            self.buffs
                .add_buff(tx, user_id, quest.id(), effect.clone())
                .await?;
        }

        tracing::info!(
            user_id = %user_id,
            quest_id = %quest.id(),
            xp = reward.xp,
            coins = reward.coins,
            multiplier,
            "Quest completed"
        );
        Ok(UserReward {
            user_id,
            reward,
            multiplier,
        })
    }

    /// Complete a quest that is not shared.
    pub async fn complete_quest(
        &self,
        tx: &mut dyn QuestTx,
        user_id: UserId,
        quest: &Quest,
    ) -> Result<UserReward, QuestError> {
        tx.lock_user_quests(quest.id(), &[user_id]).await?;
        let user_quest = self.load_user_quest(tx, user_id, quest.id()).await?;
        user_quest.ensure_completable(quest)?;
        self.reward_user(tx, quest, user_quest).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{MockQuestTx, RepoError};
    use chrono::Utc;
    use overman_domain::{Difficulty, QuestCategory, QuestDraft, UserQuestStatus, Wallet};

    fn progression() -> Progression {
        Progression::new(
            Arc::new(FixedClock(Utc::now())),
            PrerequisiteResolver::new(),
            PassiveBuffs::new(),
            RewardLedger::new(),
        )
    }

    fn quest() -> Quest {
        Quest::from_draft(
            QuestId::new(3),
            QuestDraft::new(
                "Budget week",
                QuestCategory::Money,
                Difficulty::new(2).expect("valid difficulty"),
            )
            .with_tasks_count(1)
            .with_reward(Reward::new(40, 20)),
        )
    }

    fn finished_run() -> UserQuest {
        UserQuest::purchased(UserId::new(1), QuestId::new(3), Utc::now())
            .with_status(UserQuestStatus::Started)
            .with_tasks_done(1)
    }

    #[tokio::test]
    async fn when_reward_write_fails_completion_is_aborted() {
        let mut tx = MockQuestTx::new();
        tx.expect_lock_user_quests().returning(|_, _| Ok(()));
        tx.expect_get_user_quest()
            .returning(|_, _| Ok(Some(finished_run())));
        tx.expect_list_buff_records().returning(|_| Ok(vec![]));
        tx.expect_update_user_quest().returning(|_| Ok(()));
        tx.expect_get_wallet().returning(|user| {
            Ok(Some(Wallet {
                user_id: user,
                coins: 0,
                xp: 0,
            }))
        });
        tx.expect_adjust_wallet()
            .returning(|_, _| Err(RepoError::database("adjust_wallet", "disk I/O error")));
        tx.expect_record_ledger_entry().never();
        tx.expect_confirm_completed_tasks().never();
        tx.expect_commit().never();

        let err = progression()
            .complete_quest(&mut tx, UserId::new(1), &quest())
            .await
            .expect_err("reward write failure");
        assert!(matches!(err, QuestError::Repo(_)));
    }

    #[tokio::test]
    async fn when_tasks_remain_returns_invariant_violation() {
        let mut tx = MockQuestTx::new();
        tx.expect_lock_user_quests().returning(|_, _| Ok(()));
        tx.expect_get_user_quest().returning(|_, _| {
            Ok(Some(
                UserQuest::purchased(UserId::new(1), QuestId::new(3), Utc::now())
                    .with_status(UserQuestStatus::Started),
            ))
        });
        tx.expect_update_user_quest().never();

        let err = progression()
            .complete_quest(&mut tx, UserId::new(1), &quest())
            .await
            .expect_err("unfinished");
        assert!(matches!(err, QuestError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn when_task_outside_quest_returns_invalid_input() {
        let mut tx = MockQuestTx::new();
        tx.expect_lock_user_quests().returning(|_, _| Ok(()));
        tx.expect_get_quest().returning(|_| Ok(Some(quest())));
        tx.expect_get_user_quest()
            .returning(|_, _| Ok(Some(finished_run())));
        tx.expect_get_quest_task().returning(|_, _| Ok(None));
        tx.expect_update_user_quest().never();

        let err = progression()
            .complete_task(&mut tx, UserId::new(1), QuestId::new(3), TaskId::new(99))
            .await
            .expect_err("foreign task");
        assert!(matches!(err, QuestError::InvalidInput(_)));
    }
}
