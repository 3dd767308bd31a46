//! Two-party completion of a shared quest.

use overman_domain::{Quest, SharedQuest, SharedQuestStatus, UserId};

use super::error::QuestError;
use super::progression::{Progression, UserReward};
use crate::infrastructure::ports::QuestTx;

#[derive(Clone)]
pub struct SharedCompletion {
    progression: Progression,
}

impl SharedCompletion {
    pub fn new(progression: Progression) -> Self {
        Self { progression }
    }

    /// Complete `shared` on behalf of `user_id`.
    ///
    /// Both participants' rows are locked before the partner's progress is
    /// read. If the partner is not finished nothing is written and
    /// `PartnerIncomplete` is returned. Otherwise both users are rewarded
    /// and the shared quest is closed, all in `tx`.
    pub async fn complete(
        &self,
        tx: &mut dyn QuestTx,
        shared: &SharedQuest,
        user_id: UserId,
        quest: &Quest,
    ) -> Result<Vec<UserReward>, QuestError> {
        let partner_id = shared.partner_of(user_id).ok_or_else(|| {
            QuestError::invalid_input(format!(
                "User {} is not part of shared quest {}",
                user_id, shared.id
            ))
        })?;

        let mut participants = [user_id, partner_id];
        participants.sort();
        tx.lock_user_quests(quest.id(), &participants).await?;

        let own = self
            .progression
            .load_user_quest(tx, user_id, quest.id())
            .await?;
        own.ensure_completable(quest)?;

        let partner = self
            .progression
            .load_user_quest(tx, partner_id, quest.id())
            .await?;
        if !partner.has_finished(quest) {
            tracing::info!(
                user_id = %user_id,
                partner_id = %partner_id,
                shared_quest_id = %shared.id,
                partner_tasks_done = partner.tasks_done(),
                "Shared quest waiting on partner"
            );
            return Err(QuestError::PartnerIncomplete);
        }

        let mut rewards = Vec::with_capacity(2);
        rewards.push(self.progression.reward_user(tx, quest, own).await?);
        rewards.push(self.progression.reward_user(tx, quest, partner).await?);

        let mut closed = shared.clone();
        closed.complete()?;
        tx.update_shared_quest_status(closed.id, SharedQuestStatus::Completed)
            .await?;

        tracing::info!(
            shared_quest_id = %shared.id,
            quest_id = %quest.id(),
            "Shared quest completed by both participants"
        );
        Ok(rewards)
    }
}
