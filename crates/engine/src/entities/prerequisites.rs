//! Prerequisite resolver.

use overman_domain::{QuestId, UnlockStatus, UserId};

use super::error::QuestError;
use crate::infrastructure::ports::QuestTx;

#[derive(Debug, Clone, Copy, Default)]
pub struct PrerequisiteResolver;

impl PrerequisiteResolver {
    pub fn new() -> Self {
        Self
    }

    /// Whether `user_id` has completed enough prerequisites to unlock `quest_id`.
    pub async fn is_unlocked(
        &self,
        tx: &mut dyn QuestTx,
        user_id: UserId,
        quest_id: QuestId,
    ) -> Result<UnlockStatus, QuestError> {
        let prerequisites = tx.list_prerequisites(quest_id).await?;
        if prerequisites.is_empty() {
            return Ok(UnlockStatus::OPEN);
        }

        let completed = tx.completed_quest_ids(user_id).await?;
        let status = UnlockStatus::evaluate(&prerequisites, &completed);

        tracing::debug!(
            user_id = %user_id,
            quest_id = %quest_id,
            unlocked = status.unlocked,
            satisfied = status.satisfied,
            required = status.required,
            "Evaluated quest prerequisites"
        );
        Ok(status)
    }

    /// Like [`is_unlocked`](Self::is_unlocked), but a locked quest is an error.
    pub async fn ensure_unlocked(
        &self,
        tx: &mut dyn QuestTx,
        user_id: UserId,
        quest_id: QuestId,
    ) -> Result<(), QuestError> {
        let status = self.is_unlocked(tx, user_id, quest_id).await?;
        if !status.unlocked {
            return Err(QuestError::Locked {
                satisfied: status.satisfied,
                required: status.required,
            });
        }
        Ok(())
    }
}
