//! Passive buffs held by users.

use std::sync::Arc;

use overman_domain::{BuffEffect, PassiveBuff, QuestCategory, QuestId, UserId};

use crate::entities::{PassiveBuffs, QuestError};
use crate::infrastructure::ports::QuestStore;

pub struct Buffs {
    store: Arc<dyn QuestStore>,
    buffs: PassiveBuffs,
}

impl Buffs {
    pub fn new(store: Arc<dyn QuestStore>, buffs: PassiveBuffs) -> Self {
        Self { store, buffs }
    }

    /// Grant the buff `quest_id` gives `user_id`, replacing any earlier one.
    pub async fn grant(
        &self,
        user_id: UserId,
        quest_id: QuestId,
        effect: BuffEffect,
    ) -> Result<PassiveBuff, QuestError> {
        let mut tx = self.store.begin().await?;
        if tx.get_wallet(user_id).await?.is_none() {
            return Err(QuestError::not_found("User", user_id));
        }
        if tx.get_quest(quest_id).await?.is_none() {
            return Err(QuestError::not_found("Quest", quest_id));
        }
        let buff = self
            .buffs
            .add_buff(tx.as_mut(), user_id, quest_id, effect)
            .await?;
        tx.commit().await?;
        Ok(buff)
    }

    pub async fn list(&self, user_id: UserId) -> Result<Vec<PassiveBuff>, QuestError> {
        let mut tx = self.store.begin().await?;
        self.buffs.list(tx.as_mut(), user_id).await
    }

    pub async fn reward_multiplier(
        &self,
        user_id: UserId,
        category: &QuestCategory,
    ) -> Result<f64, QuestError> {
        let mut tx = self.store.begin().await?;
        self.buffs
            .reward_multiplier(tx.as_mut(), user_id, category)
            .await
    }
}
