//! Passive buff accumulator.

use overman_domain::{combined_multiplier, BuffEffect, PassiveBuff, QuestCategory, QuestId, UserId};

use super::error::QuestError;
use crate::infrastructure::ports::QuestTx;

#[derive(Debug, Clone, Copy, Default)]
pub struct PassiveBuffs;

impl PassiveBuffs {
    pub fn new() -> Self {
        Self
    }

    /// Grant (or re-activate) the buff a quest gives a user.
    pub async fn add_buff(
        &self,
        tx: &mut dyn QuestTx,
        user_id: UserId,
        quest_id: QuestId,
        effect: BuffEffect,
    ) -> Result<PassiveBuff, QuestError> {
        effect.validate()?;
        let buff = PassiveBuff::active(user_id, quest_id, effect);
        tx.upsert_buff(&buff).await?;

        tracing::info!(
            user_id = %user_id,
            quest_id = %quest_id,
            buff_type = %buff.effect.buff_type(),
            "Passive buff granted"
        );
        Ok(buff)
    }

    /// Every decodable buff the user holds. Undecodable rows are skipped.
    pub async fn list(
        &self,
        tx: &mut dyn QuestTx,
        user_id: UserId,
    ) -> Result<Vec<PassiveBuff>, QuestError> {
        let records = tx.list_buff_records(user_id).await?;
        let buffs = records
            .iter()
            .filter_map(|record| match record.decode() {
                Ok(buff) => Some(buff),
                Err(e) => {
                    tracing::warn!(
                        user_id = %record.user_id,
                        quest_id = %record.quest_id,
                        buff_type = %record.buff_type,
                        error = %e,
                        "Skipping undecodable passive buff"
                    );
                    None
                }
            })
            .collect();
        Ok(buffs)
    }

    /// Product of the user's active reward multipliers for `category`.
    pub async fn reward_multiplier(
        &self,
        tx: &mut dyn QuestTx,
        user_id: UserId,
        category: &QuestCategory,
    ) -> Result<f64, QuestError> {
        let buffs = self.list(tx, user_id).await?;
        Ok(combined_multiplier(&buffs, category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MockQuestTx;
    use overman_domain::StoredBuff;

    fn stored(quest: i64, buff_type: &str, data: Option<&str>) -> StoredBuff {
        StoredBuff {
            user_id: UserId::new(1),
            quest_id: QuestId::new(quest),
            buff_type: buff_type.to_string(),
            buff_data: data.map(str::to_string),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn corrupt_rows_are_skipped_not_fatal() {
        let mut tx = MockQuestTx::new();
        tx.expect_list_buff_records().returning(|_| {
            Ok(vec![
                stored(
                    1,
                    "reward_multiplier",
                    Some(r#"{"category":"health","multiplier":1.1}"#),
                ),
                stored(2, "reward_multiplier", Some("{broken")),
                stored(3, "teleport", Some(r#"{"quest_id":4}"#)),
                stored(4, "reward_multiplier", None),
                stored(
                    5,
                    "reward_multiplier",
                    Some(r#"{"category":"health","multiplier":1.2}"#),
                ),
            ])
        });

        let multiplier = PassiveBuffs::new()
            .reward_multiplier(&mut tx, UserId::new(1), &QuestCategory::Health)
            .await
            .expect("multiplier");
        assert!((multiplier - 1.32).abs() < 1e-9);
    }

    #[tokio::test]
    async fn invalid_effect_is_rejected_before_writing() {
        let mut tx = MockQuestTx::new();
        tx.expect_upsert_buff().never();

        let err = PassiveBuffs::new()
            .add_buff(
                &mut tx,
                UserId::new(1),
                QuestId::new(1),
                BuffEffect::reward_multiplier(QuestCategory::Money, 0.0),
            )
            .await
            .expect_err("zero multiplier");
        assert!(matches!(err, QuestError::InvalidInput(_)));
    }
}
