//! Wallet balances and the audit trail of every change to them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Reward;
use crate::{QuestId, UserId};

/// The part of a user record the ledger touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: UserId,
    pub coins: i64,
    pub xp: i64,
}

impl Wallet {
    pub fn can_afford(&self, coins: i64) -> bool {
        self.coins >= coins
    }

    /// Wallet after applying `delta`, or an error if coins would go negative.
    pub fn apply(&self, delta: Reward) -> Result<Wallet, DomainError> {
        let coins = self.coins + delta.coins;
        if coins < 0 {
            return Err(DomainError::constraint(format!(
                "User {} has {} coins, {} needed",
                self.user_id, self.coins, -delta.coins
            )));
        }
        Ok(Wallet {
            user_id: self.user_id,
            coins,
            xp: self.xp + delta.xp,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    QuestPurchase,
    QuestReward,
    HabitFreeze,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuestPurchase => "quest_purchase",
            Self::QuestReward => "quest_reward",
            Self::HabitFreeze => "habit_freeze",
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quest_purchase" => Ok(Self::QuestPurchase),
            "quest_reward" => Ok(Self::QuestReward),
            "habit_freeze" => Ok(Self::HabitFreeze),
            other => Err(DomainError::parse(format!("Unknown ledger kind: {}", other))),
        }
    }
}

/// One wallet mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub user_id: UserId,
    pub delta: Reward,
    pub kind: LedgerKind,
    pub quest_id: Option<QuestId>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn purchase(user_id: UserId, quest_id: QuestId, price: i64, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            delta: Reward::new(0, -price),
            kind: LedgerKind::QuestPurchase,
            quest_id: Some(quest_id),
            description: format!("Purchase of quest {}", quest_id),
            created_at: now,
        }
    }

    pub fn reward(user_id: UserId, quest_id: QuestId, reward: Reward, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            delta: reward,
            kind: LedgerKind::QuestReward,
            quest_id: Some(quest_id),
            description: format!("Reward for quest {}", quest_id),
            created_at: now,
        }
    }

    pub fn freeze(
        user_id: UserId,
        quest_id: QuestId,
        cost: i64,
        date: chrono::NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            delta: Reward::new(0, -cost),
            kind: LedgerKind::HabitFreeze,
            quest_id: Some(quest_id),
            description: format!("Habit freeze for {}", date),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(coins: i64) -> Wallet {
        Wallet {
            user_id: UserId::new(1),
            coins,
            xp: 10,
        }
    }

    #[test]
    fn spending_exact_balance_leaves_zero() {
        let after = wallet(100).apply(Reward::new(0, -100)).expect("affordable");
        assert_eq!(after.coins, 0);
        assert_eq!(after.xp, 10);
    }

    #[test]
    fn overspending_is_rejected() {
        assert!(wallet(99).apply(Reward::new(0, -100)).is_err());
        assert!(!wallet(99).can_afford(100));
    }

    #[test]
    fn reward_adds_both_currencies() {
        let after = wallet(5).apply(Reward::new(25, 15)).expect("credit");
        assert_eq!((after.xp, after.coins), (35, 20));
    }
}
