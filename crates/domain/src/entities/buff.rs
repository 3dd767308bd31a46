//! Passive buffs granted by completed quests.
//!
//! A buff is stored as a type discriminator plus a JSON payload. In the
//! domain it is a closed set of effects, each with its own typed fields.
//! Stored rows that cannot be decoded are surfaced as errors so callers can
//! skip them without aborting the surrounding computation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::QuestCategory;
use crate::{QuestId, UserId};

/// Discriminator stored alongside the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffType {
    RewardMultiplier,
    StatBoost,
    UnlockQuest,
}

impl BuffType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RewardMultiplier => "reward_multiplier",
            Self::StatBoost => "stat_boost",
            Self::UnlockQuest => "unlock_quest",
        }
    }
}

impl fmt::Display for BuffType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuffType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reward_multiplier" => Ok(Self::RewardMultiplier),
            "stat_boost" => Ok(Self::StatBoost),
            "unlock_quest" => Ok(Self::UnlockQuest),
            other => Err(DomainError::parse(format!("Unknown buff type: {}", other))),
        }
    }
}

/// What a buff does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuffEffect {
    /// Multiplies quest rewards of one category (1.1 = +10%).
    RewardMultiplier {
        category: QuestCategory,
        multiplier: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// Raises a profile stat. Surfaced for display only.
    StatBoost {
        stat_name: String,
        boost_amount: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// Opens up another quest. Surfaced for display only.
    UnlockQuest {
        quest_id: QuestId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl BuffEffect {
    pub fn reward_multiplier(category: QuestCategory, multiplier: f64) -> Self {
        Self::RewardMultiplier {
            category,
            multiplier,
            description: None,
        }
    }

    pub fn buff_type(&self) -> BuffType {
        match self {
            Self::RewardMultiplier { .. } => BuffType::RewardMultiplier,
            Self::StatBoost { .. } => BuffType::StatBoost,
            Self::UnlockQuest { .. } => BuffType::UnlockQuest,
        }
    }

    /// Multiplier contributed to rewards of `category`, if any.
    pub fn multiplier_for(&self, category: &QuestCategory) -> Option<f64> {
        match self {
            Self::RewardMultiplier {
                category: buff_category,
                multiplier,
                ..
            } if buff_category == category => Some(*multiplier),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Self::RewardMultiplier { multiplier, .. }
                if !multiplier.is_finite() || *multiplier <= 0.0 =>
            {
                Err(DomainError::validation(format!(
                    "Reward multiplier must be a positive number, got {}",
                    multiplier
                )))
            }
            Self::StatBoost { stat_name, .. } if stat_name.trim().is_empty() => {
                Err(DomainError::validation("Stat boost needs a stat name"))
            }
            _ => Ok(()),
        }
    }

    /// Encode the payload column.
    pub fn to_payload(&self) -> Result<String, DomainError> {
        serde_json::to_string(self).map_err(|e| DomainError::parse(e.to_string()))
    }

    /// Decode a stored (discriminator, payload) pair.
    ///
    /// Older payloads may omit the `type` field; the column discriminator
    /// fills it in. When both are present they must agree.
    pub fn decode(buff_type: &str, payload: &str) -> Result<Self, DomainError> {
        let declared: BuffType = buff_type.parse()?;
        let mut value: serde_json::Value = serde_json::from_str(payload)
            .map_err(|e| DomainError::parse(format!("Malformed buff payload: {}", e)))?;

        let object = value
            .as_object_mut()
            .ok_or_else(|| DomainError::parse("Buff payload must be a JSON object"))?;
        object
            .entry("type")
            .or_insert_with(|| serde_json::Value::String(declared.as_str().to_string()));

        let effect: BuffEffect = serde_json::from_value(value)
            .map_err(|e| DomainError::parse(format!("Malformed buff payload: {}", e)))?;

        if effect.buff_type() != declared {
            return Err(DomainError::parse(format!(
                "Buff payload type {} does not match declared type {}",
                effect.buff_type(),
                declared
            )));
        }
        effect.validate()?;
        Ok(effect)
    }
}

/// A buff held by a user, one per (user, quest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassiveBuff {
    pub user_id: UserId,
    pub quest_id: QuestId,
    pub effect: BuffEffect,
    pub is_active: bool,
}

impl PassiveBuff {
    pub fn active(user_id: UserId, quest_id: QuestId, effect: BuffEffect) -> Self {
        Self {
            user_id,
            quest_id,
            effect,
            is_active: true,
        }
    }
}

/// A buff row as stored, before its payload is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBuff {
    pub user_id: UserId,
    pub quest_id: QuestId,
    pub buff_type: String,
    pub buff_data: Option<String>,
    pub is_active: bool,
}

impl StoredBuff {
    pub fn decode(&self) -> Result<PassiveBuff, DomainError> {
        let payload = self
            .buff_data
            .as_deref()
            .ok_or_else(|| DomainError::parse("Buff payload is missing"))?;
        Ok(PassiveBuff {
            user_id: self.user_id,
            quest_id: self.quest_id,
            effect: BuffEffect::decode(&self.buff_type, payload)?,
            is_active: self.is_active,
        })
    }
}

/// Fold active reward multipliers for a category into one scalar.
///
/// Buffs stack multiplicatively starting from 1.0.
pub fn combined_multiplier(buffs: &[PassiveBuff], category: &QuestCategory) -> f64 {
    buffs
        .iter()
        .filter(|buff| buff.is_active)
        .filter_map(|buff| buff.effect.multiplier_for(category))
        .product::<f64>()
}
