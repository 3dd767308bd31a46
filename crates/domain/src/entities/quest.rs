//! Quest entity - a catalog template of a multi-task challenge
//!
//! Quests are published once by the catalog and are read-only afterwards.
//! Every user works on a quest through their own `UserQuest` instance.
//!
//! ## Relationships (via repository methods)
//! - ordered tasks through the `quest_tasks` join (`task_order`)
//! - prerequisite quests grouped by `required_count`
//! - weighted links to development branches
//! - `next_quest_id` for sequential quest chains

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::buff::BuffEffect;
use super::task::TaskDraft;
use crate::error::DomainError;
use crate::value_objects::{Difficulty, QuestCategory, Rarity, Reward};
use crate::QuestId;

/// A published quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    id: QuestId,
    title: String,
    description: String,
    category: QuestCategory,
    rarity: Rarity,
    difficulty: Difficulty,
    price: i64,
    tasks_count: u32,
    reward: Reward,
    time_limit_hours: u32,
    next_quest_id: Option<QuestId>,
    bonus_buff: Option<BuffEffect>,
}

impl Quest {
    /// Build a quest from a validated draft and the id the store assigned.
    pub fn from_draft(id: QuestId, draft: QuestDraft) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            category: draft.category,
            rarity: draft.rarity,
            difficulty: draft.difficulty,
            price: draft.price,
            tasks_count: draft.tasks_count,
            reward: draft.reward,
            time_limit_hours: draft.time_limit_hours,
            next_quest_id: draft.next_quest_id,
            bonus_buff: draft.bonus_buff,
        }
    }

    // === Accessors ===

    pub fn id(&self) -> QuestId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &QuestCategory {
        &self.category
    }

    pub fn rarity(&self) -> Rarity {
        self.rarity
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn price(&self) -> i64 {
        self.price
    }

    pub fn tasks_count(&self) -> u32 {
        self.tasks_count
    }

    /// Base reward before passive multipliers.
    pub fn reward(&self) -> Reward {
        self.reward
    }

    pub fn time_limit_hours(&self) -> u32 {
        self.time_limit_hours
    }

    pub fn next_quest_id(&self) -> Option<QuestId> {
        self.next_quest_id
    }

    pub fn bonus_buff(&self) -> Option<&BuffEffect> {
        self.bonus_buff.as_ref()
    }

    /// Deadline for a run started at `started_at`.
    pub fn expires_at(&self, started_at: DateTime<Utc>) -> DateTime<Utc> {
        started_at + Duration::hours(i64::from(self.time_limit_hours))
    }
}

/// Input for publishing a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestDraft {
    pub title: String,
    pub description: String,
    pub category: QuestCategory,
    pub rarity: Rarity,
    pub difficulty: Difficulty,
    pub price: i64,
    pub tasks_count: u32,
    pub reward: Reward,
    pub time_limit_hours: u32,
    pub next_quest_id: Option<QuestId>,
    pub bonus_buff: Option<BuffEffect>,
}

impl QuestDraft {
    pub fn new(title: impl Into<String>, category: QuestCategory, difficulty: Difficulty) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            category,
            rarity: Rarity::Common,
            difficulty,
            price: 0,
            tasks_count: 0,
            reward: Reward::ZERO,
            time_limit_hours: 24,
            next_quest_id: None,
            bonus_buff: None,
        }
    }

    // === Builder Methods ===

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }

    pub fn with_price(mut self, price: i64) -> Self {
        self.price = price;
        self
    }

    pub fn with_tasks_count(mut self, tasks_count: u32) -> Self {
        self.tasks_count = tasks_count;
        self
    }

    pub fn with_reward(mut self, reward: Reward) -> Self {
        self.reward = reward;
        self
    }

    pub fn with_time_limit_hours(mut self, hours: u32) -> Self {
        self.time_limit_hours = hours;
        self
    }

    pub fn with_next_quest(mut self, next_quest_id: QuestId) -> Self {
        self.next_quest_id = Some(next_quest_id);
        self
    }

    pub fn with_bonus_buff(mut self, effect: BuffEffect) -> Self {
        self.bonus_buff = Some(effect);
        self
    }

    /// Check the draft against the tasks it will be published with.
    pub fn validate(&self, tasks: &[TaskDraft]) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("Quest title cannot be empty"));
        }
        if self.price < 0 {
            return Err(DomainError::validation("Quest price cannot be negative"));
        }
        if self.reward.is_negative() {
            return Err(DomainError::validation("Quest reward cannot be negative"));
        }
        if self.tasks_count == 0 {
            return Err(DomainError::validation("Quest needs at least one task"));
        }
        if usize::try_from(self.tasks_count).ok() != Some(tasks.len()) {
            return Err(DomainError::validation(format!(
                "Quest declares {} tasks but {} were supplied",
                self.tasks_count,
                tasks.len()
            )));
        }
        if let Some(buff) = &self.bonus_buff {
            buff.validate()?;
        }
        for task in tasks {
            task.validate()?;
        }
        Ok(())
    }
}
