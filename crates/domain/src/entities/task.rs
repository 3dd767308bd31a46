//! Task entity - one step of a quest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{Difficulty, QuestCategory, Rarity, Reward};
use crate::{QuestId, TaskId, UserId};

/// A task together with its place in the owning quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub quest_id: QuestId,
    pub order: u32,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub rarity: Rarity,
    pub category: Option<QuestCategory>,
    pub base_reward: Reward,
}

/// Input for a task published together with its quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub rarity: Rarity,
    pub category: Option<QuestCategory>,
    pub base_reward: Reward,
    /// Position inside the quest. `None` means "after the previous task".
    pub order: Option<u32>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            difficulty,
            rarity: Rarity::Common,
            category: None,
            base_reward: Reward::ZERO,
            order: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: QuestCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_base_reward(mut self, reward: Reward) -> Self {
        self.base_reward = reward;
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("Task title cannot be empty"));
        }
        if self.base_reward.is_negative() {
            return Err(DomainError::validation("Task reward cannot be negative"));
        }
        Ok(())
    }
}

/// A task a user has finished inside a quest run.
///
/// The rewards are held unconfirmed until the whole quest completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTask {
    pub user_id: UserId,
    pub quest_id: QuestId,
    pub task_id: TaskId,
    pub completed_at: DateTime<Utc>,
    pub reward: Reward,
    pub is_confirmed: bool,
}

impl CompletedTask {
    pub fn pending(user_id: UserId, task: &Task, completed_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            quest_id: task.quest_id,
            task_id: task.id,
            completed_at,
            reward: task.base_reward,
            is_confirmed: false,
        }
    }
}
