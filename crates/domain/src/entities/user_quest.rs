//! UserQuest - one user's run through one quest.
//!
//! Status only ever moves forward:
//! `purchased -> started -> completed`. Expiry is not a stored status; a
//! started run past its deadline is reported as expired but can still be
//! completed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::quest::Quest;
use crate::error::DomainError;
use crate::value_objects::Reward;
use crate::{QuestId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserQuestStatus {
    Purchased,
    Started,
    Completed,
}

impl UserQuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchased => "purchased",
            Self::Started => "started",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for UserQuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserQuestStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchased" => Ok(Self::Purchased),
            "started" => Ok(Self::Started),
            "completed" => Ok(Self::Completed),
            other => Err(DomainError::parse(format!(
                "Unknown user quest status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserQuest {
    user_id: UserId,
    quest_id: QuestId,
    status: UserQuestStatus,
    tasks_done: u32,
    purchased_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    reward_gained: Reward,
}

impl UserQuest {
    /// A freshly purchased run.
    pub fn purchased(user_id: UserId, quest_id: QuestId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            quest_id,
            status: UserQuestStatus::Purchased,
            tasks_done: 0,
            purchased_at: now,
            started_at: None,
            expires_at: None,
            completed_at: None,
            reward_gained: Reward::ZERO,
        }
    }

    // === Builder Methods (used when loading from storage) ===

    pub fn with_status(mut self, status: UserQuestStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_tasks_done(mut self, tasks_done: u32) -> Self {
        self.tasks_done = tasks_done;
        self
    }

    pub fn with_started(mut self, started_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_completed_at(mut self, completed_at: DateTime<Utc>) -> Self {
        self.completed_at = Some(completed_at);
        self
    }

    pub fn with_reward_gained(mut self, reward: Reward) -> Self {
        self.reward_gained = reward;
        self
    }

    // === Accessors ===

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn quest_id(&self) -> QuestId {
        self.quest_id
    }

    pub fn status(&self) -> UserQuestStatus {
        self.status
    }

    pub fn tasks_done(&self) -> u32 {
        self.tasks_done
    }

    pub fn purchased_at(&self) -> DateTime<Utc> {
        self.purchased_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn reward_gained(&self) -> Reward {
        self.reward_gained
    }

    // === Transitions ===

    pub fn start(&mut self, quest: &Quest, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != UserQuestStatus::Purchased {
            return Err(DomainError::invalid_state_transition(format!(
                "Quest {} cannot be started from status {}",
                self.quest_id, self.status
            )));
        }
        self.status = UserQuestStatus::Started;
        self.started_at = Some(now);
        self.expires_at = Some(quest.expires_at(now));
        Ok(())
    }

    /// Count one more finished task, never past the quest's task count.
    pub fn record_task(&mut self, quest: &Quest) -> Result<(), DomainError> {
        self.ensure_started()?;
        if self.tasks_done >= quest.tasks_count() {
            return Err(DomainError::invalid_state_transition(format!(
                "All {} tasks of quest {} are already done",
                quest.tasks_count(),
                self.quest_id
            )));
        }
        self.tasks_done += 1;
        Ok(())
    }

    pub fn has_finished(&self, quest: &Quest) -> bool {
        self.status == UserQuestStatus::Started && self.tasks_done == quest.tasks_count()
    }

    /// Check that the run may be completed now.
    pub fn ensure_completable(&self, quest: &Quest) -> Result<(), DomainError> {
        self.ensure_started()?;
        if self.tasks_done != quest.tasks_count() {
            return Err(DomainError::invalid_state_transition(format!(
                "Quest {} has {}/{} tasks done",
                self.quest_id,
                self.tasks_done,
                quest.tasks_count()
            )));
        }
        Ok(())
    }

    pub fn complete(
        &mut self,
        quest: &Quest,
        reward: Reward,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_completable(quest)?;
        self.status = UserQuestStatus::Completed;
        self.completed_at = Some(now);
        self.reward_gained = reward;
        Ok(())
    }

    /// Advisory only: a started run whose deadline has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == UserQuestStatus::Started
            && self.expires_at.is_some_and(|deadline| now > deadline)
    }

    fn ensure_started(&self) -> Result<(), DomainError> {
        if self.status != UserQuestStatus::Started {
            return Err(DomainError::invalid_state_transition(format!(
                "Quest {} is {}, not started",
                self.quest_id, self.status
            )));
        }
        Ok(())
    }
}
