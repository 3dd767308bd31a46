//! Co-op quest between two friends.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::{QuestId, SharedQuestId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharedQuestStatus {
    Active,
    Completed,
}

impl SharedQuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for SharedQuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SharedQuestStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(DomainError::parse(format!(
                "Unknown shared quest status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedQuest {
    pub id: SharedQuestId,
    pub quest_id: QuestId,
    pub user1_id: UserId,
    pub user2_id: UserId,
    pub status: SharedQuestStatus,
}

impl SharedQuest {
    pub fn active(id: SharedQuestId, quest_id: QuestId, user1_id: UserId, user2_id: UserId) -> Self {
        Self {
            id,
            quest_id,
            user1_id,
            user2_id,
            status: SharedQuestStatus::Active,
        }
    }

    pub fn involves(&self, user_id: UserId) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// The other participant, if `user_id` takes part at all.
    pub fn partner_of(&self, user_id: UserId) -> Option<UserId> {
        if self.user1_id == user_id {
            Some(self.user2_id)
        } else if self.user2_id == user_id {
            Some(self.user1_id)
        } else {
            None
        }
    }

    pub fn complete(&mut self) -> Result<(), DomainError> {
        if self.status == SharedQuestStatus::Completed {
            return Err(DomainError::invalid_state_transition(format!(
                "Shared quest {} is already completed",
                self.id
            )));
        }
        self.status = SharedQuestStatus::Completed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> SharedQuest {
        SharedQuest {
            id: SharedQuestId::new(1),
            quest_id: QuestId::new(9),
            user1_id: UserId::new(1),
            user2_id: UserId::new(2),
            status: SharedQuestStatus::Active,
        }
    }

    #[test]
    fn partner_lookup() {
        let quest = shared();
        assert_eq!(quest.partner_of(UserId::new(1)), Some(UserId::new(2)));
        assert_eq!(quest.partner_of(UserId::new(2)), Some(UserId::new(1)));
        assert_eq!(quest.partner_of(UserId::new(3)), None);
    }

    #[test]
    fn completes_once() {
        let mut quest = shared();
        quest.complete().expect("first completion");
        assert!(quest.complete().is_err());
    }
}
