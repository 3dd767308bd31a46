//! Outbound service ports.

use async_trait::async_trait;
use overman_domain::{QuestId, UserId};

use super::error::NotifyError;

/// The set of quests a user now holds changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestSetChange {
    pub user_id: UserId,
    pub quest_ids: Vec<QuestId>,
}

/// Fire-and-forget signal to the recommendation service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestSetNotifier: Send + Sync {
    async fn quest_set_changed(&self, changes: &[QuestSetChange]) -> Result<(), NotifyError>;
}
