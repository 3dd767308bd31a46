//! Work that runs only after a transaction has committed.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::infrastructure::ports::{QuestSetChange, QuestSetNotifier};

/// Fires the quest-set signal on a background task.
#[derive(Clone)]
pub struct PostCommit {
    notifier: Arc<dyn QuestSetNotifier>,
}

impl PostCommit {
    pub fn new(notifier: Arc<dyn QuestSetNotifier>) -> Self {
        Self { notifier }
    }

    /// Send `changes` without waiting. Failures are logged and dropped.
    pub fn quest_set_changed(&self, changes: Vec<QuestSetChange>) -> JoinHandle<()> {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.quest_set_changed(&changes).await {
                tracing::warn!(
                    error = %e,
                    users = changes.len(),
                    "Quest-set notification failed"
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{MockQuestSetNotifier, NotifyError};
    use overman_domain::{QuestId, UserId};

    #[tokio::test]
    async fn notifier_failure_is_swallowed() {
        let mut notifier = MockQuestSetNotifier::new();
        notifier
            .expect_quest_set_changed()
            .times(1)
            .returning(|_| Err(NotifyError::Rejected(503)));

        let handle = PostCommit::new(Arc::new(notifier)).quest_set_changed(vec![QuestSetChange {
            user_id: UserId::new(1),
            quest_ids: vec![QuestId::new(2)],
        }]);

        assert!(handle.await.is_ok());
    }
}
