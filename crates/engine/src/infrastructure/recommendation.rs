//! Recommendation service client.
//!
//! Tells the recommendation service which quests a user now holds so it can
//! refresh its suggestions. Delivery is best effort.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::infrastructure::ports::{NotifyError, QuestSetChange, QuestSetNotifier};

/// Default request timeout for the recommendation service.
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 30;

/// Client for the recommendation service's `/users/add` endpoint
#[derive(Clone)]
pub struct RecommendationClient {
    client: Client,
    base_url: String,
}

impl RecommendationClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, DEFAULT_NOTIFY_TIMEOUT_SECS)
    }

    pub fn with_timeout(base_url: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/users/add", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct AddUsersRequest {
    users: Vec<UserQuestSet>,
}

#[derive(Debug, Serialize)]
struct UserQuestSet {
    user_id: i64,
    quest_ids: Vec<i64>,
}

impl AddUsersRequest {
    fn from_changes(changes: &[QuestSetChange]) -> Self {
        Self {
            users: changes
                .iter()
                .map(|change| UserQuestSet {
                    user_id: change.user_id.get(),
                    quest_ids: change.quest_ids.iter().map(|id| id.get()).collect(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl QuestSetNotifier for RecommendationClient {
    async fn quest_set_changed(&self, changes: &[QuestSetChange]) -> Result<(), NotifyError> {
        let body = AddUsersRequest::from_changes(changes);

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }

        tracing::debug!(users = changes.len(), "Recommendation service notified");
        Ok(())
    }
}

/// Notifier used when no recommendation service is configured.
#[derive(Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl QuestSetNotifier for NoopNotifier {
    async fn quest_set_changed(&self, changes: &[QuestSetChange]) -> Result<(), NotifyError> {
        tracing::trace!(users = changes.len(), "No recommendation service configured");
        Ok(())
    }
}
