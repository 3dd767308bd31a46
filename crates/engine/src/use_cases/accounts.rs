//! User accounts and their wallets.

use std::sync::Arc;

use overman_domain::{LedgerEntry, Reward, UserId, Wallet};

use crate::entities::QuestError;
use crate::infrastructure::ports::QuestStore;

pub struct Accounts {
    store: Arc<dyn QuestStore>,
}

impl Accounts {
    pub fn new(store: Arc<dyn QuestStore>) -> Self {
        Self { store }
    }

    pub async fn register_user(
        &self,
        username: &str,
        starting: Reward,
    ) -> Result<UserId, QuestError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(QuestError::invalid_input("Username cannot be empty"));
        }
        if starting.is_negative() {
            return Err(QuestError::invalid_input("Starting balance cannot be negative"));
        }

        let mut tx = self.store.begin().await?;
        let user_id = tx.insert_user(username, starting).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user_id, username, "User registered");
        Ok(user_id)
    }

    pub async fn wallet(&self, user_id: UserId) -> Result<Wallet, QuestError> {
        let mut tx = self.store.begin().await?;
        tx.get_wallet(user_id)
            .await?
            .ok_or_else(|| QuestError::not_found("User", user_id))
    }

    /// Ledger entries for the user, oldest first.
    pub async fn history(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, QuestError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_ledger_entries(user_id).await?)
    }
}
