//! Reward ledger - the only writer of wallet balances.

use overman_domain::{LedgerEntry, Wallet};

use super::error::QuestError;
use crate::infrastructure::ports::QuestTx;

/// Applies currency and experience deltas and records an audit row for each.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewardLedger;

impl RewardLedger {
    pub fn new() -> Self {
        Self
    }

    /// Apply `entry` inside `tx`. A debit that would overdraw the wallet
    /// fails with `InsufficientFunds` and writes nothing.
    pub async fn apply(
        &self,
        tx: &mut dyn QuestTx,
        entry: &LedgerEntry,
    ) -> Result<Wallet, QuestError> {
        let wallet = tx
            .get_wallet(entry.user_id)
            .await?
            .ok_or_else(|| QuestError::not_found("User", entry.user_id))?;

        let updated = wallet
            .apply(entry.delta)
            .map_err(|_| QuestError::InsufficientFunds {
                needed: -entry.delta.coins,
                available: wallet.coins,
            })?;

        tx.adjust_wallet(entry.user_id, entry.delta).await?;
        tx.record_ledger_entry(entry).await?;

        tracing::debug!(
            user_id = %entry.user_id,
            kind = %entry.kind,
            coins = entry.delta.coins,
            xp = entry.delta.xp,
            "Ledger entry applied"
        );
        Ok(updated)
    }
}
