//! Habit streak calculator.
//!
//! Works on the confirmed days of one (user, task) pair. A frozen day is a
//! confirmed day without a completion time, so it keeps a streak alive.

use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveTime};
use overman_domain::{
    streak, HabitRecord, HabitReport, LedgerEntry, QuestId, TaskId, UserId,
};

use super::error::QuestError;
use super::ledger::RewardLedger;
use crate::infrastructure::ports::{ClockPort, QuestTx};

/// What a freeze request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezeOutcome {
    /// The day was confirmed and `cost` coins were charged.
    Frozen { cost: i64 },
    /// The day was already confirmed; nothing changed.
    AlreadyConfirmed,
}

#[derive(Clone)]
pub struct HabitTracker {
    clock: Arc<dyn ClockPort>,
    ledger: RewardLedger,
    freeze_cost: i64,
}

impl HabitTracker {
    pub fn new(clock: Arc<dyn ClockPort>, ledger: RewardLedger, freeze_cost: i64) -> Self {
        Self {
            clock,
            ledger,
            freeze_cost,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Confirm today for the task. A `None` time keeps any time already stored.
    pub async fn record_completion(
        &self,
        tx: &mut dyn QuestTx,
        user_id: UserId,
        quest_id: QuestId,
        task_id: TaskId,
        time: Option<NaiveTime>,
    ) -> Result<HabitRecord, QuestError> {
        let record = HabitRecord::completion(user_id, quest_id, task_id, self.today(), time);
        tx.upsert_habit_completion(&record).await?;
        Ok(record)
    }

    /// Current streak, never longer than the lookback window.
    pub async fn progress(
        &self,
        tx: &mut dyn QuestTx,
        user_id: UserId,
        task_id: TaskId,
    ) -> Result<u32, QuestError> {
        let today = self.today();
        let records = tx
            .list_confirmed_habit_records(user_id, task_id, streak::lookback_start(today))
            .await?;
        let dates: Vec<NaiveDate> = records.iter().map(|r| r.completion_date).collect();
        Ok(streak::consecutive_days(&dates, today))
    }

    pub async fn missed_days(
        &self,
        tx: &mut dyn QuestTx,
        user_id: UserId,
        task_id: TaskId,
        required_days: u32,
    ) -> Result<Vec<NaiveDate>, QuestError> {
        let last = tx.last_confirmed_habit_date(user_id, task_id).await?;
        Ok(streak::missed_days(last, self.today(), required_days))
    }

    /// Confirm a past (or today's) day without completing it.
    ///
    /// Freezing a day that is already confirmed is a free no-op. Otherwise
    /// the freeze cost is debited in the same transaction.
    pub async fn freeze(
        &self,
        tx: &mut dyn QuestTx,
        user_id: UserId,
        quest_id: QuestId,
        task_id: TaskId,
        date: NaiveDate,
    ) -> Result<FreezeOutcome, QuestError> {
        let today = self.today();
        if date > today {
            return Err(QuestError::invalid_input(format!(
                "Cannot freeze {} - it is in the future",
                date
            )));
        }

        if let Some(existing) = tx.get_habit_record(user_id, task_id, date).await? {
            if existing.is_confirmed {
                tracing::debug!(user_id = %user_id, task_id = %task_id, %date, "Day already confirmed");
                return Ok(FreezeOutcome::AlreadyConfirmed);
            }
        }

        if self.freeze_cost > 0 {
            let entry =
                LedgerEntry::freeze(user_id, quest_id, self.freeze_cost, date, self.clock.now());
            self.ledger.apply(tx, &entry).await?;
        }
        tx.confirm_habit_day(&HabitRecord::freeze(user_id, quest_id, task_id, date))
            .await?;

        tracing::info!(
            user_id = %user_id,
            task_id = %task_id,
            %date,
            cost = self.freeze_cost,
            "Habit day frozen"
        );
        Ok(FreezeOutcome::Frozen {
            cost: self.freeze_cost,
        })
    }

    pub async fn report(
        &self,
        tx: &mut dyn QuestTx,
        user_id: UserId,
        task_id: TaskId,
    ) -> Result<HabitReport, QuestError> {
        let requirement = tx.get_habit_requirement(task_id).await?;
        let required_days = requirement.map_or(1, |r| r.consecutive_days);
        let consecutive_days = self.progress(tx, user_id, task_id).await?;

        let today = self.today();
        let window_start = today
            .checked_sub_days(Days::new(u64::from(required_days.saturating_sub(1))))
            .unwrap_or(NaiveDate::MIN);
        let completions = tx
            .list_confirmed_habit_records(user_id, task_id, window_start)
            .await?
            .into_iter()
            .filter(|record| record.completion_date <= today)
            .collect();
        let missed_days = self
            .missed_days(tx, user_id, task_id, required_days)
            .await?;

        Ok(HabitReport {
            user_id,
            task_id,
            requirement,
            consecutive_days,
            completions,
            missed_days,
            is_completed: requirement.map_or(consecutive_days > 0, |r| r.is_met_by(consecutive_days)),
        })
    }
}
