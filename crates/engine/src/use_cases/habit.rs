//! Habit-gated tasks: daily marks, streaks, freezes and reports.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use overman_domain::{HabitRecord, HabitReport, QuestId, TaskId, UserId, UserQuest, UserQuestStatus};

use crate::entities::{FreezeOutcome, HabitTracker, Progression, QuestError};
use crate::infrastructure::ports::{QuestStore, QuestTx};

/// Result of marking a habit task done for today.
#[derive(Debug, Clone, PartialEq)]
pub struct HabitMark {
    /// Today's record; `None` for tasks without a habit requirement.
    pub record: Option<HabitRecord>,
    pub consecutive_days: u32,
    pub required_days: u32,
    /// The run after the mark, when the task was completed by it.
    pub completed: Option<UserQuest>,
}

pub struct Habits {
    store: Arc<dyn QuestStore>,
    tracker: HabitTracker,
    progression: Progression,
}

impl Habits {
    pub fn new(store: Arc<dyn QuestStore>, tracker: HabitTracker, progression: Progression) -> Self {
        Self {
            store,
            tracker,
            progression,
        }
    }

    /// Mark a task done for today.
    ///
    /// A task without a habit requirement completes straight away. A habit
    /// task records the day and completes once the streak reaches the
    /// required length. A completion outside the daytime window is rejected
    /// and nothing is written.
    pub async fn mark_complete(
        &self,
        user_id: UserId,
        quest_id: QuestId,
        task_id: TaskId,
        completion_time: Option<NaiveTime>,
    ) -> Result<HabitMark, QuestError> {
        let mut tx = self.store.begin().await?;
        ensure_task_in_quest(tx.as_mut(), quest_id, task_id).await?;

        let Some(requirement) = tx.get_habit_requirement(task_id).await? else {
            let run = self
                .progression
                .complete_task(tx.as_mut(), user_id, quest_id, task_id)
                .await?;
            tx.commit().await?;
            return Ok(HabitMark {
                record: None,
                consecutive_days: 0,
                required_days: 0,
                completed: Some(run),
            });
        };

        if !requirement.permits(completion_time) {
            return Err(QuestError::invalid_input(format!(
                "Task {} must be done in the {}",
                task_id,
                requirement.daytime.map_or("any", |w| w.as_str())
            )));
        }
        let run = self
            .progression
            .load_user_quest(tx.as_mut(), user_id, quest_id)
            .await?;
        if run.status() != UserQuestStatus::Started {
            return Err(QuestError::invariant(format!(
                "Quest {} is {}, not started",
                quest_id,
                run.status()
            )));
        }
        if tx.is_task_completed(user_id, quest_id, task_id).await? {
            return Err(QuestError::invariant(format!(
                "Task {} already completed",
                task_id
            )));
        }

        let record = self
            .tracker
            .record_completion(tx.as_mut(), user_id, quest_id, task_id, completion_time)
            .await?;
        let consecutive_days = self.tracker.progress(tx.as_mut(), user_id, task_id).await?;

        let completed = if requirement.is_met_by(consecutive_days) {
            Some(
                self.progression
                    .complete_task(tx.as_mut(), user_id, quest_id, task_id)
                    .await?,
            )
        } else {
            None
        };
        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            task_id = %task_id,
            consecutive_days,
            required_days = requirement.consecutive_days,
            task_completed = completed.is_some(),
            "Habit day recorded"
        );
        Ok(HabitMark {
            record: Some(record),
            consecutive_days,
            required_days: requirement.consecutive_days,
            completed,
        })
    }

    pub async fn progress(&self, user_id: UserId, task_id: TaskId) -> Result<u32, QuestError> {
        let mut tx = self.store.begin().await?;
        self.tracker.progress(tx.as_mut(), user_id, task_id).await
    }

    /// Days that still need a freeze to keep the streak alive.
    pub async fn missed_days(
        &self,
        user_id: UserId,
        task_id: TaskId,
    ) -> Result<Vec<NaiveDate>, QuestError> {
        let mut tx = self.store.begin().await?;
        let required_days = tx
            .get_habit_requirement(task_id)
            .await?
            .map_or(1, |r| r.consecutive_days);
        self.tracker
            .missed_days(tx.as_mut(), user_id, task_id, required_days)
            .await
    }

    pub async fn freeze_day(
        &self,
        user_id: UserId,
        quest_id: QuestId,
        task_id: TaskId,
        date: NaiveDate,
    ) -> Result<FreezeOutcome, QuestError> {
        let mut tx = self.store.begin().await?;
        ensure_task_in_quest(tx.as_mut(), quest_id, task_id).await?;
        let outcome = self
            .tracker
            .freeze(tx.as_mut(), user_id, quest_id, task_id, date)
            .await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// [`freeze_day`](Self::freeze_day) with a `YYYY-MM-DD` date.
    pub async fn freeze_day_str(
        &self,
        user_id: UserId,
        quest_id: QuestId,
        task_id: TaskId,
        date: &str,
    ) -> Result<FreezeOutcome, QuestError> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| QuestError::invalid_input(format!("Invalid date: {}", date)))?;
        self.freeze_day(user_id, quest_id, task_id, date).await
    }

    pub async fn report(&self, user_id: UserId, task_id: TaskId) -> Result<HabitReport, QuestError> {
        let mut tx = self.store.begin().await?;
        self.tracker.report(tx.as_mut(), user_id, task_id).await
    }
}

async fn ensure_task_in_quest(
    tx: &mut dyn QuestTx,
    quest_id: QuestId,
    task_id: TaskId,
) -> Result<(), QuestError> {
    if tx.get_quest_task(quest_id, task_id).await?.is_none() {
        return Err(QuestError::invalid_input(format!(
            "Task {} does not belong to quest {}",
            task_id, quest_id
        )));
    }
    Ok(())
}
