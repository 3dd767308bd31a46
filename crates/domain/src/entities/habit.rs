//! Habit tracking types.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{within_daytime, DaytimeWindow};
use crate::{QuestId, TaskId, UserId};

/// A task that only counts as done after a run of consecutive daily completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitRequirement {
    pub task_id: TaskId,
    pub consecutive_days: u32,
    pub daytime: Option<DaytimeWindow>,
}

impl HabitRequirement {
    pub fn new(
        task_id: TaskId,
        consecutive_days: u32,
        daytime: Option<DaytimeWindow>,
    ) -> Result<Self, DomainError> {
        if consecutive_days < 1 {
            return Err(DomainError::validation(
                "Habit requirement needs at least one day",
            ));
        }
        Ok(Self {
            task_id,
            consecutive_days,
            daytime,
        })
    }

    /// Whether a completion at `time` falls inside the daytime window.
    pub fn permits(&self, time: Option<NaiveTime>) -> bool {
        within_daytime(self.daytime, time)
    }

    pub fn is_met_by(&self, consecutive_days: u32) -> bool {
        consecutive_days >= self.consecutive_days
    }
}

/// One day of a habit, either completed or frozen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitRecord {
    pub user_id: UserId,
    pub quest_id: QuestId,
    pub task_id: TaskId,
    pub completion_date: NaiveDate,
    /// `None` for frozen days.
    pub completion_time: Option<NaiveTime>,
    pub is_confirmed: bool,
}

impl HabitRecord {
    pub fn completion(
        user_id: UserId,
        quest_id: QuestId,
        task_id: TaskId,
        date: NaiveDate,
        time: Option<NaiveTime>,
    ) -> Self {
        Self {
            user_id,
            quest_id,
            task_id,
            completion_date: date,
            completion_time: time,
            is_confirmed: true,
        }
    }

    pub fn freeze(user_id: UserId, quest_id: QuestId, task_id: TaskId, date: NaiveDate) -> Self {
        Self {
            user_id,
            quest_id,
            task_id,
            completion_date: date,
            completion_time: None,
            is_confirmed: true,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.is_confirmed && self.completion_time.is_none()
    }
}

/// Snapshot of one habit for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitReport {
    pub user_id: UserId,
    pub task_id: TaskId,
    pub requirement: Option<HabitRequirement>,
    pub consecutive_days: u32,
    /// Confirmed days inside the requirement window, newest first.
    pub completions: Vec<HabitRecord>,
    pub missed_days: Vec<NaiveDate>,
    pub is_completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(hour, 30, 0)
    }

    #[test]
    fn zero_day_requirement_is_rejected() {
        assert!(HabitRequirement::new(TaskId::new(1), 0, None).is_err());
    }

    #[test]
    fn window_gates_completion_time() {
        let req = HabitRequirement::new(TaskId::new(1), 3, Some(DaytimeWindow::Morning))
            .expect("valid requirement");
        assert!(req.permits(at(7)));
        assert!(!req.permits(at(13)));
        assert!(req.permits(None));
    }

    #[test]
    fn requirement_met_at_threshold() {
        let req = HabitRequirement::new(TaskId::new(1), 3, None).expect("valid requirement");
        assert!(!req.is_met_by(2));
        assert!(req.is_met_by(3));
    }

    #[test]
    fn freeze_has_no_time() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 2).expect("valid date");
        let record = HabitRecord::freeze(UserId::new(1), QuestId::new(1), TaskId::new(1), date);
        assert!(record.is_frozen());
        let record = HabitRecord::completion(
            UserId::new(1),
            QuestId::new(1),
            TaskId::new(1),
            date,
            at(8),
        );
        assert!(!record.is_frozen());
    }
}
