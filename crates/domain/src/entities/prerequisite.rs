//! Quest prerequisites and unlock evaluation.
//!
//! Prerequisite rows of one quest are grouped by their `required_count`.
//! Each group is an alternative way to unlock the quest: the quest opens as
//! soon as the user has completed `required_count` of the group's quests.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::QuestId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestPrerequisite {
    pub quest_id: QuestId,
    pub prerequisite_quest_id: QuestId,
    pub required_count: u32,
}

impl QuestPrerequisite {
    pub fn new(
        quest_id: QuestId,
        prerequisite_quest_id: QuestId,
        required_count: u32,
    ) -> Result<Self, DomainError> {
        if quest_id == prerequisite_quest_id {
            return Err(DomainError::validation(format!(
                "Quest {} cannot be its own prerequisite",
                quest_id
            )));
        }
        if required_count < 1 {
            return Err(DomainError::validation(
                "Prerequisite required count must be at least 1",
            ));
        }
        Ok(Self {
            quest_id,
            prerequisite_quest_id,
            required_count,
        })
    }
}

/// Result of evaluating a quest's prerequisites for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockStatus {
    pub unlocked: bool,
    pub satisfied: u32,
    pub required: u32,
}

impl UnlockStatus {
    pub const OPEN: UnlockStatus = UnlockStatus {
        unlocked: true,
        satisfied: 0,
        required: 0,
    };

    /// Evaluate `prerequisites` (in insertion order) against the set of
    /// quests the user has completed.
    ///
    /// Returns the first qualifying group. When no group qualifies, returns
    /// the group with the most completions, the earliest one on ties.
    pub fn evaluate(prerequisites: &[QuestPrerequisite], completed: &HashSet<QuestId>) -> Self {
        // (required_count, completed_in_group), ordered by first appearance
        let mut groups: Vec<(u32, u32)> = Vec::new();
        for prerequisite in prerequisites {
            let done = u32::from(completed.contains(&prerequisite.prerequisite_quest_id));
            match groups
                .iter_mut()
                .find(|(required, _)| *required == prerequisite.required_count)
            {
                Some((_, count)) => *count += done,
                None => groups.push((prerequisite.required_count, done)),
            }
        }

        if let Some(&(required, satisfied)) = groups
            .iter()
            .find(|(required, satisfied)| satisfied >= required)
        {
            return Self {
                unlocked: true,
                satisfied,
                required,
            };
        }

        let mut best: Option<(u32, u32)> = None;
        for &(required, satisfied) in &groups {
            if !best.is_some_and(|(_, best_satisfied)| satisfied <= best_satisfied) {
                best = Some((required, satisfied));
            }
        }

        match best {
            Some((required, satisfied)) => Self {
                unlocked: false,
                satisfied,
                required,
            },
            None => Self::OPEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: QuestId = QuestId::new(100);
    const A: QuestId = QuestId::new(1);
    const B: QuestId = QuestId::new(2);
    const C: QuestId = QuestId::new(3);

    fn prereq(prerequisite: QuestId, required_count: u32) -> QuestPrerequisite {
        QuestPrerequisite::new(TARGET, prerequisite, required_count).expect("valid prerequisite")
    }

    fn done(ids: &[QuestId]) -> HashSet<QuestId> {
        ids.iter().copied().collect()
    }

    fn alternatives() -> Vec<QuestPrerequisite> {
        vec![prereq(A, 2), prereq(B, 2), prereq(C, 1)]
    }

    #[test]
    fn no_prerequisites_is_open() {
        assert_eq!(UnlockStatus::evaluate(&[], &done(&[])), UnlockStatus::OPEN);
    }

    #[test]
    fn alternative_group_unlocks() {
        let status = UnlockStatus::evaluate(&alternatives(), &done(&[C]));
        assert!(status.unlocked);
        assert_eq!((status.satisfied, status.required), (1, 1));
    }

    #[test]
    fn partial_group_stays_locked() {
        let status = UnlockStatus::evaluate(&alternatives(), &done(&[A]));
        assert!(!status.unlocked);
        assert_eq!((status.satisfied, status.required), (1, 2));
    }

    #[test]
    fn full_group_unlocks() {
        let status = UnlockStatus::evaluate(&alternatives(), &done(&[A, B]));
        assert!(status.unlocked);
        assert_eq!((status.satisfied, status.required), (2, 2));
    }

    #[test]
    fn nothing_done_reports_first_group() {
        let status = UnlockStatus::evaluate(&alternatives(), &done(&[]));
        assert!(!status.unlocked);
        assert_eq!((status.satisfied, status.required), (0, 2));
    }

    #[test]
    fn self_reference_and_zero_count_rejected() {
        assert!(QuestPrerequisite::new(A, A, 1).is_err());
        assert!(QuestPrerequisite::new(TARGET, A, 0).is_err());
    }
}
