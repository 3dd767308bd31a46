//! Quest catalog: publishing content and browsing it.

use std::sync::Arc;

use overman_domain::{
    BranchDraft, BranchId, DaytimeWindow, DevelopmentBranch, HabitRequirement, Quest, QuestBranch,
    QuestCategory, QuestDraft, QuestId, QuestPrerequisite, Task, TaskDraft, TaskId, UnlockStatus,
    UserId, UserQuest, UserQuestStatus,
};

use super::quest::QuestStatusView;
use crate::entities::{Progression, QuestError};
use crate::infrastructure::ports::{ClockPort, QuestStore};

/// Branch weight given to the category branch on publish.
const CATEGORY_BRANCH_WEIGHT: f64 = 1.0;

fn category_branches() -> [(QuestCategory, &'static str); 5] {
    [
        (QuestCategory::Health, "Health"),
        (QuestCategory::Willpower, "Willpower"),
        (QuestCategory::Intelligence, "Intelligence"),
        (QuestCategory::Charisma, "Charisma"),
        (QuestCategory::Money, "Money"),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestDetails {
    pub quest: Quest,
    pub tasks: Vec<Task>,
}

/// One quest in the development tree as seen by a user.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestTreeNode {
    pub quest: Quest,
    pub prerequisites: Vec<QuestPrerequisite>,
    pub branches: Vec<QuestBranch>,
    pub unlock: UnlockStatus,
    /// `None` when the user holds no run of the quest.
    pub status: Option<UserQuestStatus>,
}

pub struct Catalog {
    store: Arc<dyn QuestStore>,
    progression: Progression,
    clock: Arc<dyn ClockPort>,
}

impl Catalog {
    pub fn new(
        store: Arc<dyn QuestStore>,
        progression: Progression,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            store,
            progression,
            clock,
        }
    }

    /// Publish a quest with its tasks.
    ///
    /// Tasks without an explicit order are numbered from 1 in the order
    /// given. The quest joins the level-1 branch named after its category
    /// when one exists.
    pub async fn publish_quest(
        &self,
        draft: QuestDraft,
        tasks: Vec<TaskDraft>,
    ) -> Result<QuestDetails, QuestError> {
        draft.validate(&tasks)?;

        let mut tx = self.store.begin().await?;
        if let Some(next) = draft.next_quest_id {
            self.progression.load_quest(tx.as_mut(), next).await?;
        }
        let quest_id = tx.insert_quest(&draft).await?;

        for (index, task) in tasks.iter().enumerate() {
            let fallback = u32::try_from(index + 1)
                .map_err(|_| QuestError::invalid_input("Too many tasks"))?;
            tx.insert_task(quest_id, task.order.unwrap_or(fallback), task)
                .await?;
        }

        if let Some(branch) = tx.find_branch(draft.category.as_str(), 1).await? {
            tx.link_quest_to_branch(&QuestBranch {
                quest_id,
                branch_id: branch.id,
                weight: CATEGORY_BRANCH_WEIGHT,
            })
            .await?;
        }

        let quest = self.progression.load_quest(tx.as_mut(), quest_id).await?;
        let tasks = tx.list_quest_tasks(quest_id).await?;
        tx.commit().await?;

        tracing::info!(
            quest_id = %quest_id,
            title = %quest.title(),
            category = %quest.category(),
            tasks = tasks.len(),
            "Quest published"
        );
        Ok(QuestDetails { quest, tasks })
    }

    pub async fn add_prerequisite(
        &self,
        quest_id: QuestId,
        prerequisite_quest_id: QuestId,
        required_count: u32,
    ) -> Result<QuestPrerequisite, QuestError> {
        let prerequisite = QuestPrerequisite::new(quest_id, prerequisite_quest_id, required_count)?;

        let mut tx = self.store.begin().await?;
        self.progression.load_quest(tx.as_mut(), quest_id).await?;
        self.progression
            .load_quest(tx.as_mut(), prerequisite_quest_id)
            .await?;
        tx.upsert_prerequisite(&prerequisite).await?;
        tx.commit().await?;

        tracing::debug!(
            quest_id = %quest_id,
            prerequisite_quest_id = %prerequisite_quest_id,
            required_count,
            "Prerequisite set"
        );
        Ok(prerequisite)
    }

    pub async fn set_habit_requirement(
        &self,
        quest_id: QuestId,
        task_id: TaskId,
        consecutive_days: u32,
        daytime: Option<DaytimeWindow>,
    ) -> Result<HabitRequirement, QuestError> {
        let requirement = HabitRequirement::new(task_id, consecutive_days, daytime)?;

        let mut tx = self.store.begin().await?;
        if tx.get_quest_task(quest_id, task_id).await?.is_none() {
            return Err(QuestError::not_found("Task", task_id));
        }
        tx.upsert_habit_requirement(&requirement).await?;
        tx.commit().await?;
        Ok(requirement)
    }

    pub async fn add_branch(&self, draft: BranchDraft) -> Result<DevelopmentBranch, QuestError> {
        draft.validate()?;

        let mut tx = self.store.begin().await?;
        if let Some(parent_id) = draft.parent_branch_id {
            let parent = tx
                .get_branch(parent_id)
                .await?
                .ok_or_else(|| QuestError::not_found("Branch", parent_id))?;
            if parent.level >= draft.level {
                return Err(QuestError::invalid_input(format!(
                    "Branch level {} must be below its parent's level {}",
                    draft.level, parent.level
                )));
            }
        }
        let id = tx.insert_branch(&draft).await?;
        tx.commit().await?;
        Ok(draft.into_branch(id))
    }

    /// Create the level-1 branch of every built-in category that is missing.
    /// Returns how many were created.
    pub async fn ensure_category_branches(&self) -> Result<usize, QuestError> {
        let mut tx = self.store.begin().await?;
        let mut created = 0;
        for (category, display_name) in category_branches() {
            if tx.find_branch(category.as_str(), 1).await?.is_none() {
                tx.insert_branch(&BranchDraft::new(category.as_str(), display_name))
                    .await?;
                created += 1;
            }
        }
        tx.commit().await?;

        if created > 0 {
            tracing::info!(created, "Seeded category branches");
        }
        Ok(created)
    }

    pub async fn link_quest_to_branch(
        &self,
        quest_id: QuestId,
        branch_id: BranchId,
        weight: f64,
    ) -> Result<QuestBranch, QuestError> {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(QuestError::invalid_input(format!(
                "Branch weight must be positive, got {}",
                weight
            )));
        }

        let mut tx = self.store.begin().await?;
        self.progression.load_quest(tx.as_mut(), quest_id).await?;
        if tx.get_branch(branch_id).await?.is_none() {
            return Err(QuestError::not_found("Branch", branch_id));
        }
        let link = QuestBranch {
            quest_id,
            branch_id,
            weight,
        };
        tx.link_quest_to_branch(&link).await?;
        tx.commit().await?;
        Ok(link)
    }

    pub async fn list_branches(&self) -> Result<Vec<DevelopmentBranch>, QuestError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_branches().await?)
    }

    pub async fn quest_details(&self, quest_id: QuestId) -> Result<QuestDetails, QuestError> {
        let mut tx = self.store.begin().await?;
        let quest = self.progression.load_quest(tx.as_mut(), quest_id).await?;
        let tasks = tx.list_quest_tasks(quest_id).await?;
        Ok(QuestDetails { quest, tasks })
    }

    /// Quests the user has never bought.
    pub async fn shop(&self, user_id: UserId) -> Result<Vec<Quest>, QuestError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_shop_quests(user_id).await?)
    }

    /// Started runs with their advisory expiry flag.
    pub async fn active(&self, user_id: UserId) -> Result<Vec<QuestStatusView>, QuestError> {
        let mut tx = self.store.begin().await?;
        let runs = tx
            .list_user_quests(user_id, Some(UserQuestStatus::Started))
            .await?;
        let now = self.clock.now();

        let mut views = Vec::with_capacity(runs.len());
        for user_quest in runs {
            let quest = self
                .progression
                .load_quest(tx.as_mut(), user_quest.quest_id())
                .await?;
            views.push(QuestStatusView {
                expired: user_quest.is_expired(now),
                quest,
                user_quest,
            });
        }
        Ok(views)
    }

    pub async fn completed(&self, user_id: UserId) -> Result<Vec<UserQuest>, QuestError> {
        let mut tx = self.store.begin().await?;
        Ok(tx
            .list_user_quests(user_id, Some(UserQuestStatus::Completed))
            .await?)
    }

    /// Every quest with its prerequisites, branches and unlock state.
    pub async fn quest_tree(&self, user_id: UserId) -> Result<Vec<QuestTreeNode>, QuestError> {
        let mut tx = self.store.begin().await?;
        let quests = tx.list_quests().await?;
        let completed = tx.completed_quest_ids(user_id).await?;
        let runs = tx.list_user_quests(user_id, None).await?;

        let mut nodes = Vec::with_capacity(quests.len());
        for quest in quests {
            let prerequisites = tx.list_prerequisites(quest.id()).await?;
            let branches = tx.list_quest_branches(quest.id()).await?;
            let unlock = UnlockStatus::evaluate(&prerequisites, &completed);
            let status = runs
                .iter()
                .find(|run| run.quest_id() == quest.id())
                .map(UserQuest::status);
            nodes.push(QuestTreeNode {
                quest,
                prerequisites,
                branches,
                unlock,
                status,
            });
        }
        Ok(nodes)
    }

    /// Quests whose prerequisites the user has met.
    pub async fn available(&self, user_id: UserId) -> Result<Vec<Quest>, QuestError> {
        Ok(self
            .quest_tree(user_id)
            .await?
            .into_iter()
            .filter(|node| node.unlock.unlocked)
            .map(|node| node.quest)
            .collect())
    }
}
