//! Repository port traits for database access.
//!
//! Every use case works inside one unit of work: it opens a [`QuestTx`]
//! through [`QuestStore::begin`], issues its reads and writes, and calls
//! [`QuestTx::commit`]. Dropping a transaction without committing rolls it
//! back.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use overman_domain::*;

use super::error::RepoError;

// =============================================================================
// Store
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn QuestTx>, RepoError>;
}

// =============================================================================
// Unit of Work
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestTx: Send {
    // Users & wallet
    async fn insert_user(&mut self, username: &str, starting: Reward) -> Result<UserId, RepoError>;
    async fn get_wallet(&mut self, user_id: UserId) -> Result<Option<Wallet>, RepoError>;
    async fn adjust_wallet(&mut self, user_id: UserId, delta: Reward) -> Result<(), RepoError>;
    async fn record_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<(), RepoError>;
    async fn list_ledger_entries(&mut self, user_id: UserId)
        -> Result<Vec<LedgerEntry>, RepoError>;

    // Catalog
    async fn insert_quest(&mut self, draft: &QuestDraft) -> Result<QuestId, RepoError>;
    /// Insert a task and its ordered link to `quest_id`.
    async fn insert_task(
        &mut self,
        quest_id: QuestId,
        order: u32,
        draft: &TaskDraft,
    ) -> Result<TaskId, RepoError>;
    async fn get_quest(&mut self, quest_id: QuestId) -> Result<Option<Quest>, RepoError>;
    async fn list_quests(&mut self) -> Result<Vec<Quest>, RepoError>;
    /// Tasks of a quest ordered by `task_order`.
    async fn list_quest_tasks(&mut self, quest_id: QuestId) -> Result<Vec<Task>, RepoError>;
    /// A task, only if it belongs to `quest_id`.
    async fn get_quest_task(
        &mut self,
        quest_id: QuestId,
        task_id: TaskId,
    ) -> Result<Option<Task>, RepoError>;

    // Prerequisites (insertion order)
    async fn list_prerequisites(
        &mut self,
        quest_id: QuestId,
    ) -> Result<Vec<QuestPrerequisite>, RepoError>;
    async fn upsert_prerequisite(
        &mut self,
        prerequisite: &QuestPrerequisite,
    ) -> Result<(), RepoError>;

    // Branches
    async fn insert_branch(&mut self, draft: &BranchDraft) -> Result<BranchId, RepoError>;
    async fn get_branch(&mut self, branch_id: BranchId)
        -> Result<Option<DevelopmentBranch>, RepoError>;
    async fn find_branch(
        &mut self,
        name: &str,
        level: u32,
    ) -> Result<Option<DevelopmentBranch>, RepoError>;
    /// All branches ordered by (level, name).
    async fn list_branches(&mut self) -> Result<Vec<DevelopmentBranch>, RepoError>;
    async fn list_quest_branches(&mut self, quest_id: QuestId)
        -> Result<Vec<QuestBranch>, RepoError>;
    async fn link_quest_to_branch(&mut self, link: &QuestBranch) -> Result<(), RepoError>;

    // User quests
    async fn get_user_quest(
        &mut self,
        user_id: UserId,
        quest_id: QuestId,
    ) -> Result<Option<UserQuest>, RepoError>;
    async fn insert_user_quest(&mut self, user_quest: &UserQuest) -> Result<(), RepoError>;
    async fn update_user_quest(&mut self, user_quest: &UserQuest) -> Result<(), RepoError>;
    /// Take write locks on the (user, quest) rows of every listed user.
    async fn lock_user_quests(
        &mut self,
        quest_id: QuestId,
        user_ids: &[UserId],
    ) -> Result<(), RepoError>;
    async fn list_user_quests(
        &mut self,
        user_id: UserId,
        status: Option<UserQuestStatus>,
    ) -> Result<Vec<UserQuest>, RepoError>;
    /// Quests the user holds no row for.
    async fn list_shop_quests(&mut self, user_id: UserId) -> Result<Vec<Quest>, RepoError>;
    async fn completed_quest_ids(&mut self, user_id: UserId)
        -> Result<HashSet<QuestId>, RepoError>;

    // Completed tasks
    async fn is_task_completed(
        &mut self,
        user_id: UserId,
        quest_id: QuestId,
        task_id: TaskId,
    ) -> Result<bool, RepoError>;
    async fn insert_completed_task(&mut self, task: &CompletedTask) -> Result<(), RepoError>;
    async fn confirm_completed_tasks(
        &mut self,
        user_id: UserId,
        quest_id: QuestId,
    ) -> Result<(), RepoError>;

    // Passive buffs
    async fn upsert_buff(&mut self, buff: &PassiveBuff) -> Result<(), RepoError>;
    async fn list_buff_records(&mut self, user_id: UserId) -> Result<Vec<StoredBuff>, RepoError>;

    // Habits
    async fn get_habit_requirement(
        &mut self,
        task_id: TaskId,
    ) -> Result<Option<HabitRequirement>, RepoError>;
    async fn upsert_habit_requirement(
        &mut self,
        requirement: &HabitRequirement,
    ) -> Result<(), RepoError>;
    /// Insert or confirm the day. A `None` time keeps the stored time.
    async fn upsert_habit_completion(&mut self, record: &HabitRecord) -> Result<(), RepoError>;
    async fn get_habit_record(
        &mut self,
        user_id: UserId,
        task_id: TaskId,
        date: NaiveDate,
    ) -> Result<Option<HabitRecord>, RepoError>;
    /// Insert the day as confirmed, or flip an existing row to confirmed.
    async fn confirm_habit_day(&mut self, record: &HabitRecord) -> Result<(), RepoError>;
    /// Confirmed records on or after `since`, newest first.
    async fn list_confirmed_habit_records(
        &mut self,
        user_id: UserId,
        task_id: TaskId,
        since: NaiveDate,
    ) -> Result<Vec<HabitRecord>, RepoError>;
    async fn last_confirmed_habit_date(
        &mut self,
        user_id: UserId,
        task_id: TaskId,
    ) -> Result<Option<NaiveDate>, RepoError>;

    // Shared quests
    async fn insert_shared_quest(
        &mut self,
        quest_id: QuestId,
        user1_id: UserId,
        user2_id: UserId,
    ) -> Result<SharedQuestId, RepoError>;
    async fn get_active_shared_quest(
        &mut self,
        quest_id: QuestId,
        user_id: UserId,
    ) -> Result<Option<SharedQuest>, RepoError>;
    async fn update_shared_quest_status(
        &mut self,
        id: SharedQuestId,
        status: SharedQuestStatus,
    ) -> Result<(), RepoError>;
    async fn list_shared_quests(&mut self, user_id: UserId) -> Result<Vec<SharedQuest>, RepoError>;

    // Friends
    /// The friendship between two users in either direction.
    async fn get_friendship(
        &mut self,
        user_id: UserId,
        other_id: UserId,
    ) -> Result<Option<Friendship>, RepoError>;
    async fn insert_friendship(&mut self, friendship: &Friendship) -> Result<(), RepoError>;
    async fn list_friendships(&mut self, user_id: UserId) -> Result<Vec<Friendship>, RepoError>;

    async fn commit(&mut self) -> Result<(), RepoError>;
}
