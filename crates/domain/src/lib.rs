//! Core domain types for the Overman quest engine.
//!
//! Pure data and rules: no I/O, no clocks, no storage. Everything that needs
//! the current time takes it as an argument.

pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use entities::{
    combined_multiplier, BranchDraft, BuffEffect, BuffType, CompletedTask, DevelopmentBranch,
    Friendship, FriendshipStatus, HabitRecord, HabitReport, HabitRequirement, LedgerEntry,
    LedgerKind, PassiveBuff, Quest, QuestBranch, QuestDraft, QuestPrerequisite, SharedQuest,
    SharedQuestStatus, StoredBuff, Task, TaskDraft, UnlockStatus, UserQuest, UserQuestStatus,
    Wallet,
};
pub use error::DomainError;
pub use ids::{BranchId, QuestId, SharedQuestId, TaskId, UserId};
pub use value_objects::{
    streak, within_daytime, DaytimeWindow, Difficulty, QuestCategory, Rarity, Reward,
    STREAK_LOOKBACK_DAYS,
};
