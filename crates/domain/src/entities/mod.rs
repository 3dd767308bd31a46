//! Domain entities - Core business objects with identity

mod branch;
mod buff;
mod friendship;
mod habit;
mod ledger;
mod prerequisite;
mod quest;
mod shared_quest;
mod task;
mod user_quest;

pub use branch::{BranchDraft, DevelopmentBranch, QuestBranch};
pub use buff::{combined_multiplier, BuffEffect, BuffType, PassiveBuff, StoredBuff};
pub use friendship::{Friendship, FriendshipStatus};
pub use habit::{HabitRecord, HabitReport, HabitRequirement};
pub use ledger::{LedgerEntry, LedgerKind, Wallet};
pub use prerequisite::{QuestPrerequisite, UnlockStatus};
pub use quest::{Quest, QuestDraft};
pub use shared_quest::{SharedQuest, SharedQuestStatus};
pub use task::{CompletedTask, Task, TaskDraft};
pub use user_quest::{UserQuest, UserQuestStatus};
