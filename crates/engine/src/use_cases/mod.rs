//! Use cases - User story orchestration.
//!
//! Each module covers one area. Use cases own the transaction: they open it,
//! run entity modules against it, commit, then fire post-commit work.

pub mod accounts;
pub mod buffs;
pub mod catalog;
pub mod habit;
pub mod post_commit;
pub mod quest;
pub mod shared_quest;
pub mod social;

pub use accounts::Accounts;
pub use buffs::Buffs;
pub use catalog::{Catalog, QuestDetails, QuestTreeNode};
pub use habit::{HabitMark, Habits};
pub use post_commit::PostCommit;
pub use quest::{QuestCompletion, QuestLifecycle, QuestStatusView};
pub use shared_quest::SharedQuests;
pub use social::Social;
