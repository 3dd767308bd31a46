//! Entity modules - Domain capability encapsulation.
//!
//! Each module wraps one engine capability. They operate on a caller-owned
//! transaction and are the building blocks for use cases.

pub mod buffs;
pub mod error;
pub mod habits;
pub mod ledger;
pub mod prerequisites;
pub mod progression;
pub mod shared_completion;

pub use buffs::PassiveBuffs;
pub use error::QuestError;
pub use habits::{FreezeOutcome, HabitTracker};
pub use ledger::RewardLedger;
pub use prerequisites::PrerequisiteResolver;
pub use progression::{Progression, UserReward};
pub use shared_completion::SharedCompletion;
