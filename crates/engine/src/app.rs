//! Application state and composition.

use std::sync::Arc;

use crate::entities::{
    HabitTracker, PassiveBuffs, PrerequisiteResolver, Progression, RewardLedger, SharedCompletion,
};
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::ports::{ClockPort, QuestSetNotifier, QuestStore};
use crate::use_cases;

/// Main application state.
///
/// Holds every use case, wired to one store, notifier and clock.
pub struct App {
    pub use_cases: UseCases,
}

/// Container for all use cases.
pub struct UseCases {
    pub accounts: use_cases::Accounts,
    pub quests: use_cases::QuestLifecycle,
    pub shared_quests: use_cases::SharedQuests,
    pub habits: use_cases::Habits,
    pub catalog: use_cases::Catalog,
    pub social: use_cases::Social,
    pub buffs: use_cases::Buffs,
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(
        store: Arc<dyn QuestStore>,
        notifier: Arc<dyn QuestSetNotifier>,
        clock: Arc<dyn ClockPort>,
        config: &EngineConfig,
    ) -> Self {
        // Stateless entity modules
        let prerequisites = PrerequisiteResolver::new();
        let buffs = PassiveBuffs::new();
        let ledger = RewardLedger::new();

        let progression = Progression::new(clock.clone(), prerequisites, buffs, ledger);
        let tracker = HabitTracker::new(clock.clone(), ledger, config.habit_freeze_cost);
        let post_commit = use_cases::PostCommit::new(notifier);

        let use_cases = UseCases {
            accounts: use_cases::Accounts::new(store.clone()),
            quests: use_cases::QuestLifecycle::new(
                store.clone(),
                progression.clone(),
                SharedCompletion::new(progression.clone()),
                post_commit.clone(),
                clock.clone(),
            ),
            shared_quests: use_cases::SharedQuests::new(
                store.clone(),
                progression.clone(),
                post_commit,
            ),
            habits: use_cases::Habits::new(store.clone(), tracker, progression.clone()),
            catalog: use_cases::Catalog::new(store.clone(), progression, clock.clone()),
            social: use_cases::Social::new(store.clone(), clock),
            buffs: use_cases::Buffs::new(store, buffs),
        };

        Self { use_cases }
    }
}
