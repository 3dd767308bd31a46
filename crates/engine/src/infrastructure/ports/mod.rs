//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Database access (SQLite today, a server database later)
//! - The recommendation service
//! - Clock (for testing)

mod error;
mod external;
mod repos;
mod testing;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::{QuestStore, QuestTx};

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{QuestSetChange, QuestSetNotifier};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use repos::{MockQuestStore, MockQuestTx};

#[cfg(test)]
pub use external::MockQuestSetNotifier;

#[cfg(test)]
pub use testing::MockClockPort;

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::ClockPort;

// =============================================================================
// Error Types
// =============================================================================
pub use error::{NotifyError, RepoError};
