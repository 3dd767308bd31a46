//! Value objects for the quest domain.

mod category;
mod daytime;
mod reward;
pub mod streak;

pub use category::{Difficulty, QuestCategory, Rarity};
pub use daytime::{within_daytime, DaytimeWindow};
pub use reward::Reward;
pub use streak::STREAK_LOOKBACK_DAYS;
