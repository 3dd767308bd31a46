//! SQLite persistence adapters
//!
//! Implements the quest store ports on top of a sqlx SQLite pool.

mod connection;
mod quest_store;
mod schema;

pub use connection::SqliteDatabase;
pub use quest_store::{SqliteQuestStore, SqliteQuestTx};
