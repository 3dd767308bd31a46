//! Test fixtures and common test helpers.
//!
//! [`TestEngine`] wires every use case to a private SQLite database (in
//! memory, or a pooled file for contention tests), a manual clock and a
//! recording notifier, and seeds users, quests and friendships through the
//! public use cases.
//!
//! # Usage
//!
//! ```rust,ignore
//! let engine = TestEngine::new().await;
//! let user = engine.seed_user("ada", 100).await;
//! let (quest, tasks) = engine
//!     .seed_quest("Walk", QuestCategory::Health, 2, 10, Reward::new(20, 5))
//!     .await;
//! engine.finish_quest(user, quest, &tasks).await;
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use tempfile::TempDir;
use overman_domain::{
    BuffEffect, Difficulty, Quest, QuestCategory, QuestDraft, QuestId, Reward, TaskDraft, TaskId,
    UserId, Wallet,
};
use tokio::sync::mpsc;

use crate::app::{App, UseCases};
use crate::entities::{
    PassiveBuffs, PrerequisiteResolver, Progression, RewardLedger, SharedCompletion,
};
use crate::infrastructure::clock::FixedClock;
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::persistence::{SqliteDatabase, SqliteQuestStore};
use crate::infrastructure::ports::{
    ClockPort, NotifyError, QuestSetChange, QuestSetNotifier, QuestStore,
};
use crate::use_cases::{PostCommit, QuestLifecycle};

// =============================================================================
// Clock
// =============================================================================

/// Clock the test moves by hand.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(Mutex::new(start))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().expect("clock lock") = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().expect("clock lock");
        *now += by;
    }
}

impl ClockPort for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("clock lock")
    }
}

/// 2024-03-10 08:00 UTC, a Sunday morning.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0)
        .single()
        .expect("valid start time")
}

// =============================================================================
// Notifiers
// =============================================================================

/// Forwards every quest-set change batch to a channel.
pub struct RecordingNotifier(mpsc::UnboundedSender<Vec<QuestSetChange>>);

impl RecordingNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<QuestSetChange>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }
}

#[async_trait]
impl QuestSetNotifier for RecordingNotifier {
    async fn quest_set_changed(&self, changes: &[QuestSetChange]) -> Result<(), NotifyError> {
        self.0
            .send(changes.to_vec())
            .map_err(|e| NotifyError::RequestFailed(e.to_string()))
    }
}

/// Always fails, like an unreachable recommendation service.
pub struct FailingNotifier;

#[async_trait]
impl QuestSetNotifier for FailingNotifier {
    async fn quest_set_changed(&self, _changes: &[QuestSetChange]) -> Result<(), NotifyError> {
        Err(NotifyError::RequestFailed("connection refused".to_string()))
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Every use case over a fresh database.
pub struct TestEngine {
    pub app: Arc<UseCases>,
    pub clock: Arc<ManualClock>,
    notifications: mpsc::UnboundedReceiver<Vec<QuestSetChange>>,
    _dir: Option<TempDir>,
}

impl TestEngine {
    /// Engine over a private in-memory database.
    pub async fn new() -> Self {
        let db = SqliteDatabase::in_memory().await.expect("in-memory database");
        let (notifier, notifications) = RecordingNotifier::new();
        Self::build(db, None, Arc::new(notifier), notifications).await
    }

    /// Engine over a WAL file database in a temp dir, served by a pool of
    /// `max_connections`, so transactions really run side by side.
    pub async fn file_backed(max_connections: u32) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = format!("sqlite://{}", dir.path().join("overman.db").display());
        let db = SqliteDatabase::connect(&url, max_connections)
            .await
            .expect("file database");
        let (notifier, notifications) = RecordingNotifier::new();
        Self::build(db, Some(dir), Arc::new(notifier), notifications).await
    }

    /// Engine whose recommendation service is always down.
    pub async fn with_failing_notifier() -> Self {
        let db = SqliteDatabase::in_memory().await.expect("in-memory database");
        let (_, notifications) = mpsc::unbounded_channel();
        Self::build(db, None, Arc::new(FailingNotifier), notifications).await
    }

    async fn build(
        db: SqliteDatabase,
        dir: Option<TempDir>,
        notifier: Arc<dyn QuestSetNotifier>,
        notifications: mpsc::UnboundedReceiver<Vec<QuestSetChange>>,
    ) -> Self {
        db.initialize_schema().await.expect("schema");

        let clock = Arc::new(ManualClock::new(start_time()));
        let app = App::new(
            Arc::new(SqliteQuestStore::new(db)),
            notifier,
            clock.clone(),
            &EngineConfig::default(),
        );

        Self {
            app: Arc::new(app.use_cases),
            clock,
            notifications,
            _dir: dir,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Next quest-set batch sent after a commit.
    ///
    /// # Panics
    ///
    /// Panics if nothing arrives within a second.
    pub async fn next_notification(&mut self) -> Vec<QuestSetChange> {
        tokio::time::timeout(StdDuration::from_secs(1), self.notifications.recv())
            .await
            .expect("notification within timeout")
            .expect("notifier channel open")
    }

    pub async fn seed_user(&self, username: &str, coins: i64) -> UserId {
        self.app
            .accounts
            .register_user(username, Reward::new(0, coins))
            .await
            .expect("seed user")
    }

    pub async fn wallet(&self, user_id: UserId) -> Wallet {
        self.app.accounts.wallet(user_id).await.expect("wallet")
    }

    pub async fn befriend(&self, user_id: UserId, friend_id: UserId) {
        self.app
            .social
            .add_friend(user_id, friend_id)
            .await
            .expect("befriend");
    }

    /// Publish a quest with `tasks` numbered tasks.
    pub async fn seed_quest(
        &self,
        title: &str,
        category: QuestCategory,
        tasks: u32,
        price: i64,
        reward: Reward,
    ) -> (QuestId, Vec<TaskId>) {
        let draft = QuestDraft::new(title, category, difficulty(3))
            .with_tasks_count(tasks)
            .with_price(price)
            .with_reward(reward);
        self.publish(draft).await
    }

    /// One-task quest that continues into `next`.
    pub async fn seed_chained_quest(&self, title: &str, next: QuestId) -> (QuestId, Vec<TaskId>) {
        let draft = QuestDraft::new(title, QuestCategory::Intelligence, difficulty(2))
            .with_tasks_count(1)
            .with_next_quest(next);
        self.publish(draft).await
    }

    /// One-task quest that grants `effect` on completion.
    pub async fn seed_quest_with_buff(
        &self,
        title: &str,
        effect: BuffEffect,
    ) -> (QuestId, Vec<TaskId>) {
        let draft = QuestDraft::new(title, QuestCategory::Money, difficulty(2))
            .with_tasks_count(1)
            .with_bonus_buff(effect);
        self.publish(draft).await
    }

    async fn publish(&self, draft: QuestDraft) -> (QuestId, Vec<TaskId>) {
        let tasks = (1..=draft.tasks_count)
            .map(|n| TaskDraft::new(format!("{} step {}", draft.title, n), difficulty(2)))
            .collect();
        let details = self
            .app
            .catalog
            .publish_quest(draft, tasks)
            .await
            .expect("seed quest");
        let task_ids = details.tasks.iter().map(|t| t.id).collect();
        (details.quest.id(), task_ids)
    }

    /// Buy, start, do every task and complete a solo quest.
    pub async fn finish_quest(&self, user_id: UserId, quest_id: QuestId, tasks: &[TaskId]) {
        let quests = &self.app.quests;
        quests.purchase(user_id, quest_id).await.expect("purchase");
        quests.start(user_id, quest_id).await.expect("start");
        for task in tasks {
            quests
                .complete_task(user_id, quest_id, *task)
                .await
                .expect("complete task");
        }
        quests
            .complete_quest(user_id, quest_id)
            .await
            .expect("complete quest");
    }
}

// =============================================================================
// Mock-backed helpers
// =============================================================================

pub fn difficulty(value: u8) -> Difficulty {
    Difficulty::new(value).expect("valid difficulty")
}

/// A one-task health quest with the given id and price.
pub fn sample_quest(id: QuestId, price: i64) -> Quest {
    Quest::from_draft(
        id,
        QuestDraft::new("Sample", QuestCategory::Health, difficulty(1))
            .with_tasks_count(1)
            .with_price(price),
    )
}

/// Quest lifecycle over arbitrary (usually mocked) ports.
pub fn lifecycle_with(
    store: Arc<dyn QuestStore>,
    notifier: Arc<dyn QuestSetNotifier>,
) -> QuestLifecycle {
    let clock: Arc<dyn ClockPort> = Arc::new(FixedClock(start_time()));
    let progression = Progression::new(
        clock.clone(),
        PrerequisiteResolver::new(),
        PassiveBuffs::new(),
        RewardLedger::new(),
    );
    QuestLifecycle::new(
        store,
        progression.clone(),
        SharedCompletion::new(progression),
        PostCommit::new(notifier),
        clock,
    )
}
