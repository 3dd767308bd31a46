//! SQLite implementation of the quest store.
//!
//! One `SqliteQuestTx` wraps one sqlx transaction. Dropping it without
//! `commit` rolls everything back.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use overman_domain::*;
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Row, SqliteConnection, Transaction};

use super::connection::SqliteDatabase;
use crate::infrastructure::ports::{QuestStore, QuestTx, RepoError};

const QUEST_COLUMNS: &str = "q.id, q.title, q.description, q.category, q.rarity, q.difficulty, \
     q.price, q.tasks_count, q.reward_xp, q.reward_coin, q.time_limit_hours, q.next_quest_id, \
     q.bonus_buff_type, q.bonus_buff_data";

const TASK_COLUMNS: &str = "t.id, qt.quest_id, qt.task_order, t.title, t.description, \
     t.difficulty, t.rarity, t.category, t.base_xp_reward, t.base_coin_reward";

const USER_QUEST_COLUMNS: &str = "user_id, quest_id, status, tasks_done, purchased_at, \
     started_at, expires_at, completed_at, xp_gained, coin_gained";

const HABIT_COLUMNS: &str =
    "user_id, quest_id, task_id, completion_date, completion_time, is_confirmed";

const BRANCH_COLUMNS: &str =
    "id, name, display_name, description, parent_branch_id, level, icon, color";

/// Opens transactions against a [`SqliteDatabase`].
#[derive(Clone)]
pub struct SqliteQuestStore {
    db: SqliteDatabase,
}

impl SqliteQuestStore {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db }
    }
}

#[async_trait]
impl QuestStore for SqliteQuestStore {
    async fn begin(&self) -> Result<Box<dyn QuestTx>, RepoError> {
        // Take the write lock up front so concurrent writers wait on the
        // busy handler instead of failing a read-to-write upgrade.
        let tx = self
            .db
            .pool()
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| RepoError::database("begin", e))?;
        Ok(Box::new(SqliteQuestTx { tx: Some(tx) }))
    }
}

pub struct SqliteQuestTx {
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteQuestTx {
    fn conn(&mut self) -> Result<&mut SqliteConnection, RepoError> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| RepoError::database("transaction", "transaction already committed"))
    }
}

// =============================================================================
// Row decoding
// =============================================================================

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepoError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| RepoError::serialization(format!("{}: {}", name, e)))
}

fn count(row: &SqliteRow, name: &str) -> Result<u32, RepoError> {
    let value: i64 = column(row, name)?;
    u32::try_from(value)
        .map_err(|_| RepoError::serialization(format!("{}: {} is out of range", name, value)))
}

fn difficulty(row: &SqliteRow) -> Result<Difficulty, RepoError> {
    let value: i64 = column(row, "difficulty")?;
    u8::try_from(value)
        .map_err(|_| RepoError::serialization(format!("difficulty: {} is out of range", value)))
        .and_then(|v| Difficulty::new(v).map_err(RepoError::serialization))
}

fn quest_from_row(row: &SqliteRow) -> Result<Quest, RepoError> {
    let id = QuestId::new(column(row, "id")?);
    let category: String = column(row, "category")?;
    let rarity: String = column(row, "rarity")?;
    let next_quest_id: Option<i64> = column(row, "next_quest_id")?;
    let bonus_type: Option<String> = column(row, "bonus_buff_type")?;
    let bonus_data: Option<String> = column(row, "bonus_buff_data")?;

    let bonus_buff = match (bonus_type, bonus_data) {
        (Some(buff_type), Some(payload)) => match BuffEffect::decode(&buff_type, &payload) {
            Ok(effect) => Some(effect),
            Err(e) => {
                tracing::warn!(quest_id = %id, error = %e, "Ignoring undecodable bonus buff");
                None
            }
        },
        _ => None,
    };

    let draft = QuestDraft {
        title: column(row, "title")?,
        description: column(row, "description")?,
        category: category.parse().map_err(RepoError::serialization)?,
        rarity: rarity.parse().map_err(RepoError::serialization)?,
        difficulty: difficulty(row)?,
        price: column(row, "price")?,
        tasks_count: count(row, "tasks_count")?,
        reward: Reward::new(column(row, "reward_xp")?, column(row, "reward_coin")?),
        time_limit_hours: count(row, "time_limit_hours")?,
        next_quest_id: next_quest_id.map(QuestId::new),
        bonus_buff,
    };
    Ok(Quest::from_draft(id, draft))
}

fn task_from_row(row: &SqliteRow) -> Result<Task, RepoError> {
    let rarity: String = column(row, "rarity")?;
    let category: Option<String> = column(row, "category")?;
    Ok(Task {
        id: TaskId::new(column(row, "id")?),
        quest_id: QuestId::new(column(row, "quest_id")?),
        order: count(row, "task_order")?,
        title: column(row, "title")?,
        description: column(row, "description")?,
        difficulty: difficulty(row)?,
        rarity: rarity.parse().map_err(RepoError::serialization)?,
        category: category
            .map(|c| c.parse::<QuestCategory>())
            .transpose()
            .map_err(RepoError::serialization)?,
        base_reward: Reward::new(
            column(row, "base_xp_reward")?,
            column(row, "base_coin_reward")?,
        ),
    })
}

fn user_quest_from_row(row: &SqliteRow) -> Result<UserQuest, RepoError> {
    let status: String = column(row, "status")?;
    let started_at: Option<DateTime<Utc>> = column(row, "started_at")?;
    let expires_at: Option<DateTime<Utc>> = column(row, "expires_at")?;
    let completed_at: Option<DateTime<Utc>> = column(row, "completed_at")?;

    let mut user_quest = UserQuest::purchased(
        UserId::new(column(row, "user_id")?),
        QuestId::new(column(row, "quest_id")?),
        column(row, "purchased_at")?,
    )
    .with_status(status.parse().map_err(RepoError::serialization)?)
    .with_tasks_done(count(row, "tasks_done")?)
    .with_reward_gained(Reward::new(
        column(row, "xp_gained")?,
        column(row, "coin_gained")?,
    ));

    if let (Some(started), Some(expires)) = (started_at, expires_at) {
        user_quest = user_quest.with_started(started, expires);
    }
    if let Some(completed) = completed_at {
        user_quest = user_quest.with_completed_at(completed);
    }
    Ok(user_quest)
}

fn habit_from_row(row: &SqliteRow) -> Result<HabitRecord, RepoError> {
    let completion_time: Option<NaiveTime> = column(row, "completion_time")?;
    Ok(HabitRecord {
        user_id: UserId::new(column(row, "user_id")?),
        quest_id: QuestId::new(column(row, "quest_id")?),
        task_id: TaskId::new(column(row, "task_id")?),
        completion_date: column(row, "completion_date")?,
        completion_time,
        is_confirmed: column(row, "is_confirmed")?,
    })
}

fn branch_from_row(row: &SqliteRow) -> Result<DevelopmentBranch, RepoError> {
    let parent: Option<i64> = column(row, "parent_branch_id")?;
    Ok(DevelopmentBranch {
        id: BranchId::new(column(row, "id")?),
        name: column(row, "name")?,
        display_name: column(row, "display_name")?,
        description: column(row, "description")?,
        parent_branch_id: parent.map(BranchId::new),
        level: count(row, "level")?,
        icon: column(row, "icon")?,
        color: column(row, "color")?,
    })
}

fn shared_quest_from_row(row: &SqliteRow) -> Result<SharedQuest, RepoError> {
    let status: String = column(row, "status")?;
    Ok(SharedQuest {
        id: SharedQuestId::new(column(row, "id")?),
        quest_id: QuestId::new(column(row, "quest_id")?),
        user1_id: UserId::new(column(row, "user1_id")?),
        user2_id: UserId::new(column(row, "user2_id")?),
        status: status.parse().map_err(RepoError::serialization)?,
    })
}

fn friendship_from_row(row: &SqliteRow) -> Result<Friendship, RepoError> {
    let status: String = column(row, "status")?;
    Ok(Friendship {
        user_id: UserId::new(column(row, "user_id")?),
        friend_id: UserId::new(column(row, "friend_id")?),
        status: status.parse().map_err(RepoError::serialization)?,
        created_at: column(row, "created_at")?,
    })
}

fn ledger_from_row(row: &SqliteRow) -> Result<LedgerEntry, RepoError> {
    let kind: String = column(row, "kind")?;
    let quest_id: Option<i64> = column(row, "quest_id")?;
    Ok(LedgerEntry {
        user_id: UserId::new(column(row, "user_id")?),
        delta: Reward::new(column(row, "xp_delta")?, column(row, "coin_delta")?),
        kind: kind.parse().map_err(RepoError::serialization)?,
        quest_id: quest_id.map(QuestId::new),
        description: column(row, "description")?,
        created_at: column(row, "created_at")?,
    })
}

fn collect<T>(
    rows: Vec<SqliteRow>,
    decode: impl Fn(&SqliteRow) -> Result<T, RepoError>,
) -> Result<Vec<T>, RepoError> {
    rows.iter().map(decode).collect()
}

// =============================================================================
// QuestTx
// =============================================================================

#[async_trait]
impl QuestTx for SqliteQuestTx {
    async fn insert_user(&mut self, username: &str, starting: Reward) -> Result<UserId, RepoError> {
        let conn = self.conn()?;
        let result = sqlx::query("INSERT INTO users (username, coins, xp) VALUES (?, ?, ?)")
            .bind(username)
            .bind(starting.coins)
            .bind(starting.xp)
            .execute(&mut *conn)
            .await
            .map_err(|e| RepoError::from_sqlx("insert_user", e))?;
        Ok(UserId::new(result.last_insert_rowid()))
    }

    async fn get_wallet(&mut self, user_id: UserId) -> Result<Option<Wallet>, RepoError> {
        let conn = self.conn()?;
        let row = sqlx::query("SELECT id, coins, xp FROM users WHERE id = ?")
            .bind(user_id.get())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| RepoError::from_sqlx("get_wallet", e))?;

        row.map(|row| -> Result<Wallet, RepoError> {
            Ok(Wallet {
                user_id: UserId::new(column(&row, "id")?),
                coins: column(&row, "coins")?,
                xp: column(&row, "xp")?,
            })
        })
        .transpose()
    }

    async fn adjust_wallet(&mut self, user_id: UserId, delta: Reward) -> Result<(), RepoError> {
        let conn = self.conn()?;
        let result = sqlx::query("UPDATE users SET coins = coins + ?, xp = xp + ? WHERE id = ?")
            .bind(delta.coins)
            .bind(delta.xp)
            .bind(user_id.get())
            .execute(&mut *conn)
            .await
            .map_err(|e| RepoError::from_sqlx("adjust_wallet", e))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::not_found("User", user_id));
        }
        Ok(())
    }

    async fn record_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<(), RepoError> {
        let conn = self.conn()?;
        sqlx::query(
            r#"
            INSERT INTO user_coin_transactions
                (user_id, coin_delta, xp_delta, kind, quest_id, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.user_id.get())
        .bind(entry.delta.coins)
        .bind(entry.delta.xp)
        .bind(entry.kind.as_str())
        .bind(entry.quest_id.map(QuestId::get))
        .bind(&entry.description)
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("record_ledger_entry", e))?;
        Ok(())
    }

    async fn list_ledger_entries(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<LedgerEntry>, RepoError> {
        let conn = self.conn()?;
        let rows = sqlx::query(
            r#"
            SELECT user_id, coin_delta, xp_delta, kind, quest_id, description, created_at
            FROM user_coin_transactions
            WHERE user_id = ?
            ORDER BY id
            "#,
        )
        .bind(user_id.get())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("list_ledger_entries", e))?;
        collect(rows, ledger_from_row)
    }

    async fn insert_quest(&mut self, draft: &QuestDraft) -> Result<QuestId, RepoError> {
        let (buff_type, buff_data) = match &draft.bonus_buff {
            Some(effect) => (
                Some(effect.buff_type().as_str()),
                Some(effect.to_payload().map_err(RepoError::serialization)?),
            ),
            None => (None, None),
        };

        let conn = self.conn()?;
        let result = sqlx::query(
            r#"
            INSERT INTO quests
                (title, description, category, rarity, difficulty, price, tasks_count,
                 reward_xp, reward_coin, time_limit_hours, next_quest_id,
                 bonus_buff_type, bonus_buff_data)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.category.as_str())
        .bind(draft.rarity.as_str())
        .bind(i64::from(draft.difficulty.value()))
        .bind(draft.price)
        .bind(i64::from(draft.tasks_count))
        .bind(draft.reward.xp)
        .bind(draft.reward.coins)
        .bind(i64::from(draft.time_limit_hours))
        .bind(draft.next_quest_id.map(QuestId::get))
        .bind(buff_type)
        .bind(buff_data)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("insert_quest", e))?;
        Ok(QuestId::new(result.last_insert_rowid()))
    }

    async fn insert_task(
        &mut self,
        quest_id: QuestId,
        order: u32,
        draft: &TaskDraft,
    ) -> Result<TaskId, RepoError> {
        let conn = self.conn()?;
        let result = sqlx::query(
            r#"
            INSERT INTO tasks
                (title, description, difficulty, rarity, category, base_xp_reward, base_coin_reward)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(i64::from(draft.difficulty.value()))
        .bind(draft.rarity.as_str())
        .bind(draft.category.as_ref().map(|c| c.as_str().to_string()))
        .bind(draft.base_reward.xp)
        .bind(draft.base_reward.coins)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("insert_task", e))?;
        let task_id = TaskId::new(result.last_insert_rowid());

        sqlx::query("INSERT INTO quest_tasks (quest_id, task_id, task_order) VALUES (?, ?, ?)")
            .bind(quest_id.get())
            .bind(task_id.get())
            .bind(i64::from(order))
            .execute(&mut *conn)
            .await
            .map_err(|e| RepoError::from_sqlx("insert_task", e))?;
        Ok(task_id)
    }

    async fn get_quest(&mut self, quest_id: QuestId) -> Result<Option<Quest>, RepoError> {
        let conn = self.conn()?;
        let row = sqlx::query(&format!("SELECT {} FROM quests q WHERE q.id = ?", QUEST_COLUMNS))
            .bind(quest_id.get())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| RepoError::from_sqlx("get_quest", e))?;
        row.as_ref().map(quest_from_row).transpose()
    }

    async fn list_quests(&mut self) -> Result<Vec<Quest>, RepoError> {
        let conn = self.conn()?;
        let rows = sqlx::query(&format!("SELECT {} FROM quests q ORDER BY q.id", QUEST_COLUMNS))
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| RepoError::from_sqlx("list_quests", e))?;
        collect(rows, quest_from_row)
    }

    async fn list_quest_tasks(&mut self, quest_id: QuestId) -> Result<Vec<Task>, RepoError> {
        let conn = self.conn()?;
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM quest_tasks qt
            JOIN tasks t ON t.id = qt.task_id
            WHERE qt.quest_id = ?
            ORDER BY qt.task_order, t.id
            "#,
            TASK_COLUMNS
        ))
        .bind(quest_id.get())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("list_quest_tasks", e))?;
        collect(rows, task_from_row)
    }

    async fn get_quest_task(
        &mut self,
        quest_id: QuestId,
        task_id: TaskId,
    ) -> Result<Option<Task>, RepoError> {
        let conn = self.conn()?;
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM quest_tasks qt
            JOIN tasks t ON t.id = qt.task_id
            WHERE qt.quest_id = ? AND qt.task_id = ?
            "#,
            TASK_COLUMNS
        ))
        .bind(quest_id.get())
        .bind(task_id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("get_quest_task", e))?;
        row.as_ref().map(task_from_row).transpose()
    }

    async fn list_prerequisites(
        &mut self,
        quest_id: QuestId,
    ) -> Result<Vec<QuestPrerequisite>, RepoError> {
        let conn = self.conn()?;
        let rows = sqlx::query(
            r#"
            SELECT quest_id, prerequisite_quest_id, required_count
            FROM quest_prerequisites
            WHERE quest_id = ?
            ORDER BY id
            "#,
        )
        .bind(quest_id.get())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("list_prerequisites", e))?;

        collect(rows, |row| {
            Ok(QuestPrerequisite {
                quest_id: QuestId::new(column(row, "quest_id")?),
                prerequisite_quest_id: QuestId::new(column(row, "prerequisite_quest_id")?),
                required_count: count(row, "required_count")?,
            })
        })
    }

    async fn upsert_prerequisite(
        &mut self,
        prerequisite: &QuestPrerequisite,
    ) -> Result<(), RepoError> {
        let conn = self.conn()?;
        sqlx::query(
            r#"
            INSERT INTO quest_prerequisites (quest_id, prerequisite_quest_id, required_count)
            VALUES (?, ?, ?)
            ON CONFLICT(quest_id, prerequisite_quest_id) DO UPDATE SET
                required_count = excluded.required_count
            "#,
        )
        .bind(prerequisite.quest_id.get())
        .bind(prerequisite.prerequisite_quest_id.get())
        .bind(i64::from(prerequisite.required_count))
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("upsert_prerequisite", e))?;
        Ok(())
    }

    async fn insert_branch(&mut self, draft: &BranchDraft) -> Result<BranchId, RepoError> {
        let conn = self.conn()?;
        let result = sqlx::query(
            r#"
            INSERT INTO development_branches
                (name, display_name, description, parent_branch_id, level, icon, color)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.display_name)
        .bind(&draft.description)
        .bind(draft.parent_branch_id.map(BranchId::get))
        .bind(i64::from(draft.level))
        .bind(&draft.icon)
        .bind(&draft.color)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("insert_branch", e))?;
        Ok(BranchId::new(result.last_insert_rowid()))
    }

    async fn get_branch(
        &mut self,
        branch_id: BranchId,
    ) -> Result<Option<DevelopmentBranch>, RepoError> {
        let conn = self.conn()?;
        let row = sqlx::query(&format!(
            "SELECT {} FROM development_branches WHERE id = ?",
            BRANCH_COLUMNS
        ))
        .bind(branch_id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("get_branch", e))?;
        row.as_ref().map(branch_from_row).transpose()
    }

    async fn find_branch(
        &mut self,
        name: &str,
        level: u32,
    ) -> Result<Option<DevelopmentBranch>, RepoError> {
        let conn = self.conn()?;
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM development_branches
            WHERE lower(name) = lower(?) AND level = ?
            ORDER BY id
            LIMIT 1
            "#,
            BRANCH_COLUMNS
        ))
        .bind(name)
        .bind(i64::from(level))
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("find_branch", e))?;
        row.as_ref().map(branch_from_row).transpose()
    }

    async fn list_branches(&mut self) -> Result<Vec<DevelopmentBranch>, RepoError> {
        let conn = self.conn()?;
        let rows = sqlx::query(&format!(
            "SELECT {} FROM development_branches ORDER BY level, name",
            BRANCH_COLUMNS
        ))
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("list_branches", e))?;
        collect(rows, branch_from_row)
    }

    async fn list_quest_branches(
        &mut self,
        quest_id: QuestId,
    ) -> Result<Vec<QuestBranch>, RepoError> {
        let conn = self.conn()?;
        let rows = sqlx::query(
            "SELECT quest_id, branch_id, weight FROM quest_branches WHERE quest_id = ? ORDER BY branch_id",
        )
        .bind(quest_id.get())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("list_quest_branches", e))?;

        collect(rows, |row| {
            Ok(QuestBranch {
                quest_id: QuestId::new(column(row, "quest_id")?),
                branch_id: BranchId::new(column(row, "branch_id")?),
                weight: column(row, "weight")?,
            })
        })
    }

    async fn link_quest_to_branch(&mut self, link: &QuestBranch) -> Result<(), RepoError> {
        let conn = self.conn()?;
        sqlx::query(
            r#"
            INSERT INTO quest_branches (quest_id, branch_id, weight)
            VALUES (?, ?, ?)
            ON CONFLICT(quest_id, branch_id) DO UPDATE SET weight = excluded.weight
            "#,
        )
        .bind(link.quest_id.get())
        .bind(link.branch_id.get())
        .bind(link.weight)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("link_quest_to_branch", e))?;
        Ok(())
    }

    async fn get_user_quest(
        &mut self,
        user_id: UserId,
        quest_id: QuestId,
    ) -> Result<Option<UserQuest>, RepoError> {
        let conn = self.conn()?;
        let row = sqlx::query(&format!(
            "SELECT {} FROM user_quests WHERE user_id = ? AND quest_id = ?",
            USER_QUEST_COLUMNS
        ))
        .bind(user_id.get())
        .bind(quest_id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("get_user_quest", e))?;
        row.as_ref().map(user_quest_from_row).transpose()
    }

    async fn insert_user_quest(&mut self, user_quest: &UserQuest) -> Result<(), RepoError> {
        let conn = self.conn()?;
        sqlx::query(&format!(
            "INSERT INTO user_quests ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            USER_QUEST_COLUMNS
        ))
        .bind(user_quest.user_id().get())
        .bind(user_quest.quest_id().get())
        .bind(user_quest.status().as_str())
        .bind(i64::from(user_quest.tasks_done()))
        .bind(user_quest.purchased_at())
        .bind(user_quest.started_at())
        .bind(user_quest.expires_at())
        .bind(user_quest.completed_at())
        .bind(user_quest.reward_gained().xp)
        .bind(user_quest.reward_gained().coins)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("insert_user_quest", e))?;
        Ok(())
    }

    async fn update_user_quest(&mut self, user_quest: &UserQuest) -> Result<(), RepoError> {
        let conn = self.conn()?;
        let result = sqlx::query(
            r#"
            UPDATE user_quests SET
                status = ?, tasks_done = ?, started_at = ?, expires_at = ?,
                completed_at = ?, xp_gained = ?, coin_gained = ?
            WHERE user_id = ? AND quest_id = ?
            "#,
        )
        .bind(user_quest.status().as_str())
        .bind(i64::from(user_quest.tasks_done()))
        .bind(user_quest.started_at())
        .bind(user_quest.expires_at())
        .bind(user_quest.completed_at())
        .bind(user_quest.reward_gained().xp)
        .bind(user_quest.reward_gained().coins)
        .bind(user_quest.user_id().get())
        .bind(user_quest.quest_id().get())
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("update_user_quest", e))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::not_found(
                "UserQuest",
                format!("{}/{}", user_quest.user_id(), user_quest.quest_id()),
            ));
        }
        Ok(())
    }

    async fn lock_user_quests(
        &mut self,
        quest_id: QuestId,
        user_ids: &[UserId],
    ) -> Result<(), RepoError> {
        let conn = self.conn()?;
        // A write takes SQLite's database lock for the rest of the transaction.
        for user_id in user_ids {
            sqlx::query(
                "UPDATE user_quests SET tasks_done = tasks_done WHERE user_id = ? AND quest_id = ?",
            )
            .bind(user_id.get())
            .bind(quest_id.get())
            .execute(&mut *conn)
            .await
            .map_err(|e| RepoError::from_sqlx("lock_user_quests", e))?;
        }
        Ok(())
    }

    async fn list_user_quests(
        &mut self,
        user_id: UserId,
        status: Option<UserQuestStatus>,
    ) -> Result<Vec<UserQuest>, RepoError> {
        let status = status.map(|s| s.as_str());
        let conn = self.conn()?;
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM user_quests
            WHERE user_id = ? AND (? IS NULL OR status = ?)
            ORDER BY purchased_at, quest_id
            "#,
            USER_QUEST_COLUMNS
        ))
        .bind(user_id.get())
        .bind(status)
        .bind(status)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("list_user_quests", e))?;
        collect(rows, user_quest_from_row)
    }

    async fn list_shop_quests(&mut self, user_id: UserId) -> Result<Vec<Quest>, RepoError> {
        let conn = self.conn()?;
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM quests q
            WHERE NOT EXISTS (
                SELECT 1 FROM user_quests uq WHERE uq.quest_id = q.id AND uq.user_id = ?
            )
            ORDER BY q.id
            "#,
            QUEST_COLUMNS
        ))
        .bind(user_id.get())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("list_shop_quests", e))?;
        collect(rows, quest_from_row)
    }

    async fn completed_quest_ids(
        &mut self,
        user_id: UserId,
    ) -> Result<HashSet<QuestId>, RepoError> {
        let conn = self.conn()?;
        let rows = sqlx::query(
            "SELECT quest_id FROM user_quests WHERE user_id = ? AND status = 'completed'",
        )
        .bind(user_id.get())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("completed_quest_ids", e))?;

        rows.iter()
            .map(|row| column(row, "quest_id").map(QuestId::new))
            .collect()
    }

    async fn is_task_completed(
        &mut self,
        user_id: UserId,
        quest_id: QuestId,
        task_id: TaskId,
    ) -> Result<bool, RepoError> {
        let conn = self.conn()?;
        let row = sqlx::query(
            r#"
            SELECT 1 AS found FROM user_completed_tasks
            WHERE user_id = ? AND quest_id = ? AND task_id = ?
            "#,
        )
        .bind(user_id.get())
        .bind(quest_id.get())
        .bind(task_id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("is_task_completed", e))?;
        Ok(row.is_some())
    }

    async fn insert_completed_task(&mut self, task: &CompletedTask) -> Result<(), RepoError> {
        let conn = self.conn()?;
        sqlx::query(
            r#"
            INSERT INTO user_completed_tasks
                (user_id, quest_id, task_id, completed_at, xp_gained, coin_gained, is_confirmed)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(task.user_id.get())
        .bind(task.quest_id.get())
        .bind(task.task_id.get())
        .bind(task.completed_at)
        .bind(task.reward.xp)
        .bind(task.reward.coins)
        .bind(task.is_confirmed)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("insert_completed_task", e))?;
        Ok(())
    }

    async fn confirm_completed_tasks(
        &mut self,
        user_id: UserId,
        quest_id: QuestId,
    ) -> Result<(), RepoError> {
        let conn = self.conn()?;
        sqlx::query(
            "UPDATE user_completed_tasks SET is_confirmed = 1 WHERE user_id = ? AND quest_id = ?",
        )
        .bind(user_id.get())
        .bind(quest_id.get())
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("confirm_completed_tasks", e))?;
        Ok(())
    }

    async fn upsert_buff(&mut self, buff: &PassiveBuff) -> Result<(), RepoError> {
        let payload = buff.effect.to_payload().map_err(RepoError::serialization)?;
        let conn = self.conn()?;
        sqlx::query(
            r#"
            INSERT INTO user_passive_buffs (user_id, quest_id, buff_type, buff_data, is_active)
            VALUES (?, ?, ?, ?, 1)
            ON CONFLICT(user_id, quest_id) DO UPDATE SET
                buff_type = excluded.buff_type,
                buff_data = excluded.buff_data,
                is_active = 1
            "#,
        )
        .bind(buff.user_id.get())
        .bind(buff.quest_id.get())
        .bind(buff.effect.buff_type().as_str())
        .bind(payload)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("upsert_buff", e))?;
        Ok(())
    }

    async fn list_buff_records(&mut self, user_id: UserId) -> Result<Vec<StoredBuff>, RepoError> {
        let conn = self.conn()?;
        let rows = sqlx::query(
            r#"
            SELECT user_id, quest_id, buff_type, buff_data, is_active
            FROM user_passive_buffs
            WHERE user_id = ?
            ORDER BY quest_id
            "#,
        )
        .bind(user_id.get())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("list_buff_records", e))?;

        collect(rows, |row| {
            Ok(StoredBuff {
                user_id: UserId::new(column(row, "user_id")?),
                quest_id: QuestId::new(column(row, "quest_id")?),
                buff_type: column(row, "buff_type")?,
                buff_data: column(row, "buff_data")?,
                is_active: column(row, "is_active")?,
            })
        })
    }

    async fn get_habit_requirement(
        &mut self,
        task_id: TaskId,
    ) -> Result<Option<HabitRequirement>, RepoError> {
        let conn = self.conn()?;
        let row = sqlx::query(
            "SELECT task_id, consecutive_days, daytime FROM task_habit_requirements WHERE task_id = ?",
        )
        .bind(task_id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("get_habit_requirement", e))?;

        row.map(|row| -> Result<HabitRequirement, RepoError> {
            let daytime: Option<String> = column(&row, "daytime")?;
            Ok(HabitRequirement {
                task_id: TaskId::new(column(&row, "task_id")?),
                consecutive_days: count(&row, "consecutive_days")?,
                daytime: daytime
                    .map(|d| d.parse::<DaytimeWindow>())
                    .transpose()
                    .map_err(RepoError::serialization)?,
            })
        })
        .transpose()
    }

    async fn upsert_habit_requirement(
        &mut self,
        requirement: &HabitRequirement,
    ) -> Result<(), RepoError> {
        let conn = self.conn()?;
        sqlx::query(
            r#"
            INSERT INTO task_habit_requirements (task_id, consecutive_days, daytime)
            VALUES (?, ?, ?)
            ON CONFLICT(task_id) DO UPDATE SET
                consecutive_days = excluded.consecutive_days,
                daytime = excluded.daytime
            "#,
        )
        .bind(requirement.task_id.get())
        .bind(i64::from(requirement.consecutive_days))
        .bind(requirement.daytime.map(|d| d.as_str()))
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("upsert_habit_requirement", e))?;
        Ok(())
    }

    async fn upsert_habit_completion(&mut self, record: &HabitRecord) -> Result<(), RepoError> {
        let conn = self.conn()?;
        sqlx::query(
            r#"
            INSERT INTO habit_tracking
                (user_id, quest_id, task_id, completion_date, completion_time, is_confirmed)
            VALUES (?, ?, ?, ?, ?, 1)
            ON CONFLICT(user_id, task_id, completion_date) DO UPDATE SET
                completion_time = COALESCE(excluded.completion_time, habit_tracking.completion_time),
                is_confirmed = 1
            "#,
        )
        .bind(record.user_id.get())
        .bind(record.quest_id.get())
        .bind(record.task_id.get())
        .bind(record.completion_date)
        .bind(record.completion_time)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("upsert_habit_completion", e))?;
        Ok(())
    }

    async fn get_habit_record(
        &mut self,
        user_id: UserId,
        task_id: TaskId,
        date: NaiveDate,
    ) -> Result<Option<HabitRecord>, RepoError> {
        let conn = self.conn()?;
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM habit_tracking
            WHERE user_id = ? AND task_id = ? AND completion_date = ?
            "#,
            HABIT_COLUMNS
        ))
        .bind(user_id.get())
        .bind(task_id.get())
        .bind(date)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("get_habit_record", e))?;
        row.as_ref().map(habit_from_row).transpose()
    }

    async fn confirm_habit_day(&mut self, record: &HabitRecord) -> Result<(), RepoError> {
        let conn = self.conn()?;
        sqlx::query(
            r#"
            INSERT INTO habit_tracking
                (user_id, quest_id, task_id, completion_date, completion_time, is_confirmed)
            VALUES (?, ?, ?, ?, NULL, 1)
            ON CONFLICT(user_id, task_id, completion_date) DO UPDATE SET is_confirmed = 1
            "#,
        )
        .bind(record.user_id.get())
        .bind(record.quest_id.get())
        .bind(record.task_id.get())
        .bind(record.completion_date)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("confirm_habit_day", e))?;
        Ok(())
    }

    async fn list_confirmed_habit_records(
        &mut self,
        user_id: UserId,
        task_id: TaskId,
        since: NaiveDate,
    ) -> Result<Vec<HabitRecord>, RepoError> {
        let conn = self.conn()?;
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM habit_tracking
            WHERE user_id = ? AND task_id = ? AND is_confirmed = 1 AND completion_date >= ?
            ORDER BY completion_date DESC
            "#,
            HABIT_COLUMNS
        ))
        .bind(user_id.get())
        .bind(task_id.get())
        .bind(since)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("list_confirmed_habit_records", e))?;
        collect(rows, habit_from_row)
    }

    async fn last_confirmed_habit_date(
        &mut self,
        user_id: UserId,
        task_id: TaskId,
    ) -> Result<Option<NaiveDate>, RepoError> {
        let conn = self.conn()?;
        let row = sqlx::query(
            r#"
            SELECT completion_date
            FROM habit_tracking
            WHERE user_id = ? AND task_id = ? AND is_confirmed = 1
            ORDER BY completion_date DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.get())
        .bind(task_id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("last_confirmed_habit_date", e))?;
        row.map(|row| column(&row, "completion_date")).transpose()
    }

    async fn insert_shared_quest(
        &mut self,
        quest_id: QuestId,
        user1_id: UserId,
        user2_id: UserId,
    ) -> Result<SharedQuestId, RepoError> {
        let conn = self.conn()?;
        let result = sqlx::query(
            "INSERT INTO shared_quests (quest_id, user1_id, user2_id, status) VALUES (?, ?, ?, 'active')",
        )
        .bind(quest_id.get())
        .bind(user1_id.get())
        .bind(user2_id.get())
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("insert_shared_quest", e))?;
        Ok(SharedQuestId::new(result.last_insert_rowid()))
    }

    async fn get_active_shared_quest(
        &mut self,
        quest_id: QuestId,
        user_id: UserId,
    ) -> Result<Option<SharedQuest>, RepoError> {
        let conn = self.conn()?;
        let row = sqlx::query(
            r#"
            SELECT id, quest_id, user1_id, user2_id, status
            FROM shared_quests
            WHERE quest_id = ? AND status = 'active' AND (user1_id = ? OR user2_id = ?)
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(quest_id.get())
        .bind(user_id.get())
        .bind(user_id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("get_active_shared_quest", e))?;
        row.as_ref().map(shared_quest_from_row).transpose()
    }

    async fn update_shared_quest_status(
        &mut self,
        id: SharedQuestId,
        status: SharedQuestStatus,
    ) -> Result<(), RepoError> {
        let conn = self.conn()?;
        let result = sqlx::query("UPDATE shared_quests SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.get())
            .execute(&mut *conn)
            .await
            .map_err(|e| RepoError::from_sqlx("update_shared_quest_status", e))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::not_found("SharedQuest", id));
        }
        Ok(())
    }

    async fn list_shared_quests(&mut self, user_id: UserId) -> Result<Vec<SharedQuest>, RepoError> {
        let conn = self.conn()?;
        let rows = sqlx::query(
            r#"
            SELECT id, quest_id, user1_id, user2_id, status
            FROM shared_quests
            WHERE user1_id = ? OR user2_id = ?
            ORDER BY id
            "#,
        )
        .bind(user_id.get())
        .bind(user_id.get())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("list_shared_quests", e))?;
        collect(rows, shared_quest_from_row)
    }

    async fn get_friendship(
        &mut self,
        user_id: UserId,
        other_id: UserId,
    ) -> Result<Option<Friendship>, RepoError> {
        let conn = self.conn()?;
        let row = sqlx::query(
            r#"
            SELECT user_id, friend_id, status, created_at
            FROM friends
            WHERE (user_id = ? AND friend_id = ?) OR (user_id = ? AND friend_id = ?)
            LIMIT 1
            "#,
        )
        .bind(user_id.get())
        .bind(other_id.get())
        .bind(other_id.get())
        .bind(user_id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("get_friendship", e))?;
        row.as_ref().map(friendship_from_row).transpose()
    }

    async fn insert_friendship(&mut self, friendship: &Friendship) -> Result<(), RepoError> {
        let conn = self.conn()?;
        sqlx::query(
            "INSERT INTO friends (user_id, friend_id, status, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(friendship.user_id.get())
        .bind(friendship.friend_id.get())
        .bind(friendship.status.as_str())
        .bind(friendship.created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("insert_friendship", e))?;
        Ok(())
    }

    async fn list_friendships(&mut self, user_id: UserId) -> Result<Vec<Friendship>, RepoError> {
        let conn = self.conn()?;
        let rows = sqlx::query(
            r#"
            SELECT user_id, friend_id, status, created_at
            FROM friends
            WHERE user_id = ? OR friend_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(user_id.get())
        .bind(user_id.get())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| RepoError::from_sqlx("list_friendships", e))?;
        collect(rows, friendship_from_row)
    }

    async fn commit(&mut self) -> Result<(), RepoError> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| RepoError::database("commit", "transaction already committed"))?;
        tx.commit()
            .await
            .map_err(|e| RepoError::database("commit", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteQuestStore {
        let db = SqliteDatabase::in_memory().await.expect("in-memory database");
        db.initialize_schema().await.expect("schema");
        SqliteQuestStore::new(db)
    }

    fn quest_draft() -> (QuestDraft, Vec<TaskDraft>) {
        let difficulty = Difficulty::new(3).expect("valid difficulty");
        let draft = QuestDraft::new("Hydrate", QuestCategory::Health, difficulty)
            .with_tasks_count(1)
            .with_price(10)
            .with_reward(Reward::new(30, 5))
            .with_bonus_buff(BuffEffect::reward_multiplier(QuestCategory::Health, 1.1));
        let tasks = vec![TaskDraft::new("Drink water", difficulty)];
        (draft, tasks)
    }

    #[tokio::test]
    async fn uncommitted_writes_are_rolled_back() {
        let store = store().await;

        let mut tx = store.begin().await.expect("begin");
        let user = tx
            .insert_user("ghost", Reward::new(0, 100))
            .await
            .expect("insert user");
        drop(tx);

        let mut tx = store.begin().await.expect("begin");
        assert!(tx.get_wallet(user).await.expect("query").is_none());
    }

    #[tokio::test]
    async fn quest_round_trips_with_ordered_tasks_and_bonus_buff() {
        let store = store().await;
        let (draft, tasks) = quest_draft();

        let mut tx = store.begin().await.expect("begin");
        let quest_id = tx.insert_quest(&draft).await.expect("insert quest");
        let second = TaskDraft::new("Refill bottle", draft.difficulty);
        tx.insert_task(quest_id, 2, &second).await.expect("task 2");
        tx.insert_task(quest_id, 1, &tasks[0]).await.expect("task 1");
        tx.commit().await.expect("commit");

        let mut tx = store.begin().await.expect("begin");
        let quest = tx
            .get_quest(quest_id)
            .await
            .expect("query")
            .expect("quest exists");
        assert_eq!(quest.title(), "Hydrate");
        assert_eq!(quest.reward(), Reward::new(30, 5));
        assert_eq!(
            quest.bonus_buff().and_then(|b| b.multiplier_for(&QuestCategory::Health)),
            Some(1.1)
        );

        let loaded = tx.list_quest_tasks(quest_id).await.expect("tasks");
        let titles: Vec<&str> = loaded.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Drink water", "Refill bottle"]);
    }

    #[tokio::test]
    async fn duplicate_user_quest_is_a_constraint_violation() {
        let store = store().await;
        let (draft, _) = quest_draft();

        let mut tx = store.begin().await.expect("begin");
        let user = tx.insert_user("ada", Reward::ZERO).await.expect("user");
        let quest = tx.insert_quest(&draft).await.expect("quest");
        let run = UserQuest::purchased(user, quest, Utc::now());
        tx.insert_user_quest(&run).await.expect("first insert");

        let err = tx.insert_user_quest(&run).await.expect_err("duplicate");
        assert!(matches!(err, RepoError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn habit_completion_keeps_stored_time_when_none_given() {
        let store = store().await;
        let (draft, tasks) = quest_draft();
        let date = NaiveDate::from_ymd_opt(2024, 4, 1).expect("valid date");
        let morning = NaiveTime::from_hms_opt(7, 15, 0);

        let mut tx = store.begin().await.expect("begin");
        let user = tx.insert_user("ada", Reward::ZERO).await.expect("user");
        let quest = tx.insert_quest(&draft).await.expect("quest");
        let task = tx.insert_task(quest, 1, &tasks[0]).await.expect("task");

        let first = HabitRecord::completion(user, quest, task, date, morning);
        tx.upsert_habit_completion(&first).await.expect("first");
        let again = HabitRecord::completion(user, quest, task, date, None);
        tx.upsert_habit_completion(&again).await.expect("again");

        let stored = tx
            .get_habit_record(user, task, date)
            .await
            .expect("query")
            .expect("record exists");
        assert_eq!(stored.completion_time, morning);
        assert!(stored.is_confirmed);
    }

    #[tokio::test]
    async fn data_survives_reopening_file_database() {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = format!("sqlite://{}", dir.path().join("overman.db").display());

        let user = {
            let db = SqliteDatabase::connect(&url, 2).await.expect("connect");
            db.initialize_schema().await.expect("schema");
            let store = SqliteQuestStore::new(db.clone());
            let mut tx = store.begin().await.expect("begin");
            let user = tx
                .insert_user("persistent", Reward::new(5, 40))
                .await
                .expect("user");
            tx.commit().await.expect("commit");
            db.pool().close().await;
            user
        };

        let db = SqliteDatabase::connect(&url, 2).await.expect("reconnect");
        db.initialize_schema().await.expect("schema is idempotent");
        let store = SqliteQuestStore::new(db);
        let mut tx = store.begin().await.expect("begin");
        let wallet = tx
            .get_wallet(user)
            .await
            .expect("query")
            .expect("user persisted");
        assert_eq!((wallet.xp, wallet.coins), (5, 40));
    }
}
