//! Relational schema. Every statement is idempotent.

pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        coins INTEGER NOT NULL DEFAULT 0,
        xp INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quests (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        category TEXT NOT NULL,
        rarity TEXT NOT NULL,
        difficulty INTEGER NOT NULL,
        price INTEGER NOT NULL DEFAULT 0,
        tasks_count INTEGER NOT NULL,
        reward_xp INTEGER NOT NULL DEFAULT 0,
        reward_coin INTEGER NOT NULL DEFAULT 0,
        time_limit_hours INTEGER NOT NULL DEFAULT 24,
        next_quest_id INTEGER REFERENCES quests(id),
        bonus_buff_type TEXT,
        bonus_buff_data TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        difficulty INTEGER NOT NULL,
        rarity TEXT NOT NULL,
        category TEXT,
        base_xp_reward INTEGER NOT NULL DEFAULT 0,
        base_coin_reward INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quest_tasks (
        quest_id INTEGER NOT NULL REFERENCES quests(id),
        task_id INTEGER NOT NULL REFERENCES tasks(id),
        task_order INTEGER NOT NULL,
        PRIMARY KEY (quest_id, task_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_quests (
        user_id INTEGER NOT NULL REFERENCES users(id),
        quest_id INTEGER NOT NULL REFERENCES quests(id),
        status TEXT NOT NULL,
        tasks_done INTEGER NOT NULL DEFAULT 0,
        purchased_at TEXT NOT NULL,
        started_at TEXT,
        expires_at TEXT,
        completed_at TEXT,
        xp_gained INTEGER NOT NULL DEFAULT 0,
        coin_gained INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (user_id, quest_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_completed_tasks (
        user_id INTEGER NOT NULL REFERENCES users(id),
        quest_id INTEGER NOT NULL REFERENCES quests(id),
        task_id INTEGER NOT NULL REFERENCES tasks(id),
        completed_at TEXT NOT NULL,
        xp_gained INTEGER NOT NULL DEFAULT 0,
        coin_gained INTEGER NOT NULL DEFAULT 0,
        is_confirmed INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (user_id, quest_id, task_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_coin_transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        coin_delta INTEGER NOT NULL,
        xp_delta INTEGER NOT NULL,
        kind TEXT NOT NULL,
        quest_id INTEGER REFERENCES quests(id),
        description TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS task_habit_requirements (
        task_id INTEGER PRIMARY KEY REFERENCES tasks(id),
        consecutive_days INTEGER NOT NULL,
        daytime TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS habit_tracking (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        quest_id INTEGER NOT NULL REFERENCES quests(id),
        task_id INTEGER NOT NULL REFERENCES tasks(id),
        completion_date TEXT NOT NULL,
        completion_time TEXT,
        is_confirmed INTEGER NOT NULL DEFAULT 0,
        UNIQUE (user_id, task_id, completion_date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quest_prerequisites (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        quest_id INTEGER NOT NULL REFERENCES quests(id),
        prerequisite_quest_id INTEGER NOT NULL REFERENCES quests(id),
        required_count INTEGER NOT NULL DEFAULT 1,
        UNIQUE (quest_id, prerequisite_quest_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS development_branches (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        display_name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        parent_branch_id INTEGER REFERENCES development_branches(id),
        level INTEGER NOT NULL DEFAULT 1,
        icon TEXT,
        color TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quest_branches (
        quest_id INTEGER NOT NULL REFERENCES quests(id),
        branch_id INTEGER NOT NULL REFERENCES development_branches(id),
        weight REAL NOT NULL DEFAULT 1.0,
        PRIMARY KEY (quest_id, branch_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_passive_buffs (
        user_id INTEGER NOT NULL REFERENCES users(id),
        quest_id INTEGER NOT NULL REFERENCES quests(id),
        buff_type TEXT NOT NULL,
        buff_data TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        PRIMARY KEY (user_id, quest_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS shared_quests (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        quest_id INTEGER NOT NULL REFERENCES quests(id),
        user1_id INTEGER NOT NULL REFERENCES users(id),
        user2_id INTEGER NOT NULL REFERENCES users(id),
        status TEXT NOT NULL DEFAULT 'active',
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS friends (
        user_id INTEGER NOT NULL REFERENCES users(id),
        friend_id INTEGER NOT NULL REFERENCES users(id),
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        PRIMARY KEY (user_id, friend_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_quest_tasks_order ON quest_tasks (quest_id, task_order)",
    "CREATE INDEX IF NOT EXISTS idx_user_quests_status ON user_quests (user_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_habit_tracking_user_task ON habit_tracking (user_id, task_id, completion_date)",
    "CREATE INDEX IF NOT EXISTS idx_coin_transactions_user ON user_coin_transactions (user_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_shared_quests_quest ON shared_quests (quest_id, status)",
];
